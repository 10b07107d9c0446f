use serde::{Deserialize, Serialize};

use crate::CurveError;
use crate::hermite::hermite;

/// A (time, value) keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub time: f32,
    pub value: f32,
}

/// Scalar keyframe curve evaluated with Hermite segments.
///
/// Tangents are derived on the fly from neighbouring keys at evaluation
/// time, so keys can be edited freely as long as `sort` runs afterwards.
#[derive(Debug, Clone, Default)]
pub struct AnimCurve {
    keys: Vec<Key>,
    usable: bool,
    start_time: f32,
    end_time: f32,
    start_value: f32,
    end_value: f32,
}

impl AnimCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and sort a curve from `(time, value)` pairs.
    pub fn from_pairs(pairs: &[[f32; 2]]) -> Result<Self, CurveError> {
        let mut curve = Self::new();
        for (i, [t, v]) in pairs.iter().copied().enumerate() {
            if !t.is_finite() || !v.is_finite() {
                return Err(CurveError::NonFinite(i));
            }
            curve.add_key(t, v);
        }
        curve.sort();
        Ok(curve)
    }

    /// Build a curve over `params` with one value per parameter.
    pub fn from_params(params: &[f32], values: &[f32]) -> Result<Self, CurveError> {
        if params.len() != values.len() {
            return Err(CurveError::LengthMismatch {
                values: values.len(),
                params: params.len(),
            });
        }
        let pairs: Vec<[f32; 2]> = params.iter().zip(values).map(|(&t, &v)| [t, v]).collect();
        Self::from_pairs(&pairs)
    }

    /// Append a key. The curve is unusable until [`sort`](Self::sort) runs.
    pub fn add_key(&mut self, time: f32, value: f32) {
        self.keys.push(Key { time, value });
        self.usable = false;
    }

    pub fn sort(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        self.keys.sort_by(|a, b| a.time.total_cmp(&b.time));

        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];
        self.start_time = first.time;
        self.start_value = first.value;
        self.end_time = last.time;
        self.end_value = last.value;
        self.usable = true;
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    pub fn evaluate(&self, time: f32) -> f32 {
        if !self.usable {
            return 0.0;
        }
        if self.keys.len() == 1 || time <= self.start_time {
            return self.start_value;
        }
        if time >= self.end_time {
            return self.end_value;
        }

        // keys are few; a linear scan beats anything clever here
        let last = self.keys.len() - 1;
        let mut i = 0;
        while i < last - 1 && self.keys[i + 1].time <= time {
            i += 1;
        }

        let k0 = self.keys[i];
        let k1 = self.keys[i + 1];
        let span = k1.time - k0.time;
        if span <= 0.0 {
            return k1.value;
        }
        let u = (time - k0.time) / span;

        let m0 = if i == 0 {
            k1.value - k0.value
        } else {
            0.5 * (k1.value - self.keys[i - 1].value)
        };
        let m1 = if i + 1 == last {
            k1.value - k0.value
        } else {
            0.5 * (self.keys[i + 2].value - k0.value)
        };

        hermite(k0.value, k1.value, m0, m1, u)
    }
}
