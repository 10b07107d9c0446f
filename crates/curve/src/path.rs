use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{AnimCurve, Curve3D, CurveError};

/// What a path does once its time runs past `end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    /// Hold the final point.
    #[default]
    Constant,
    /// Restart from the first point.
    Cycle,
    /// Run back and forth.
    Oscillate,
}

/// A timed 3D path: a [`Curve3D`] over `[0, 1]` mapped onto
/// `[start_time, end_time]`, with an optional roll value per point.
#[derive(Debug, Clone)]
pub struct Path3D {
    curve: Curve3D,
    roll: Option<AnimCurve>,
    start_time: f32,
    end_time: f32,
    loop_kind: LoopKind,
}

impl Path3D {
    /// Build a path through `points`.
    ///
    /// With `times`, each point is placed at its time normalized over the
    /// first..last range; otherwise points are spread uniformly. The path
    /// runs from `delay` to `delay + lifetime`.
    pub fn new(
        points: &[Vec3],
        times: Option<&[f32]>,
        delay: f32,
        lifetime: f32,
        loop_kind: LoopKind,
    ) -> Result<Self, CurveError> {
        let curve = match times {
            Some(times) => {
                if times.len() != points.len() {
                    return Err(CurveError::LengthMismatch {
                        values: points.len(),
                        params: times.len(),
                    });
                }
                Curve3D::from_points_with_params(points, &normalize_times(times))?
            }
            None => Curve3D::from_points(points)?,
        };
        Ok(Self {
            curve,
            roll: None,
            start_time: delay,
            end_time: delay + lifetime.max(0.0),
            loop_kind,
        })
    }

    /// Attach per-point roll angles (degrees), aligned with the curve points.
    pub fn with_roll(mut self, rolls: &[f32]) -> Result<Self, CurveError> {
        let params: Vec<f32> = self.curve.points().iter().map(|p| p.param).collect();
        self.roll = Some(AnimCurve::from_params(&params, rolls)?);
        Ok(self)
    }

    pub fn curve(&self) -> &Curve3D {
        &self.curve
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    pub fn loop_kind(&self) -> LoopKind {
        self.loop_kind
    }

    pub fn has_roll(&self) -> bool {
        self.roll.is_some()
    }

    /// Remap wall time onto the curve parameter, applying the loop mode.
    pub fn calc_curve_time(&self, time: f32) -> f32 {
        if time <= self.start_time {
            return 0.0;
        }
        let span = self.end_time - self.start_time;
        if span <= 0.0 {
            return 1.0;
        }
        if time <= self.end_time {
            return (time - self.start_time) / span;
        }
        let local = time - self.start_time;
        match self.loop_kind {
            LoopKind::Constant => 1.0,
            LoopKind::Cycle => (local % span) / span,
            LoopKind::Oscillate => {
                let phase = (local % span) / span;
                if ((local / span) as u64) % 2 == 1 {
                    1.0 - phase
                } else {
                    phase
                }
            }
        }
    }

    pub fn evaluate_at_time(&self, time: f32) -> Vec3 {
        self.curve.evaluate(self.calc_curve_time(time))
    }

    pub fn tangent_at_time(&self, time: f32) -> Vec3 {
        self.curve.evaluate_tangent(self.calc_curve_time(time))
    }

    /// Roll in degrees; zero when the path has no roll data.
    pub fn roll_at_time(&self, time: f32) -> f32 {
        self.roll
            .as_ref()
            .map_or(0.0, |r| r.evaluate(self.calc_curve_time(time)))
    }
}

fn normalize_times(times: &[f32]) -> Vec<f32> {
    let first = times.iter().copied().fold(f32::INFINITY, f32::min);
    let last = times.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = last - first;
    if span <= 0.0 {
        return vec![0.0; times.len()];
    }
    times.iter().map(|t| (t - first) / span).collect()
}
