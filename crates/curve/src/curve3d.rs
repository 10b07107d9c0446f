use glam::Vec3;

use crate::CurveError;
use crate::hermite::{hermite, hermite_derivative};

/// A control point of a [`Curve3D`]. `tangent` is filled in by `sort`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub param: f32,
    pub point: Vec3,
    pub tangent: Vec3,
}

/// Hermite curve through 3D points, parameterized (usually) over `[0, 1]`.
///
/// Unlike [`AnimCurve`](crate::AnimCurve) the tangents are precomputed by
/// [`sort`](Self::sort) as `0.5 * (next - prev)`, with the first and last
/// points standing in for their own missing neighbour.
#[derive(Debug, Clone, Default)]
pub struct Curve3D {
    points: Vec<CurvePoint>,
    usable: bool,
    start_param: f32,
    end_param: f32,
    start_point: Vec3,
    end_point: Vec3,
    start_tangent: Vec3,
    end_tangent: Vec3,
}

impl Curve3D {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points spread uniformly over `[0, 1]`.
    pub fn from_points(points: &[Vec3]) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        let denom = (points.len().max(2) - 1) as f32;
        let params: Vec<f32> = (0..points.len()).map(|i| i as f32 / denom).collect();
        Self::from_points_with_params(points, &params)
    }

    pub fn from_points_with_params(points: &[Vec3], params: &[f32]) -> Result<Self, CurveError> {
        if points.is_empty() {
            return Err(CurveError::Empty);
        }
        if points.len() != params.len() {
            return Err(CurveError::LengthMismatch {
                values: points.len(),
                params: params.len(),
            });
        }
        let mut curve = Self::new();
        for (i, (&p, &u)) in points.iter().zip(params).enumerate() {
            if !p.is_finite() || !u.is_finite() {
                return Err(CurveError::NonFinite(i));
            }
            curve.add_point(u, p);
        }
        curve.sort();
        Ok(curve)
    }

    /// Append a point. The curve is unusable until [`sort`](Self::sort) runs.
    pub fn add_point(&mut self, param: f32, point: Vec3) {
        self.points.push(CurvePoint {
            param,
            point,
            tangent: Vec3::ZERO,
        });
        self.usable = false;
    }

    pub fn sort(&mut self) {
        if self.points.is_empty() {
            return;
        }
        if self.points.len() == 1 {
            let p = &mut self.points[0];
            p.tangent = Vec3::ZERO;
            self.start_param = p.param;
            self.end_param = p.param;
            self.start_point = p.point;
            self.end_point = p.point;
            self.start_tangent = Vec3::ZERO;
            self.end_tangent = Vec3::ZERO;
            self.usable = true;
            return;
        }

        self.points.sort_by(|a, b| a.param.total_cmp(&b.param));
        self.compute_tangents();

        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        self.start_param = first.param;
        self.start_point = first.point;
        self.start_tangent = first.tangent;
        self.end_param = last.param;
        self.end_point = last.point;
        self.end_tangent = last.tangent;
        self.usable = true;
    }

    /// Recompute every tangent from the (already sorted) points.
    pub fn compute_tangents(&mut self) {
        let n = self.points.len();
        if n == 0 {
            return;
        }
        let positions: Vec<Vec3> = self.points.iter().map(|p| p.point).collect();
        for (i, p) in self.points.iter_mut().enumerate() {
            let prev = positions[i.saturating_sub(1)];
            let next = positions[(i + 1).min(n - 1)];
            p.tangent = (next - prev) * 0.5;
        }
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn evaluate(&self, param: f32) -> Vec3 {
        if !self.usable {
            return Vec3::ZERO;
        }
        if param <= self.start_param {
            return self.start_point;
        }
        if param >= self.end_param {
            return self.end_point;
        }
        let (a, b, u) = self.segment(param);
        hermite(a.point, b.point, a.tangent, b.tangent, u)
    }

    /// Curve direction at `param`, in point units per unit of parameter.
    /// Outside the parameter range the end tangents are returned.
    pub fn evaluate_tangent(&self, param: f32) -> Vec3 {
        if !self.usable {
            return Vec3::ZERO;
        }
        if param <= self.start_param {
            return self.start_tangent;
        }
        if param >= self.end_param {
            return self.end_tangent;
        }
        let (a, b, u) = self.segment(param);
        let span = b.param - a.param;
        if span <= 0.0 {
            return b.tangent;
        }
        hermite_derivative(a.point, b.point, a.tangent, b.tangent, u) / span
    }

    fn segment(&self, param: f32) -> (CurvePoint, CurvePoint, f32) {
        let last = self.points.len() - 1;
        let mut i = 0;
        while i < last - 1 && self.points[i + 1].param <= param {
            i += 1;
        }
        let a = self.points[i];
        let b = self.points[i + 1];
        let span = b.param - a.param;
        let u = if span > 0.0 {
            (param - a.param) / span
        } else {
            1.0
        };
        (a, b, u)
    }
}
