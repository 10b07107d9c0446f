//! Keyframe curves: scalar time curves, 3D parameter curves and timed paths.
//!
//! # Invariants
//! - A curve is unusable between `add_key` and `sort`; evaluating it then
//!   yields zero instead of panicking.
//! - Curves clamp outside their key range. Looping is the job of
//!   [`Path3D::calc_curve_time`], never of the curve itself.

mod anim_curve;
mod curve3d;
mod ease;
mod hermite;
mod path;

pub use anim_curve::{AnimCurve, Key};
pub use curve3d::{Curve3D, CurvePoint};
pub use ease::Ease;
pub use hermite::{HermiteValue, hermite, hermite_derivative};
pub use path::{LoopKind, Path3D};

/// Errors from building curves out of authored data.
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    #[error("curve needs at least one point")]
    Empty,
    #[error("{values} values but {params} parameters")]
    LengthMismatch { values: usize, params: usize },
    #[error("non-finite value at index {0}")]
    NonFinite(usize),
}

pub fn crate_info() -> &'static str {
    "torque-curve v0.1.0"
}
