use std::ops::{Add, Mul, Sub};

/// Anything the Hermite basis can blend: scalars and vectors alike.
pub trait HermiteValue: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> {}

impl<T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>> HermiteValue for T {}

/// Cubic Hermite interpolation between `p0` and `p1` with tangents `m0`, `m1`
/// at local parameter `t` in `[0, 1]`.
pub fn hermite<T: HermiteValue>(p0: T, p1: T, m0: T, m1: T, t: f32) -> T {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11
}

/// Derivative of [`hermite`] with respect to `t`.
pub fn hermite_derivative<T: HermiteValue>(p0: T, p1: T, m0: T, m1: T, t: f32) -> T {
    let t2 = t * t;
    let d00 = 6.0 * t2 - 6.0 * t;
    let d10 = 3.0 * t2 - 4.0 * t + 1.0;
    let d01 = -6.0 * t2 + 6.0 * t;
    let d11 = 3.0 * t2 - 2.0 * t;
    p0 * d00 + m0 * d10 + p1 * d01 + m1 * d11
}
