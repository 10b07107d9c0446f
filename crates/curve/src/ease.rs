use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Two-parameter ease for fade ramps.
///
/// `ease_in` is the fraction of the ramp spent accelerating and `ease_out`
/// the point where deceleration begins. The curve is a sine shoulder, a
/// straight middle and a sine tail; `(0, 1)` is a plain linear ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ease {
    pub ease_in: f32,
    pub ease_out: f32,
}

impl Default for Ease {
    fn default() -> Self {
        Self::LINEAR
    }
}

impl Ease {
    pub const LINEAR: Ease = Ease {
        ease_in: 0.0,
        ease_out: 1.0,
    };

    pub fn new(ease_in: f32, ease_out: f32) -> Self {
        Self { ease_in, ease_out }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.ease_in)
            && (0.0..=1.0).contains(&self.ease_out)
            && self.ease_in <= self.ease_out
    }

    /// Map a normalized ramp position to an eased one. Both ends are fixed:
    /// `apply(0) == 0`, `apply(1) == 1`.
    pub fn apply(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let ein = self.ease_in.clamp(0.0, 1.0);
        let eout = self.ease_out.clamp(ein, 1.0);
        let ee = eout - ein + 1.0;

        if t <= ein {
            let tin = t / ein;
            return ((PI * (tin - 1.0)).sin() + PI * tin) * ein / PI / ee;
        }
        if t <= eout {
            return (2.0 * t - ein) / ee;
        }
        let iout = 1.0 - eout;
        let g = (t - eout) * PI / iout;
        ((g.sin() + g) * iout / PI + 2.0 * eout - ein) / ee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn linear_is_identity() {
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!(approx_eq(Ease::LINEAR.apply(t), t));
        }
    }

    #[test]
    fn shaped_ease_keeps_endpoints_and_monotonic() {
        let e = Ease::new(0.3, 0.6);
        assert_eq!(e.apply(0.0), 0.0);
        assert_eq!(e.apply(1.0), 1.0);
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = e.apply(i as f32 / 100.0);
            assert!(v >= prev - 1e-6, "not monotonic at {i}");
            prev = v;
        }
    }

    #[test]
    fn shaped_ease_is_continuous_at_breaks() {
        let e = Ease::new(0.25, 0.75);
        for brk in [0.25f32, 0.75] {
            let lo = e.apply(brk - 1e-4);
            let hi = e.apply(brk + 1e-4);
            assert!((lo - hi).abs() < 1e-3);
        }
    }

    #[test]
    fn ease_in_starts_slower_than_linear() {
        let e = Ease::new(0.5, 1.0);
        assert!(e.apply(0.1) < 0.1);
    }

    #[test]
    fn validity() {
        assert!(Ease::LINEAR.is_valid());
        assert!(!Ease::new(0.8, 0.2).is_valid());
        assert!(!Ease::new(-0.1, 1.0).is_valid());
    }
}
