use serde::{Deserialize, Serialize};
use torque_curve::Ease;

use crate::ConfigError;

/// Sentinel for "never ends". Propagates through every derived field.
pub const INFINITE_LIFETIME: f32 = f32::INFINITY;

/// Authored timing of an effect or a weighted modifier.
///
/// A negative `lifetime` means infinite. Fades and a finite lifetime are
/// scaled by `life_bias` when the schedule is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingParams {
    pub delay: f32,
    pub lifetime: f32,
    pub fade_in_time: f32,
    pub fade_out_time: f32,
    pub residue_lifetime: f32,
    pub fade_in_ease: Ease,
    pub fade_out_ease: Ease,
    pub life_bias: f32,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            delay: 0.0,
            lifetime: -1.0,
            fade_in_time: 0.0,
            fade_out_time: 0.0,
            residue_lifetime: 0.0,
            fade_in_ease: Ease::LINEAR,
            fade_out_ease: Ease::LINEAR,
            life_bias: 1.0,
        }
    }
}

impl TimingParams {
    /// Finite timing with linear fades.
    pub fn finite(delay: f32, lifetime: f32, fade_in_time: f32, fade_out_time: f32) -> Self {
        Self {
            delay,
            lifetime,
            fade_in_time,
            fade_out_time,
            ..Self::default()
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.lifetime < 0.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("delay", self.delay),
            ("lifetime", self.lifetime),
            ("fade_in_time", self.fade_in_time),
            ("fade_out_time", self.fade_out_time),
            ("residue_lifetime", self.residue_lifetime),
            ("life_bias", self.life_bias),
        ];
        for (field, v) in finite {
            if !v.is_finite() {
                return Err(ConfigError::invalid(field, format!("{v} is not finite")));
            }
        }
        for (field, v) in [
            ("delay", self.delay),
            ("fade_in_time", self.fade_in_time),
            ("fade_out_time", self.fade_out_time),
            ("residue_lifetime", self.residue_lifetime),
        ] {
            if v < 0.0 {
                return Err(ConfigError::invalid(field, format!("{v} is negative")));
            }
        }
        if self.life_bias <= 0.0 {
            return Err(ConfigError::invalid("life_bias", "must be positive"));
        }
        if !self.fade_in_ease.is_valid() || !self.fade_out_ease.is_valid() {
            return Err(ConfigError::invalid("ease", "ease points must lie in [0, 1]"));
        }
        Ok(())
    }

    /// Apply the life bias and derive every time boundary.
    pub fn schedule(&self) -> TimingSchedule {
        let bias = self.life_bias;
        let scale = |v: f32| if bias != 1.0 { v * bias } else { v };
        let lifetime = if self.is_infinite() {
            INFINITE_LIFETIME
        } else {
            scale(self.lifetime)
        };
        let fade_in_time = scale(self.fade_in_time);
        let fade_out_time = scale(self.fade_out_time);
        let delay = self.delay;

        let full_lifetime = lifetime + fade_out_time;
        let life_end = delay + lifetime;
        let fade_out_start = if full_lifetime.is_infinite() {
            INFINITE_LIFETIME
        } else {
            delay + lifetime
        };
        TimingSchedule {
            delay,
            lifetime,
            fade_in_time,
            fade_out_time,
            residue_lifetime: self.residue_lifetime,
            full_lifetime,
            life_end,
            fade_in_end: delay + fade_in_time,
            fade_out_start,
            done_time: fade_out_start + fade_out_time,
            do_fade_inout: fade_in_time + fade_out_time > 0.0,
            fade_in_ease: self.fade_in_ease,
            fade_out_ease: self.fade_out_ease,
        }
    }
}

/// Derived, biased timing. Infinite fields hold [`INFINITE_LIFETIME`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSchedule {
    pub delay: f32,
    pub lifetime: f32,
    pub fade_in_time: f32,
    pub fade_out_time: f32,
    pub residue_lifetime: f32,
    pub full_lifetime: f32,
    pub life_end: f32,
    pub fade_in_end: f32,
    pub fade_out_start: f32,
    pub done_time: f32,
    pub do_fade_inout: bool,
    pub fade_in_ease: Ease,
    pub fade_out_ease: Ease,
}

impl TimingSchedule {
    pub fn is_infinite(&self) -> bool {
        self.full_lifetime.is_infinite()
    }

    /// Weight factor at `elapsed` seconds since start.
    ///
    /// 0 before the delay, eased up across the fade-in, 1 through the full
    /// window, eased down across the fade-out and 0 once done.
    pub fn weight_at(&self, elapsed: f32) -> f32 {
        if elapsed < self.delay {
            return 0.0;
        }
        if elapsed < self.fade_in_end {
            let t = (elapsed - self.delay) / self.fade_in_time;
            return self.fade_in_ease.apply(t.clamp(0.0, 1.0));
        }
        if elapsed < self.fade_out_start {
            return 1.0;
        }
        if elapsed < self.done_time {
            let t = (elapsed - self.fade_out_start) / self.fade_out_time;
            return 1.0 - self.fade_out_ease.apply(t.clamp(0.0, 1.0));
        }
        0.0
    }

    /// Delay 0, never ends, no fades: the weight is 1 for all elapsed >= 0.
    pub fn is_constant_full(&self) -> bool {
        self.delay == 0.0 && self.is_infinite() && self.fade_in_time == 0.0
    }

    /// Turn an infinite schedule into one that ends `after_stop` seconds
    /// after `elapsed`. The fade-out is stretched over that same window, so
    /// the weight reaches zero exactly when the update window closes.
    pub fn collapse_at(&mut self, elapsed: f32, after_stop: f32) {
        let lived = (elapsed - self.delay).max(0.0);
        let after_stop = after_stop.max(0.0);
        self.lifetime = lived;
        self.fade_out_time = after_stop;
        self.full_lifetime = lived + after_stop;
        self.life_end = self.delay + lived;
        self.fade_out_start = self.life_end;
        self.done_time = self.life_end + after_stop;
        self.do_fade_inout = self.fade_in_time + self.fade_out_time > 0.0;
    }
}

/// A modifier's weighting, with the constant-1.0 shortcut.
#[derive(Debug, Clone, Copy)]
pub struct Weighting {
    schedule: TimingSchedule,
    constant: bool,
}

impl Weighting {
    pub fn new(params: &TimingParams) -> Self {
        let schedule = params.schedule();
        Self {
            constant: schedule.is_constant_full(),
            schedule,
        }
    }

    pub fn schedule(&self) -> &TimingSchedule {
        &self.schedule
    }

    pub fn factor(&self, elapsed: f32) -> f32 {
        if self.constant {
            1.0
        } else {
            self.schedule.weight_at(elapsed)
        }
    }
}

impl Default for Weighting {
    fn default() -> Self {
        Self::new(&TimingParams::default())
    }
}
