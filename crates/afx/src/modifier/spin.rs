use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    pub axis: Vec3,
    /// Initial angle, degrees.
    pub angle: f32,
    pub angle_variance: f32,
    /// Degrees per second.
    pub rate: f32,
    pub rate_variance: f32,
    pub timing: TimingParams,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            axis: Vec3::Z,
            angle: 0.0,
            angle_variance: 0.0,
            rate: 0.0,
            rate_variance: 0.0,
            timing: TimingParams::default(),
        }
    }
}

/// Accumulating rotation about a fixed local axis.
#[derive(Debug)]
pub struct SpinModifier {
    axis: Vec3,
    base_angle: f32,
    angle_variance: f32,
    base_rate: f32,
    rate_variance: f32,
    theta: f32,
    rate: f32,
    weighting: Weighting,
}

impl SpinModifier {
    pub fn new(config: &SpinConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        let axis = config
            .axis
            .try_normalize()
            .ok_or_else(|| ConfigError::invalid("axis", "spin axis must be non-zero"))?;
        for (field, v) in [
            ("angle", config.angle),
            ("angle_variance", config.angle_variance),
            ("rate", config.rate),
            ("rate_variance", config.rate_variance),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::invalid(field, format!("{v} is not finite")));
            }
        }
        Ok(Self {
            axis,
            base_angle: config.angle,
            angle_variance: config.angle_variance,
            base_rate: config.rate,
            rate_variance: config.rate_variance,
            theta: config.angle,
            rate: config.rate,
            weighting: Weighting::new(&config.timing),
        })
    }

    /// Current angle in degrees.
    pub fn angle(&self) -> f32 {
        self.theta
    }
}

impl XfmModifier for SpinModifier {
    fn name(&self) -> &'static str {
        "spin"
    }

    fn start(&mut self, _timestamp: f32, ctx: &mut ModifierContext<'_>) {
        self.theta = self.base_angle;
        if self.angle_variance != 0.0 {
            self.theta += self.angle_variance * ctx.rng.signed_unit();
        }
        self.rate = self.base_rate;
        if self.rate_variance != 0.0 {
            self.rate += self.rate_variance * ctx.rng.signed_unit();
        }
    }

    fn update_params(
        &mut self,
        dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        self.theta = (self.theta + self.rate * w * dt) % 360.0;
        params.ori *= Quat::from_axis_angle(self.axis, self.theta.to_radians());
    }
}
