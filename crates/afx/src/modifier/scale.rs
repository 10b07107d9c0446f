use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub scale: Vec3,
    pub timing: TimingParams,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            scale: Vec3::ONE,
            timing: TimingParams::default(),
        }
    }
}

/// Multiplies scale by a factor faded in from identity.
#[derive(Debug)]
pub struct ScaleModifier {
    scale: Vec3,
    weighting: Weighting,
}

impl ScaleModifier {
    pub fn new(config: &ScaleConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            scale: config.scale,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for ScaleModifier {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        params.scale *= Vec3::ONE.lerp(self.scale, w);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockwaveConfig {
    /// Scale growth per second.
    pub rate: f32,
    /// Grow in X and Y only.
    pub flat: bool,
    pub timing: TimingParams,
}

impl Default for ShockwaveConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            flat: false,
            timing: TimingParams::default(),
        }
    }
}

/// Expanding ring: scale grows linearly from the modifier's own delay.
#[derive(Debug)]
pub struct ShockwaveModifier {
    rate: f32,
    flat: bool,
    weighting: Weighting,
}

impl ShockwaveModifier {
    pub fn new(config: &ShockwaveConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            rate: config.rate,
            flat: config.flat,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for ShockwaveModifier {
    fn name(&self) -> &'static str {
        "shockwave"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        let age = (elapsed - self.weighting.schedule().delay).max(0.0);
        let grow = 1.0 + self.rate * age * w;
        if self.flat {
            params.scale.x *= grow;
            params.scale.y *= grow;
        } else {
            params.scale *= grow;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomRotConfig {
    /// Zero picks a random axis per start.
    pub axis: Vec3,
    /// Degrees.
    pub theta_min: f32,
    pub theta_max: f32,
    pub timing: TimingParams,
}

impl Default for RandomRotConfig {
    fn default() -> Self {
        Self {
            axis: Vec3::Z,
            theta_min: 0.0,
            theta_max: 360.0,
            timing: TimingParams::default(),
        }
    }
}

/// A rotation chosen once per start and faded in by weight.
#[derive(Debug)]
pub struct RandomRotModifier {
    axis: Option<Vec3>,
    theta_min: f32,
    theta_max: f32,
    rotation: Quat,
    weighting: Weighting,
}

impl RandomRotModifier {
    pub fn new(config: &RandomRotConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        if config.theta_min > config.theta_max {
            return Err(ConfigError::invalid(
                "theta_min",
                format!("{} exceeds theta_max {}", config.theta_min, config.theta_max),
            ));
        }
        Ok(Self {
            axis: config.axis.try_normalize(),
            theta_min: config.theta_min,
            theta_max: config.theta_max,
            rotation: Quat::IDENTITY,
            weighting: Weighting::new(&config.timing),
        })
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }
}

impl XfmModifier for RandomRotModifier {
    fn name(&self) -> &'static str {
        "random_rot"
    }

    fn start(&mut self, _timestamp: f32, ctx: &mut ModifierContext<'_>) {
        let axis = self.axis.unwrap_or_else(|| {
            let rng = &mut *ctx.rng;
            Vec3::new(rng.signed_unit(), rng.signed_unit(), rng.signed_unit())
                .try_normalize()
                .unwrap_or(Vec3::Z)
        });
        let theta = ctx.rng.range(self.theta_min, self.theta_max);
        self.rotation = Quat::from_axis_angle(axis, theta.to_radians());
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        params.ori = (params.ori * Quat::IDENTITY.slerp(self.rotation, w)).normalize();
    }
}
