use bitflags::bitflags;
use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

bitflags! {
    /// Fields an oscillation drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct OscillateMask: u8 {
        const POSITION = 1 << 0;
        const POSITION2 = 1 << 1;
        const SCALE = 1 << 2;
        const ROTATION = 1 << 3;
    }
}

impl Default for OscillateMask {
    fn default() -> Self {
        OscillateMask::POSITION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillateConfig {
    pub mask: OscillateMask,
    pub axis: Vec3,
    pub min: f32,
    pub max: f32,
    /// Radians per second fed to `sin`.
    pub speed: f32,
    /// Position offsets follow the current orientation.
    pub local_offset: bool,
    /// Add to scale instead of multiplying it.
    pub additive_scale: bool,
    pub timing: TimingParams,
}

impl Default for OscillateConfig {
    fn default() -> Self {
        Self {
            mask: OscillateMask::default(),
            axis: Vec3::Z,
            min: 0.0,
            max: 1.0,
            speed: 1.0,
            local_offset: true,
            additive_scale: false,
            timing: TimingParams::default(),
        }
    }
}

/// Position in `[0, 1]` along the min..max swing.
fn swing(speed: f32, elapsed: f32) -> f32 {
    0.5 * ((speed * elapsed).sin() + 1.0)
}

#[derive(Debug)]
pub struct OscillateModifier {
    mask: OscillateMask,
    axis: Vec3,
    min: f32,
    max: f32,
    speed: f32,
    local_offset: bool,
    additive_scale: bool,
    weighting: Weighting,
}

impl OscillateModifier {
    pub fn new(config: &OscillateConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        if config.axis == Vec3::ZERO || !config.axis.is_finite() {
            return Err(ConfigError::invalid("axis", "oscillation axis must be non-zero"));
        }
        Ok(Self {
            mask: config.mask,
            axis: config.axis,
            min: config.min,
            max: config.max,
            speed: config.speed,
            local_offset: config.local_offset,
            additive_scale: config.additive_scale,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for OscillateModifier {
    fn name(&self) -> &'static str {
        "oscillate"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        let value = (self.min + (self.max - self.min) * swing(self.speed, elapsed)) * w;
        let offset = self.axis * value;

        if self.mask.intersects(OscillateMask::POSITION | OscillateMask::POSITION2) {
            let offset = if self.local_offset {
                params.ori * offset
            } else {
                offset
            };
            if self.mask.contains(OscillateMask::POSITION) {
                params.pos += offset;
            }
            if self.mask.contains(OscillateMask::POSITION2) {
                params.pos2 += offset;
            }
        }
        if self.mask.contains(OscillateMask::SCALE) {
            if self.additive_scale {
                params.scale += offset;
            } else {
                params.scale *= Vec3::ONE + offset;
            }
        }
        if self.mask.contains(OscillateMask::ROTATION) {
            // axis is non-zero, checked at build
            params.ori *= Quat::from_axis_angle(self.axis.normalize(), value.to_radians());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillateColorConfig {
    pub color_a: Vec4,
    pub color_b: Vec4,
    pub speed: f32,
    pub timing: TimingParams,
}

impl Default for OscillateColorConfig {
    fn default() -> Self {
        Self {
            color_a: Vec4::ONE,
            color_b: Vec4::new(0.0, 0.0, 0.0, 1.0),
            speed: 1.0,
            timing: TimingParams::default(),
        }
    }
}

/// Swings color between two endpoints.
#[derive(Debug)]
pub struct OscillateColorModifier {
    color_a: Vec4,
    color_b: Vec4,
    speed: f32,
    weighting: Weighting,
}

impl OscillateColorModifier {
    pub fn new(config: &OscillateColorConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            color_a: config.color_a,
            color_b: config.color_b,
            speed: config.speed,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for OscillateColorModifier {
    fn name(&self) -> &'static str {
        "oscillate_color"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        let target = self.color_a.lerp(self.color_b, swing(self.speed, elapsed));
        params.color = params.color.lerp(target, w);
    }
}
