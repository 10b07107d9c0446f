//! Modifiers that settle the effect onto scene geometry: the ground under
//! it, or the box of the object it is constrained to.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use torque_common::TypeMask;

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

const DEFAULT_CAST_DISTANCE: f32 = 1000.0;

fn check_cast_distance(distance: f32) -> Result<(), ConfigError> {
    if distance.is_finite() && distance > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid("cast_distance", format!("{distance} must be positive")))
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConformConfig {
    /// Height kept above the hit point.
    pub height: f32,
    /// Tilt up-axis onto the surface normal.
    pub conform_orientation: bool,
    pub mask: TypeMask,
    pub cast_distance: f32,
    pub timing: TimingParams,
}

impl Default for GroundConformConfig {
    fn default() -> Self {
        Self {
            height: 0.0,
            conform_orientation: false,
            mask: TypeMask::default(),
            cast_distance: DEFAULT_CAST_DISTANCE,
            timing: TimingParams::default(),
        }
    }
}

/// Snaps to whatever surface lies above or below the current position.
#[derive(Debug)]
pub struct GroundConformModifier {
    height: f32,
    conform_orientation: bool,
    mask: TypeMask,
    cast_distance: f32,
    weighting: Weighting,
}

impl GroundConformModifier {
    pub fn new(config: &GroundConformConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        check_cast_distance(config.cast_distance)?;
        Ok(Self {
            height: config.height,
            conform_orientation: config.conform_orientation,
            mask: config.mask,
            cast_distance: config.cast_distance,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for GroundConformModifier {
    fn name(&self) -> &'static str {
        "ground_conform"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        if w <= 0.0 {
            return;
        }
        let from = params.pos + Vec3::Z * self.cast_distance;
        let to = params.pos - Vec3::Z * self.cast_distance;
        let Some(hit) = ctx.collision.cast_ray(from, to, self.mask) else {
            tracing::trace!(pos = ?params.pos, "ground conform found no surface");
            return;
        };
        params.pos.z = lerp(params.pos.z, hit.point.z + self.height, w);
        if !self.conform_orientation {
            return;
        }
        if let Some(normal) = hit.normal.try_normalize() {
            let up = params.ori * Vec3::Z;
            let tilt = Quat::from_rotation_arc(up, normal);
            params.ori = (Quat::IDENTITY.slerp(tilt, w) * params.ori).normalize();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudeConformConfig {
    pub height: f32,
    /// Keep the altitude seen on the first hit instead of `height`.
    pub freeze: bool,
    pub mask: TypeMask,
    pub cast_distance: f32,
    pub timing: TimingParams,
}

impl Default for AltitudeConformConfig {
    fn default() -> Self {
        Self {
            height: 0.0,
            freeze: false,
            mask: TypeMask::default(),
            cast_distance: DEFAULT_CAST_DISTANCE,
            timing: TimingParams::default(),
        }
    }
}

/// Holds a fixed height above the ground below.
#[derive(Debug)]
pub struct AltitudeConformModifier {
    height: f32,
    freeze: bool,
    frozen_altitude: Option<f32>,
    mask: TypeMask,
    cast_distance: f32,
    weighting: Weighting,
}

impl AltitudeConformModifier {
    pub fn new(config: &AltitudeConformConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        check_cast_distance(config.cast_distance)?;
        Ok(Self {
            height: config.height,
            freeze: config.freeze,
            frozen_altitude: None,
            mask: config.mask,
            cast_distance: config.cast_distance,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for AltitudeConformModifier {
    fn name(&self) -> &'static str {
        "altitude_conform"
    }

    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {
        self.frozen_altitude = None;
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        if w <= 0.0 {
            return;
        }
        let to = params.pos - Vec3::Z * self.cast_distance;
        let Some(hit) = ctx.collision.cast_ray(params.pos, to, self.mask) else {
            tracing::trace!(pos = ?params.pos, "altitude conform found no ground");
            return;
        };
        let altitude = if self.freeze {
            *self.frozen_altitude.get_or_insert(params.pos.z - hit.point.z)
        } else {
            self.height
        };
        params.pos.z = lerp(params.pos.z, hit.point.z + altitude, w);
    }
}

/// Which face of the constraint box to sit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConformConfig {
    pub alignment: BoxAlignment,
    pub offset: f32,
    pub timing: TimingParams,
}

#[derive(Debug)]
pub struct BoxConformModifier {
    alignment: BoxAlignment,
    offset: f32,
    weighting: Weighting,
}

impl BoxConformModifier {
    pub fn new(config: &BoxConformConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            alignment: config.alignment,
            offset: config.offset,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for BoxConformModifier {
    fn name(&self) -> &'static str {
        "box_conform"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let Some(object) = ctx.pos_object() else {
            tracing::trace!("box conform has no constraint object");
            return;
        };
        let b = object.world_box;
        let z = match self.alignment {
            BoxAlignment::Top => b.max.z,
            BoxAlignment::Center => b.center().z,
            BoxAlignment::Bottom => b.min.z,
        };
        let w = self.weighting.factor(elapsed);
        params.pos.z = lerp(params.pos.z, z + self.offset, w);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxHeightOffsetConfig {
    pub height_scale: f32,
    pub offset: Vec3,
    pub timing: TimingParams,
}

impl Default for BoxHeightOffsetConfig {
    fn default() -> Self {
        Self {
            height_scale: 1.0,
            offset: Vec3::ZERO,
            timing: TimingParams::default(),
        }
    }
}

/// Raises the effect by a fraction of the constraint object's height.
#[derive(Debug)]
pub struct BoxHeightOffsetModifier {
    height_scale: f32,
    offset: Vec3,
    weighting: Weighting,
}

impl BoxHeightOffsetModifier {
    pub fn new(config: &BoxHeightOffsetConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            height_scale: config.height_scale,
            offset: config.offset,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for BoxHeightOffsetModifier {
    fn name(&self) -> &'static str {
        "box_height_offset"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let Some(object) = ctx.pos_object() else {
            tracing::trace!("box height offset has no constraint object");
            return;
        };
        let height = object.world_box.max.z - object.world_box.min.z;
        let w = self.weighting.factor(elapsed);
        params.pos += (Vec3::Z * height * self.height_scale + self.offset) * w;
    }
}
