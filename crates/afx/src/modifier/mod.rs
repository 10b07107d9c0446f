//! Transform modifiers.
//!
//! Each modifier reads and writes an [`XfmParams`] once per tick. Weighted
//! modifiers carry their own [`TimingParams`](crate::TimingParams) and blend
//! their contribution by the resulting weight.

mod aim;
mod conform;
mod freeze;
mod offset;
mod oscillate;
mod path_conform;
mod scale;
mod spin;
mod wave;

pub use aim::{AimConfig, AimModifier};
pub use conform::{
    AltitudeConformConfig, AltitudeConformModifier, BoxAlignment, BoxConformConfig,
    BoxConformModifier, BoxHeightOffsetConfig, BoxHeightOffsetModifier, GroundConformConfig,
    GroundConformModifier,
};
pub use freeze::{FreezeConfig, FreezeMode, FreezeModifier};
pub use offset::{
    OffsetConfig, OffsetModifier, OffsetSpace, VelocityOffsetConfig, VelocityOffsetModifier,
};
pub use oscillate::{
    OscillateColorConfig, OscillateColorModifier, OscillateConfig, OscillateMask, OscillateModifier,
};
pub use path_conform::{PathConformConfig, PathConformModifier};
pub use scale::{
    RandomRotConfig, RandomRotModifier, ScaleConfig, ScaleModifier, ShockwaveConfig,
    ShockwaveModifier,
};
pub use spin::{SpinConfig, SpinModifier};
pub use wave::{
    FadeConfig, FadeModifier, WaveColorConfig, WaveColorModifier, WaveOp, WaveScalarConfig,
    WaveScalarModifier, WaveTarget, Waveform,
};

use serde::{Deserialize, Serialize};
use torque_common::{CollisionQuery, RandomSource};

use crate::constraint::{ConstraintHandle, ConstraintLookup, SceneObjectInfo};
use crate::{ConfigError, PathRegistry, XfmParams};

/// Collaborators a modifier may consult during one call.
pub struct ModifierContext<'a> {
    pub constraints: &'a dyn ConstraintLookup,
    pub collision: &'a dyn CollisionQuery,
    pub rng: &'a mut dyn RandomSource,
    /// The owning effect's position constraint, if it resolved.
    pub pos_constraint: Option<ConstraintHandle>,
}

impl ModifierContext<'_> {
    /// Scene object behind the position constraint.
    pub fn pos_object(&self) -> Option<SceneObjectInfo> {
        self.pos_constraint.and_then(|h| self.constraints.scene_object(h))
    }
}

/// One stage of the transform pipeline.
pub trait XfmModifier {
    fn name(&self) -> &'static str;

    /// Called once when the owning effect starts.
    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {}

    /// Mutate `params` for this tick. `elapsed` is seconds since start.
    fn update_params(
        &mut self,
        dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    );
}

/// Everything a modifier may need while being built.
#[derive(Debug, Clone, Copy)]
pub struct BuildEnv<'a> {
    pub paths: &'a PathRegistry,
}

/// Authored modifier, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModifierConfig {
    Aim(AimConfig),
    AimFixed(AimConfig),
    Spin(SpinConfig),
    Oscillate(OscillateConfig),
    OscillateColor(OscillateColorConfig),
    Freeze(FreezeConfig),
    GroundConform(GroundConformConfig),
    AltitudeConform(AltitudeConformConfig),
    BoxConform(BoxConformConfig),
    BoxHeightOffset(BoxHeightOffsetConfig),
    PathConform(PathConformConfig),
    LocalOffset(OffsetConfig),
    WorldOffset(OffsetConfig),
    WorldOffset2(OffsetConfig),
    Scale(ScaleConfig),
    RandomRot(RandomRotConfig),
    Shockwave(ShockwaveConfig),
    VelocityOffset(VelocityOffsetConfig),
    WaveScalar(WaveScalarConfig),
    WaveColor(WaveColorConfig),
    Fade(FadeConfig),
}

impl ModifierConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Aim(_) => "aim",
            Self::AimFixed(_) => "aim_fixed",
            Self::Spin(_) => "spin",
            Self::Oscillate(_) => "oscillate",
            Self::OscillateColor(_) => "oscillate_color",
            Self::Freeze(_) => "freeze",
            Self::GroundConform(_) => "ground_conform",
            Self::AltitudeConform(_) => "altitude_conform",
            Self::BoxConform(_) => "box_conform",
            Self::BoxHeightOffset(_) => "box_height_offset",
            Self::PathConform(_) => "path_conform",
            Self::LocalOffset(_) => "local_offset",
            Self::WorldOffset(_) => "world_offset",
            Self::WorldOffset2(_) => "world_offset2",
            Self::Scale(_) => "scale",
            Self::RandomRot(_) => "random_rot",
            Self::Shockwave(_) => "shockwave",
            Self::VelocityOffset(_) => "velocity_offset",
            Self::WaveScalar(_) => "wave_scalar",
            Self::WaveColor(_) => "wave_color",
            Self::Fade(_) => "fade",
        }
    }
}

/// Build the runtime modifier for `config`.
pub fn build_modifier(
    config: &ModifierConfig,
    env: &BuildEnv<'_>,
) -> Result<Box<dyn XfmModifier>, ConfigError> {
    let m: Box<dyn XfmModifier> = match config {
        ModifierConfig::Aim(c) => Box::new(AimModifier::new(c, false)?),
        ModifierConfig::AimFixed(c) => Box::new(AimModifier::new(c, true)?),
        ModifierConfig::Spin(c) => Box::new(SpinModifier::new(c)?),
        ModifierConfig::Oscillate(c) => Box::new(OscillateModifier::new(c)?),
        ModifierConfig::OscillateColor(c) => Box::new(OscillateColorModifier::new(c)?),
        ModifierConfig::Freeze(c) => Box::new(FreezeModifier::new(c)?),
        ModifierConfig::GroundConform(c) => Box::new(GroundConformModifier::new(c)?),
        ModifierConfig::AltitudeConform(c) => Box::new(AltitudeConformModifier::new(c)?),
        ModifierConfig::BoxConform(c) => Box::new(BoxConformModifier::new(c)?),
        ModifierConfig::BoxHeightOffset(c) => Box::new(BoxHeightOffsetModifier::new(c)?),
        ModifierConfig::PathConform(c) => Box::new(PathConformModifier::new(c, env.paths)?),
        ModifierConfig::LocalOffset(c) => Box::new(OffsetModifier::new(c, OffsetSpace::Local)?),
        ModifierConfig::WorldOffset(c) => Box::new(OffsetModifier::new(c, OffsetSpace::World)?),
        ModifierConfig::WorldOffset2(c) => Box::new(OffsetModifier::new(c, OffsetSpace::World2)?),
        ModifierConfig::Scale(c) => Box::new(ScaleModifier::new(c)?),
        ModifierConfig::RandomRot(c) => Box::new(RandomRotModifier::new(c)?),
        ModifierConfig::Shockwave(c) => Box::new(ShockwaveModifier::new(c)?),
        ModifierConfig::VelocityOffset(c) => Box::new(VelocityOffsetModifier::new(c)?),
        ModifierConfig::WaveScalar(c) => Box::new(WaveScalarModifier::new(c)?),
        ModifierConfig::WaveColor(c) => Box::new(WaveColorModifier::new(c)?),
        ModifierConfig::Fade(c) => Box::new(FadeModifier::new(c)?),
    };
    Ok(m)
}
