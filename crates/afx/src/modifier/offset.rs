use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    pub offset: Vec3,
    pub timing: TimingParams,
}

/// Frame an [`OffsetModifier`] works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetSpace {
    /// Rotated by the current orientation, added to `pos`.
    Local,
    /// Added to `pos` as is.
    World,
    /// Added to `pos2` as is.
    World2,
}

#[derive(Debug)]
pub struct OffsetModifier {
    offset: Vec3,
    space: OffsetSpace,
    weighting: Weighting,
}

impl OffsetModifier {
    pub fn new(config: &OffsetConfig, space: OffsetSpace) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        if !config.offset.is_finite() {
            return Err(ConfigError::invalid("offset", "must be finite"));
        }
        Ok(Self {
            offset: config.offset,
            space,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for OffsetModifier {
    fn name(&self) -> &'static str {
        match self.space {
            OffsetSpace::Local => "local_offset",
            OffsetSpace::World => "world_offset",
            OffsetSpace::World2 => "world_offset2",
        }
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let offset = self.offset * self.weighting.factor(elapsed);
        match self.space {
            OffsetSpace::Local => params.pos += params.ori * offset,
            OffsetSpace::World => params.pos += offset,
            OffsetSpace::World2 => params.pos2 += offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityOffsetConfig {
    /// Distance pushed along the direction of travel.
    pub distance: f32,
    /// Apply to `pos2` instead of `pos`.
    pub on_pos2: bool,
    pub timing: TimingParams,
}

/// Leads (or trails, with a negative distance) the direction of travel,
/// measured from the unmodified position between ticks.
#[derive(Debug)]
pub struct VelocityOffsetModifier {
    distance: f32,
    on_pos2: bool,
    last_pos: Option<Vec3>,
    weighting: Weighting,
}

impl VelocityOffsetModifier {
    pub fn new(config: &VelocityOffsetConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            distance: config.distance,
            on_pos2: config.on_pos2,
            last_pos: None,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for VelocityOffsetModifier {
    fn name(&self) -> &'static str {
        "velocity_offset"
    }

    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {
        self.last_pos = None;
    }

    fn update_params(
        &mut self,
        dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let current = if self.on_pos2 {
            params.pos2
        } else {
            params.pos
        };
        let Some(last) = self.last_pos.replace(current) else {
            return;
        };
        if dt <= 0.0 {
            return;
        }
        let Some(dir) = ((current - last) / dt).try_normalize() else {
            return;
        };
        let offset = dir * self.distance * self.weighting.factor(elapsed);
        if self.on_pos2 {
            params.pos2 += offset;
        } else {
            params.pos += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::testing::Fixture;
    use glam::Quat;

    #[test]
    fn offsets_by_space() {
        let mut fx = Fixture::new();
        let config = OffsetConfig {
            offset: Vec3::new(0.0, 2.0, 0.0),
            ..OffsetConfig::default()
        };
        let turned = XfmParams {
            ori: Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2),
            ..XfmParams::default()
        };

        let mut p = turned;
        OffsetModifier::new(&config, OffsetSpace::Local)
            .unwrap()
            .update_params(0.1, 0.0, &mut p, &mut fx.ctx());
        assert!(p.pos.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        let mut p = turned;
        OffsetModifier::new(&config, OffsetSpace::World)
            .unwrap()
            .update_params(0.1, 0.0, &mut p, &mut fx.ctx());
        assert_eq!(p.pos, Vec3::new(0.0, 2.0, 0.0));

        let mut p = turned;
        OffsetModifier::new(&config, OffsetSpace::World2)
            .unwrap()
            .update_params(0.1, 0.0, &mut p, &mut fx.ctx());
        assert_eq!(p.pos, Vec3::ZERO);
        assert_eq!(p.pos2, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn offset_is_weighted() {
        let mut fx = Fixture::new();
        let mut m = OffsetModifier::new(
            &OffsetConfig {
                offset: Vec3::splat(4.0),
                timing: TimingParams::finite(0.0, 1.0, 0.0, 2.0),
            },
            OffsetSpace::World,
        )
        .unwrap();
        let mut p = XfmParams::default();
        m.update_params(0.1, 2.0, &mut p, &mut fx.ctx());
        assert!(p.pos.abs_diff_eq(Vec3::splat(2.0), 1e-5));
    }

    #[test]
    fn velocity_offset_leads_motion() {
        let mut fx = Fixture::new();
        let mut m = VelocityOffsetModifier::new(&VelocityOffsetConfig {
            distance: 3.0,
            ..VelocityOffsetConfig::default()
        })
        .unwrap();
        m.start(0.0, &mut fx.ctx());

        let mut p = XfmParams::at(Vec3::ZERO);
        m.update_params(0.5, 0.0, &mut p, &mut fx.ctx());
        assert_eq!(p.pos, Vec3::ZERO);

        let mut p = XfmParams::at(Vec3::new(0.0, 1.0, 0.0));
        m.update_params(0.5, 0.5, &mut p, &mut fx.ctx());
        assert!(p.pos.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));

        // stationary: no direction, no offset
        let mut p = XfmParams::at(Vec3::new(0.0, 1.0, 0.0));
        m.update_params(0.5, 1.0, &mut p, &mut fx.ctx());
        assert_eq!(p.pos, Vec3::new(0.0, 1.0, 0.0));
    }
}
