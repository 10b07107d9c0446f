use std::fmt;

use crate::modifier::{BuildEnv, ModifierConfig, ModifierContext, XfmModifier, build_modifier};
use crate::{ConfigError, XfmParams};

/// Most modifiers one effect may carry.
pub const MAX_XFM_MODIFIERS: usize = 20;

/// Modifiers run in authoring order against one shared [`XfmParams`].
#[derive(Default)]
pub struct XfmPipeline {
    modifiers: Vec<Box<dyn XfmModifier>>,
}

impl XfmPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every modifier in `configs`. Fails on the first bad one.
    pub fn build(configs: &[ModifierConfig], env: &BuildEnv<'_>) -> Result<Self, ConfigError> {
        let _span = tracing::info_span!("xfm_pipeline_build", modifiers = configs.len()).entered();
        if configs.len() > MAX_XFM_MODIFIERS {
            return Err(ConfigError::TooManyModifiers {
                count: configs.len(),
                max: MAX_XFM_MODIFIERS,
            });
        }
        let mut pipeline = Self::new();
        for (index, config) in configs.iter().enumerate() {
            let m = build_modifier(config, env).inspect_err(|e| {
                tracing::warn!(
                    index,
                    kind = config.kind(),
                    error = %e,
                    "transform modifier rejected"
                );
            })?;
            pipeline.modifiers.push(m);
        }
        Ok(pipeline)
    }

    pub fn push(&mut self, modifier: Box<dyn XfmModifier>) -> Result<(), ConfigError> {
        if self.modifiers.len() >= MAX_XFM_MODIFIERS {
            return Err(ConfigError::TooManyModifiers {
                count: self.modifiers.len() + 1,
                max: MAX_XFM_MODIFIERS,
            });
        }
        self.modifiers.push(modifier);
        Ok(())
    }

    pub fn start(&mut self, timestamp: f32, ctx: &mut ModifierContext<'_>) {
        for m in &mut self.modifiers {
            m.start(timestamp, ctx);
        }
    }

    pub fn update(
        &mut self,
        dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        for m in &mut self.modifiers {
            m.update_params(dt, elapsed, params, ctx);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modifiers.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

impl fmt::Debug for XfmPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XfmPipeline")
            .field("modifiers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathRegistry;
    use crate::modifier::testing::Fixture;
    use crate::modifier::{AimConfig, OffsetConfig, ScaleConfig};
    use glam::Vec3;

    fn offset(v: Vec3) -> ModifierConfig {
        ModifierConfig::WorldOffset(OffsetConfig {
            offset: v,
            ..OffsetConfig::default()
        })
    }

    #[test]
    fn order_is_authoring_order() {
        let paths = PathRegistry::new();
        let env = BuildEnv { paths: &paths };
        let mut fx = Fixture::new();
        let aim = ModifierConfig::AimFixed(AimConfig::default());

        let shift = offset(Vec3::new(10.0, 0.0, 0.0));
        let mut offset_first = XfmPipeline::build(&[shift.clone(), aim.clone()], &env).unwrap();
        let mut aim_first = XfmPipeline::build(&[aim, shift], &env).unwrap();
        assert_eq!(offset_first.names(), ["world_offset", "aim_fixed"]);

        let start = XfmParams {
            pos2: Vec3::new(0.0, 10.0, 0.0),
            ..XfmParams::default()
        };
        let mut a = start;
        let mut b = start;
        offset_first.update(0.1, 0.0, &mut a, &mut fx.ctx());
        aim_first.update(0.1, 0.0, &mut b, &mut fx.ctx());
        assert_eq!(a.pos, b.pos);
        let diagonal = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!(a.forward().abs_diff_eq(diagonal, 1e-5));
        assert!(b.forward().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn every_stage_sees_previous_output() {
        let paths = PathRegistry::new();
        let env = BuildEnv { paths: &paths };
        let mut fx = Fixture::new();
        let scale = ModifierConfig::Scale(ScaleConfig {
            scale: Vec3::splat(2.0),
            ..ScaleConfig::default()
        });
        let mut pipeline = XfmPipeline::build(&[scale.clone(), scale], &env).unwrap();
        let mut p = XfmParams::default();
        pipeline.update(0.1, 0.0, &mut p, &mut fx.ctx());
        assert_eq!(p.scale, Vec3::splat(4.0));
    }

    #[test]
    fn too_many_modifiers_is_rejected() {
        let paths = PathRegistry::new();
        let env = BuildEnv { paths: &paths };
        let configs = vec![offset(Vec3::X); MAX_XFM_MODIFIERS + 1];
        assert!(matches!(
            XfmPipeline::build(&configs, &env),
            Err(ConfigError::TooManyModifiers { count: 21, max: 20 })
        ));
        let full = XfmPipeline::build(&configs[..MAX_XFM_MODIFIERS], &env);
        let mut full = full.unwrap();
        assert_eq!(full.len(), MAX_XFM_MODIFIERS);
        let extra = crate::build_modifier(&offset(Vec3::Y), &env).unwrap();
        assert!(full.push(extra).is_err());
    }

    #[test]
    fn bad_modifier_fails_the_build() {
        let paths = PathRegistry::new();
        let env = BuildEnv { paths: &paths };
        let bad = ModifierConfig::PathConform(crate::modifier::PathConformConfig {
            paths: "missing".into(),
            ..Default::default()
        });
        assert!(matches!(
            XfmPipeline::build(&[offset(Vec3::X), bad], &env),
            Err(ConfigError::UnknownPath(_))
        ));
    }
}
