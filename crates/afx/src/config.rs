use bitflags::bitflags;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use torque_curve::AnimCurve;

use crate::constraint::{ConstraintSpec, LifeState};
use crate::modifier::ModifierConfig;
use crate::pipeline::MAX_XFM_MODIFIERS;
use crate::{ConfigError, TimingParams};

bitflags! {
    /// Life states of the life-constraint object that let an effect run.
    /// Empty means no life test.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct LifeConditions: u8 {
        const ALIVE = 1 << 0;
        const DYING = 1 << 1;
        const DEAD = 1 << 2;
    }
}

impl LifeConditions {
    pub fn admits(self, state: LifeState) -> bool {
        if self.is_empty() {
            return true;
        }
        let flag = match state {
            LifeState::Alive => LifeConditions::ALIVE,
            LifeState::Dying => LifeConditions::DYING,
            LifeState::Dead => LifeConditions::DEAD,
        };
        self.contains(flag)
    }
}

/// Authored effect: timing, constraints and the modifier list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectWrapperConfig {
    pub name: String,
    pub timing: TimingParams,
    pub pos_constraint: Option<String>,
    pub ori_constraint: Option<String>,
    pub aim_constraint: Option<String>,
    pub life_constraint: Option<String>,
    pub life_conditions: LifeConditions,
    /// Seconds of constraint history to sample behind the present.
    pub history_time: f32,
    /// `[time, visibility]` keys over the effect's life.
    pub vis_keys: Option<Vec<[f32; 2]>>,
    pub xfm_modifiers: Vec<ModifierConfig>,
    pub is_looping: bool,
    pub is_enabled: bool,
    /// Overrides whether `stop` is honored. Unset defers to the adapter.
    pub requires_stop: Option<bool>,
    /// Inclusive `[min, max]` ranking the effect runs at.
    pub ranking_range: [u8; 2],
    pub lod_range: [u8; 2],
    pub scale: Vec3,
    pub color: Vec4,
}

impl Default for EffectWrapperConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            timing: TimingParams::default(),
            pos_constraint: None,
            ori_constraint: None,
            aim_constraint: None,
            life_constraint: None,
            life_conditions: LifeConditions::empty(),
            history_time: 0.0,
            vis_keys: None,
            xfm_modifiers: Vec::new(),
            is_looping: false,
            is_enabled: true,
            requires_stop: None,
            ranking_range: [0, u8::MAX],
            lod_range: [0, u8::MAX],
            scale: Vec3::ONE,
            color: Vec4::ONE,
        }
    }
}

impl EffectWrapperConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        for spec in self.constraint_specs() {
            spec?;
        }
        if self.xfm_modifiers.len() > MAX_XFM_MODIFIERS {
            return Err(ConfigError::TooManyModifiers {
                count: self.xfm_modifiers.len(),
                max: MAX_XFM_MODIFIERS,
            });
        }
        let ranges = [
            ("ranking_range", self.ranking_range),
            ("lod_range", self.lod_range),
        ];
        for (field, [lo, hi]) in ranges {
            if lo > hi {
                return Err(ConfigError::invalid(field, format!("min {lo} exceeds max {hi}")));
            }
        }
        if !self.history_time.is_finite() || self.history_time < 0.0 {
            return Err(ConfigError::invalid("history_time", "must be finite and non-negative"));
        }
        if !self.scale.is_finite() || !self.color.is_finite() {
            return Err(ConfigError::invalid("scale", "base scale and color must be finite"));
        }
        self.vis_curve()?;
        Ok(())
    }

    /// Parse one optional spec string.
    pub(crate) fn parse_spec(text: Option<&String>) -> Result<Option<ConstraintSpec>, ConfigError> {
        text.map(|s| s.parse::<ConstraintSpec>())
            .transpose()
            .map_err(ConfigError::from)
    }

    fn constraint_specs(
        &self,
    ) -> impl Iterator<Item = Result<Option<ConstraintSpec>, ConfigError>> + '_ {
        [
            &self.pos_constraint,
            &self.ori_constraint,
            &self.aim_constraint,
            &self.life_constraint,
        ]
        .into_iter()
        .map(|s| Self::parse_spec(s.as_ref()))
    }

    pub(crate) fn vis_curve(&self) -> Result<Option<AnimCurve>, ConfigError> {
        self.vis_keys
            .as_deref()
            .map(AnimCurve::from_pairs)
            .transpose()
            .map_err(ConfigError::VisKeys)
    }

    pub fn in_ranges(&self, ranking: u8, lod: u8) -> bool {
        let [rlo, rhi] = self.ranking_range;
        let [llo, lhi] = self.lod_range;
        (rlo..=rhi).contains(&ranking) && (llo..=lhi).contains(&lod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_document_with_defaults() {
        let config = EffectWrapperConfig::from_json(
            r##"{
                "name": "flare",
                "timing": { "lifetime": 2, "fade_out_time": 1 },
                "pos_constraint": "#caster",
                "life_conditions": "ALIVE | DYING",
                "vis_keys": [[0, 0], [1, 1]],
                "xfm_modifiers": [{ "kind": "spin", "rate": 180 }]
            }"##,
        )
        .unwrap();
        assert_eq!(config.name, "flare");
        assert_eq!(config.timing.lifetime, 2.0);
        assert!(config.is_enabled);
        let alive_or_dying = LifeConditions::ALIVE | LifeConditions::DYING;
        assert_eq!(config.life_conditions, alive_or_dying);
        assert_eq!(config.xfm_modifiers.len(), 1);
        assert_eq!(config.ranking_range, [0, 255]);
    }

    #[test]
    fn malformed_constraint_fails_validation() {
        let config = EffectWrapperConfig {
            aim_constraint: Some("target".into()),
            ..EffectWrapperConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Constraint(_))));
    }

    #[test]
    fn inverted_range_fails_validation() {
        let config = EffectWrapperConfig {
            lod_range: [5, 2],
            ..EffectWrapperConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "lod_range"));
    }

    #[test]
    fn bad_vis_keys_fail_validation() {
        let config = EffectWrapperConfig {
            vis_keys: Some(vec![[0.0, f32::NAN]]),
            ..EffectWrapperConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::VisKeys(_))));
    }

    #[test]
    fn life_conditions_admit() {
        assert!(LifeConditions::empty().admits(LifeState::Dead));
        assert!(LifeConditions::ALIVE.admits(LifeState::Alive));
        assert!(!LifeConditions::ALIVE.admits(LifeState::Dying));
        assert!((LifeConditions::DYING | LifeConditions::DEAD).admits(LifeState::Dead));
    }

    #[test]
    fn ranges_are_inclusive() {
        let config = EffectWrapperConfig {
            ranking_range: [2, 4],
            lod_range: [0, 1],
            ..EffectWrapperConfig::default()
        };
        assert!(config.in_ranges(2, 1));
        assert!(config.in_ranges(4, 0));
        assert!(!config.in_ranges(5, 0));
        assert!(!config.in_ranges(3, 2));
    }
}
