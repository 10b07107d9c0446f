use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::params::look_rotation;
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    /// Ignore the height difference between the two positions.
    pub z_only: bool,
    pub timing: TimingParams,
}

/// Turns the forward axis from `pos` toward `pos2`.
#[derive(Debug)]
pub struct AimModifier {
    z_only: bool,
    fixed: bool,
    weighting: Weighting,
}

impl AimModifier {
    /// `fixed` applies the aim directly, ignoring timing.
    pub fn new(config: &AimConfig, fixed: bool) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            z_only: config.z_only,
            fixed,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for AimModifier {
    fn name(&self) -> &'static str {
        if self.fixed { "aim_fixed" } else { "aim" }
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let mut dir = params.pos2 - params.pos;
        if self.z_only {
            dir.z = 0.0;
        }
        let Some(aim) = look_rotation(dir) else {
            tracing::trace!("aim skipped: positions coincide");
            return;
        };
        if self.fixed {
            params.ori = aim;
            return;
        }
        let w = self.weighting.factor(elapsed);
        if w > 0.0 {
            params.ori = params.ori.slerp(aim, w).normalize();
        }
    }
}
