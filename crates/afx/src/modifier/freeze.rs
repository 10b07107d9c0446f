use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, XfmParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeMode {
    #[default]
    Position,
    Orientation,
    Position2,
    AllButScale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeConfig {
    pub mode: FreezeMode,
    /// Seconds before the latch closes.
    pub delay: f32,
}

#[derive(Debug, Clone, Copy)]
struct Frozen {
    pos: Vec3,
    ori: Quat,
    pos2: Vec3,
}

/// Captures field values on its first active tick and pins them after.
#[derive(Debug)]
pub struct FreezeModifier {
    mode: FreezeMode,
    delay: f32,
    frozen: Option<Frozen>,
}

impl FreezeModifier {
    pub fn new(config: &FreezeConfig) -> Result<Self, ConfigError> {
        if !config.delay.is_finite() || config.delay < 0.0 {
            return Err(ConfigError::invalid("delay", format!("freeze delay {}", config.delay)));
        }
        Ok(Self {
            mode: config.mode,
            delay: config.delay,
            frozen: None,
        })
    }

    pub fn is_latched(&self) -> bool {
        self.frozen.is_some()
    }
}

impl XfmModifier for FreezeModifier {
    fn name(&self) -> &'static str {
        "freeze"
    }

    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {
        self.frozen = None;
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        if elapsed < self.delay {
            return;
        }
        let frozen = *self.frozen.get_or_insert(Frozen {
            pos: params.pos,
            ori: params.ori,
            pos2: params.pos2,
        });
        match self.mode {
            FreezeMode::Position => params.pos = frozen.pos,
            FreezeMode::Orientation => params.ori = frozen.ori,
            FreezeMode::Position2 => params.pos2 = frozen.pos2,
            FreezeMode::AllButScale => {
                params.pos = frozen.pos;
                params.ori = frozen.ori;
                params.pos2 = frozen.pos2;
            }
        }
    }
}
