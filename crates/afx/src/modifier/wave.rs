//! Periodic drivers for scalar and color fields, and the plain fade.

use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use torque_common::RandomSource;

use super::{ModifierContext, XfmModifier};
use crate::{ConfigError, TimingParams, Weighting, XfmParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    /// A fresh random level each cycle.
    Noise,
    One,
}

/// How a wave value combines with the field it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveOp {
    #[default]
    Replace,
    Add,
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveTarget {
    #[default]
    Visibility,
    UniformScale,
}

/// Waveform state; noise keeps the level of the current cycle.
#[derive(Debug, Clone)]
struct Oscillator {
    waveform: Waveform,
    speed: f32,
    phase: f32,
    cycle: Option<i64>,
    level: f32,
}

impl Oscillator {
    fn new(waveform: Waveform, speed: f32, phase: f32) -> Result<Self, ConfigError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(ConfigError::invalid("speed", format!("wave speed {speed}")));
        }
        Ok(Self {
            waveform,
            speed,
            phase,
            cycle: None,
            level: 0.0,
        })
    }

    /// Wave height in `[0, 1]`.
    fn sample(&mut self, elapsed: f32, rng: &mut dyn RandomSource) -> f32 {
        let cycles = elapsed * self.speed + self.phase;
        let t = cycles - cycles.floor();
        match self.waveform {
            Waveform::Sine => 0.5 - 0.5 * (TAU * t).cos(),
            Waveform::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Waveform::Triangle => 1.0 - (2.0 * t - 1.0).abs(),
            Waveform::Sawtooth => t,
            Waveform::Noise => {
                let cycle = cycles.floor() as i64;
                if self.cycle != Some(cycle) {
                    self.cycle = Some(cycle);
                    self.level = rng.next_f32();
                }
                self.level
            }
            Waveform::One => 1.0,
        }
    }
}

fn combine(op: WaveOp, field: f32, value: f32, w: f32) -> f32 {
    match op {
        WaveOp::Replace => field + (value - field) * w,
        WaveOp::Add => field + value * w,
        WaveOp::Multiply => field * (1.0 + (value - 1.0) * w),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveScalarConfig {
    pub waveform: Waveform,
    /// Cycles per second.
    pub speed: f32,
    /// Phase in cycles.
    pub phase: f32,
    /// Value at the wave trough.
    pub a: f32,
    /// Value at the wave crest.
    pub b: f32,
    pub target: WaveTarget,
    pub op: WaveOp,
    pub timing: TimingParams,
}

impl Default for WaveScalarConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            speed: 1.0,
            phase: 0.0,
            a: 0.0,
            b: 1.0,
            target: WaveTarget::Visibility,
            op: WaveOp::Replace,
            timing: TimingParams::default(),
        }
    }
}

#[derive(Debug)]
pub struct WaveScalarModifier {
    osc: Oscillator,
    a: f32,
    b: f32,
    target: WaveTarget,
    op: WaveOp,
    weighting: Weighting,
}

impl WaveScalarModifier {
    pub fn new(config: &WaveScalarConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            osc: Oscillator::new(config.waveform, config.speed, config.phase)?,
            a: config.a,
            b: config.b,
            target: config.target,
            op: config.op,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for WaveScalarModifier {
    fn name(&self) -> &'static str {
        "wave_scalar"
    }

    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {
        self.osc.cycle = None;
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        let wave = self.osc.sample(elapsed, &mut *ctx.rng);
        let value = self.a + (self.b - self.a) * wave;
        match self.target {
            WaveTarget::Visibility => params.vis = combine(self.op, params.vis, value, w),
            WaveTarget::UniformScale => {
                params.scale = params.scale.map(|s| combine(self.op, s, value, w));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveColorConfig {
    pub waveform: Waveform,
    pub speed: f32,
    pub phase: f32,
    pub a: Vec4,
    pub b: Vec4,
    pub op: WaveOp,
    pub timing: TimingParams,
}

impl Default for WaveColorConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            speed: 1.0,
            phase: 0.0,
            a: Vec4::new(0.0, 0.0, 0.0, 1.0),
            b: Vec4::ONE,
            op: WaveOp::Replace,
            timing: TimingParams::default(),
        }
    }
}

#[derive(Debug)]
pub struct WaveColorModifier {
    osc: Oscillator,
    a: Vec4,
    b: Vec4,
    op: WaveOp,
    weighting: Weighting,
}

impl WaveColorModifier {
    pub fn new(config: &WaveColorConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            osc: Oscillator::new(config.waveform, config.speed, config.phase)?,
            a: config.a,
            b: config.b,
            op: config.op,
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for WaveColorModifier {
    fn name(&self) -> &'static str {
        "wave_color"
    }

    fn start(&mut self, _timestamp: f32, _ctx: &mut ModifierContext<'_>) {
        self.osc.cycle = None;
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        let wave = self.osc.sample(elapsed, &mut *ctx.rng);
        let value = self.a.lerp(self.b, wave);
        let c = params.color;
        params.color = Vec4::new(
            combine(self.op, c.x, value.x, w),
            combine(self.op, c.y, value.y, w),
            combine(self.op, c.z, value.z, w),
            combine(self.op, c.w, value.w, w),
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    pub timing: TimingParams,
}

/// Scales visibility by its own weight.
#[derive(Debug)]
pub struct FadeModifier {
    weighting: Weighting,
}

impl FadeModifier {
    pub fn new(config: &FadeConfig) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        Ok(Self {
            weighting: Weighting::new(&config.timing),
        })
    }
}

impl XfmModifier for FadeModifier {
    fn name(&self) -> &'static str {
        "fade"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        params.vis *= self.weighting.factor(elapsed);
    }
}
