//! Runtime of a single effect: lifecycle, constraint resolution, fade and
//! the per-tick transform pipeline.

use glam::{Mat4, Quat, Vec3, Vec4};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use torque_common::{CollisionQuery, RandomSource};
use torque_curve::AnimCurve;

use crate::constraint::{ConstraintHandle, ConstraintLookup, ConstraintSpec, LifeState};
use crate::modifier::{BuildEnv, ModifierContext};
use crate::{ConfigError, EffectWrapperConfig, TimingSchedule, XfmParams, XfmPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperState {
    Uninitialized,
    Started,
    Active,
    Stopping,
    Done,
}

/// Execution conditions an effect is started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecContext {
    pub ranking: u8,
    pub lod: u8,
}

/// Host collaborators handed to each `start`/`update` call.
pub struct FxServices<'a> {
    pub constraints: &'a dyn ConstraintLookup,
    pub collision: &'a dyn CollisionQuery,
    pub rng: &'a mut dyn RandomSource,
}

impl FxServices<'_> {
    fn modifier_ctx(&mut self, pos_constraint: Option<ConstraintHandle>) -> ModifierContext<'_> {
        ModifierContext {
            constraints: self.constraints,
            collision: self.collision,
            rng: &mut *self.rng,
            pos_constraint,
        }
    }
}

/// What an effect publishes after each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectOutput {
    pub transform: Mat4,
    pub pos: Vec3,
    pub ori: Quat,
    pub pos2: Vec3,
    pub scale: Vec3,
    pub color: Vec4,
    /// Timing fade combined with the visibility keys.
    pub fade: f32,
    /// Visibility written by the modifiers.
    pub vis: f32,
    pub in_scope: bool,
}

impl Default for EffectOutput {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            pos: Vec3::ZERO,
            ori: Quat::IDENTITY,
            pos2: Vec3::ZERO,
            scale: Vec3::ONE,
            color: Vec4::ONE,
            fade: 0.0,
            vis: 1.0,
            in_scope: false,
        }
    }
}

/// Per-effect-type behavior plugged into an [`EffectWrapper`].
pub trait EffectAdapter {
    /// Returning `false` ends the effect before its first update.
    fn on_start(&mut self) -> bool {
        true
    }

    /// Returning `false` ends the effect.
    fn on_update(&mut self, _dt: f32, _output: &EffectOutput) -> bool {
        true
    }

    fn on_stop(&mut self) {}

    fn on_finish(&mut self, _was_stopped: bool) {}

    /// Whether `stop` has any effect. Effects that end on their own ignore it.
    fn requires_stop(&self, timing: &TimingSchedule) -> bool {
        timing.is_infinite()
    }

    /// Seconds an infinite effect keeps running after `stop`.
    fn after_stop_time(&self, fade_out_time: f32) -> f32 {
        fade_out_time
    }
}

/// Calls seen by a [`RecordingAdapter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterLog {
    pub starts: u32,
    pub updates: u32,
    pub stops: u32,
    pub finishes: u32,
    pub was_stopped: Option<bool>,
    pub last_output: Option<EffectOutput>,
}

/// Adapter that records every hook call into a shared [`AdapterLog`].
#[derive(Debug, Clone)]
pub struct RecordingAdapter {
    log: Rc<RefCell<AdapterLog>>,
    accept_start: bool,
    requires_stop: Option<bool>,
    after_stop: Option<f32>,
}

impl Default for RecordingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(AdapterLog::default())),
            accept_start: true,
            requires_stop: None,
            after_stop: None,
        }
    }

    pub fn rejecting_start(mut self) -> Self {
        self.accept_start = false;
        self
    }

    pub fn with_requires_stop(mut self, requires: bool) -> Self {
        self.requires_stop = Some(requires);
        self
    }

    pub fn with_after_stop(mut self, seconds: f32) -> Self {
        self.after_stop = Some(seconds);
        self
    }

    pub fn log(&self) -> Rc<RefCell<AdapterLog>> {
        Rc::clone(&self.log)
    }
}

impl EffectAdapter for RecordingAdapter {
    fn on_start(&mut self) -> bool {
        self.log.borrow_mut().starts += 1;
        self.accept_start
    }

    fn on_update(&mut self, _dt: f32, output: &EffectOutput) -> bool {
        let mut log = self.log.borrow_mut();
        log.updates += 1;
        log.last_output = Some(*output);
        true
    }

    fn on_stop(&mut self) {
        self.log.borrow_mut().stops += 1;
    }

    fn on_finish(&mut self, was_stopped: bool) {
        let mut log = self.log.borrow_mut();
        log.finishes += 1;
        log.was_stopped = Some(was_stopped);
    }

    fn requires_stop(&self, timing: &TimingSchedule) -> bool {
        self.requires_stop.unwrap_or_else(|| timing.is_infinite())
    }

    fn after_stop_time(&self, fade_out_time: f32) -> f32 {
        self.after_stop.unwrap_or(fade_out_time)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Handles {
    pos: Option<ConstraintHandle>,
    ori: Option<ConstraintHandle>,
    aim: Option<ConstraintHandle>,
    life: Option<ConstraintHandle>,
}

#[derive(Debug, Clone, Default)]
struct Specs {
    pos: Option<ConstraintSpec>,
    ori: Option<ConstraintSpec>,
    aim: Option<ConstraintSpec>,
    life: Option<ConstraintSpec>,
}

fn resolve(
    spec: Option<&ConstraintSpec>,
    lookup: &dyn ConstraintLookup,
) -> Option<ConstraintHandle> {
    let spec = spec.filter(|s| !s.is_none())?;
    let handle = lookup.resolve(spec);
    if handle.is_none() {
        tracing::debug!(constraint = %spec, "constraint did not resolve");
    }
    handle
}

/// One running effect.
///
/// Drive it with [`start`](Self::start), then [`update`](Self::update) every
/// tick until it returns `false` or [`is_done`](Self::is_done) reports true,
/// and finish with exactly one [`cleanup`](Self::cleanup).
pub struct EffectWrapper {
    config: EffectWrapperConfig,
    specs: Specs,
    handles: Handles,
    pipeline: XfmPipeline,
    adapter: Box<dyn EffectAdapter>,
    vis_keys: Option<AnimCurve>,
    timing: TimingSchedule,
    state: WrapperState,
    elapsed: f32,
    life_elapsed: f32,
    stopped: bool,
    ended_early: bool,
    life_checked: bool,
    final_update_done: bool,
    cleaned_up: bool,
    output: EffectOutput,
}

impl EffectWrapper {
    pub fn new(
        config: EffectWrapperConfig,
        env: &BuildEnv<'_>,
        adapter: Box<dyn EffectAdapter>,
    ) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            tracing::warn!(effect = %config.name, error = %e, "effect config rejected");
            return Err(e);
        }
        let specs = Specs {
            pos: EffectWrapperConfig::parse_spec(config.pos_constraint.as_ref())?,
            ori: EffectWrapperConfig::parse_spec(config.ori_constraint.as_ref())?,
            aim: EffectWrapperConfig::parse_spec(config.aim_constraint.as_ref())?,
            life: EffectWrapperConfig::parse_spec(config.life_constraint.as_ref())?,
        };
        let vis_keys = config.vis_curve()?;
        let pipeline = match XfmPipeline::build(&config.xfm_modifiers, env) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::warn!(effect = %config.name, error = %e, "effect pipeline rejected");
                return Err(e);
            }
        };
        let timing = config.timing.schedule();
        Ok(Self {
            config,
            specs,
            handles: Handles::default(),
            pipeline,
            adapter,
            vis_keys,
            timing,
            state: WrapperState::Uninitialized,
            elapsed: 0.0,
            life_elapsed: 0.0,
            stopped: false,
            ended_early: false,
            life_checked: false,
            final_update_done: false,
            cleaned_up: false,
            output: EffectOutput::default(),
        })
    }

    /// Resolve constraints, derive timing and start the modifiers. Returns
    /// whether the effect became active.
    pub fn start(&mut self, timestamp: f32, exec: ExecContext, svc: &mut FxServices<'_>) -> bool {
        if self.state != WrapperState::Uninitialized {
            tracing::warn!(effect = %self.config.name, state = ?self.state, "effect started twice");
            return self.state == WrapperState::Active;
        }
        self.state = WrapperState::Started;
        self.handles = Handles {
            pos: resolve(self.specs.pos.as_ref(), svc.constraints),
            ori: resolve(self.specs.ori.as_ref(), svc.constraints),
            aim: resolve(self.specs.aim.as_ref(), svc.constraints),
            life: resolve(self.specs.life.as_ref(), svc.constraints),
        };
        self.timing = self.config.timing.schedule();
        {
            let mut ctx = svc.modifier_ctx(self.handles.pos);
            self.pipeline.start(timestamp, &mut ctx);
        }

        let enabled = self.config.is_enabled && self.config.in_ranges(exec.ranking, exec.lod);
        if enabled && self.adapter.on_start() {
            self.state = WrapperState::Active;
            tracing::debug!(effect = %self.config.name, timestamp, "effect active");
            true
        } else {
            self.state = WrapperState::Done;
            self.ended_early = true;
            tracing::debug!(effect = %self.config.name, enabled, "effect did not start");
            false
        }
    }

    /// Advance by `dt`. Returns `false` once the effect has finished.
    pub fn update(&mut self, dt: f32, svc: &mut FxServices<'_>) -> bool {
        if !matches!(self.state, WrapperState::Active | WrapperState::Stopping) {
            return false;
        }
        self.elapsed += dt;
        let delay = self.timing.delay;
        self.life_elapsed = (self.elapsed - delay).min(self.timing.full_lifetime);

        if self.elapsed < delay {
            self.output.in_scope = false;
            return true;
        }

        let end = delay + self.timing.full_lifetime;
        if self.elapsed > end {
            self.output.in_scope = false;
            if self.final_update_done {
                if self.in_residue() {
                    tracing::trace!(
                        effect = %self.config.name,
                        elapsed = self.elapsed,
                        "effect in residue"
                    );
                    return true;
                }
                self.state = WrapperState::Done;
                tracing::debug!(effect = %self.config.name, elapsed = self.elapsed, "effect done");
                return false;
            }
            self.final_update_done = true;
        }

        if !self.life_checked {
            self.life_checked = true;
            if !self.life_conditions_met(svc.constraints) {
                tracing::debug!(effect = %self.config.name, "life conditions not met");
                if end.is_finite() {
                    self.elapsed = end;
                }
                self.output.in_scope = false;
                self.ended_early = true;
                self.state = WrapperState::Done;
                return false;
            }
        }

        let fade = self.current_fade();
        let (mut params, mut in_scope) = self.constrained_params(svc.constraints);
        {
            let mut ctx = svc.modifier_ctx(self.handles.pos);
            self.pipeline.update(dt, self.elapsed, &mut params, &mut ctx);
        }
        if self.final_update_done {
            in_scope = false;
        }

        self.output = EffectOutput {
            transform: params.transform(),
            pos: params.pos,
            ori: params.ori,
            pos2: params.pos2,
            scale: params.scale,
            color: params.color,
            fade,
            vis: params.vis,
            in_scope,
        };
        tracing::trace!(
            effect = %self.config.name,
            elapsed = self.elapsed,
            fade,
            in_scope,
            "effect updated"
        );

        if !self.adapter.on_update(dt, &self.output) {
            tracing::debug!(effect = %self.config.name, "effect ended by its adapter");
            self.state = WrapperState::Done;
            self.ended_early = true;
            return false;
        }
        true
    }

    /// Ask the effect to wind down. An infinite lifetime becomes finite,
    /// fading out from now.
    pub fn stop(&mut self) {
        let requires = self
            .config
            .requires_stop
            .unwrap_or_else(|| self.adapter.requires_stop(&self.timing));
        if !requires {
            tracing::trace!(effect = %self.config.name, "stop ignored");
            return;
        }
        if self.stopped || !matches!(self.state, WrapperState::Started | WrapperState::Active) {
            return;
        }
        self.stopped = true;
        self.state = WrapperState::Stopping;
        self.adapter.on_stop();
        if self.timing.is_infinite() {
            let after = self.adapter.after_stop_time(self.timing.fade_out_time);
            self.timing.collapse_at(self.elapsed, after);
            tracing::debug!(
                effect = %self.config.name,
                elapsed = self.elapsed,
                full_lifetime = self.timing.full_lifetime,
                "infinite effect stopped"
            );
        }
    }

    /// Release constraints and run the adapter's finish hook. Later calls
    /// do nothing.
    pub fn cleanup(&mut self, was_stopped: bool, constraints: &dyn ConstraintLookup) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.adapter.on_finish(was_stopped || self.stopped);

        let h = self.handles;
        let held = [h.pos, h.ori, h.aim, h.life];
        let mut held: Vec<ConstraintHandle> = held.into_iter().flatten().collect();
        held.sort_unstable();
        held.dedup();
        for handle in held {
            constraints.release(handle);
        }
        self.handles = Handles::default();
        self.state = WrapperState::Done;
    }

    /// True once the effect has lived out its life and fade-out. Looping
    /// effects only report done when they ended early.
    pub fn is_done(&self) -> bool {
        if self.ended_early {
            return true;
        }
        if self.state == WrapperState::Uninitialized || self.config.is_looping {
            return false;
        }
        self.elapsed >= self.timing.life_end + self.timing.fade_out_time
    }

    /// Past the end, but still within the residue lifetime.
    pub fn in_residue(&self) -> bool {
        let finished = self.ended_early || self.state == WrapperState::Done;
        if finished || self.timing.residue_lifetime <= 0.0 {
            return false;
        }
        let end = self.timing.delay + self.timing.full_lifetime;
        self.elapsed > end && self.elapsed < end + self.timing.residue_lifetime
    }

    fn life_conditions_met(&self, constraints: &dyn ConstraintLookup) -> bool {
        let conditions = self.config.life_conditions;
        if conditions.is_empty() || self.specs.life.is_none() {
            return true;
        }
        let life = self
            .handles
            .life
            .and_then(|h| constraints.scene_object(h))
            .map_or(LifeState::Dead, |o| o.life);
        conditions.admits(life)
    }

    fn current_fade(&self) -> f32 {
        let mut fade = if self.timing.do_fade_inout {
            self.timing.weight_at(self.elapsed)
        } else {
            1.0
        };
        if let Some(vis) = &self.vis_keys {
            fade = fade.min(vis.evaluate(self.life_elapsed));
        }
        fade.clamp(0.0, 1.0)
    }

    /// Base params from the constraints. Unavailable constraints leave the
    /// default in place and clear the scope flag.
    fn constrained_params(&self, constraints: &dyn ConstraintLookup) -> (XfmParams, bool) {
        let history = self.config.history_time;
        let mut params = XfmParams {
            scale: self.config.scale,
            color: self.config.color,
            ..XfmParams::default()
        };
        let mut in_scope = true;

        if self.specs.pos.is_some() {
            match self.handles.pos.and_then(|h| constraints.position(h, history)) {
                Some(pos) => params.pos = pos,
                None => {
                    tracing::trace!(effect = %self.config.name, "position constraint unavailable");
                    in_scope = false;
                }
            }
        }
        if self.specs.ori.is_some() {
            match self.handles.ori.and_then(|h| constraints.transform(h, history)) {
                Some(m) => params.ori = m.to_scale_rotation_translation().1,
                None => {
                    tracing::trace!(
                        effect = %self.config.name,
                        "orientation constraint unavailable"
                    );
                    in_scope = false;
                }
            }
        }
        params.pos2 = params.pos;
        if self.specs.aim.is_some() {
            match self.handles.aim.and_then(|h| constraints.position(h, history)) {
                Some(pos) => params.pos2 = pos,
                None => {
                    tracing::trace!(effect = %self.config.name, "aim constraint unavailable");
                    in_scope = false;
                }
            }
        }
        (params, in_scope)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EffectWrapperConfig {
        &self.config
    }

    pub fn state(&self) -> WrapperState {
        self.state
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn life_elapsed(&self) -> f32 {
        self.life_elapsed
    }

    pub fn timing(&self) -> &TimingSchedule {
        &self.timing
    }

    pub fn output(&self) -> &EffectOutput {
        &self.output
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn pipeline(&self) -> &XfmPipeline {
        &self.pipeline
    }
}

impl fmt::Debug for EffectWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectWrapper")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("elapsed", &self.elapsed)
            .field("stopped", &self.stopped)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintSource, SceneObjectInfo, StaticConstraints};
    use crate::modifier::{ModifierConfig, OffsetConfig};
    use crate::{LifeConditions, PathRegistry, TimingParams};
    use torque_common::{Aabb, ObjectId, SplitMix64};

    struct Host {
        constraints: StaticConstraints,
        rng: SplitMix64,
    }

    impl Host {
        fn new() -> Self {
            Self {
                constraints: StaticConstraints::new(),
                rng: SplitMix64::new(11),
            }
        }

        fn svc(&mut self) -> FxServices<'_> {
            FxServices {
                constraints: &self.constraints,
                collision: &(),
                rng: &mut self.rng,
            }
        }
    }

    fn wrapper(config: EffectWrapperConfig) -> (EffectWrapper, Rc<RefCell<AdapterLog>>) {
        wrapper_with(config, RecordingAdapter::new())
    }

    fn wrapper_with(
        config: EffectWrapperConfig,
        adapter: RecordingAdapter,
    ) -> (EffectWrapper, Rc<RefCell<AdapterLog>>) {
        let paths = PathRegistry::new();
        let log = adapter.log();
        let env = BuildEnv { paths: &paths };
        let w = EffectWrapper::new(config, &env, Box::new(adapter)).unwrap();
        (w, log)
    }

    fn timed(timing: TimingParams) -> EffectWrapperConfig {
        EffectWrapperConfig {
            name: "test".into(),
            timing,
            ..EffectWrapperConfig::default()
        }
    }

    #[test]
    fn done_after_lifetime_plus_fade_out() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(timed(TimingParams::finite(0.0, 2.0, 0.0, 1.0)));
        assert!(w.start(0.0, ExecContext::default(), &mut host.svc()));
        for _ in 0..5 {
            assert!(w.update(0.5, &mut host.svc()));
        }
        assert_eq!(w.elapsed(), 2.5);
        assert!(!w.is_done());
        assert!((w.output().fade - 0.5).abs() < 1e-5);
        w.update(0.5, &mut host.svc());
        assert_eq!(w.elapsed(), 3.0);
        assert!(w.is_done());
    }

    #[test]
    fn one_extra_update_past_the_end() {
        let mut host = Host::new();
        let (mut w, log) = wrapper(timed(TimingParams::finite(0.0, 1.0, 0.0, 0.0)));
        w.start(0.0, ExecContext::default(), &mut host.svc());
        assert!(w.update(0.6, &mut host.svc()));
        assert!(w.output().in_scope);
        assert!(w.update(0.6, &mut host.svc()));
        assert!(!w.output().in_scope);
        assert!(!w.update(0.6, &mut host.svc()));
        assert_eq!(w.state(), WrapperState::Done);
        assert_eq!(log.borrow().updates, 2);
    }

    #[test]
    fn disabled_effect_never_updates() {
        let mut host = Host::new();
        let (mut w, log) = wrapper(EffectWrapperConfig {
            is_enabled: false,
            ..EffectWrapperConfig::default()
        });
        assert!(!w.start(0.0, ExecContext::default(), &mut host.svc()));
        assert_eq!(w.state(), WrapperState::Done);
        assert!(!w.update(0.1, &mut host.svc()));
        assert_eq!(log.borrow().starts, 0);
        assert_eq!(log.borrow().updates, 0);
        assert!(w.is_done());
    }

    #[test]
    fn out_of_range_or_rejected_start_is_done() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(EffectWrapperConfig {
            lod_range: [1, 3],
            ..EffectWrapperConfig::default()
        });
        assert!(!w.start(0.0, ExecContext { ranking: 0, lod: 4 }, &mut host.svc()));

        let adapter = RecordingAdapter::new().rejecting_start();
        let (mut w, log) = wrapper_with(EffectWrapperConfig::default(), adapter);
        assert!(!w.start(0.0, ExecContext::default(), &mut host.svc()));
        assert_eq!(log.borrow().starts, 1);
        assert!(!w.update(0.1, &mut host.svc()));
        assert_eq!(log.borrow().updates, 0);
    }

    #[test]
    fn delay_keeps_effect_out_of_scope() {
        let mut host = Host::new();
        let (mut w, log) = wrapper(timed(TimingParams::finite(1.0, 2.0, 0.0, 0.0)));
        w.start(0.0, ExecContext::default(), &mut host.svc());
        assert!(w.update(0.5, &mut host.svc()));
        assert!(!w.output().in_scope);
        assert_eq!(log.borrow().updates, 0);
        assert!(w.update(0.75, &mut host.svc()));
        assert!(w.output().in_scope);
        assert!((w.life_elapsed() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn constraints_feed_params_and_modifiers_run() {
        let mut host = Host::new();
        host.constraints.insert(
            ConstraintSpec::new(ConstraintSource::Caster),
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
        );
        host.constraints.insert(
            ConstraintSpec::new(ConstraintSource::Target),
            Mat4::from_translation(Vec3::new(0.0, 9.0, 0.0)),
        );
        let (mut w, log) = wrapper(EffectWrapperConfig {
            pos_constraint: Some("#caster".into()),
            aim_constraint: Some("#target".into()),
            xfm_modifiers: vec![ModifierConfig::WorldOffset(OffsetConfig {
                offset: Vec3::Z,
                ..OffsetConfig::default()
            })],
            ..EffectWrapperConfig::default()
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.update(0.1, &mut host.svc());
        let out = w.output();
        assert!(out.in_scope);
        assert_eq!(out.pos, Vec3::new(1.0, 2.0, 4.0));
        assert_eq!(out.pos2, Vec3::new(0.0, 9.0, 0.0));
        assert_eq!(out.transform.w_axis.truncate(), out.pos);
        assert_eq!(out.fade, 1.0);
        assert_eq!(log.borrow().last_output, Some(*out));
    }

    #[test]
    fn missing_constraint_clears_scope() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(EffectWrapperConfig {
            pos_constraint: Some("#scene.crate01".into()),
            ..EffectWrapperConfig::default()
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        assert!(w.update(0.1, &mut host.svc()));
        assert!(!w.output().in_scope);
        assert_eq!(w.output().pos, Vec3::ZERO);
    }

    #[test]
    fn failed_life_conditions_skip_to_end() {
        let mut host = Host::new();
        let info = SceneObjectInfo {
            id: ObjectId(3),
            world_box: Aabb::new(Vec3::ZERO, Vec3::ONE),
            life: LifeState::Dead,
        };
        let target = ConstraintSpec::new(ConstraintSource::Target);
        host.constraints.insert_object(target, Mat4::IDENTITY, info);
        let (mut w, log) = wrapper(EffectWrapperConfig {
            timing: TimingParams::finite(0.0, 4.0, 0.0, 1.0),
            life_constraint: Some("#target".into()),
            life_conditions: LifeConditions::ALIVE,
            ..EffectWrapperConfig::default()
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        assert!(!w.update(0.1, &mut host.svc()));
        assert_eq!(w.elapsed(), 5.0);
        assert!(w.is_done());
        assert!(!w.output().in_scope);
        assert_eq!(log.borrow().updates, 0);
    }

    #[test]
    fn stop_collapses_infinite_lifetime() {
        let mut host = Host::new();
        let (mut w, log) = wrapper(timed(TimingParams {
            fade_out_time: 1.0,
            ..TimingParams::default()
        }));
        w.start(0.0, ExecContext::default(), &mut host.svc());
        for _ in 0..4 {
            w.update(0.5, &mut host.svc());
        }
        assert!(!w.is_done());
        w.stop();
        assert_eq!(w.state(), WrapperState::Stopping);
        assert!(!w.timing().is_infinite());
        assert_eq!(w.timing().full_lifetime, 3.0);
        assert_eq!(log.borrow().stops, 1);

        w.update(0.5, &mut host.svc());
        assert!((w.output().fade - 0.5).abs() < 1e-5);
        w.update(0.5, &mut host.svc());
        assert!(w.is_done());

        w.cleanup(false, &host.constraints);
        assert_eq!(log.borrow().was_stopped, Some(true));
    }

    #[test]
    fn after_stop_window_drives_fade_and_done() {
        let mut host = Host::new();
        let adapter = RecordingAdapter::new().with_after_stop(2.0);
        let (mut w, _) = wrapper_with(
            timed(TimingParams {
                fade_out_time: 1.0,
                ..TimingParams::default()
            }),
            adapter,
        );
        w.start(0.0, ExecContext::default(), &mut host.svc());
        for _ in 0..4 {
            w.update(0.5, &mut host.svc());
        }
        w.stop();
        assert_eq!(w.timing().full_lifetime, 4.0);
        assert_eq!(w.timing().fade_out_time, 2.0);

        assert!(w.update(0.5, &mut host.svc()));
        assert!((w.output().fade - 0.75).abs() < 1e-5);
        assert!(w.update(1.0, &mut host.svc()));
        assert!((w.output().fade - 0.25).abs() < 1e-5);
        assert!(!w.is_done());
        w.update(0.5, &mut host.svc());
        assert!(w.is_done());
        assert!(w.output().fade.abs() < 1e-5);
    }

    #[test]
    fn stop_is_ignored_when_not_required() {
        let mut host = Host::new();
        let (mut w, log) = wrapper(timed(TimingParams::finite(0.0, 2.0, 0.0, 1.0)));
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.stop();
        assert!(!w.is_stopped());
        assert_eq!(w.state(), WrapperState::Active);
        assert_eq!(log.borrow().stops, 0);

        let (mut w, _) = wrapper(EffectWrapperConfig {
            requires_stop: Some(true),
            ..timed(TimingParams::finite(0.0, 2.0, 0.0, 1.0))
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.stop();
        assert!(w.is_stopped());
        assert_eq!(w.timing().full_lifetime, 3.0);
    }

    #[test]
    fn cleanup_runs_once_and_releases() {
        let mut host = Host::new();
        let caster = ConstraintSpec::new(ConstraintSource::Caster);
        host.constraints.insert(caster, Mat4::IDENTITY);
        let (mut w, log) = wrapper(EffectWrapperConfig {
            pos_constraint: Some("#caster".into()),
            ori_constraint: Some("#caster".into()),
            ..EffectWrapperConfig::default()
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.cleanup(false, &host.constraints);
        w.cleanup(true, &host.constraints);
        assert_eq!(log.borrow().finishes, 1);
        assert_eq!(log.borrow().was_stopped, Some(false));
        assert_eq!(host.constraints.release_count(), 1);
        assert_eq!(w.state(), WrapperState::Done);
    }

    #[test]
    fn visibility_keys_cap_the_fade() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(EffectWrapperConfig {
            vis_keys: Some(vec![[0.0, 0.0], [2.0, 1.0]]),
            ..timed(TimingParams::finite(0.0, 4.0, 0.0, 0.0))
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.update(1.0, &mut host.svc());
        let fade = w.output().fade;
        assert!(fade > 0.0 && fade < 1.0);
        w.update(2.0, &mut host.svc());
        assert_eq!(w.output().fade, 1.0);
    }

    #[test]
    fn residue_lingers_after_end() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(timed(TimingParams {
            residue_lifetime: 1.0,
            ..TimingParams::finite(0.0, 1.0, 0.0, 0.0)
        }));
        w.start(0.0, ExecContext::default(), &mut host.svc());
        assert!(w.update(1.2, &mut host.svc()));
        assert!(w.update(0.3, &mut host.svc()));
        assert!(w.in_residue());
        assert!(w.is_done());
        assert!(!w.update(0.6, &mut host.svc()));
        assert!(!w.in_residue());
    }

    #[test]
    fn looping_effect_never_reports_done() {
        let mut host = Host::new();
        let (mut w, _) = wrapper(EffectWrapperConfig {
            is_looping: true,
            ..timed(TimingParams::finite(0.0, 1.0, 0.0, 0.0))
        });
        w.start(0.0, ExecContext::default(), &mut host.svc());
        w.update(5.0, &mut host.svc());
        assert!(!w.is_done());
    }

    #[test]
    fn bad_config_is_rejected_at_construction() {
        let paths = PathRegistry::new();
        let config = EffectWrapperConfig {
            pos_constraint: Some("#nowhere".into()),
            ..EffectWrapperConfig::default()
        };
        let env = BuildEnv { paths: &paths };
        let err = EffectWrapper::new(config, &env, Box::new(RecordingAdapter::new()));
        assert!(matches!(err, Err(ConfigError::Constraint(_))));
    }
}
