//! Effect runtime: timing model, transform-modifier pipeline, effect wrapper.
//!
//! # Invariants
//! - Weight factors are computed in one place ([`TimingSchedule::weight_at`])
//!   and shared by every weighted modifier.
//! - Modifiers run in authoring order, each mutating the same [`XfmParams`].
//! - Nothing that goes wrong during a tick escapes [`EffectWrapper`] as an
//!   error; it is logged and surfaces through the scope flag.

mod config;
mod constraint;
mod error;
pub mod modifier;
mod params;
mod paths;
mod pipeline;
mod timing;
mod wrapper;

pub use config::{EffectWrapperConfig, LifeConditions};
pub use constraint::{
    ConstraintError, ConstraintHandle, ConstraintLookup, ConstraintSource, ConstraintSpec,
    LifeState, SceneObjectInfo, StaticConstraints,
};
pub use error::ConfigError;
pub use modifier::{BuildEnv, ModifierConfig, ModifierContext, XfmModifier, build_modifier};
pub use params::{XfmParams, look_rotation};
pub use paths::{PathConfig, PathEntry, PathRegistry};
pub use pipeline::{MAX_XFM_MODIFIERS, XfmPipeline};
pub use timing::{INFINITE_LIFETIME, TimingParams, TimingSchedule, Weighting};
pub use wrapper::{
    AdapterLog, EffectAdapter, EffectOutput, EffectWrapper, ExecContext, FxServices,
    RecordingAdapter, WrapperState,
};

pub fn crate_info() -> &'static str {
    "torque-afx v0.1.0"
}
