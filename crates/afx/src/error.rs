use torque_curve::CurveError;

use crate::constraint::ConstraintError;

/// Authoring-time errors. Raised while building modifiers, paths and
/// effect wrappers; never during a tick.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid constraint spec: {0}")]
    Constraint(#[from] ConstraintError),
    #[error("malformed path spec `{field}`: {reason}")]
    MalformedPathSpec { field: &'static str, reason: String },
    #[error("unknown path `{0}`")]
    UnknownPath(String),
    #[error("path conform lists no paths")]
    EmptyPathList,
    #[error("path `{name}`: {source}")]
    Path {
        name: String,
        #[source]
        source: CurveError,
    },
    #[error("visibility keys: {0}")]
    VisKeys(#[source] CurveError),
    #[error("too many transform modifiers: {count} (max {max})")]
    TooManyModifiers { count: usize, max: usize },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
