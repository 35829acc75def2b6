use thiserror::Error;

/// Errors surfaced by the public pipeline operations.
///
/// Only `start()` hands one of these back to the caller. Everything that
/// happens after a session is running is absorbed and recorded as a
/// diagnostic instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no recorder is attached, recording cannot start")]
    RecorderUnavailable,

    #[error("recorder failed to start: {0}")]
    RecorderFailed(#[from] RecorderError),

    #[error("pipeline disabled after an earlier setup failure")]
    Disabled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("reactor is no longer running")]
    ReactorGone,
}

/// Failure reported by the external recorder collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("recorder is not supported in this environment: {0}")]
    Unsupported(String),
}

/// Failure reported by a sink. Never propagated past the pipeline.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink is closed")]
    Closed,

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink panicked during delivery")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bad value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Boundary validation failure for a raw recorder payload.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event payload is not an object")]
    NotAnObject,

    #[error("event is missing `{0}`")]
    MissingField(&'static str),

    #[error("event is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
