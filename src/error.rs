use thiserror::Error;

/// Errors raised by the crane core and its file-facing helpers.
#[derive(Debug, Error)]
pub enum CraneError {
    /// A state outside the track/angle bounds reached `commit`. This is a
    /// defect in whatever produced the state and is not recoverable.
    #[error("invariant violated: position {position} / angle {angle} outside track bounds")]
    InvariantViolation { position: f64, angle: f64 },

    #[error("destination {0} is outside the track")]
    InvalidDestination(f64),

    #[error("invalid membership function: {0}")]
    InvalidShape(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("control loop worker panicked")]
    SchedulerPanicked,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for crane operations
pub type Result<T> = std::result::Result<T, CraneError>;
