//! Error types for the DriftId library

use thiserror::Error;

/// Result type alias for DriftId operations
pub type Result<T> = std::result::Result<T, DriftIdError>;

/// Main error type for the DriftId library
#[derive(Error, Debug)]
pub enum DriftIdError {
    /// The `(timeBits, workerBits, seqBits)` triple does not sum to 63, or one
    /// of the components is non-positive. Raised at construction; fatal.
    #[error("invalid bit layout: {message}")]
    InvalidLayout {
        /// Description of why the layout is invalid
        message: String,
    },

    /// `currentSeconds - epochSeconds` exceeds `maxDeltaSeconds`. Raised from
    /// the mint path; the service cannot recover without re-laying out the id.
    #[error("timestamp exhausted: {seconds_since_epoch}s since epoch exceeds the {max_delta_seconds}s budget")]
    TimestampExhausted {
        /// Seconds elapsed since the configured epoch
        seconds_since_epoch: i64,
        /// Maximum seconds representable by the configured `timeBits`
        max_delta_seconds: i64,
    },

    /// The wall clock regressed further than the configured policy tolerates.
    #[error("clock regressed by {delta_seconds}s, exceeding the strict-mode policy")]
    ClockRegression {
        /// How many seconds the clock moved backward
        delta_seconds: i64,
    },

    /// The cached variant's ring buffer was empty when a consumer took from it.
    #[error("ring buffer exhausted; producer has not kept up with consumers")]
    Exhausted,

    /// Invalid configuration parameter.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Generic error for unexpected conditions that should not occur in a
    /// correctly functioning system, such as a flag-discipline violation.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Error message describing the unexpected condition
        message: String,
    },
}

impl DriftIdError {
    /// Create a new invalid-layout error
    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout { message: message.into() }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Create a new unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected { message: message.into() }
    }

    /// Whether a caller can reasonably retry the operation that produced this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exhausted | Self::ClockRegression { .. })
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::DriftIdError::config(format!($($arg)*))
    };
}
