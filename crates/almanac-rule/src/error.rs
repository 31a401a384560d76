use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while building, parsing or windowing recurrence rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid frequency '{0}': expected daily, weekly or monthly")]
    InvalidFrequency(String),

    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid recurrence pattern: {0}")]
    InvalidPattern(String),
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
