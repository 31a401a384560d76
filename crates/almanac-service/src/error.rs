use almanac_rule::RuleError;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid frequency '{0}': expected daily, weekly or monthly")]
    InvalidFrequency(String),

    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Recurring series {0} needs an occurrence start to change a single occurrence")]
    MissingOccurrenceTarget(Uuid),

    #[error("Series {series_id} has no occurrence at {requested}")]
    OccurrenceNotFound {
        series_id: Uuid,
        requested: DateTime<Utc>,
    },

    #[error("Exception for series {series_id} at {original_start} could not be written")]
    DuplicateException {
        series_id: Uuid,
        original_start: DateTime<Utc>,
    },

    #[error("Invalid change: {0}")]
    InvalidChange(String),

    #[error("Query window yields more than {0} occurrences")]
    TooManyOccurrences(usize),

    #[error(transparent)]
    RuleError(RuleError),

    #[error(transparent)]
    DatabaseError(#[from] almanac_db::error::DbError),
}

impl From<RuleError> for ServiceError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::InvalidFrequency(frequency) => Self::InvalidFrequency(frequency),
            RuleError::InvalidRange { start, end } => Self::InvalidRange { start, end },
            other @ RuleError::InvalidPattern(_) => Self::RuleError(other),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
