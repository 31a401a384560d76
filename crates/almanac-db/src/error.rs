use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error(
        "Unique constraint violated: exception for series {series_id} at {original_start} already exists"
    )]
    UniqueViolation {
        series_id: uuid::Uuid,
        original_start: DateTime<Utc>,
    },

    #[error("Series already exists: {0}")]
    DuplicateSeries(uuid::Uuid),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
