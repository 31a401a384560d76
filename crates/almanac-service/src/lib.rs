//! Recurrence expansion and series mutation for calendar entries.

pub mod calendar;
pub mod error;

pub use calendar::{
    CalendarService, DeleteOutcome, ExpansionPolicy, Occurrence, SeriesChanges, UpdateOutcome,
};
pub use error::{ServiceError, ServiceResult};
