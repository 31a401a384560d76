pub mod exception;
pub mod series;

pub use exception::{EntryException, ExceptionKind, Overrides};
pub use series::{NewRecurrence, NewSeries, Recurrence, Schedule, Series};
