pub mod expand;
pub mod mutation;
pub mod occurrence;
pub mod service;

pub use expand::{
    ExpansionPolicy, OccurrenceSlot, expand_modified_exception, expand_range,
    expand_single_occurrence,
};
pub use mutation::SeriesChanges;
pub use occurrence::Occurrence;
pub use service::{CalendarService, DeleteOutcome, UpdateOutcome};
