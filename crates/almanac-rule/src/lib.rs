//! Recurrence rules for calendar series.
//!
//! A rule is a (frequency, start, until) triple with a canonical two-line text
//! form (`DTSTART:...` / `RRULE:FREQ=...;UNTIL=...`). Rules generate their
//! occurrence start times lazily for any query window.

pub mod error;
pub mod rule;

pub use error::{RuleError, RuleResult};
pub use rule::{Frequency, Occurrences, Rule, TimeWindow, build_rule};
