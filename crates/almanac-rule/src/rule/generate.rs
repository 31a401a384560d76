//! Lazy occurrence generation.

use std::iter::FusedIterator;

use chrono::{DateTime, Utc};

use super::{Frequency, Rule, TimeWindow};

/// ## Summary
/// Iterator over the occurrence starts of a rule inside a window.
///
/// Yields strictly increasing timestamps `t` with `rule.start <= t <= rule.until`
/// and `window.start <= t <= window.end`. The first index is found by seeking, so
/// occurrences before the window are never materialized.
#[derive(Debug, Clone)]
pub struct Occurrences {
    frequency: Frequency,
    anchor: DateTime<Utc>,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    next_step: Option<u32>,
}

impl Occurrences {
    pub(crate) fn new(rule: &Rule, window: &TimeWindow) -> Self {
        let lower = window.start().max(rule.start());
        let upper = window.end().min(rule.until());
        let next_step = (lower <= upper)
            .then(|| rule.frequency().steps_not_after(rule.start(), lower));

        tracing::trace!(
            frequency = %rule.frequency(),
            lower = %lower,
            upper = %upper,
            first_step = ?next_step,
            "Generating occurrences"
        );

        Self {
            frequency: rule.frequency(),
            anchor: rule.start(),
            lower,
            upper,
            next_step,
        }
    }
}

impl Iterator for Occurrences {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = self.next_step?;
            let Some(candidate) = self.frequency.advance(self.anchor, step) else {
                self.next_step = None;
                return None;
            };

            if candidate > self.upper {
                self.next_step = None;
                return None;
            }

            self.next_step = step.checked_add(1);

            // Only the seek estimate can land before the window; walk forward from it.
            if candidate >= self.lower {
                return Some(candidate);
            }
        }
    }
}

impl FusedIterator for Occurrences {}
