use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{RuleError, RuleResult};

/// Inclusive time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// ## Summary
    /// Creates a window covering `start..=end`.
    ///
    /// ## Errors
    /// Returns `RuleError::InvalidRange` if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RuleResult<Self> {
        if end < start {
            return Err(RuleError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Caller guarantees `start <= end`.
    pub(crate) const fn ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `tolerance` either side of `center`.
    #[must_use]
    pub fn around(center: DateTime<Utc>, tolerance: TimeDelta) -> Self {
        let tolerance = tolerance.abs();
        Self {
            start: center.checked_sub_signed(tolerance).unwrap_or(center),
            end: center.checked_add_signed(tolerance).unwrap_or(center),
        }
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Overlap of two windows, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self { start, end })
    }
}
