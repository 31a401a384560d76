use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// How often a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Value of the `FREQ` part in the textual rule form.
    #[must_use]
    pub const fn rrule_name(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    /// ## Summary
    /// Returns the start of occurrence number `steps` of a series beginning at `start`.
    ///
    /// Occurrences are always computed from the series start, never from the previous
    /// occurrence, so the time of day and (for monthly series) the day of month stay
    /// anchored to `start`.
    ///
    /// Monthly steps clamp to the last day of the target month when the anchor day does
    /// not exist there: a series starting on Jan 31 continues Feb 29 (leap year) or
    /// Feb 28, then Mar 31, Apr 30.
    ///
    /// Returns `None` if the result is outside the representable date range.
    #[must_use]
    pub fn advance(self, start: DateTime<Utc>, steps: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => start.checked_add_signed(TimeDelta::days(i64::from(steps))),
            Self::Weekly => start.checked_add_signed(TimeDelta::weeks(i64::from(steps))),
            Self::Monthly => start.checked_add_months(Months::new(steps)),
        }
    }

    /// ## Summary
    /// Returns a step count whose occurrence is not after `target`.
    ///
    /// Used to seek close to a window start without walking every earlier occurrence.
    /// The estimate is never past the first occurrence at or after `target`; callers
    /// walk forward from it.
    #[must_use]
    pub(crate) fn steps_not_after(self, start: DateTime<Utc>, target: DateTime<Utc>) -> u32 {
        if target <= start {
            return 0;
        }

        let steps = match self {
            Self::Daily => (target - start).num_days(),
            Self::Weekly => (target - start).num_weeks(),
            Self::Monthly => {
                let months = i64::from(target.year() - start.year()) * 12
                    + i64::from(target.month0())
                    - i64::from(start.month0());
                // A clamped occurrence stays inside its month, so one month back is safe.
                months - 1
            }
        };

        u32::try_from(steps.max(0)).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(RuleError::InvalidFrequency(s.to_string())),
        }
    }
}

impl TryFrom<rrule::Frequency> for Frequency {
    type Error = RuleError;

    fn try_from(value: rrule::Frequency) -> Result<Self, Self::Error> {
        match value {
            rrule::Frequency::Daily => Ok(Self::Daily),
            rrule::Frequency::Weekly => Ok(Self::Weekly),
            rrule::Frequency::Monthly => Ok(Self::Monthly),
            other => Err(RuleError::InvalidFrequency(format!("{other:?}").to_lowercase())),
        }
    }
}
