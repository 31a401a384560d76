//! Calendar series (master entries).

use almanac_rule::{Frequency, Rule, RuleError, RuleResult, TimeWindow, build_rule};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ## Summary
/// A stored calendar entry: either a single event or the master of a recurring series.
///
/// `start_time_utc`/`end_time_utc` define the first occurrence and the duration every
/// occurrence inherits. On the wire a series uses the flat document shape
/// (`recurring`, `frequency`, `recurrenceEndsUtc`, `recurrencePattern`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord", into = "SeriesRecord")]
pub struct Series {
    pub id: Uuid,
    pub event_id: String,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub all_day: bool,
    pub start_time_utc: DateTime<Utc>,
    pub end_time_utc: DateTime<Utc>,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Single,
    Recurring(Recurrence),
}

/// Recurrence of a series with its persisted pattern string.
///
/// The pattern is only ever produced from the rule, so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    rule: Rule,
    pattern: String,
}

impl Recurrence {
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self {
            pattern: rule.serialize(),
            rule,
        }
    }

    #[must_use]
    pub const fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.rule.frequency()
    }

    #[must_use]
    pub const fn ends_utc(&self) -> DateTime<Utc> {
        self.rule.until()
    }
}

/// Input for creating a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeries {
    pub event_id: String,
    pub creator_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub start_time_utc: DateTime<Utc>,
    pub end_time_utc: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Option<NewRecurrence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurrence {
    /// One of `daily`, `weekly`, `monthly`.
    pub frequency: String,
    pub recurrence_ends_utc: DateTime<Utc>,
}

impl Series {
    /// ## Summary
    /// Builds a series from creation input, computing the recurrence pattern for
    /// recurring entries.
    ///
    /// ## Errors
    /// - `RuleError::InvalidRange` if the end precedes the start, or the recurrence end
    ///   precedes the start
    /// - `RuleError::InvalidFrequency` for an unsupported frequency literal
    pub fn from_new(id: Uuid, new: NewSeries) -> RuleResult<Self> {
        let start_time_utc = new.start_time_utc.trunc_subsecs(0);
        let end_time_utc = new.end_time_utc.trunc_subsecs(0);
        if end_time_utc < start_time_utc {
            return Err(RuleError::InvalidRange {
                start: start_time_utc,
                end: end_time_utc,
            });
        }

        let schedule = match &new.recurrence {
            Some(recurrence) => Schedule::Recurring(Recurrence::new(build_rule(
                &recurrence.frequency,
                start_time_utc,
                recurrence.recurrence_ends_utc,
            )?)),
            None => Schedule::Single,
        };

        Ok(Self {
            id,
            event_id: new.event_id,
            creator_id: new.creator_id,
            title: new.title,
            description: new.description,
            all_day: new.all_day,
            start_time_utc,
            end_time_utc,
            schedule,
        })
    }

    #[must_use]
    pub const fn is_recurring(&self) -> bool {
        matches!(self.schedule, Schedule::Recurring(_))
    }

    #[must_use]
    pub const fn recurrence(&self) -> Option<&Recurrence> {
        match &self.schedule {
            Schedule::Recurring(recurrence) => Some(recurrence),
            Schedule::Single => None,
        }
    }

    #[must_use]
    pub fn rule(&self) -> Option<&Rule> {
        self.recurrence().map(Recurrence::rule)
    }

    /// Length every generated occurrence inherits.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_time_utc - self.start_time_utc
    }

    /// Window in which the series can have occurrences.
    #[must_use]
    pub fn span(&self) -> TimeWindow {
        match &self.schedule {
            Schedule::Recurring(recurrence) => recurrence.rule().span(),
            Schedule::Single => TimeWindow::new(self.start_time_utc, self.end_time_utc)
                .unwrap_or_else(|_| TimeWindow::around(self.start_time_utc, TimeDelta::zero())),
        }
    }
}

/// Flat document shape of a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesRecord {
    id: Uuid,
    event_id: String,
    creator_id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    all_day: bool,
    recurring: bool,
    start_time_utc: DateTime<Utc>,
    end_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurrence_ends_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurrence_pattern: Option<String>,
}

impl From<Series> for SeriesRecord {
    fn from(series: Series) -> Self {
        let recurrence = series.recurrence().cloned();
        Self {
            id: series.id,
            event_id: series.event_id,
            creator_id: series.creator_id,
            title: series.title,
            description: series.description,
            all_day: series.all_day,
            recurring: recurrence.is_some(),
            start_time_utc: series.start_time_utc,
            end_time_utc: series.end_time_utc,
            frequency: recurrence.as_ref().map(Recurrence::frequency),
            recurrence_ends_utc: recurrence.as_ref().map(Recurrence::ends_utc),
            recurrence_pattern: recurrence.map(|r| r.pattern),
        }
    }
}

impl TryFrom<SeriesRecord> for Series {
    type Error = RuleError;

    fn try_from(record: SeriesRecord) -> Result<Self, Self::Error> {
        let start_time_utc = record.start_time_utc.trunc_subsecs(0);
        let end_time_utc = record.end_time_utc.trunc_subsecs(0);
        if end_time_utc < start_time_utc {
            return Err(RuleError::InvalidRange {
                start: start_time_utc,
                end: end_time_utc,
            });
        }

        let schedule = if record.recurring {
            let frequency = record
                .frequency
                .ok_or_else(|| RuleError::InvalidPattern("recurring series without frequency".into()))?;
            let ends = record.recurrence_ends_utc.ok_or_else(|| {
                RuleError::InvalidPattern("recurring series without recurrenceEndsUtc".into())
            })?;
            let recurrence = Recurrence::new(Rule::new(frequency, start_time_utc, ends)?);

            if let Some(stored) = &record.recurrence_pattern
                && stored != recurrence.pattern()
            {
                return Err(RuleError::InvalidPattern(format!(
                    "stored pattern {stored:?} does not match {:?}",
                    recurrence.pattern()
                )));
            }
            Schedule::Recurring(recurrence)
        } else {
            Schedule::Single
        };

        Ok(Self {
            id: record.id,
            event_id: record.event_id,
            creator_id: record.creator_id,
            title: record.title,
            description: record.description,
            all_day: record.all_day,
            start_time_utc,
            end_time_utc,
            schedule,
        })
    }
}
