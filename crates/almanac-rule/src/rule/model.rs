//! Recurrence rule model and its canonical text form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use super::{Frequency, Occurrences, TimeWindow};
use crate::error::{RuleError, RuleResult};

const RULE_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// ## Summary
/// A fixed-frequency recurrence: every day, week or month from `start` until `until`
/// (inclusive).
///
/// Timestamps are truncated to whole seconds on construction so the text form
/// round-trips exactly. Serializes as its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rule {
    frequency: Frequency,
    start: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl Rule {
    /// ## Summary
    /// Creates a rule.
    ///
    /// ## Errors
    /// Returns `RuleError::InvalidRange` if `until` precedes `start`.
    pub fn new(frequency: Frequency, start: DateTime<Utc>, until: DateTime<Utc>) -> RuleResult<Self> {
        let start = start.trunc_subsecs(0);
        let until = until.trunc_subsecs(0);
        if until < start {
            return Err(RuleError::InvalidRange { start, end: until });
        }
        Ok(Self {
            frequency,
            start,
            until,
        })
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn until(&self) -> DateTime<Utc> {
        self.until
    }

    /// Window from the first occurrence to the recurrence end.
    #[must_use]
    pub const fn span(&self) -> TimeWindow {
        TimeWindow::ordered(self.start, self.until)
    }

    /// ## Summary
    /// Canonical text form:
    ///
    /// ```text
    /// DTSTART:20240101T100000Z
    /// RRULE:FREQ=WEEKLY;UNTIL=20240301T000000Z
    /// ```
    #[must_use]
    pub fn serialize(&self) -> String {
        format!(
            "DTSTART:{}\nRRULE:FREQ={};UNTIL={}",
            self.start.format(RULE_TIMESTAMP_FORMAT),
            self.frequency.rrule_name(),
            self.until.format(RULE_TIMESTAMP_FORMAT),
        )
    }

    /// ## Summary
    /// Parses the text form produced by [`Rule::serialize`].
    ///
    /// The RRULE grammar is validated by the `rrule` crate; frequency, DTSTART and
    /// UNTIL are then read back from the parsed set. Only the canonical form is
    /// accepted, so any other RRULE part (`BYDAY`, `BYMONTHDAY`, ...) or any
    /// `EXDATE`/`RDATE`/`EXRULE` line is rejected rather than dropped.
    ///
    /// ## Errors
    /// - `RuleError::InvalidPattern` if the text is malformed, has no `UNTIL`, uses
    ///   `COUNT`/`INTERVAL`/multiple rules, or carries parts the canonical form lacks
    /// - `RuleError::InvalidFrequency` if `FREQ` is not daily, weekly or monthly
    /// - `RuleError::InvalidRange` if `UNTIL` precedes `DTSTART`
    pub fn parse(text: &str) -> RuleResult<Self> {
        let text = text.trim().replace("\r\n", "\n");

        // rrule reports a reversed range as a generic validation error.
        if let Some((start, until)) = declared_bounds(&text)
            && until < start
        {
            return Err(RuleError::InvalidRange { start, end: until });
        }

        let rrule_set = text
            .parse::<RRuleSet>()
            .map_err(|err| RuleError::InvalidPattern(err.to_string()))?;

        if !rrule_set.get_exdate().is_empty()
            || !rrule_set.get_rdate().is_empty()
            || !rrule_set.get_exrule().is_empty()
        {
            return Err(RuleError::InvalidPattern(
                "EXDATE, RDATE and EXRULE are not supported".to_string(),
            ));
        }

        let [rrule] = rrule_set.get_rrule().as_slice() else {
            return Err(RuleError::InvalidPattern(
                "expected exactly one RRULE".to_string(),
            ));
        };

        if rrule.get_count().is_some() {
            return Err(RuleError::InvalidPattern(
                "COUNT is not supported, use UNTIL".to_string(),
            ));
        }
        if rrule.get_interval() != 1 {
            return Err(RuleError::InvalidPattern(format!(
                "INTERVAL={} is not supported",
                rrule.get_interval()
            )));
        }

        let frequency = Frequency::try_from(rrule.get_freq())?;
        let until = rrule
            .get_until()
            .ok_or_else(|| RuleError::InvalidPattern("missing UNTIL".to_string()))?
            .with_timezone(&Utc);
        let start = rrule_set.get_dt_start().with_timezone(&Utc);

        let rule = Self::new(frequency, start, until)?;
        if rule.serialize() != text {
            return Err(RuleError::InvalidPattern(format!(
                "unsupported recurrence parts in {text:?}, expected {:?}",
                rule.serialize()
            )));
        }
        Ok(rule)
    }

    /// Lazily generates occurrence starts inside `window`.
    #[must_use]
    pub fn occurrences(&self, window: &TimeWindow) -> Occurrences {
        Occurrences::new(self, window)
    }

    /// Whether `instant` is exactly one of this rule's occurrences.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let window = TimeWindow::around(instant, chrono::TimeDelta::zero());
        self.occurrences(&window).next() == Some(instant)
    }
}

/// ## Summary
/// Builds a rule from the frequency literal (`daily`, `weekly`, `monthly`), the series
/// start and the inclusive recurrence end.
///
/// ## Errors
/// - `RuleError::InvalidFrequency` for any other frequency literal
/// - `RuleError::InvalidRange` if `until` precedes `start`
pub fn build_rule(frequency: &str, start: DateTime<Utc>, until: DateTime<Utc>) -> RuleResult<Rule> {
    let frequency = frequency.parse::<Frequency>()?;
    Rule::new(frequency, start, until)
}

/// DTSTART and UNTIL as written in a canonical pattern, if both are present.
fn declared_bounds(text: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let parse = |value: &str| {
        NaiveDateTime::parse_from_str(value, RULE_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    };

    let start = text
        .lines()
        .find_map(|line| line.trim().strip_prefix("DTSTART:"))
        .and_then(parse)?;
    let until = text
        .lines()
        .filter_map(|line| line.trim().strip_prefix("RRULE:"))
        .flat_map(|rule| rule.split(';'))
        .find_map(|part| part.strip_prefix("UNTIL="))
        .and_then(parse)?;
    Some((start, until))
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Rule {
    type Error = RuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.serialize()
    }
}
