//! Expansion of series into concrete occurrences with their exceptions merged in.

use std::collections::HashMap;

use almanac_core::config::ExpansionConfig;
use almanac_core::constants::{DEFAULT_MAX_OCCURRENCES, DEFAULT_TOLERANCE_SECONDS};
use almanac_db::model::{EntryException, ExceptionKind, Series};
use almanac_rule::{Rule, TimeWindow};
use chrono::{DateTime, TimeDelta, Utc};

use super::occurrence::Occurrence;
use crate::error::{ServiceError, ServiceResult};

/// Limits applied while expanding series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    /// Half-width of the window used to match a requested occurrence start.
    pub tolerance: TimeDelta,
    /// Most occurrences a single series may generate for one window.
    pub max_occurrences: usize,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            tolerance: TimeDelta::seconds(DEFAULT_TOLERANCE_SECONDS),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

impl From<&ExpansionConfig> for ExpansionPolicy {
    fn from(config: &ExpansionConfig) -> Self {
        Self {
            tolerance: TimeDelta::try_seconds(config.tolerance_seconds).unwrap_or(TimeDelta::MAX),
            max_occurrences: config.max_occurrences,
        }
    }
}

/// Start and end of one generated occurrence before exceptions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl OccurrenceSlot {
    /// Slot at `start` with the series' duration.
    #[must_use]
    pub fn for_series(series: &Series, start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start.checked_add_signed(series.duration()).unwrap_or(start),
        }
    }
}

/// ## Summary
/// Resolves an approximate timestamp to the earliest grid timestamp of the rule
/// within `tolerance` of it.
#[must_use]
pub fn resolve_occurrence_start(
    rule: &Rule,
    requested: DateTime<Utc>,
    tolerance: TimeDelta,
) -> Option<DateTime<Utc>> {
    rule.occurrences(&TimeWindow::around(requested, tolerance)).next()
}

fn materialize(
    series: &Series,
    start: DateTime<Utc>,
    exception: Option<&EntryException>,
) -> Option<Occurrence> {
    let occurrence = Occurrence::generated(series, OccurrenceSlot::for_series(series, start));
    match exception.map(|e| (e.id, &e.kind)) {
        Some((_, ExceptionKind::Deleted)) => {
            tracing::trace!(%start, "Occurrence suppressed by exception");
            None
        }
        Some((id, ExceptionKind::Modified(overrides))) => {
            tracing::trace!(%start, exception_id = %id, "Occurrence modified by exception");
            Some(occurrence.with_overrides(id, overrides))
        }
        None => Some(occurrence),
    }
}

/// ## Summary
/// Expands a series over `window`, merging its exceptions.
///
/// Occurrences covered by a `Deleted` exception are omitted; `Modified` exceptions
/// override the fields they set. Output is in generation order. A non-recurring series
/// yields itself when it starts and ends inside the window.
///
/// ## Errors
/// Returns `ServiceError::TooManyOccurrences` if the series generates more than
/// `policy.max_occurrences` occurrences in the window.
pub fn expand_range(
    series: &Series,
    exceptions: &[EntryException],
    window: &TimeWindow,
    policy: &ExpansionPolicy,
) -> ServiceResult<Vec<Occurrence>> {
    let Some(rule) = series.rule() else {
        let inside = window.contains(series.start_time_utc) && window.contains(series.end_time_utc);
        return Ok(if inside {
            vec![Occurrence::from_series(series)]
        } else {
            Vec::new()
        });
    };

    let by_start: HashMap<DateTime<Utc>, &EntryException> = exceptions
        .iter()
        .filter(|exception| exception.series_id == series.id)
        .map(|exception| (exception.original_start_utc, exception))
        .collect();

    let mut occurrences = Vec::new();
    for (generated, start) in rule.occurrences(window).enumerate() {
        if generated >= policy.max_occurrences {
            tracing::warn!(
                series_id = %series.id,
                limit = policy.max_occurrences,
                "Expansion exceeded occurrence limit"
            );
            return Err(ServiceError::TooManyOccurrences(policy.max_occurrences));
        }
        occurrences.extend(materialize(series, start, by_start.get(&start).copied()));
    }

    tracing::debug!(
        series_id = %series.id,
        count = occurrences.len(),
        "Expanded series"
    );
    Ok(occurrences)
}

/// ## Summary
/// Finds the earliest occurrence of `series` within the policy tolerance of `target`.
///
/// Returns `None` when no occurrence lies in `[target - tolerance, target + tolerance]`
/// or when the occurrence is suppressed by a `Deleted` exception.
#[must_use]
pub fn expand_single_occurrence(
    series: &Series,
    exceptions: &[EntryException],
    target: DateTime<Utc>,
    policy: &ExpansionPolicy,
) -> Option<Occurrence> {
    let Some(rule) = series.rule() else {
        return TimeWindow::around(target, policy.tolerance)
            .contains(series.start_time_utc)
            .then(|| Occurrence::from_series(series));
    };

    let start = resolve_occurrence_start(rule, target, policy.tolerance)?;
    let exception = exceptions
        .iter()
        .find(|exception| exception.key() == (series.id, start));
    materialize(series, start, exception)
}

/// Projects an exception onto the defaults of its series.
///
/// A `Deleted` exception projects to the unmodified occurrence.
#[must_use]
pub fn expand_modified_exception(exception: &EntryException, series: &Series) -> Occurrence {
    let occurrence = Occurrence::generated(
        series,
        OccurrenceSlot::for_series(series, exception.original_start_utc),
    );
    match exception.overrides() {
        Some(overrides) => occurrence.with_overrides(exception.id, overrides),
        None => occurrence,
    }
}
