//! Edits and deletions of whole series or single occurrences.
//!
//! Whole-series changes rewrite the stored series (and its pattern); single-occurrence
//! changes only ever touch exceptions.

use almanac_db::db::CalendarRepository;
use almanac_db::error::DbError;
use almanac_db::model::{EntryException, ExceptionKind, Overrides, Recurrence, Schedule, Series};
use almanac_rule::{Rule, build_rule};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::expand::{ExpansionPolicy, expand_modified_exception, resolve_occurrence_start};
use super::occurrence::Occurrence;
use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Partial update of a calendar entry. `None` fields stay as they are.
///
/// `frequency` and `recurrence_ends_utc` only apply to whole recurring series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: Option<bool>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub recurrence_ends_utc: Option<DateTime<Utc>>,
}

impl SeriesChanges {
    #[must_use]
    pub const fn touches_recurrence(&self) -> bool {
        self.frequency.is_some() || self.recurrence_ends_utc.is_some()
    }

    /// Occurrence-level part of the changes.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            title: self.title.clone(),
            description: self.description.clone(),
            start_time_utc: self.start_time_utc.map(|t| t.trunc_subsecs(0)),
            end_time_utc: self.end_time_utc.map(|t| t.trunc_subsecs(0)),
            all_day: self.all_day,
        }
    }
}

/// What a mutation request applies to once the series is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationScope {
    WholeSeries,
    Occurrence(DateTime<Utc>),
}

impl MutationScope {
    /// ## Summary
    /// Non-recurring entries and `apply_to_series` requests act on the whole series;
    /// everything else targets one occurrence.
    ///
    /// ## Errors
    /// Returns `ServiceError::MissingOccurrenceTarget` for a single-occurrence request
    /// without an occurrence start.
    pub fn resolve(
        series: &Series,
        occurrence_start: Option<DateTime<Utc>>,
        apply_to_series: bool,
    ) -> ServiceResult<Self> {
        if !series.is_recurring() || apply_to_series {
            return Ok(Self::WholeSeries);
        }
        occurrence_start
            .map(Self::Occurrence)
            .ok_or(ServiceError::MissingOccurrenceTarget(series.id))
    }
}

/// ## Summary
/// Builds the series that results from applying `changes`, without storing it.
///
/// The recurrence pattern is rebuilt from the resulting frequency, start and
/// recurrence end.
///
/// ## Errors
/// - `ServiceError::InvalidChange` if recurrence fields are given for a non-recurring entry
/// - `ServiceError::InvalidRange` if the result would end before it starts
/// - `ServiceError::InvalidFrequency` for an unsupported frequency
pub fn apply_series_changes(series: &Series, changes: &SeriesChanges) -> ServiceResult<Series> {
    let start_time_utc = changes
        .start_time_utc
        .unwrap_or(series.start_time_utc)
        .trunc_subsecs(0);
    let end_time_utc = changes
        .end_time_utc
        .unwrap_or(series.end_time_utc)
        .trunc_subsecs(0);
    if end_time_utc < start_time_utc {
        return Err(ServiceError::InvalidRange {
            start: start_time_utc,
            end: end_time_utc,
        });
    }

    let schedule = match &series.schedule {
        Schedule::Single if changes.touches_recurrence() => {
            return Err(ServiceError::InvalidChange(
                "recurrence fields cannot be set on a non-recurring entry".to_string(),
            ));
        }
        Schedule::Single => Schedule::Single,
        Schedule::Recurring(recurrence) => {
            let frequency = changes
                .frequency
                .as_deref()
                .unwrap_or(recurrence.frequency().as_str());
            let ends = changes.recurrence_ends_utc.unwrap_or(recurrence.ends_utc());
            Schedule::Recurring(Recurrence::new(build_rule(frequency, start_time_utc, ends)?))
        }
    };

    Ok(Series {
        id: series.id,
        event_id: series.event_id.clone(),
        creator_id: series.creator_id.clone(),
        title: changes.title.clone().unwrap_or_else(|| series.title.clone()),
        description: changes
            .description
            .clone()
            .or_else(|| series.description.clone()),
        all_day: changes.all_day.unwrap_or(series.all_day),
        start_time_utc,
        end_time_utc,
        schedule,
    })
}

/// ## Summary
/// Updates a whole series and drops exceptions that no longer fall on its grid.
///
/// The new series is fully validated before the single `update_series` call, so a
/// rejected change leaves storage untouched.
///
/// ## Errors
/// Validation errors from [`apply_series_changes`] and storage errors.
pub async fn update_whole_series<R: CalendarRepository + ?Sized>(
    repository: &R,
    series: &Series,
    changes: &SeriesChanges,
) -> ServiceResult<Series> {
    let updated = apply_series_changes(series, changes)?;
    let updated = repository.update_series(updated).await?;

    if let (Some(previous), Some(current)) = (series.rule(), updated.rule())
        && previous != current
    {
        prune_orphaned_exceptions(repository, updated.id, previous, current).await?;
    }
    Ok(updated)
}

async fn prune_orphaned_exceptions<R: CalendarRepository + ?Sized>(
    repository: &R,
    series_id: uuid::Uuid,
    previous: &Rule,
    current: &Rule,
) -> ServiceResult<usize> {
    let exceptions = repository
        .find_exceptions_for_series_in_range(series_id, previous.span())
        .await?;

    let mut pruned = 0;
    for exception in exceptions
        .iter()
        .filter(|exception| !current.contains(exception.original_start_utc))
    {
        if repository.delete_exception(exception.id).await? {
            pruned += 1;
        }
    }
    if pruned > 0 {
        tracing::debug!(%series_id, pruned, "Pruned exceptions off the new recurrence grid");
    }
    Ok(pruned)
}

/// ## Summary
/// Deletes a series and every exception it owns.
///
/// Returns the number of exceptions removed.
///
/// ## Errors
/// `ServiceError::NotFound` if the series does not exist, or a storage error.
pub async fn delete_whole_series<R: CalendarRepository + ?Sized>(
    repository: &R,
    series_id: uuid::Uuid,
) -> ServiceResult<usize> {
    if !repository.delete_series(series_id).await? {
        return Err(ServiceError::NotFound(format!("series {series_id}")));
    }
    Ok(repository.delete_exceptions_for_series(series_id).await?)
}

fn resolve_target(
    series: &Series,
    requested: DateTime<Utc>,
    policy: &ExpansionPolicy,
) -> ServiceResult<DateTime<Utc>> {
    series
        .rule()
        .and_then(|rule| resolve_occurrence_start(rule, requested, policy.tolerance))
        .ok_or(ServiceError::OccurrenceNotFound {
            series_id: series.id,
            requested,
        })
}

/// ## Summary
/// Edits one occurrence of a recurring series through a `Modified` exception.
///
/// An existing `Modified` exception for the occurrence has the new overrides merged
/// into it; otherwise one is created. If a concurrent request creates the exception
/// first, the write is retried once as an update of that exception.
///
/// ## Errors
/// - `ServiceError::InvalidChange` if recurrence fields are given or no field changes
/// - `ServiceError::OccurrenceNotFound` if `requested` is not on the series grid or the
///   occurrence was deleted
/// - `ServiceError::InvalidRange` if the edited occurrence would end before it starts
/// - `ServiceError::DuplicateException` if the retried write still fails
pub async fn update_single_occurrence<R: CalendarRepository + ?Sized>(
    repository: &R,
    series: &Series,
    requested: DateTime<Utc>,
    changes: &SeriesChanges,
    policy: &ExpansionPolicy,
) -> ServiceResult<Occurrence> {
    if changes.touches_recurrence() {
        return Err(ServiceError::InvalidChange(
            "recurrence fields can only change for the whole series".to_string(),
        ));
    }
    let overrides = changes.overrides();
    if overrides.is_empty() {
        return Err(ServiceError::InvalidChange(
            "no occurrence fields to change".to_string(),
        ));
    }
    let original_start = resolve_target(series, requested, policy)?;

    let stored = match repository
        .find_exception_for_occurrence(series.id, original_start)
        .await?
    {
        Some(existing) => {
            merge_into_existing(repository, series, existing, overrides, requested).await?
        }
        None => {
            let candidate = EntryException::modified(series.id, original_start, overrides.clone());
            validate_projection(&candidate, series)?;
            match repository.insert_exception(candidate).await {
                Ok(inserted) => inserted,
                Err(DbError::UniqueViolation { .. }) => {
                    tracing::warn!(
                        series_id = %series.id,
                        %original_start,
                        "Exception created concurrently, retrying as update"
                    );
                    retry_as_update(repository, series, original_start, overrides, requested).await?
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    Ok(expand_modified_exception(&stored, series))
}

async fn merge_into_existing<R: CalendarRepository + ?Sized>(
    repository: &R,
    series: &Series,
    mut existing: EntryException,
    overrides: Overrides,
    requested: DateTime<Utc>,
) -> ServiceResult<EntryException> {
    let Some(current) = existing.overrides() else {
        return Err(ServiceError::OccurrenceNotFound {
            series_id: series.id,
            requested,
        });
    };
    let mut merged = current.clone();
    merged.merge(overrides);
    existing.kind = ExceptionKind::Modified(merged);

    validate_projection(&existing, series)?;
    Ok(repository.update_exception(existing).await?)
}

async fn retry_as_update<R: CalendarRepository + ?Sized>(
    repository: &R,
    series: &Series,
    original_start: DateTime<Utc>,
    overrides: Overrides,
    requested: DateTime<Utc>,
) -> ServiceResult<EntryException> {
    let duplicate = || ServiceError::DuplicateException {
        series_id: series.id,
        original_start,
    };

    let Some(winner) = repository
        .find_exception_for_occurrence(series.id, original_start)
        .await?
    else {
        return Err(duplicate());
    };

    match merge_into_existing(repository, series, winner, overrides, requested).await {
        Err(ServiceError::DatabaseError(DbError::NotFound(_) | DbError::UniqueViolation { .. })) => {
            Err(duplicate())
        }
        other => other,
    }
}

fn validate_projection(exception: &EntryException, series: &Series) -> ServiceResult<()> {
    let projected = expand_modified_exception(exception, series);
    if projected.end_time_utc < projected.start_time_utc {
        return Err(ServiceError::InvalidRange {
            start: projected.start_time_utc,
            end: projected.end_time_utc,
        });
    }
    Ok(())
}

/// ## Summary
/// Suppresses one occurrence of a recurring series with a `Deleted` exception.
///
/// Replaces a `Modified` exception for the same occurrence in place. Deleting an
/// already deleted occurrence succeeds without changes. The series itself is untouched.
///
/// ## Errors
/// `ServiceError::OccurrenceNotFound` if `requested` is not on the series grid, or a
/// storage error.
pub async fn delete_single_occurrence<R: CalendarRepository + ?Sized>(
    repository: &R,
    series: &Series,
    requested: DateTime<Utc>,
    policy: &ExpansionPolicy,
) -> ServiceResult<EntryException> {
    let original_start = resolve_target(series, requested, policy)?;
    Ok(repository
        .upsert_exception(EntryException::deleted(series.id, original_start))
        .await?)
}
