//! Caller-facing calendar operations.

use almanac_core::config::Settings;
use almanac_db::db::CalendarRepository;
use almanac_db::model::{NewSeries, Series};
use almanac_rule::TimeWindow;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use uuid::Uuid;

use super::expand::{ExpansionPolicy, expand_range, expand_single_occurrence};
use super::mutation::{
    MutationScope, SeriesChanges, delete_single_occurrence, delete_whole_series,
    update_single_occurrence, update_whole_series,
};
use super::occurrence::Occurrence;
use crate::error::{ServiceError, ServiceResult};

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum UpdateOutcome {
    /// The stored series was rewritten.
    Series(Series),
    /// One occurrence was overridden; carries the merged occurrence.
    Occurrence(Occurrence),
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum DeleteOutcome {
    #[serde(rename_all = "camelCase")]
    Series {
        series_id: Uuid,
        exceptions_removed: usize,
    },
    #[serde(rename_all = "camelCase")]
    Occurrence {
        series_id: Uuid,
        original_start_utc: DateTime<Utc>,
    },
}

/// ## Summary
/// Calendar operations over a [`CalendarRepository`].
///
/// Holds no state besides the repository and the expansion policy; concurrent requests
/// against the same series are reconciled through the repository's uniqueness rules.
#[derive(Debug)]
pub struct CalendarService<R> {
    repository: R,
    policy: ExpansionPolicy,
}

impl<R: CalendarRepository> CalendarService<R> {
    #[must_use]
    pub fn new(repository: R) -> Self {
        Self::with_policy(repository, ExpansionPolicy::default())
    }

    #[must_use]
    pub const fn with_policy(repository: R, policy: ExpansionPolicy) -> Self {
        Self { repository, policy }
    }

    #[must_use]
    pub fn from_settings(repository: R, settings: &Settings) -> Self {
        Self::with_policy(repository, ExpansionPolicy::from(&settings.expansion))
    }

    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    #[must_use]
    pub const fn policy(&self) -> &ExpansionPolicy {
        &self.policy
    }

    async fn load_series(&self, series_id: Uuid) -> ServiceResult<Series> {
        self.repository
            .get_series_by_id(series_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("series {series_id}")))
    }

    /// ## Summary
    /// Creates a single entry or recurring series, computing its recurrence pattern.
    ///
    /// ## Errors
    /// - `ServiceError::InvalidRange` if the entry or its recurrence ends before it starts
    /// - `ServiceError::InvalidFrequency` for an unsupported frequency
    #[tracing::instrument(skip(self, new), fields(
        title = %new.title,
        recurring = new.recurrence.is_some(),
    ))]
    pub async fn create_series(&self, new: NewSeries) -> ServiceResult<Series> {
        let series = Series::from_new(Uuid::now_v7(), new)?;
        let series = self.repository.insert_series(series).await?;
        tracing::debug!(series_id = %series.id, "Created series");
        Ok(series)
    }

    /// ## Summary
    /// Returns every occurrence in `[start, end]`, sorted by start time.
    ///
    /// Single entries are included when they lie entirely inside the window; recurring
    /// series are expanded with their exceptions merged. Exceptions for all recurring
    /// series are fetched concurrently.
    ///
    /// ## Errors
    /// - `ServiceError::InvalidRange` if `end` precedes `start`
    /// - `ServiceError::TooManyOccurrences` if a series expands past the policy limit
    #[tracing::instrument(skip(self))]
    pub async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<Vec<Occurrence>> {
        let window = TimeWindow::new(start, end)?;

        let singles = self.repository.find_single_entries_in_range(window).await?;
        let recurring = self.repository.find_recurring_series_in_range(window).await?;
        let exceptions = try_join_all(recurring.iter().map(|series| {
            self.repository
                .find_exceptions_for_series_in_range(series.id, window)
        }))
        .await?;

        let mut occurrences: Vec<Occurrence> = singles.iter().map(Occurrence::from_series).collect();
        for (series, exceptions) in recurring.iter().zip(&exceptions) {
            occurrences.extend(expand_range(series, exceptions, &window, &self.policy)?);
        }
        occurrences.sort_by_key(|occurrence| occurrence.start_time_utc);

        tracing::debug!(
            singles = singles.len(),
            recurring = recurring.len(),
            count = occurrences.len(),
            "Range query completed"
        );
        Ok(occurrences)
    }

    /// ## Summary
    /// Returns one entry: a non-recurring entry directly, or the occurrence of a
    /// recurring series: the earliest one within the configured tolerance of `approx_start`.
    ///
    /// ## Errors
    /// - `ServiceError::NotFound` if the series does not exist
    /// - `ServiceError::MissingOccurrenceTarget` for a recurring series without `approx_start`
    /// - `ServiceError::OccurrenceNotFound` if no occurrence matches or it was deleted
    #[tracing::instrument(skip(self))]
    pub async fn get_occurrence(
        &self,
        series_id: Uuid,
        approx_start: Option<DateTime<Utc>>,
    ) -> ServiceResult<Occurrence> {
        let series = self.load_series(series_id).await?;
        if !series.is_recurring() {
            return Ok(Occurrence::from_series(&series));
        }
        let requested = approx_start.ok_or(ServiceError::MissingOccurrenceTarget(series_id))?;

        let window = TimeWindow::around(requested, self.policy.tolerance);
        let exceptions = self
            .repository
            .find_exceptions_for_series_in_range(series_id, window)
            .await?;

        expand_single_occurrence(&series, &exceptions, requested, &self.policy).ok_or(
            ServiceError::OccurrenceNotFound {
                series_id,
                requested,
            },
        )
    }

    /// ## Summary
    /// Applies `changes` to a whole series or to the single occurrence at
    /// `occurrence_start`.
    ///
    /// Non-recurring entries are always updated directly. For recurring series,
    /// `apply_to_series` rewrites the series (recomputing the pattern and dropping
    /// exceptions that fall off the new grid); otherwise an exception is created or
    /// merged for the targeted occurrence.
    ///
    /// ## Errors
    /// - `ServiceError::NotFound` if the series does not exist
    /// - `ServiceError::MissingOccurrenceTarget` for a single-occurrence edit without a target
    /// - `ServiceError::OccurrenceNotFound` if the target is not an occurrence
    /// - `ServiceError::InvalidRange`, `InvalidFrequency`, `InvalidChange` for rejected changes
    /// - `ServiceError::DuplicateException` if a concurrent write could not be reconciled
    #[tracing::instrument(skip(self, changes), fields(
        recurrence_change = changes.touches_recurrence(),
    ))]
    pub async fn update_occurrence_or_series(
        &self,
        series_id: Uuid,
        changes: SeriesChanges,
        occurrence_start: Option<DateTime<Utc>>,
        apply_to_series: bool,
    ) -> ServiceResult<UpdateOutcome> {
        let series = self.load_series(series_id).await?;

        let outcome = match MutationScope::resolve(&series, occurrence_start, apply_to_series) {
            Ok(MutationScope::WholeSeries) => {
                update_whole_series(&self.repository, &series, &changes)
                    .await
                    .map(UpdateOutcome::Series)
            }
            Ok(MutationScope::Occurrence(requested)) => update_single_occurrence(
                &self.repository,
                &series,
                requested,
                &changes,
                &self.policy,
            )
            .await
            .map(UpdateOutcome::Occurrence),
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "Update rejected");
        }
        outcome
    }

    /// ## Summary
    /// Deletes a whole series (with its exceptions) or suppresses the single occurrence
    /// at `occurrence_start`.
    ///
    /// Deleting an occurrence that is already deleted succeeds.
    ///
    /// ## Errors
    /// - `ServiceError::NotFound` if the series does not exist
    /// - `ServiceError::MissingOccurrenceTarget` for a single-occurrence delete without a target
    /// - `ServiceError::OccurrenceNotFound` if the target is not an occurrence
    #[tracing::instrument(skip(self))]
    pub async fn delete_occurrence_or_series(
        &self,
        series_id: Uuid,
        occurrence_start: Option<DateTime<Utc>>,
        apply_to_series: bool,
    ) -> ServiceResult<DeleteOutcome> {
        let series = self.load_series(series_id).await?;

        let outcome = match MutationScope::resolve(&series, occurrence_start, apply_to_series) {
            Ok(MutationScope::WholeSeries) => delete_whole_series(&self.repository, series_id)
                .await
                .map(|exceptions_removed| DeleteOutcome::Series {
                    series_id,
                    exceptions_removed,
                }),
            Ok(MutationScope::Occurrence(requested)) => {
                delete_single_occurrence(&self.repository, &series, requested, &self.policy)
                    .await
                    .map(|exception| DeleteOutcome::Occurrence {
                        series_id,
                        original_start_utc: exception.original_start_utc,
                    })
            }
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "Delete rejected");
        }
        outcome
    }
}
