//! Per-occurrence exceptions of a recurring series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ## Summary
/// Override or removal of one occurrence of a recurring series.
///
/// Keyed by (`series_id`, `original_start_utc`): the unmodified occurrence start the
/// exception replaces. At most one exception exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryException {
    pub id: Uuid,
    pub series_id: Uuid,
    pub original_start_utc: DateTime<Utc>,
    pub kind: ExceptionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExceptionKind {
    /// The occurrence is suppressed.
    Deleted,
    /// The occurrence is shown with these values over the series defaults.
    Modified(Overrides),
}

/// Override values; `None` fields inherit from the series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
}

impl Overrides {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time_utc.is_none()
            && self.end_time_utc.is_none()
            && self.all_day.is_none()
    }

    /// Applies `newer` on top of `self`; fields `newer` leaves unset are kept.
    pub fn merge(&mut self, newer: Self) {
        if newer.title.is_some() {
            self.title = newer.title;
        }
        if newer.description.is_some() {
            self.description = newer.description;
        }
        if newer.start_time_utc.is_some() {
            self.start_time_utc = newer.start_time_utc;
        }
        if newer.end_time_utc.is_some() {
            self.end_time_utc = newer.end_time_utc;
        }
        if newer.all_day.is_some() {
            self.all_day = newer.all_day;
        }
    }
}

impl EntryException {
    #[must_use]
    pub fn deleted(series_id: Uuid, original_start_utc: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            series_id,
            original_start_utc,
            kind: ExceptionKind::Deleted,
        }
    }

    #[must_use]
    pub fn modified(series_id: Uuid, original_start_utc: DateTime<Utc>, overrides: Overrides) -> Self {
        Self {
            id: Uuid::new_v4(),
            series_id,
            original_start_utc,
            kind: ExceptionKind::Modified(overrides),
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self.kind, ExceptionKind::Deleted)
    }

    #[must_use]
    pub const fn overrides(&self) -> Option<&Overrides> {
        match &self.kind {
            ExceptionKind::Modified(overrides) => Some(overrides),
            ExceptionKind::Deleted => None,
        }
    }

    /// Storage key of this exception.
    #[must_use]
    pub const fn key(&self) -> (Uuid, DateTime<Utc>) {
        (self.series_id, self.original_start_utc)
    }
}
