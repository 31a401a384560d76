use almanac_db::model::{Overrides, Series};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::expand::OccurrenceSlot;

/// ## Summary
/// A concrete calendar occurrence as shown to users. Never persisted.
///
/// Recurring instances carry `original_start_utc`, the unmodified grid timestamp that
/// identifies them for later edits, and the id of the exception applied to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub series_id: Uuid,
    pub event_id: String,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub all_day: bool,
    pub start_time_utc: DateTime<Utc>,
    pub end_time_utc: DateTime<Utc>,
    pub recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_id: Option<Uuid>,
}

impl Occurrence {
    /// The series itself, as stored.
    #[must_use]
    pub fn from_series(series: &Series) -> Self {
        Self {
            series_id: series.id,
            event_id: series.event_id.clone(),
            creator_id: series.creator_id.clone(),
            title: series.title.clone(),
            description: series.description.clone(),
            all_day: series.all_day,
            start_time_utc: series.start_time_utc,
            end_time_utc: series.end_time_utc,
            recurring: series.is_recurring(),
            original_start_utc: None,
            exception_id: None,
        }
    }

    /// Generated instance of a recurring series with the series defaults.
    #[must_use]
    pub fn generated(series: &Series, slot: OccurrenceSlot) -> Self {
        Self {
            start_time_utc: slot.start,
            end_time_utc: slot.end,
            recurring: true,
            original_start_utc: Some(slot.start),
            ..Self::from_series(series)
        }
    }

    /// ## Summary
    /// Applies exception overrides on top of this occurrence.
    ///
    /// An overridden start without an overridden end keeps the occurrence's duration.
    #[must_use]
    pub fn with_overrides(mut self, exception_id: Uuid, overrides: &Overrides) -> Self {
        if let Some(title) = &overrides.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &overrides.description {
            self.description = Some(description.clone());
        }
        if let Some(all_day) = overrides.all_day {
            self.all_day = all_day;
        }

        let duration = self.end_time_utc - self.start_time_utc;
        if let Some(start) = overrides.start_time_utc {
            self.start_time_utc = start;
            self.end_time_utc = start.checked_add_signed(duration).unwrap_or(start);
        }
        if let Some(end) = overrides.end_time_utc {
            self.end_time_utc = end;
        }

        self.exception_id = Some(exception_id);
        self
    }
}
