#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Every test builds its own service over a fresh in-memory repository, so tests can
//! run in parallel without sharing state.

use almanac_test::component::calendar::Occurrence;
use almanac_test::component::db::InMemoryRepository;
use almanac_test::component::model::{NewRecurrence, NewSeries, Series};
use almanac_test::component::{CalendarService, SeriesChanges};
use chrono::{DateTime, TimeZone, Utc};

pub type TestService = CalendarService<InMemoryRepository>;

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid UTC timestamp")
}

pub fn service() -> TestService {
    CalendarService::new(InMemoryRepository::new())
}

/// Weekly Monday standup, 10:00-11:00 UTC, 2024-01-01 until 2024-03-01.
pub fn weekly_standup() -> NewSeries {
    NewSeries {
        event_id: "634b339218b3b892b312e5ca".to_string(),
        creator_id: "424b339218b3b892b312e5cb".to_string(),
        title: "Standup".to_string(),
        description: Some("Team sync".to_string()),
        all_day: false,
        start_time_utc: utc(2024, 1, 1, 10, 0),
        end_time_utc: utc(2024, 1, 1, 11, 0),
        recurrence: Some(NewRecurrence {
            frequency: "weekly".to_string(),
            recurrence_ends_utc: utc(2024, 3, 1, 0, 0),
        }),
    }
}

pub async fn seed_weekly_standup(service: &TestService) -> Series {
    service
        .create_series(weekly_standup())
        .await
        .expect("Failed to create weekly standup")
}

pub fn starts(occurrences: &[Occurrence]) -> Vec<DateTime<Utc>> {
    occurrences.iter().map(|o| o.start_time_utc).collect()
}

pub fn retitle(title: &str) -> SeriesChanges {
    SeriesChanges {
        title: Some(title.to_string()),
        ..SeriesChanges::default()
    }
}
