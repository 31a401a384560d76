//! Tests for creating, querying and rewriting whole series.

use almanac_test::component::config::Settings;
use almanac_test::component::db::{CalendarRepository, InMemoryRepository};
use almanac_test::component::model::NewRecurrence;
use almanac_test::component::{CalendarService, SeriesChanges, ServiceError, UpdateOutcome};
use almanac_test::rule::{Frequency, build_rule};
use chrono::{DateTime, Utc};
use rrule::RRuleSet;

use super::helpers::*;

// ============================================================================
// Creation and Range Queries
// ============================================================================

/// ## Summary
/// A new recurring series stores the canonical pattern of its rule.
#[test_log::test(tokio::test)]
async fn create_series_stores_pattern() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    let stored = service
        .repository()
        .get_series_by_id(series.id)
        .await
        .expect("Failed to load series")
        .expect("Series should exist");
    let recurrence = stored.recurrence().expect("Series should recur");

    assert_eq!(
        recurrence.pattern(),
        "DTSTART:20240101T100000Z\nRRULE:FREQ=WEEKLY;UNTIL=20240301T000000Z"
    );
}

/// ## Summary
/// Creation rejects reversed ranges and unknown frequencies.
#[test_log::test(tokio::test)]
async fn create_series_validation() {
    let service = service();

    let mut reversed = weekly_standup();
    reversed.end_time_utc = utc(2023, 12, 31, 0, 0);
    assert!(matches!(
        service.create_series(reversed).await,
        Err(ServiceError::InvalidRange { .. })
    ));

    let mut ends_early = weekly_standup();
    ends_early.recurrence = Some(NewRecurrence {
        frequency: "weekly".to_string(),
        recurrence_ends_utc: utc(2023, 12, 1, 0, 0),
    });
    assert!(matches!(
        service.create_series(ends_early).await,
        Err(ServiceError::InvalidRange { .. })
    ));

    let mut yearly = weekly_standup();
    yearly.recurrence = Some(NewRecurrence {
        frequency: "yearly".to_string(),
        recurrence_ends_utc: utc(2025, 1, 1, 0, 0),
    });
    assert!(matches!(
        service.create_series(yearly).await,
        Err(ServiceError::InvalidFrequency(_))
    ));
}

/// ## Summary
/// Weekly expansion through the service agrees with the rrule engine.
#[test_log::test(tokio::test)]
async fn weekly_query_matches_rrule_engine() {
    let service = service();
    let series = seed_weekly_standup(&service).await;
    let pattern = series.recurrence().expect("Series should recur").pattern();

    let rrule_set: RRuleSet = pattern.parse().expect("Pattern should parse");
    let expected: Vec<DateTime<Utc>> = rrule_set
        .all(100)
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect();

    let occurrences = service
        .query_range(utc(2023, 12, 1, 0, 0), utc(2024, 4, 1, 0, 0))
        .await
        .expect("Failed to query range");

    assert_eq!(expected.len(), 9);
    assert_eq!(starts(&occurrences), expected);
}

/// ## Summary
/// Monthly series clamp to the last day of shorter months.
#[test_log::test(tokio::test)]
async fn monthly_series_clamps_to_month_end() {
    let service = service();
    let mut new = weekly_standup();
    new.start_time_utc = utc(2024, 1, 31, 9, 0);
    new.end_time_utc = utc(2024, 1, 31, 10, 0);
    new.recurrence = Some(NewRecurrence {
        frequency: "monthly".to_string(),
        recurrence_ends_utc: utc(2024, 6, 1, 0, 0),
    });
    service.create_series(new).await.expect("Failed to create series");

    let occurrences = service
        .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 6, 30, 0, 0))
        .await
        .expect("Failed to query range");

    assert_eq!(
        starts(&occurrences),
        vec![
            utc(2024, 1, 31, 9, 0),
            utc(2024, 2, 29, 9, 0),
            utc(2024, 3, 31, 9, 0),
            utc(2024, 4, 30, 9, 0),
            utc(2024, 5, 31, 9, 0),
        ]
    );
}

/// ## Summary
/// The configured occurrence limit bounds a single expansion.
#[test_log::test(tokio::test)]
async fn occurrence_limit_from_settings() {
    let mut settings = Settings::default();
    settings.expansion.max_occurrences = 5;
    let service = CalendarService::from_settings(InMemoryRepository::new(), &settings);
    seed_weekly_standup(&service).await;

    assert!(matches!(
        service
            .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 3, 1, 0, 0))
            .await,
        Err(ServiceError::TooManyOccurrences(5))
    ));
    let allowed = service
        .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 0, 0))
        .await
        .expect("Failed to query range");
    assert_eq!(allowed.len(), 5);
}

// ============================================================================
// Whole-Series Edits
// ============================================================================

/// ## Summary
/// Changing the frequency rewrites the pattern and the query cadence.
#[test_log::test(tokio::test)]
async fn whole_series_weekly_to_daily() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    let outcome = service
        .update_occurrence_or_series(
            series.id,
            SeriesChanges {
                frequency: Some("daily".to_string()),
                ..SeriesChanges::default()
            },
            None,
            true,
        )
        .await
        .expect("Failed to update series");
    let UpdateOutcome::Series(updated) = outcome else {
        panic!("Expected a series outcome");
    };

    let expected = build_rule("daily", utc(2024, 1, 1, 10, 0), utc(2024, 3, 1, 0, 0))
        .expect("Valid rule");
    let recurrence = updated.recurrence().expect("Series should recur");
    assert_eq!(recurrence.frequency(), Frequency::Daily);
    assert_eq!(recurrence.pattern(), expected.serialize());

    let occurrences = service
        .query_range(utc(2024, 1, 8, 0, 0), utc(2024, 1, 10, 23, 59))
        .await
        .expect("Failed to query range");
    assert_eq!(
        starts(&occurrences),
        vec![
            utc(2024, 1, 8, 10, 0),
            utc(2024, 1, 9, 10, 0),
            utc(2024, 1, 10, 10, 0),
        ]
    );
}

/// ## Summary
/// A rejected whole-series update leaves the stored series unchanged.
#[test_log::test(tokio::test)]
async fn failed_whole_series_update_leaves_series_unchanged() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    let result = service
        .update_occurrence_or_series(
            series.id,
            SeriesChanges {
                title: Some("Renamed".to_string()),
                frequency: Some("fortnightly".to_string()),
                ..SeriesChanges::default()
            },
            None,
            true,
        )
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidFrequency(_))));

    let stored = service
        .repository()
        .get_series_by_id(series.id)
        .await
        .expect("Failed to load series")
        .expect("Series should exist");
    assert_eq!(stored, series);
}

/// ## Summary
/// Title edits on the whole series flow into every unmodified occurrence.
#[test_log::test(tokio::test)]
async fn whole_series_title_edit_keeps_exceptions() {
    let service = service();
    let series = seed_weekly_standup(&service).await;
    service
        .update_occurrence_or_series(
            series.id,
            retitle("Standup (moved)"),
            Some(utc(2024, 1, 8, 10, 0)),
            false,
        )
        .await
        .expect("Failed to edit occurrence");

    service
        .update_occurrence_or_series(series.id, retitle("Daily Standup"), None, true)
        .await
        .expect("Failed to update series");

    let occurrences = service
        .query_range(utc(2024, 1, 8, 0, 0), utc(2024, 1, 15, 23, 59))
        .await
        .expect("Failed to query range");
    let titles: Vec<&str> = occurrences.iter().map(|o| o.title.as_str()).collect();
    assert_eq!(titles, vec!["Standup (moved)", "Daily Standup"]);
    assert_eq!(service.repository().exception_count(series.id).await, 1);
}

/// ## Summary
/// Shortening a series drops exceptions that fall after the new end.
#[test_log::test(tokio::test)]
async fn shortening_series_prunes_orphaned_exceptions() {
    let service = service();
    let series = seed_weekly_standup(&service).await;
    for day in [8, 29] {
        service
            .delete_occurrence_or_series(series.id, Some(utc(2024, 1, day, 10, 0)), false)
            .await
            .expect("Failed to delete occurrence");
    }
    service
        .update_occurrence_or_series(
            series.id,
            retitle("Late"),
            Some(utc(2024, 2, 26, 10, 0)),
            false,
        )
        .await
        .expect("Failed to edit occurrence");

    service
        .update_occurrence_or_series(
            series.id,
            SeriesChanges {
                recurrence_ends_utc: Some(utc(2024, 1, 20, 0, 0)),
                ..SeriesChanges::default()
            },
            None,
            true,
        )
        .await
        .expect("Failed to shorten series");

    assert_eq!(service.repository().exception_count(series.id).await, 1);
    let occurrences = service
        .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 3, 1, 0, 0))
        .await
        .expect("Failed to query range");
    assert_eq!(
        starts(&occurrences),
        vec![utc(2024, 1, 1, 10, 0), utc(2024, 1, 15, 10, 0)]
    );
}
