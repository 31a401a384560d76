//! Tests for editing single occurrences.

use almanac_test::component::{SeriesChanges, ServiceError, UpdateOutcome};

use super::helpers::*;

// ============================================================================
// Single Occurrence Edits
// ============================================================================

/// ## Summary
/// Editing one occurrence changes only that occurrence.
#[test_log::test(tokio::test)]
async fn edit_single_occurrence_title() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    let outcome = service
        .update_occurrence_or_series(
            series.id,
            retitle("Standup (moved)"),
            Some(utc(2024, 1, 8, 10, 0)),
            false,
        )
        .await
        .expect("Failed to edit occurrence");
    let UpdateOutcome::Occurrence(edited) = outcome else {
        panic!("Expected an occurrence outcome");
    };
    assert_eq!(edited.title, "Standup (moved)");
    assert_eq!(edited.original_start_utc, Some(utc(2024, 1, 8, 10, 0)));

    let moved = service
        .get_occurrence(series.id, Some(utc(2024, 1, 8, 10, 0)))
        .await
        .expect("Failed to get edited occurrence");
    let untouched = service
        .get_occurrence(series.id, Some(utc(2024, 1, 15, 10, 0)))
        .await
        .expect("Failed to get untouched occurrence");

    assert_eq!(moved.title, "Standup (moved)");
    assert_eq!(moved.description.as_deref(), Some("Team sync"));
    assert_eq!(untouched.title, "Standup");

    let stored = service
        .repository()
        .exception_count(series.id)
        .await;
    assert_eq!(stored, 1);
}

/// ## Summary
/// Editing the same occurrence twice keeps one exception with both edits applied.
#[test_log::test(tokio::test)]
async fn edit_same_occurrence_twice_upserts() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    service
        .update_occurrence_or_series(series.id, retitle("First"), Some(utc(2024, 1, 8, 10, 0)), false)
        .await
        .expect("Failed first edit");
    service
        .update_occurrence_or_series(
            series.id,
            SeriesChanges {
                title: Some("Second".to_string()),
                all_day: Some(true),
                ..SeriesChanges::default()
            },
            Some(utc(2024, 1, 8, 10, 0)),
            false,
        )
        .await
        .expect("Failed second edit");

    let occurrence = service
        .get_occurrence(series.id, Some(utc(2024, 1, 8, 10, 0)))
        .await
        .expect("Failed to get occurrence");
    assert_eq!(occurrence.title, "Second");
    assert!(occurrence.all_day);
    assert_eq!(service.repository().exception_count(series.id).await, 1);
}

/// ## Summary
/// A moved occurrence appears at its new time but keeps its original key.
#[test_log::test(tokio::test)]
async fn edit_moves_occurrence() {
    let service = service();
    let series = seed_weekly_standup(&service).await;

    service
        .update_occurrence_or_series(
            series.id,
            SeriesChanges {
                start_time_utc: Some(utc(2024, 1, 8, 14, 0)),
                ..SeriesChanges::default()
            },
            Some(utc(2024, 1, 8, 10, 0)),
            false,
        )
        .await
        .expect("Failed to move occurrence");

    let occurrences = service
        .query_range(utc(2024, 1, 8, 0, 0), utc(2024, 1, 8, 23, 59))
        .await
        .expect("Failed to query range");

    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].start_time_utc, utc(2024, 1, 8, 14, 0));
    assert_eq!(occurrences[0].end_time_utc, utc(2024, 1, 8, 15, 0));
    assert_eq!(occurrences[0].original_start_utc, Some(utc(2024, 1, 8, 10, 0)));
}

// ============================================================================
// Rejected Edits
// ============================================================================

/// ## Summary
/// Invalid single-occurrence edits fail without creating exceptions.
#[test_log::test(tokio::test)]
async fn edit_rejections() {
    let service = service();
    let series = seed_weekly_standup(&service).await;
    let target = Some(utc(2024, 1, 8, 10, 0));

    assert!(matches!(
        service
            .update_occurrence_or_series(series.id, retitle("x"), None, false)
            .await,
        Err(ServiceError::MissingOccurrenceTarget(_))
    ));
    assert!(matches!(
        service
            .update_occurrence_or_series(
                series.id,
                retitle("x"),
                Some(utc(2024, 1, 9, 10, 0)),
                false
            )
            .await,
        Err(ServiceError::OccurrenceNotFound { .. })
    ));
    assert!(matches!(
        service
            .update_occurrence_or_series(
                series.id,
                SeriesChanges {
                    end_time_utc: Some(utc(2024, 1, 8, 9, 0)),
                    ..SeriesChanges::default()
                },
                target,
                false
            )
            .await,
        Err(ServiceError::InvalidRange { .. })
    ));
    assert!(matches!(
        service
            .update_occurrence_or_series(
                series.id,
                SeriesChanges {
                    frequency: Some("daily".to_string()),
                    ..SeriesChanges::default()
                },
                target,
                false
            )
            .await,
        Err(ServiceError::InvalidChange(_))
    ));
    assert!(matches!(
        service
            .update_occurrence_or_series(series.id, SeriesChanges::default(), target, false)
            .await,
        Err(ServiceError::InvalidChange(_))
    ));

    assert_eq!(service.repository().exception_count(series.id).await, 0);
}

/// ## Summary
/// A deleted occurrence can no longer be edited or fetched.
#[test_log::test(tokio::test)]
async fn edit_deleted_occurrence_fails() {
    let service = service();
    let series = seed_weekly_standup(&service).await;
    let target = Some(utc(2024, 1, 15, 10, 0));

    service
        .delete_occurrence_or_series(series.id, target, false)
        .await
        .expect("Failed to delete occurrence");

    assert!(matches!(
        service
            .update_occurrence_or_series(series.id, retitle("x"), target, false)
            .await,
        Err(ServiceError::OccurrenceNotFound { .. })
    ));
    assert!(matches!(
        service.get_occurrence(series.id, target).await,
        Err(ServiceError::OccurrenceNotFound { .. })
    ));
}
