//! Tests for concurrent requests against the same series.

use std::sync::Arc;

use almanac_test::component::SeriesChanges;
use futures::future::join_all;

use super::helpers::*;

/// ## Summary
/// Concurrent edits of one occurrence all succeed and leave a single exception.
#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_edits_keep_one_exception() {
    let service = Arc::new(service());
    let series_id = seed_weekly_standup(&service).await.id;
    let target = Some(utc(2024, 1, 8, 10, 0));

    let handles = (0..8).map(|n| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .update_occurrence_or_series(
                    series_id,
                    SeriesChanges {
                        description: Some(format!("edit {n}")),
                        ..SeriesChanges::default()
                    },
                    target,
                    false,
                )
                .await
        })
    });

    for result in join_all(handles).await {
        result
            .expect("Task panicked")
            .expect("Concurrent edit should succeed");
    }

    assert_eq!(service.repository().exception_count(series_id).await, 1);
    let occurrence = service
        .get_occurrence(series_id, target)
        .await
        .expect("Failed to get occurrence");
    assert!(
        occurrence
            .description
            .as_deref()
            .is_some_and(|d| d.starts_with("edit "))
    );
}

/// ## Summary
/// Concurrent deletes of one occurrence are idempotent.
#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn concurrent_deletes_keep_one_exception() {
    let service = Arc::new(service());
    let series_id = seed_weekly_standup(&service).await.id;

    let handles = (0..8).map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .delete_occurrence_or_series(series_id, Some(utc(2024, 1, 15, 10, 0)), false)
                .await
        })
    });

    for result in join_all(handles).await {
        result
            .expect("Task panicked")
            .expect("Concurrent delete should succeed");
    }

    assert_eq!(service.repository().exception_count(series_id).await, 1);
}

/// ## Summary
/// Range queries running alongside edits always see a consistent occurrence count.
#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn queries_alongside_edits() {
    let service = Arc::new(service());
    let series_id = seed_weekly_standup(&service).await.id;

    let editor = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for day in [1, 8, 15, 22, 29] {
                service
                    .update_occurrence_or_series(
                        series_id,
                        retitle("Edited"),
                        Some(utc(2024, 1, day, 10, 0)),
                        false,
                    )
                    .await
                    .expect("Edit should succeed");
            }
        })
    };
    let readers = (0..4).map(|_| {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 23, 59))
                .await
                .map(|occurrences| occurrences.len())
        })
    });

    for count in join_all(readers).await {
        let count = count
            .expect("Task panicked")
            .expect("Query should succeed");
        assert_eq!(count, 5);
    }
    editor.await.expect("Editor panicked");

    let occurrences = service
        .query_range(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 23, 59))
        .await
        .expect("Failed to query range");
    assert!(occurrences.iter().all(|o| o.title == "Edited"));
}
