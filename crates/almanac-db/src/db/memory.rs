//! In-memory repository.
//!
//! Enforces the same constraints a database schema would: unique series ids and a
//! unique (series id, original occurrence start) key per exception.

use std::collections::HashMap;

use almanac_rule::TimeWindow;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CalendarRepository, DbFuture};
use crate::error::DbError;
use crate::model::{EntryException, Series};

type ExceptionKey = (Uuid, DateTime<Utc>);

#[derive(Debug, Default)]
struct State {
    series: HashMap<Uuid, Series>,
    exceptions: HashMap<Uuid, EntryException>,
    exception_keys: HashMap<ExceptionKey, Uuid>,
}

impl State {
    fn remove_exception(&mut self, id: Uuid) -> Option<EntryException> {
        let removed = self.exceptions.remove(&id)?;
        self.exception_keys.remove(&removed.key());
        Some(removed)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: RwLock<State>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored exceptions for a series.
    pub async fn exception_count(&self, series_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .exceptions
            .values()
            .filter(|exception| exception.series_id == series_id)
            .count()
    }
}

fn sorted_by_start(mut series: Vec<Series>) -> Vec<Series> {
    series.sort_by_key(|s| (s.start_time_utc, s.id));
    series
}

impl CalendarRepository for InMemoryRepository {
    fn insert_series(&self, series: Series) -> DbFuture<'_, Series> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if state.series.contains_key(&series.id) {
                return Err(DbError::DuplicateSeries(series.id));
            }
            state.series.insert(series.id, series.clone());
            tracing::trace!(series_id = %series.id, "Inserted series");
            Ok(series)
        })
    }

    fn get_series_by_id(&self, id: Uuid) -> DbFuture<'_, Option<Series>> {
        Box::pin(async move { Ok(self.state.read().await.series.get(&id).cloned()) })
    }

    fn update_series(&self, series: Series) -> DbFuture<'_, Series> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let Some(stored) = state.series.get_mut(&series.id) else {
                return Err(DbError::NotFound(format!("series {}", series.id)));
            };
            *stored = series.clone();
            tracing::trace!(series_id = %series.id, "Updated series");
            Ok(series)
        })
    }

    fn delete_series(&self, id: Uuid) -> DbFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.write().await.series.remove(&id).is_some()) })
    }

    fn find_single_entries_in_range(&self, window: TimeWindow) -> DbFuture<'_, Vec<Series>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let found = state
                .series
                .values()
                .filter(|s| !s.is_recurring())
                .filter(|s| s.start_time_utc >= window.start() && s.end_time_utc <= window.end())
                .cloned()
                .collect();
            Ok(sorted_by_start(found))
        })
    }

    fn find_recurring_series_in_range(&self, window: TimeWindow) -> DbFuture<'_, Vec<Series>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let found = state
                .series
                .values()
                .filter(|s| s.is_recurring() && s.span().intersect(&window).is_some())
                .cloned()
                .collect();
            Ok(sorted_by_start(found))
        })
    }

    fn find_exceptions_for_series_in_range(
        &self,
        series_id: Uuid,
        window: TimeWindow,
    ) -> DbFuture<'_, Vec<EntryException>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut found: Vec<EntryException> = state
                .exceptions
                .values()
                .filter(|e| e.series_id == series_id && window.contains(e.original_start_utc))
                .cloned()
                .collect();
            found.sort_by_key(|e| e.original_start_utc);
            Ok(found)
        })
    }

    fn find_exception_for_occurrence(
        &self,
        series_id: Uuid,
        original_start: DateTime<Utc>,
    ) -> DbFuture<'_, Option<EntryException>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state
                .exception_keys
                .get(&(series_id, original_start))
                .and_then(|id| state.exceptions.get(id))
                .cloned())
        })
    }

    fn insert_exception(&self, exception: EntryException) -> DbFuture<'_, EntryException> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let key = exception.key();
            if state.exception_keys.contains_key(&key) {
                return Err(DbError::UniqueViolation {
                    series_id: key.0,
                    original_start: key.1,
                });
            }
            state.exception_keys.insert(key, exception.id);
            state.exceptions.insert(exception.id, exception.clone());
            tracing::trace!(exception_id = %exception.id, "Inserted exception");
            Ok(exception)
        })
    }

    fn update_exception(&self, exception: EntryException) -> DbFuture<'_, EntryException> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let Some(previous_key) = state.exceptions.get(&exception.id).map(EntryException::key)
            else {
                return Err(DbError::NotFound(format!("exception {}", exception.id)));
            };

            let key = exception.key();
            if key != previous_key {
                if state.exception_keys.contains_key(&key) {
                    return Err(DbError::UniqueViolation {
                        series_id: key.0,
                        original_start: key.1,
                    });
                }
                state.exception_keys.remove(&previous_key);
                state.exception_keys.insert(key, exception.id);
            }
            state.exceptions.insert(exception.id, exception.clone());
            tracing::trace!(exception_id = %exception.id, "Updated exception");
            Ok(exception)
        })
    }

    fn upsert_exception(&self, mut exception: EntryException) -> DbFuture<'_, EntryException> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let key = exception.key();
            if let Some(existing_id) = state.exception_keys.get(&key).copied() {
                exception.id = existing_id;
            } else {
                state.exception_keys.insert(key, exception.id);
            }
            state.exceptions.insert(exception.id, exception.clone());
            tracing::trace!(exception_id = %exception.id, "Upserted exception");
            Ok(exception)
        })
    }

    fn delete_exception(&self, id: Uuid) -> DbFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.write().await.remove_exception(id).is_some()) })
    }

    fn delete_exceptions_for_series(&self, series_id: Uuid) -> DbFuture<'_, usize> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let ids: Vec<Uuid> = state
                .exceptions
                .values()
                .filter(|e| e.series_id == series_id)
                .map(|e| e.id)
                .collect();
            for id in &ids {
                state.remove_exception(*id);
            }
            Ok(ids.len())
        })
    }
}
