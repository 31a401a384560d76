//! Storage seam for series and exceptions.
//!
//! The engine never issues storage queries itself; it goes through
//! [`CalendarRepository`]. Each call is assumed atomic on its own, nothing more.

use std::future::Future;
use std::pin::Pin;

use almanac_rule::TimeWindow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::model::{EntryException, Series};

pub mod memory;

pub use memory::InMemoryRepository;

pub type DbFuture<'a, T> = Pin<Box<dyn Future<Output = DbResult<T>> + Send + 'a>>;

pub trait CalendarRepository: Send + Sync {
    /// Fails with `DbError::DuplicateSeries` if the id is taken.
    fn insert_series(&self, series: Series) -> DbFuture<'_, Series>;

    fn get_series_by_id(&self, id: Uuid) -> DbFuture<'_, Option<Series>>;

    /// Replaces the stored series with the same id. Fails with `DbError::NotFound`.
    fn update_series(&self, series: Series) -> DbFuture<'_, Series>;

    /// Returns whether a series was removed.
    fn delete_series(&self, id: Uuid) -> DbFuture<'_, bool>;

    /// Non-recurring entries that start and end inside `window`.
    fn find_single_entries_in_range(&self, window: TimeWindow) -> DbFuture<'_, Vec<Series>>;

    /// Recurring series whose `[start, recurrence end]` overlaps `window`.
    fn find_recurring_series_in_range(&self, window: TimeWindow) -> DbFuture<'_, Vec<Series>>;

    /// Exceptions of `series_id` whose original occurrence start lies in `window`.
    fn find_exceptions_for_series_in_range(
        &self,
        series_id: Uuid,
        window: TimeWindow,
    ) -> DbFuture<'_, Vec<EntryException>>;

    fn find_exception_for_occurrence(
        &self,
        series_id: Uuid,
        original_start: DateTime<Utc>,
    ) -> DbFuture<'_, Option<EntryException>>;

    /// Fails with `DbError::UniqueViolation` if an exception with the same key exists.
    fn insert_exception(&self, exception: EntryException) -> DbFuture<'_, EntryException>;

    /// Replaces the exception with the same id. Fails with `DbError::NotFound`.
    fn update_exception(&self, exception: EntryException) -> DbFuture<'_, EntryException>;

    /// Inserts, or replaces the exception holding the same key while keeping its id.
    fn upsert_exception(&self, exception: EntryException) -> DbFuture<'_, EntryException>;

    /// Returns whether an exception was removed.
    fn delete_exception(&self, id: Uuid) -> DbFuture<'_, bool>;

    /// Returns the number of exceptions removed.
    fn delete_exceptions_for_series(&self, series_id: Uuid) -> DbFuture<'_, usize>;
}
