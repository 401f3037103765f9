use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use ember_types::models::StreakRecord;

/// Persistence failure from a [`StreakStore`] implementation.
#[derive(Debug, Error)]
#[error("streak store: {0}")]
pub struct StoreError(pub anyhow::Error);

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

/// Repository seam between the engine and whatever holds the `streaks`
/// table. The engine never talks to a database directly.
pub trait StreakStore: Send + Sync {
    /// Fetch the record for `user_id`, if one exists.
    fn fetch(&self, user_id: Uuid) -> Result<Option<StreakRecord>, StoreError>;

    /// Insert a zeroed record stamped with `now`. Implementations must treat
    /// a duplicate-key race as "already exists" and return the stored row.
    fn insert_zeroed(&self, user_id: Uuid, now: DateTime<Utc>)
    -> Result<StreakRecord, StoreError>;

    /// Conditionally persist `record`: the write applies only while the
    /// stored row's `updated_at` still equals `expected_updated_at`.
    /// Returns `false` when the row moved underneath the caller.
    fn update_if_unchanged(
        &self,
        record: &StreakRecord,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Zero `current_streak` on every row whose `last_streak_date` is
    /// strictly before `cutoff`, leaving `highest_streak` alone. Rows that
    /// are already at zero are not re-touched, so repeat sweeps report zero.
    /// Returns the number of rows changed.
    fn reset_streaks_before(
        &self,
        cutoff: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Top `limit` records ordered by `current_streak` descending, ties
    /// broken by `highest_streak` descending, then `user_id` ascending.
    fn top_streaks(&self, limit: u32) -> Result<Vec<StreakRecord>, StoreError>;
}
