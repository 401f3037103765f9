use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use ember_engine::store::{StoreError, StreakStore};
use ember_types::models::StreakRecord;

use crate::Database;
use crate::models::{StreakRow, format_date, format_timestamp};

/// [`StreakStore`] over the shared SQLite handle. The connection mutex
/// already serializes writers, so the conditional update rarely loses here;
/// the compare is what keeps the engine portable to a multi-writer store.
#[derive(Clone)]
pub struct SqliteStreakStore {
    db: Arc<Database>,
}

impl SqliteStreakStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl StreakStore for SqliteStreakStore {
    fn fetch(&self, user_id: Uuid) -> Result<Option<StreakRecord>, StoreError> {
        let row = self.db.streak_fetch(&user_id.to_string())?;
        row.map(StreakRow::into_record).transpose().map_err(Into::into)
    }

    fn insert_zeroed(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord, StoreError> {
        let row = self
            .db
            .streak_insert_zeroed(&user_id.to_string(), &format_timestamp(now))?;
        Ok(row.into_record()?)
    }

    fn update_if_unchanged(
        &self,
        record: &StreakRecord,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = StreakRow::from_record(record);
        Ok(self
            .db
            .streak_update_if_unchanged(&row, &format_timestamp(expected_updated_at))?)
    }

    fn reset_streaks_before(
        &self,
        cutoff: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .db
            .streak_reset_before(&format_date(cutoff), &format_timestamp(now))?)
    }

    fn top_streaks(&self, limit: u32) -> Result<Vec<StreakRecord>, StoreError> {
        let rows = self.db.streak_top(limit)?;
        rows.into_iter()
            .map(|row| row.into_record().map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use tempfile::TempDir;

    fn open_db() -> (Arc<Database>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("ember.db")).unwrap();
        (Arc::new(db), dir)
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(user_id: Uuid, now: DateTime<Utc>) -> StreakRecord {
        StreakRecord {
            user_id,
            current_streak: 3,
            highest_streak: 5,
            last_streak_date: Some(date("2025-03-10")),
            daily_posts_count: 1,
            daily_comments_count: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn zeroed_insert_and_fetch_round_trip() {
        let (db, _dir) = open_db();
        let store = SqliteStreakStore::new(db);
        let user = Uuid::new_v4();
        let now = ts("2025-03-10T09:00:00.000Z");

        assert!(store.fetch(user).unwrap().is_none());

        let created = store.insert_zeroed(user, now).unwrap();
        assert_eq!(created.user_id, user);
        assert_eq!(created.current_streak, 0);
        assert_eq!(created.last_streak_date, None);
        assert_eq!(created.created_at, now);

        let fetched = store.fetch(user).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn duplicate_insert_returns_the_stored_row() {
        let (db, _dir) = open_db();
        let store = SqliteStreakStore::new(db);
        let user = Uuid::new_v4();

        let first = store.insert_zeroed(user, ts("2025-03-10T09:00:00.000Z")).unwrap();
        let mut updated = first.clone();
        updated.current_streak = 2;
        updated.updated_at = ts("2025-03-10T10:00:00.000Z");
        assert!(store.update_if_unchanged(&updated, first.updated_at).unwrap());

        // A second insert must not clobber the row.
        let again = store.insert_zeroed(user, ts("2025-03-11T09:00:00.000Z")).unwrap();
        assert_eq!(again.current_streak, 2);
        assert_eq!(again.created_at, first.created_at);
    }

    #[test]
    fn conditional_update_rejects_stale_writers() {
        let (db, _dir) = open_db();
        let store = SqliteStreakStore::new(db);
        let user = Uuid::new_v4();
        let t0 = ts("2025-03-10T09:00:00.000Z");

        store.insert_zeroed(user, t0).unwrap();

        let mut fresh = record(user, t0);
        fresh.updated_at = ts("2025-03-10T09:01:00.000Z");
        assert!(store.update_if_unchanged(&fresh, t0).unwrap());

        // Same expectation again: the row moved, so the write must miss.
        let mut stale = record(user, t0);
        stale.current_streak = 99;
        stale.updated_at = ts("2025-03-10T09:02:00.000Z");
        assert!(!store.update_if_unchanged(&stale, t0).unwrap());

        let stored = store.fetch(user).unwrap().unwrap();
        assert_eq!(stored.current_streak, 3);

        // Dates and counters round-trip through their text encodings.
        assert_eq!(stored.last_streak_date, Some(date("2025-03-10")));
        assert_eq!(stored.daily_posts_count, 1);
        assert_eq!(stored.daily_comments_count, 2);
    }

    #[test]
    fn sweep_zeroes_only_rows_before_the_cutoff() {
        let (db, _dir) = open_db();
        let store = SqliteStreakStore::new(db.clone());
        let now = ts("2025-03-12T06:00:00.000Z");

        let lapsed = Uuid::new_v4();
        let active = Uuid::new_v4();
        let never = Uuid::new_v4();

        for (user, last_date, streak) in [
            (lapsed, Some("2025-03-09"), 7),
            (active, Some("2025-03-11"), 2),
            (never, None, 0),
        ] {
            let created = store.insert_zeroed(user, now).unwrap();
            let mut rec = created.clone();
            rec.current_streak = streak;
            rec.highest_streak = streak.max(4);
            rec.last_streak_date = last_date.map(date);
            rec.updated_at = ts("2025-03-12T06:30:00.000Z");
            assert!(store.update_if_unchanged(&rec, created.updated_at).unwrap());
        }

        // Sweep as of 2025-03-12: anyone without activity on the 11th lapses.
        let cutoff = date("2025-03-11");
        let swept = store
            .reset_streaks_before(cutoff, ts("2025-03-12T07:00:00.000Z"))
            .unwrap();
        assert_eq!(swept, 1);

        let lapsed_row = store.fetch(lapsed).unwrap().unwrap();
        assert_eq!(lapsed_row.current_streak, 0);
        assert_eq!(lapsed_row.highest_streak, 7);
        assert_eq!(store.fetch(active).unwrap().unwrap().current_streak, 2);
        assert_eq!(store.fetch(never).unwrap().unwrap().current_streak, 0);

        // Second pass finds nothing left to reset.
        let swept = store
            .reset_streaks_before(cutoff, ts("2025-03-12T07:05:00.000Z"))
            .unwrap();
        assert_eq!(swept, 0);
    }

    #[test]
    fn top_streaks_order_and_limit() {
        let (db, _dir) = open_db();
        let store = SqliteStreakStore::new(db);
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 6, 0, 0).unwrap();

        let mut users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        users.sort();

        // users[0]: streak 5. users[1] and users[2] tie at 3 with different
        // highs. users[3] ties users[2] exactly, so user_id decides.
        let shapes = [(5u32, 5u32), (3, 8), (3, 3), (3, 3)];
        for (user, (current, highest)) in users.iter().zip(shapes) {
            let created = store.insert_zeroed(*user, now).unwrap();
            let mut rec = created.clone();
            rec.current_streak = current;
            rec.highest_streak = highest;
            rec.last_streak_date = Some(date("2025-03-11"));
            rec.updated_at = now + chrono::Duration::seconds(1);
            assert!(store.update_if_unchanged(&rec, created.updated_at).unwrap());
        }

        let top = store.top_streaks(10).unwrap();
        let order: Vec<Uuid> = top.iter().map(|r| r.user_id).collect();
        assert_eq!(order, vec![users[0], users[1], users[2], users[3]]);

        assert_eq!(store.top_streaks(2).unwrap().len(), 2);
    }
}
