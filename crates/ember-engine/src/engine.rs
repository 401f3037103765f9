use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ember_types::models::{StreakRecord, TodayProgress};

use crate::clock::{Clock, SystemClock};
use crate::error::StreakError;
use crate::store::StreakStore;

/// Comments on other users' posts needed to complete a day.
/// Posting is the stronger signal and needs only one.
pub const COMMENT_DAILY_TARGET: u32 = 5;

/// How many times a read-modify-write is retried when the conditional
/// update loses to a concurrent writer for the same user.
const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Result of recording a contribution.
#[derive(Debug, Clone)]
pub enum ContributionOutcome {
    /// The streak advanced by one for a fresh day.
    Advanced {
        record: StreakRecord,
        previous_streak: u32,
    },
    /// The day was already completed; only the daily counter moved.
    AlreadyCompleted { record: StreakRecord },
    /// Comment counted toward the daily target without crossing it.
    Accumulating {
        record: StreakRecord,
        comments_progress: u32,
    },
    /// Comment on the user's own post. No state was touched.
    OwnPost,
}

impl ContributionOutcome {
    pub fn streak_increased(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }

    pub fn record(&self) -> Option<&StreakRecord> {
        match self {
            Self::Advanced { record, .. }
            | Self::AlreadyCompleted { record }
            | Self::Accumulating { record, .. } => Some(record),
            Self::OwnPost => None,
        }
    }
}

/// What a contribution decided to do with the loaded record.
enum Decision {
    Advanced { previous_streak: u32 },
    AlreadyCompleted,
    Accumulating { comments_progress: u32 },
}

impl Decision {
    fn into_outcome(self, record: StreakRecord) -> ContributionOutcome {
        match self {
            Self::Advanced { previous_streak } => ContributionOutcome::Advanced {
                record,
                previous_streak,
            },
            Self::AlreadyCompleted => ContributionOutcome::AlreadyCompleted { record },
            Self::Accumulating { comments_progress } => ContributionOutcome::Accumulating {
                record,
                comments_progress,
            },
        }
    }
}

/// The streak state machine. Owns no storage and no wall clock — both are
/// injected, so the whole thing runs against an in-memory store in tests.
#[derive(Clone)]
pub struct StreakEngine {
    store: Arc<dyn StreakStore>,
    clock: Arc<dyn Clock>,
}

impl StreakEngine {
    pub fn new(store: Arc<dyn StreakStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<dyn StreakStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// The engine's idea of the current calendar date.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fetch the user's streak record, lazily inserting a zeroed one.
    pub fn get_or_create(&self, user_id: Uuid) -> Result<StreakRecord, StreakError> {
        require_user(user_id)?;
        self.load_or_insert(user_id)
    }

    /// Record a qualifying post. One post on a fresh day advances the
    /// streak; further posts that day only bump the daily counter.
    pub fn record_post(&self, user_id: Uuid) -> Result<ContributionOutcome, StreakError> {
        require_user(user_id)?;

        self.apply(user_id, |record, today| {
            if record.completed_on(today) {
                record.daily_posts_count += 1;
                Decision::AlreadyCompleted
            } else {
                let previous_streak = advance(record, today);
                record.daily_posts_count = 1;
                record.daily_comments_count = 0;
                Decision::Advanced { previous_streak }
            }
        })
    }

    /// Record a qualifying comment. Comments on the user's own posts never
    /// count. On a fresh day the counter accumulates toward
    /// [`COMMENT_DAILY_TARGET`]; the comment that reaches it advances the
    /// streak exactly like a post.
    pub fn record_comment(
        &self,
        user_id: Uuid,
        post_owner_id: Uuid,
    ) -> Result<ContributionOutcome, StreakError> {
        require_user(user_id)?;

        if user_id == post_owner_id {
            return Ok(ContributionOutcome::OwnPost);
        }

        self.apply(user_id, |record, today| {
            if record.completed_on(today) {
                record.daily_comments_count += 1;
                return Decision::AlreadyCompleted;
            }

            // Below the target last_streak_date is not written, so the
            // stored counter is the running count even across a date change.
            let new_count = record.daily_comments_count + 1;
            if new_count >= COMMENT_DAILY_TARGET {
                let previous_streak = advance(record, today);
                record.daily_comments_count = new_count;
                record.daily_posts_count = 0;
                Decision::Advanced { previous_streak }
            } else {
                record.daily_comments_count = new_count;
                Decision::Accumulating {
                    comments_progress: new_count,
                }
            }
        })
    }

    /// Read-only summary for UI display. Never fails: storage errors and
    /// absent rows both degrade to the zeroed summary.
    pub fn today_progress(&self, user_id: Uuid) -> TodayProgress {
        let today = self.clock.today();

        let record = match self.store.fetch(user_id) {
            Ok(Some(record)) => record,
            Ok(None) => return empty_progress(),
            Err(e) => {
                warn!("today_progress degraded to zeroes for {}: {}", user_id, e);
                return empty_progress();
            }
        };

        let completed = record.completed_on(today);
        let posts_today = if completed { record.daily_posts_count } else { 0 };
        let comments_today = if completed {
            record.daily_comments_count
        } else {
            0
        };

        TodayProgress {
            current_streak: record.current_streak,
            highest_streak: record.highest_streak,
            posts_today,
            comments_today,
            streak_completed_today: completed,
            comments_needed: COMMENT_DAILY_TARGET.saturating_sub(comments_today),
        }
    }

    /// Top `limit` streaks for the leaderboard. Soft-fails to an empty list
    /// so a storage hiccup never breaks the screen behind it.
    pub fn leaderboard(&self, limit: u32) -> Vec<StreakRecord> {
        match self.store.top_streaks(limit) {
            Ok(records) => records,
            Err(e) => {
                warn!("leaderboard degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Sweep for the external daily scheduler: zero every streak whose owner
    /// did not contribute on the day before `as_of`. `highest_streak` is
    /// untouched. Repeat runs with the same date change nothing.
    pub fn reset_lapsed(&self, as_of: NaiveDate) -> Result<u64, StreakError> {
        let cutoff = as_of.pred_opt().unwrap_or(as_of);
        let count = self.store.reset_streaks_before(cutoff, self.clock.now())?;
        if count > 0 {
            info!("sweep as of {} reset {} lapsed streaks", as_of, count);
        }
        Ok(count)
    }

    fn load_or_insert(&self, user_id: Uuid) -> Result<StreakRecord, StreakError> {
        if let Some(record) = self.store.fetch(user_id)? {
            return Ok(record);
        }
        Ok(self.store.insert_zeroed(user_id, self.clock.now())?)
    }

    /// Load, decide, conditionally write. Retries the whole cycle when a
    /// concurrent writer moved the row between our read and our write.
    fn apply<F>(&self, user_id: Uuid, decide: F) -> Result<ContributionOutcome, StreakError>
    where
        F: Fn(&mut StreakRecord, NaiveDate) -> Decision,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut record = self.load_or_insert(user_id)?;
            let expected_updated_at = record.updated_at;

            let decision = decide(&mut record, self.clock.today());
            record.updated_at = self.clock.now();

            if self.store.update_if_unchanged(&record, expected_updated_at)? {
                return Ok(decision.into_outcome(record));
            }

            debug!(
                "streak update for {} lost the race (attempt {}/{})",
                user_id, attempt, MAX_UPDATE_ATTEMPTS
            );
        }

        Err(StreakError::Contention {
            user_id,
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }
}

/// Bump the streak for a fresh day and keep the high-water mark in step.
fn advance(record: &mut StreakRecord, today: NaiveDate) -> u32 {
    let previous_streak = record.current_streak;
    record.current_streak += 1;
    record.highest_streak = record.highest_streak.max(record.current_streak);
    record.last_streak_date = Some(today);
    previous_streak
}

fn require_user(user_id: Uuid) -> Result<(), StreakError> {
    if user_id.is_nil() {
        return Err(StreakError::InvalidArgument("user_id must not be nil"));
    }
    Ok(())
}

fn empty_progress() -> TodayProgress {
    TodayProgress {
        current_streak: 0,
        highest_streak: 0,
        posts_today: 0,
        comments_today: 0,
        streak_completed_today: false,
        comments_needed: COMMENT_DAILY_TARGET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

    use anyhow::anyhow;
    use chrono::{DateTime, Days, Utc};

    use crate::store::StoreError;

    /// In-memory store with switches for fault injection.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<Uuid, StreakRecord>>,
        forced_conflicts: AtomicU32,
        fail_all: AtomicBool,
    }

    impl MemoryStore {
        fn get(&self, user_id: Uuid) -> Option<StreakRecord> {
            self.rows.lock().unwrap().get(&user_id).cloned()
        }

        fn check_failure(&self) -> Result<(), StoreError> {
            if self.fail_all.load(Ordering::SeqCst) {
                return Err(StoreError(anyhow!("store offline")));
            }
            Ok(())
        }
    }

    impl StreakStore for MemoryStore {
        fn fetch(&self, user_id: Uuid) -> Result<Option<StreakRecord>, StoreError> {
            self.check_failure()?;
            Ok(self.get(user_id))
        }

        fn insert_zeroed(
            &self,
            user_id: Uuid,
            now: DateTime<Utc>,
        ) -> Result<StreakRecord, StoreError> {
            self.check_failure()?;
            let mut rows = self.rows.lock().unwrap();
            // Duplicate insert hands back the existing row, like the
            // re-fetch in the SQLite implementation.
            Ok(rows
                .entry(user_id)
                .or_insert_with(|| StreakRecord::zeroed(user_id, now))
                .clone())
        }

        fn update_if_unchanged(
            &self,
            record: &StreakRecord,
            expected_updated_at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            self.check_failure()?;
            if self
                .forced_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Ok(false);
            }
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&record.user_id) {
                Some(stored) if stored.updated_at == expected_updated_at => {
                    *stored = record.clone();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        fn reset_streaks_before(
            &self,
            cutoff: NaiveDate,
            now: DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            self.check_failure()?;
            let mut count = 0;
            for record in self.rows.lock().unwrap().values_mut() {
                if let Some(date) = record.last_streak_date {
                    if date < cutoff && record.current_streak != 0 {
                        record.current_streak = 0;
                        record.updated_at = now;
                        count += 1;
                    }
                }
            }
            Ok(count)
        }

        fn top_streaks(&self, limit: u32) -> Result<Vec<StreakRecord>, StoreError> {
            self.check_failure()?;
            let mut all: Vec<StreakRecord> =
                self.rows.lock().unwrap().values().cloned().collect();
            all.sort_by(|a, b| {
                b.current_streak
                    .cmp(&a.current_streak)
                    .then(b.highest_streak.cmp(&a.highest_streak))
                    .then(a.user_id.cmp(&b.user_id))
            });
            all.truncate(limit as usize);
            Ok(all)
        }
    }

    /// Clock whose date is advanced by hand; every `now()` is distinct so
    /// the conditional update has something real to compare.
    struct ManualClock {
        today: Mutex<NaiveDate>,
        ticks: AtomicI64,
    }

    impl ManualClock {
        fn starting(date: NaiveDate) -> Self {
            Self {
                today: Mutex::new(date),
                ticks: AtomicI64::new(0),
            }
        }

        fn advance_days(&self, days: u64) {
            let mut today = self.today.lock().unwrap();
            *today = today.checked_add_days(Days::new(days)).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn today(&self) -> NaiveDate {
            *self.today.lock().unwrap()
        }

        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.today().and_hms_opt(12, 0, 0).unwrap().and_utc()
                + chrono::Duration::milliseconds(tick)
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup(start: &str) -> (StreakEngine, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::starting(day(start)));
        let engine = StreakEngine::new(store.clone(), clock.clone());
        (engine, store, clock)
    }

    #[test]
    fn first_post_starts_a_streak() {
        let (engine, _, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();

        let outcome = engine.record_post(user).unwrap();

        let ContributionOutcome::Advanced {
            record,
            previous_streak,
        } = outcome
        else {
            panic!("expected the first post to advance the streak");
        };
        assert_eq!(previous_streak, 0);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.highest_streak, 1);
        assert_eq!(record.daily_posts_count, 1);
        assert_eq!(record.daily_comments_count, 0);
        assert_eq!(record.last_streak_date, Some(clock.today()));
    }

    #[test]
    fn same_day_posts_advance_only_once() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();

        assert!(engine.record_post(user).unwrap().streak_increased());
        for _ in 0..3 {
            let outcome = engine.record_post(user).unwrap();
            assert!(matches!(outcome, ContributionOutcome::AlreadyCompleted { .. }));
        }

        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.daily_posts_count, 4);
    }

    #[test]
    fn completed_day_post_keeps_existing_streak() {
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();

        // Three days of posting, then a fourth advance today.
        for _ in 0..3 {
            engine.record_post(user).unwrap();
            clock.advance_days(1);
        }
        engine.record_post(user).unwrap();
        let repeat = engine.record_post(user).unwrap();

        assert!(!repeat.streak_increased());
        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 4);
        assert_eq!(record.daily_posts_count, 2);
    }

    #[test]
    fn fifth_comment_completes_the_day() {
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        for expected in 1..=4u32 {
            let outcome = engine.record_comment(user, owner).unwrap();
            let ContributionOutcome::Accumulating {
                comments_progress, ..
            } = outcome
            else {
                panic!("expected comment {} to accumulate", expected);
            };
            assert_eq!(comments_progress, expected);
            assert!(!engine.today_progress(user).streak_completed_today);
            assert_eq!(store.get(user).unwrap().current_streak, 0);
        }

        let outcome = engine.record_comment(user, owner).unwrap();
        assert!(outcome.streak_increased());

        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.daily_comments_count, 5);
        assert_eq!(record.daily_posts_count, 0);
        assert_eq!(record.last_streak_date, Some(clock.today()));
    }

    #[test]
    fn four_comments_then_streak_advances_on_fifth_with_prior_streak() {
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        // Build a three-day streak via posts, then a fresh day of comments.
        for _ in 0..3 {
            engine.record_post(user).unwrap();
            clock.advance_days(1);
        }
        for _ in 0..4 {
            engine.record_comment(user, owner).unwrap();
        }
        assert_eq!(store.get(user).unwrap().current_streak, 3);

        let outcome = engine.record_comment(user, owner).unwrap();
        let ContributionOutcome::Advanced {
            record,
            previous_streak,
        } = outcome
        else {
            panic!("expected the fifth comment to advance the streak");
        };
        assert_eq!(previous_streak, 3);
        assert_eq!(record.current_streak, 4);
        assert_eq!(record.daily_comments_count, 5);
        assert_eq!(record.daily_posts_count, 0);
    }

    #[test]
    fn own_post_comments_never_mutate_state() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        // Exercise against empty state and against built-up state.
        let outcome = engine.record_comment(user, user).unwrap();
        assert!(matches!(outcome, ContributionOutcome::OwnPost));
        assert!(store.get(user).is_none());

        engine.record_post(user).unwrap();
        engine.record_comment(user, owner).unwrap();
        let before = store.get(user).unwrap();

        let outcome = engine.record_comment(user, user).unwrap();
        assert!(matches!(outcome, ContributionOutcome::OwnPost));
        assert_eq!(store.get(user).unwrap(), before);
    }

    #[test]
    fn post_wins_over_partial_comment_progress() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        for _ in 0..3 {
            engine.record_comment(user, owner).unwrap();
        }
        let outcome = engine.record_post(user).unwrap();

        assert!(outcome.streak_increased());
        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.daily_posts_count, 1);
        // The comment run restarts; partial progress does not combine.
        assert_eq!(record.daily_comments_count, 0);
    }

    #[test]
    fn day_rollover_resets_daily_counters() {
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        engine.record_post(user).unwrap();
        engine.record_post(user).unwrap();
        for _ in 0..2 {
            engine.record_comment(user, owner).unwrap();
        }
        let yesterday = store.get(user).unwrap();
        assert_eq!(yesterday.daily_posts_count, 2);
        assert_eq!(yesterday.daily_comments_count, 2);

        clock.advance_days(1);
        let outcome = engine.record_post(user).unwrap();

        assert!(outcome.streak_increased());
        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 2);
        assert_eq!(record.daily_posts_count, 1);
        assert_eq!(record.daily_comments_count, 0);
        assert_eq!(record.last_streak_date, Some(clock.today()));
    }

    #[test]
    fn sub_threshold_comments_carry_until_target() {
        // last_streak_date never moves below the target, so a partial run
        // keeps counting across a date change until the fifth comment lands.
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        for _ in 0..4 {
            engine.record_comment(user, owner).unwrap();
        }
        clock.advance_days(2);

        let outcome = engine.record_comment(user, owner).unwrap();
        assert!(outcome.streak_increased());
        let record = store.get(user).unwrap();
        assert_eq!(record.daily_comments_count, 5);
        assert_eq!(record.last_streak_date, Some(clock.today()));
    }

    #[test]
    fn highest_streak_never_decreases() {
        let (engine, store, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();

        for _ in 0..3 {
            engine.record_post(user).unwrap();
            let record = store.get(user).unwrap();
            assert!(record.highest_streak >= record.current_streak);
            clock.advance_days(1);
        }
        assert_eq!(store.get(user).unwrap().highest_streak, 3);

        // Lapse for two days, sweep, then start over.
        clock.advance_days(2);
        engine.reset_lapsed(clock.today()).unwrap();
        let swept = store.get(user).unwrap();
        assert_eq!(swept.current_streak, 0);
        assert_eq!(swept.highest_streak, 3);

        engine.record_post(user).unwrap();
        let record = store.get(user).unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.highest_streak, 3);
    }

    #[test]
    fn sweep_resets_only_lapsed_rows_and_is_idempotent() {
        let (engine, store, clock) = setup("2025-03-10");
        let lapsed = Uuid::new_v4();
        let active = Uuid::new_v4();
        let untouched = Uuid::new_v4();

        // `lapsed` builds a 7-day streak ending three days back.
        for _ in 0..7 {
            engine.record_post(lapsed).unwrap();
            clock.advance_days(1);
        }
        clock.advance_days(2);
        let sweep_day = clock.today();

        // `active` contributed on the day before the sweep.
        {
            let mut record = engine.get_or_create(active).unwrap();
            record.current_streak = 2;
            record.highest_streak = 2;
            record.last_streak_date = sweep_day.pred_opt();
            let expected = record.updated_at;
            store.update_if_unchanged(&record, expected).unwrap();
        }
        engine.get_or_create(untouched).unwrap();

        let first = engine.reset_lapsed(sweep_day).unwrap();
        assert_eq!(first, 1);
        assert_eq!(store.get(lapsed).unwrap().current_streak, 0);
        assert_eq!(store.get(lapsed).unwrap().highest_streak, 7);
        assert_eq!(store.get(active).unwrap().current_streak, 2);
        assert_eq!(store.get(untouched).unwrap().current_streak, 0);

        let second = engine.reset_lapsed(sweep_day).unwrap();
        assert_eq!(second, 0);
        assert_eq!(store.get(lapsed).unwrap().current_streak, 0);
        assert_eq!(store.get(active).unwrap().current_streak, 2);
    }

    #[test]
    fn get_or_create_is_lazy_and_rejects_nil() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();

        assert!(store.get(user).is_none());
        let created = engine.get_or_create(user).unwrap();
        assert_eq!(created.current_streak, 0);
        assert_eq!(created.last_streak_date, None);

        let again = engine.get_or_create(user).unwrap();
        assert_eq!(again, created);

        let err = engine.get_or_create(Uuid::nil()).unwrap_err();
        assert!(matches!(err, StreakError::InvalidArgument(_)));
        let err = engine.record_post(Uuid::nil()).unwrap_err();
        assert!(matches!(err, StreakError::InvalidArgument(_)));
    }

    #[test]
    fn conditional_update_retries_then_gives_up() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();

        // Two lost races still leave one good attempt.
        store.forced_conflicts.store(2, Ordering::SeqCst);
        assert!(engine.record_post(user).unwrap().streak_increased());

        // Losing every attempt surfaces contention.
        store.forced_conflicts.store(3, Ordering::SeqCst);
        let err = engine.record_post(user).unwrap_err();
        assert!(matches!(err, StreakError::Contention { .. }));
    }

    #[test]
    fn today_progress_reports_the_current_day_only() {
        let (engine, _, clock) = setup("2025-03-10");
        let user = Uuid::new_v4();
        let owner = Uuid::new_v4();

        engine.record_post(user).unwrap();
        engine.record_comment(user, owner).unwrap();

        let progress = engine.today_progress(user);
        assert!(progress.streak_completed_today);
        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.posts_today, 1);
        assert_eq!(progress.comments_today, 1);
        assert_eq!(progress.comments_needed, 4);

        clock.advance_days(1);
        let progress = engine.today_progress(user);
        assert!(!progress.streak_completed_today);
        assert_eq!(progress.current_streak, 1);
        assert_eq!(progress.posts_today, 0);
        assert_eq!(progress.comments_today, 0);
        assert_eq!(progress.comments_needed, 5);
    }

    #[test]
    fn today_progress_never_fails() {
        let (engine, store, _) = setup("2025-03-10");
        let user = Uuid::new_v4();

        // Absent row.
        assert_eq!(engine.today_progress(user), empty_progress());

        // Storage down.
        engine.record_post(user).unwrap();
        store.fail_all.store(true, Ordering::SeqCst);
        assert_eq!(engine.today_progress(user), empty_progress());
    }

    #[test]
    fn leaderboard_orders_deterministically_and_soft_fails() {
        let (engine, store, clock) = setup("2025-03-10");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        // a: streak 2. b and c: streak 1, but b has the higher high-water mark.
        engine.record_post(a).unwrap();
        clock.advance_days(1);
        engine.record_post(a).unwrap();
        engine.record_post(b).unwrap();
        engine.record_post(c).unwrap();
        {
            let mut record = store.get(b).unwrap();
            record.highest_streak = 9;
            let expected = record.updated_at;
            store.update_if_unchanged(&record, expected).unwrap();
        }

        let board = engine.leaderboard(10);
        assert_eq!(board[0].user_id, a);
        assert_eq!(board[1].user_id, b);
        assert_eq!(board[2].user_id, c);

        let top_two = engine.leaderboard(2);
        assert_eq!(top_two.len(), 2);

        store.fail_all.store(true, Ordering::SeqCst);
        assert!(engine.leaderboard(10).is_empty());
    }
}
