use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user streak state, one row per user.
///
/// `daily_posts_count` and `daily_comments_count` describe the day named by
/// `last_streak_date`; once the calendar moves past that date they are stale
/// and get overwritten by the next contribution that advances the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: Uuid,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub last_streak_date: Option<NaiveDate>,
    pub daily_posts_count: u32,
    pub daily_comments_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreakRecord {
    /// A freshly-created record with all counters at zero.
    pub fn zeroed(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_streak: 0,
            highest_streak: 0,
            last_streak_date: None,
            daily_posts_count: 0,
            daily_comments_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.last_streak_date == Some(date)
    }
}

/// Read-only summary of today's progress, for passive UI display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayProgress {
    pub current_streak: u32,
    pub highest_streak: u32,
    pub posts_today: u32,
    pub comments_today: u32,
    pub streak_completed_today: bool,
    pub comments_needed: u32,
}
