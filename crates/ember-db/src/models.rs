/// Database row types — these map directly to SQLite rows.
/// Distinct from ember-types API models to keep the DB layer independent.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use ember_types::models::StreakRecord;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub created_at: String,
}

pub struct StreakRow {
    pub user_id: String,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub last_streak_date: Option<String>,
    pub daily_posts_count: u32,
    pub daily_comments_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl StreakRow {
    pub fn from_record(record: &StreakRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            current_streak: record.current_streak,
            highest_streak: record.highest_streak,
            last_streak_date: record.last_streak_date.map(format_date),
            daily_posts_count: record.daily_posts_count,
            daily_comments_count: record.daily_comments_count,
            created_at: format_timestamp(record.created_at),
            updated_at: format_timestamp(record.updated_at),
        }
    }

    pub fn into_record(self) -> Result<StreakRecord> {
        Ok(StreakRecord {
            user_id: self
                .user_id
                .parse()
                .with_context(|| format!("corrupt streak user_id '{}'", self.user_id))?,
            current_streak: self.current_streak,
            highest_streak: self.highest_streak,
            last_streak_date: self.last_streak_date.as_deref().map(parse_date).transpose()?,
            daily_posts_count: self.daily_posts_count,
            daily_comments_count: self.daily_comments_count,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Calendar dates are stored as local `YYYY-MM-DD` text.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("corrupt streak date '{}'", s))
}

/// Timestamps are stored as RFC 3339 with millisecond precision so the
/// text round-trips exactly and the conditional update can compare it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = s.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    // SQLite's datetime('now') writes "YYYY-MM-DD HH:MM:SS" without a
    // timezone. Parse as naive UTC and convert.
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .with_context(|| format!("corrupt timestamp '{}'", s))
}
