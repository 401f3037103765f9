use crate::Database;
use crate::models::{CommentRow, PostRow, StreakRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn get_username_by_id(&self, id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT username FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map_err(|_| anyhow!("User not found: {}", id))
        })
    }

    /// Batch-fetch usernames for a set of user IDs (single query, no N+1).
    pub fn get_usernames_for_ids(&self, user_ids: &[String]) -> Result<Vec<(String, String)>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, username FROM users WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = user_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, id: &str, author_id: &str, body: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, body) VALUES (?1, ?2, ?3)",
                (id, author_id, body),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.author_id, u.username, p.body, p.created_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE p.id = ?1",
            )?;

            let row = stmt.query_row([id], map_post_row).optional()?;
            Ok(row)
        })
    }

    /// Newest-first feed page. Pass the `created_at` of the oldest post from
    /// the previous page as `before` to fetch older posts.
    pub fn get_posts(&self, limit: u32, before: Option<&str>) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.author_id, u.username, p.body, p.created_at
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE (?1 IS NULL OR p.created_at < ?1)
                 ORDER BY p.created_at DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![before, limit], map_post_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, id: &str, post_id: &str, author_id: &str, body: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, body) VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, author_id, body),
            )?;
            Ok(())
        })
    }

    /// Oldest-first comment thread for a post, with author usernames
    /// resolved in the same query (eliminates N+1).
    pub fn get_comments_for_post(&self, post_id: &str, limit: u32) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.body, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.author_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![post_id, limit], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Streaks --

    pub fn streak_fetch(&self, user_id: &str) -> Result<Option<StreakRow>> {
        self.with_conn(|conn| query_streak(conn, user_id))
    }

    /// Insert a zeroed row. A concurrent insert for the same user is fine:
    /// the insert is ignored and the stored row is returned.
    pub fn streak_insert_zeroed(&self, user_id: &str, now: &str) -> Result<StreakRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO streaks
                     (user_id, current_streak, highest_streak, last_streak_date,
                      daily_posts_count, daily_comments_count, created_at, updated_at)
                 VALUES (?1, 0, 0, NULL, 0, 0, ?2, ?2)",
                (user_id, now),
            )?;

            query_streak(conn, user_id)?
                .ok_or_else(|| anyhow!("streak row vanished after insert: {}", user_id))
        })
    }

    /// Compare-and-swap write: applies only while the stored `updated_at`
    /// still matches. Returns false when another writer got there first.
    pub fn streak_update_if_unchanged(
        &self,
        row: &StreakRow,
        expected_updated_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE streaks
                 SET current_streak = ?2,
                     highest_streak = ?3,
                     last_streak_date = ?4,
                     daily_posts_count = ?5,
                     daily_comments_count = ?6,
                     updated_at = ?7
                 WHERE user_id = ?1 AND updated_at = ?8",
                rusqlite::params![
                    row.user_id,
                    row.current_streak,
                    row.highest_streak,
                    row.last_streak_date,
                    row.daily_posts_count,
                    row.daily_comments_count,
                    row.updated_at,
                    expected_updated_at,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    /// Zero every streak last advanced strictly before `cutoff`. Rows already
    /// at zero are skipped so a repeat sweep reports nothing to do.
    pub fn streak_reset_before(&self, cutoff: &str, now: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE streaks
                 SET current_streak = 0, updated_at = ?2
                 WHERE last_streak_date < ?1 AND current_streak <> 0",
                (cutoff, now),
            )?;
            Ok(changed as u64)
        })
    }

    pub fn streak_top(&self, limit: u32) -> Result<Vec<StreakRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, current_streak, highest_streak, last_streak_date,
                        daily_posts_count, daily_comments_count, created_at, updated_at
                 FROM streaks
                 ORDER BY current_streak DESC, highest_streak DESC, user_id ASC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], map_streak_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt.query_row([username], map_user_row).optional()?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE id = ?1")?;

    let row = stmt.query_row([id], map_user_row).optional()?;
    Ok(row)
}

fn query_streak(conn: &Connection, user_id: &str) -> Result<Option<StreakRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, current_streak, highest_streak, last_streak_date,
                daily_posts_count, daily_comments_count, created_at, updated_at
         FROM streaks WHERE user_id = ?1",
    )?;

    let row = stmt.query_row([user_id], map_streak_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "unknown".to_string()),
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_streak_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StreakRow> {
    Ok(StreakRow {
        user_id: row.get(0)?,
        current_streak: row.get(1)?,
        highest_streak: row.get(2)?,
        last_streak_date: row.get(3)?,
        daily_posts_count: row.get(4)?,
        daily_comments_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
