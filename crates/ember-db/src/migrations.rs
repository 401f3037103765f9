use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        -- One row per user; all timestamps written by the engine clock.
        CREATE TABLE IF NOT EXISTS streaks (
            user_id              TEXT PRIMARY KEY,
            current_streak       INTEGER NOT NULL DEFAULT 0,
            highest_streak       INTEGER NOT NULL DEFAULT 0,
            last_streak_date     TEXT,
            daily_posts_count    INTEGER NOT NULL DEFAULT 0,
            daily_comments_count INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_streaks_current
            ON streaks(current_streak DESC);

        CREATE INDEX IF NOT EXISTS idx_streaks_last_date
            ON streaks(last_streak_date);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
