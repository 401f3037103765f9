use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::StreakRecord;

// -- JWT Claims --

/// JWT claims shared between ember-api (REST middleware) and ember-gateway
/// (WebSocket authentication). Canonical definition lives here in ember-types
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Posts / comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub streak: Option<StreakOutcome>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub streak: Option<StreakOutcome>,
}

// -- Streaks --

/// Flattened contribution result, the flag shape the mobile client consumes.
#[derive(Debug, Clone, Serialize)]
pub struct StreakOutcome {
    pub streak_increased: bool,
    pub already_completed: bool,
    pub own_post: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<StreakRecord>,
}

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub record: StreakRecord,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub username: String,
    pub current_streak: u32,
    pub highest_streak: u32,
}

// -- Admin sweep --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepRequest {
    /// Sweep date; defaults to the server's current local date.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub as_of: NaiveDate,
    pub reset_count: u64,
}
