use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use ember_types::api::{Claims, CreatePostRequest, PostResponse};
use ember_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::streaks::{broadcast_streak_update, outcome_to_api};

const MAX_BODY_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination — pass the `created_at` timestamp of the
    /// oldest post from the previous page to fetch older posts.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// Create a post, then feed the contribution to the streak engine. The post
/// is durable before the engine runs; a streak failure is logged and the
/// response simply carries no streak outcome rather than failing the post.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.body.trim().is_empty() || req.body.len() > MAX_BODY_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let post_id = Uuid::new_v4();

    // Run blocking DB work off the async runtime
    let app = state.clone();
    let pid = post_id.to_string();
    let aid = claims.sub.to_string();
    let body = req.body.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        app.db.insert_post(&pid, &aid, &body)?;
        Ok::<_, anyhow::Error>(app.engine.record_post(claims.sub))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let streak = match outcome {
        Ok(outcome) => {
            broadcast_streak_update(&state, &outcome);
            Some(outcome_to_api(&outcome))
        }
        Err(e) => {
            warn!("post {} stored but streak update failed: {}", post_id, e);
            None
        }
    };

    let now = chrono::Utc::now();

    // Broadcast to all WebSocket clients
    state.dispatcher.broadcast(GatewayEvent::PostCreate {
        id: post_id,
        author_id: claims.sub,
        author_username: claims.username.clone(),
        body: req.body.clone(),
        timestamp: now,
    });

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            id: post_id,
            author_id: claims.sub,
            author_username: claims.username,
            body: req.body,
            created_at: now,
            streak,
        }),
    ))
}

pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let limit = query.limit.min(200);
    let before = query.before;

    let rows = tokio::task::spawn_blocking(move || db.get_posts(limit, before.as_deref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let posts: Vec<PostResponse> = rows
        .into_iter()
        .map(|row| PostResponse {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt post id '{}': {}", row.id, e);
                Uuid::default()
            }),
            author_id: row.author_id.parse().unwrap_or_else(|e| {
                warn!("Corrupt author_id '{}' on post '{}': {}", row.author_id, row.id, e);
                Uuid::default()
            }),
            author_username: row.author_username,
            body: row.body,
            created_at: ember_db::models::parse_timestamp(&row.created_at).unwrap_or_else(|e| {
                warn!("Corrupt created_at on post '{}': {}", row.id, e);
                chrono::DateTime::default()
            }),
            streak: None,
        })
        .collect();

    Ok(Json(posts))
}
