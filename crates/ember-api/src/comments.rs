use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use ember_types::api::{Claims, CommentResponse, CreateCommentRequest};
use ember_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::streaks::{broadcast_streak_update, outcome_to_api};

const MAX_BODY_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// Create a comment, then feed the contribution to the streak engine.
/// Comments on the author's own post still get stored — they just never
/// count toward the streak.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.body.trim().is_empty() || req.body.len() > MAX_BODY_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let comment_id = Uuid::new_v4();

    // Run blocking DB work off the async runtime
    let app = state.clone();
    let cid = comment_id.to_string();
    let pid = post_id.to_string();
    let aid = claims.sub.to_string();
    let body = req.body.clone();
    let result = tokio::task::spawn_blocking(move || {
        let Some(post) = app.db.get_post(&pid)? else {
            return Ok::<_, anyhow::Error>(None);
        };
        let post_owner: Uuid = post
            .author_id
            .parse()
            .map_err(|e| anyhow::anyhow!("corrupt author_id on post '{}': {}", pid, e))?;

        app.db.insert_comment(&cid, &pid, &aid, &body)?;
        Ok(Some(app.engine.record_comment(claims.sub, post_owner)))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let Some(outcome) = result else {
        return Err(StatusCode::NOT_FOUND);
    };

    let streak = match outcome {
        Ok(outcome) => {
            broadcast_streak_update(&state, &outcome);
            Some(outcome_to_api(&outcome))
        }
        Err(e) => {
            warn!("comment {} stored but streak update failed: {}", comment_id, e);
            None
        }
    };

    let now = chrono::Utc::now();

    // Broadcast to all WebSocket clients
    state.dispatcher.broadcast(GatewayEvent::CommentCreate {
        id: comment_id,
        post_id,
        author_id: claims.sub,
        author_username: claims.username.clone(),
        body: req.body.clone(),
        timestamp: now,
    });

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment_id,
            post_id,
            author_id: claims.sub,
            author_username: claims.username,
            body: req.body,
            created_at: now,
            streak,
        }),
    ))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let pid = post_id.to_string();
    let limit = query.limit.min(500);

    let rows = tokio::task::spawn_blocking(move || db.get_comments_for_post(&pid, limit))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let comments: Vec<CommentResponse> = rows
        .into_iter()
        .map(|row| CommentResponse {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt comment id '{}': {}", row.id, e);
                Uuid::default()
            }),
            post_id,
            author_id: row.author_id.parse().unwrap_or_else(|e| {
                warn!(
                    "Corrupt author_id '{}' on comment '{}': {}",
                    row.author_id, row.id, e
                );
                Uuid::default()
            }),
            author_username: row.author_username,
            body: row.body,
            created_at: ember_db::models::parse_timestamp(&row.created_at).unwrap_or_else(|e| {
                warn!("Corrupt created_at on comment '{}': {}", row.id, e);
                chrono::DateTime::default()
            }),
            streak: None,
        })
        .collect();

    Ok(Json(comments))
}
