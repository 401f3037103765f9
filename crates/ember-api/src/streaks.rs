use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use ember_engine::{ContributionOutcome, StreakError};
use ember_types::api::{Claims, LeaderboardEntry, StreakOutcome, StreakResponse};
use ember_types::events::GatewayEvent;
use ember_types::models::StreakRecord;

use crate::auth::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

pub async fn get_my_streak(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    get_streak_for(state, claims.sub).await
}

pub async fn get_user_streak(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    get_streak_for(state, user_id).await
}

async fn get_streak_for(state: AppState, user_id: Uuid) -> Result<Json<StreakResponse>, StatusCode> {
    let engine = state.engine.clone();
    let record = tokio::task::spawn_blocking(move || engine.get_or_create(user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| streak_error_status(&e))?;

    Ok(Json(StreakResponse { record }))
}

/// Today's progress for the authenticated user. Degrades to zeroes inside
/// the engine, so this handler has no failure path besides the join.
pub async fn get_today_progress(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let progress = tokio::task::spawn_blocking(move || engine.today_progress(claims.sub))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(progress))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let limit = query.limit.min(100);

    let engine = state.engine.clone();
    let db = state.db.clone();
    let entries = tokio::task::spawn_blocking(move || {
        let records = engine.leaderboard(limit);

        // One batch username lookup; missing users render as "unknown".
        let ids: Vec<String> = records.iter().map(|r| r.user_id.to_string()).collect();
        let names: HashMap<String, String> = db
            .get_usernames_for_ids(&ids)
            .unwrap_or_default()
            .into_iter()
            .collect();

        records
            .into_iter()
            .map(|record| LeaderboardEntry {
                username: names
                    .get(&record.user_id.to_string())
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                user_id: record.user_id,
                current_streak: record.current_streak,
                highest_streak: record.highest_streak,
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(entries))
}

pub(crate) fn streak_error_status(err: &StreakError) -> StatusCode {
    match err {
        StreakError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        StreakError::Storage(_) | StreakError::Contention { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Flatten an engine outcome into the flag shape the client consumes.
pub(crate) fn outcome_to_api(outcome: &ContributionOutcome) -> StreakOutcome {
    match outcome {
        ContributionOutcome::Advanced {
            record,
            previous_streak,
        } => StreakOutcome {
            streak_increased: true,
            already_completed: false,
            own_post: false,
            previous_streak: Some(*previous_streak),
            comments_progress: None,
            record: Some(record.clone()),
        },
        ContributionOutcome::AlreadyCompleted { record } => StreakOutcome {
            streak_increased: false,
            already_completed: true,
            own_post: false,
            previous_streak: None,
            comments_progress: None,
            record: Some(record.clone()),
        },
        ContributionOutcome::Accumulating {
            record,
            comments_progress,
        } => StreakOutcome {
            streak_increased: false,
            already_completed: false,
            own_post: false,
            previous_streak: None,
            comments_progress: Some(*comments_progress),
            record: Some(record.clone()),
        },
        ContributionOutcome::OwnPost => StreakOutcome {
            streak_increased: false,
            already_completed: false,
            own_post: true,
            previous_streak: None,
            comments_progress: None,
            record: None,
        },
    }
}

/// Push the updated streak row to gateway subscribers.
pub(crate) fn broadcast_streak_update(state: &AppState, outcome: &ContributionOutcome) {
    let Some(record) = outcome.record() else {
        return;
    };
    state
        .dispatcher
        .broadcast(streak_update_event(record, outcome));
}

fn streak_update_event(record: &StreakRecord, outcome: &ContributionOutcome) -> GatewayEvent {
    let completed = matches!(
        outcome,
        ContributionOutcome::Advanced { .. } | ContributionOutcome::AlreadyCompleted { .. }
    );
    GatewayEvent::StreakUpdate {
        user_id: record.user_id,
        current_streak: record.current_streak,
        highest_streak: record.highest_streak,
        streak_completed_today: completed,
    }
}
