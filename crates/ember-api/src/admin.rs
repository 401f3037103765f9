use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{error, warn};

use ember_types::api::{SweepRequest, SweepResponse};

use crate::auth::AppState;
use crate::streaks::streak_error_status;

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Daily sweep entry point for the external scheduler. Zeroes every streak
/// whose owner missed yesterday; safe to re-run.
pub async fn sweep_lapsed_streaks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SweepRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    require_admin(&state, &headers)?;

    let engine = state.engine.clone();
    let as_of = req.as_of.unwrap_or_else(|| engine.today());

    let reset_count = tokio::task::spawn_blocking(move || engine.reset_lapsed(as_of))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| streak_error_status(&e))?;

    Ok(Json(SweepResponse { as_of, reset_count }))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if state.admin_token.is_empty() {
        warn!("sweep requested but EMBER_ADMIN_TOKEN is not configured");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if presented != state.admin_token {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(())
}
