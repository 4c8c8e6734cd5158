use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crewdeck_core::standing::PilotStanding;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LEADERBOARD_SIZE: i64 = 20;
const MAX_LEADERBOARD_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/vas/{va_id}/leaderboard", get(leaderboard))
        .route("/v1/vas/{va_id}/pilots/{pilot_id}/standing", get(standing))
}

async fn leaderboard(
    State(state): State<AppState>,
    Path(va_id): Path<Uuid>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<PilotStanding>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);

    let rows = state
        .standing_repo
        .leaderboard(va_id, limit)
        .await
        .map_err(|e| ApiError::store("validation", e))?;

    Ok(Json(rows))
}

async fn standing(
    State(state): State<AppState>,
    Path((va_id, pilot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PilotStanding>, ApiError> {
    let standing = state
        .standing_repo
        .get_standing(pilot_id, va_id)
        .await
        .map_err(|e| ApiError::store("validation", e))?;

    Ok(Json(standing))
}
