use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::LeaderboardEntry;
use crate::error::AppResult;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/leaderboard", get(leaderboard))
}

/// GET /api/leaderboard?limit=N
///
/// Users ranked by number of completed donations, all time.
async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = state.store.leaderboard(limit).await?;
    Ok(Json(entries))
}
