pub mod audio;
pub mod charities;
pub mod donations;
pub mod leaderboard;
pub mod payments;
pub mod users;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

/// The full /api surface.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .merge(users::router())
        .merge(charities::router())
        .merge(donations::router())
        .merge(payments::router())
        .merge(audio::router())
        .merge(leaderboard::router())
        .route("/health", get(health));

    Router::new().nest("/api", api)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
