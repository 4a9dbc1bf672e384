use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::db::models::Charity;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/charities", get(list_charities))
        .route("/init-charities", post(init_charities))
}

/// GET /api/charities
async fn list_charities(State(state): State<AppState>) -> AppResult<Json<Vec<Charity>>> {
    let charities = state.store.charities().await?;
    Ok(Json(charities))
}

/// POST /api/init-charities
///
/// Safe to call repeatedly; only an empty collection gets seeded.
async fn init_charities(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let inserted = state.store.seed_charities(&Charity::defaults()).await?;
    let message = if inserted == 0 {
        "Charities already initialized"
    } else {
        tracing::info!("Seeded {} default charities", inserted);
        "Charities initialized successfully"
    };

    Ok(Json(json!({ "message": message })))
}
