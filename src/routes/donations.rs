use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::Donation;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 500;

#[derive(Deserialize)]
pub struct CreateDonationRequest {
    pub user_id: String,
    pub charity_id: String,
    pub amount: f64,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/donations", post(create_donation).get(list_donations))
}

/// POST /api/donations
///
/// Status, ripple visuals and timestamps are server-derived; the request
/// carries only the three client-settable fields and anything else in the
/// body is ignored.
async fn create_donation(
    State(state): State<AppState>,
    Json(req): Json<CreateDonationRequest>,
) -> AppResult<Json<Donation>> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(AppError::Validation("amount must be positive".into()));
    }
    if state.store.user_by_id(&req.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", req.user_id)));
    }
    if state.store.charity_by_id(&req.charity_id).await?.is_none() {
        return Err(AppError::NotFound(format!("charity {}", req.charity_id)));
    }

    let donation = Donation::new(&req.user_id, &req.charity_id, req.amount, Utc::now());
    state.store.insert_donation(&donation).await?;
    tracing::info!(
        "Created donation {} of {} for charity {}",
        donation.id,
        donation.amount,
        donation.charity_id
    );

    Ok(Json(donation))
}

/// GET /api/donations?limit=N
///
/// The public feed: completed donations only, newest first.
async fn list_donations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Donation>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let donations = state.store.completed_donations(limit).await?;
    Ok(Json(donations))
}
