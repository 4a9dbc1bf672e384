use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::repository::Settlement;
use crate::donations::{self, PaymentReference};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub donation_id: String,
    /// Alternate UPI handle; defaults to the configured one.
    pub upi_id: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub donation_id: String,
    pub payment_id: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment/generate-upi", post(generate_upi))
        .route("/payment/verify", post(verify))
}

/// POST /api/payment/generate-upi
///
/// The amount in the link comes from the stored donation, never from the
/// caller. Nothing is persisted; the reference only becomes durable if it
/// comes back through verification.
async fn generate_upi(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> AppResult<Json<PaymentReference>> {
    let donation = state
        .store
        .donation_by_id(&req.donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("donation {}", req.donation_id)))?;

    let payments = &state.config.payments;
    let handle = req.upi_id.as_deref().unwrap_or(&payments.upi_id);
    let reference = donations::payment_reference(
        &donation.id,
        donation.amount,
        handle,
        &payments.payee,
        &payments.currency,
    );

    Ok(Json(reference))
}

/// POST /api/payment/verify
///
/// Mocked gateway: every pending donation verifies successfully. Safe to
/// call twice; a settled donation is left untouched and the original
/// reference is echoed back.
async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let donation = state
        .store
        .donation_by_id(&req.donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("donation {}", req.donation_id)))?;

    let points = donations::reward_points(donation.amount);
    let settlement = state
        .store
        .settle_donation(&donation.id, &req.payment_id, Utc::now(), points)
        .await?;

    let response = match settlement {
        Settlement::Credited(settled) => {
            tracing::info!(
                "Donation {} verified; credited {} hope points",
                settled.id,
                points
            );
            VerifyResponse {
                success: true,
                message: "Payment verified successfully".to_string(),
                payment_id: settled.payment_id.unwrap_or_else(|| req.payment_id.clone()),
            }
        }
        Settlement::AlreadySettled(settled) => VerifyResponse {
            success: true,
            message: "Payment already verified".to_string(),
            payment_id: settled.payment_id.unwrap_or_else(|| req.payment_id.clone()),
        },
    };

    Ok(Json(response))
}
