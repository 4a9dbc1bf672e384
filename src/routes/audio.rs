use axum::extract::{DefaultBodyLimit, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::AudioMessage;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Encoded voice notes above this many characters are rejected.
const MAX_AUDIO_CHARS: usize = 2_000_000;

/// Must stay above MAX_AUDIO_CHARS so oversize payloads reach the
/// length check rather than the transport limit.
const AUDIO_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Deserialize)]
pub struct CreateAudioRequest {
    pub user_id: String,
    pub donation_id: String,
    pub audio_data: String,
    pub duration: f64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/audio-message", post(create_audio_message))
        .route("/audio-message/{donation_id}", get(get_audio_message))
        .layer(DefaultBodyLimit::max(AUDIO_BODY_LIMIT))
}

/// POST /api/audio-message
///
/// The payload is an opaque encoded blob; no referential checks, a note
/// may arrive before its donation exists.
async fn create_audio_message(
    State(state): State<AppState>,
    Json(req): Json<CreateAudioRequest>,
) -> AppResult<Json<AudioMessage>> {
    if req.audio_data.len() > MAX_AUDIO_CHARS {
        return Err(AppError::Validation(format!(
            "audio payload exceeds {MAX_AUDIO_CHARS} characters"
        )));
    }

    let message = AudioMessage::new(
        &req.user_id,
        &req.donation_id,
        req.audio_data,
        req.duration,
        Utc::now(),
    );
    state.store.insert_audio_message(&message).await?;

    Ok(Json(message))
}

/// GET /api/audio-message/{donation_id}
///
/// Several notes may target one donation; the newest wins.
async fn get_audio_message(
    State(state): State<AppState>,
    Path(donation_id): Path<String>,
) -> AppResult<Json<AudioMessage>> {
    let message = state
        .store
        .latest_audio_for_donation(&donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("audio message for donation {donation_id}")))?;

    Ok(Json(message))
}
