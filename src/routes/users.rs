use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::db::models::{TimelineEntry, User};
use crate::db::repository::RepositoryError;
use crate::error::{AppError, AppResult};
use crate::profile;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub emotion: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/user/{user_id}", get(get_user))
        .route("/user/{user_id}/timeline", get(user_timeline))
}

/// POST /api/register
///
/// Idempotent by email: registering an address twice returns the stored
/// user unchanged, whatever name came with the second request.
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<User>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    let email = req.email.trim();
    if !profile::is_valid_email(email) {
        return Err(AppError::Validation(format!("invalid email address: {email}")));
    }

    if let Some(existing) = state.store.user_by_email(email).await? {
        return Ok(Json(existing));
    }

    let user = User::new(name, email, req.emotion, Utc::now());
    match state.store.insert_user(&user).await {
        Ok(()) => {
            tracing::info!("Registered user {} ({})", user.id, user.email);
            Ok(Json(user))
        }
        // Lost the race against a concurrent registration for the same
        // email; hand back the row that won.
        Err(RepositoryError::Conflict(_)) => {
            let existing = state
                .store
                .user_by_email(email)
                .await?
                .ok_or_else(|| AppError::Conflict(format!("email {email} is already registered")))?;
            Ok(Json(existing))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /api/user/{user_id}
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state
        .store
        .user_by_id(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    Ok(Json(user))
}

/// GET /api/user/{user_id}/timeline
///
/// Unknown users simply get an empty timeline.
async fn user_timeline(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<TimelineEntry>>> {
    let timeline = state.store.user_timeline(&user_id).await?;
    Ok(Json(timeline))
}
