use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::models::profile::UserProfileRow;
use crate::profile::store::{find_profile, insert_profile, upsert_profile};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub onboarding_data: Value,
}

/// GET /profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserProfileRow>, AppError> {
    find_profile(&state.db, user.id())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
}

/// POST /profile
pub async fn handle_create_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProfileRequest>,
) -> Result<(StatusCode, Json<UserProfileRow>), AppError> {
    let profile = insert_profile(&state.db, user.id(), &req.onboarding_data)
        .await?
        .ok_or_else(|| AppError::Conflict("Profile already exists".to_string()))?;
    info!("Created profile for user {}", user.id());
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PUT /profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<UserProfileRow>, AppError> {
    let profile = upsert_profile(&state.db, user.id(), &req.onboarding_data).await?;
    Ok(Json(profile))
}
