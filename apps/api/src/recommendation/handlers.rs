use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::auth::extractor::{CurrentUser, OptionalUser};
use crate::errors::AppError;
use crate::intake::models::IntakeData;
use crate::models::recommendation::RecommendationRow;
use crate::profile::store::find_profile;
use crate::recommendation::parser::RecommendationResponse;
use crate::recommendation::service::{
    answers_from_value, cached_response, clamp_limit, find_recommendation, generate_recommendation,
    latest_recommendation, recommendation_history, store_recommendation,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub intake_id: Option<String>,
    pub intake: Option<IntakeData>,
    /// Return the caller's latest stored recommendation instead of calling the LLM.
    #[serde(default)]
    pub use_cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// POST /recommendations
pub async fn handle_create_recommendation(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    if let (Some(user), true) = (&user, req.use_cached) {
        let latest = latest_recommendation(&state.db, user.id()).await?;
        let cached = cached_response(latest.as_ref())?;
        info!("Serving cached recommendation for user {}", user.id());
        return Ok(Json(cached));
    }

    let answers = resolve_intake(&state, user.as_ref(), &req).await?;
    let llm = state.llm()?;
    let generated = generate_recommendation(llm, &answers).await?;

    if let Some(user) = &user {
        store_recommendation(&state.db, user.id(), &answers, &generated).await?;
    }

    Ok(Json(generated.response))
}

/// Intake precedence: stored intake id, inline payload, then the caller's
/// onboarding profile.
async fn resolve_intake(
    state: &AppState,
    user: Option<&CurrentUser>,
    req: &RecommendationRequest,
) -> Result<Value, AppError> {
    if let Some(id) = &req.intake_id {
        let record = state
            .intakes
            .get_str(id)
            .ok_or_else(|| AppError::NotFound("Intake not found.".to_string()))?;
        return Ok(record.payload.answered_fields());
    }

    if let Some(intake) = &req.intake {
        return Ok(intake.answered_fields());
    }

    if let Some(user) = user {
        let onboarding = find_profile(&state.db, user.id())
            .await?
            .and_then(|profile| profile.onboarding_data)
            .filter(|data| !data.is_null());
        if let Some(data) = onboarding {
            return Ok(answers_from_value(&data));
        }
    }

    Err(AppError::Validation(
        "Provide either intake_id or intake payload.".to_string(),
    ))
}

/// GET /recommendations/history
pub async fn handle_recommendation_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<RecommendationRow>>, AppError> {
    let rows = recommendation_history(&state.db, user.id(), clamp_limit(params.limit)).await?;
    Ok(Json(rows))
}

/// GET /recommendations/:id
pub async fn handle_get_recommendation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<RecommendationRow>, AppError> {
    find_recommendation(&state.db, user.id(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))
}
