use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::extractor::CurrentUser;
use crate::checklist::cache_key::checklist_cache_key;
use crate::checklist::generator::generate_checklist;
use crate::checklist::store::{
    cache_checklist, find_cached_checklist, find_progress, normalise_steps, stored_steps,
    upsert_progress,
};
use crate::errors::AppError;
use crate::recommendation::parser::first_text;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChecklistResponse {
    pub checklist: Value,
    pub cached: bool,
    pub cache_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub visa_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub visa_type: String,
    #[serde(default)]
    pub completed_steps: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub visa_type: String,
    pub completed_steps: Vec<i64>,
}

/// POST /recommendations/checklist
///
/// Body is a single visa option as returned by `/recommendations`.
pub async fn handle_generate_checklist(
    State(state): State<AppState>,
    Json(option): Json<Map<String, Value>>,
) -> Result<Json<ChecklistResponse>, AppError> {
    let visa_type = first_text(&option, &["visa_type"])
        .ok_or_else(|| AppError::Validation("visa_type is required".to_string()))?;
    let cache_key = checklist_cache_key(&option);

    if let Some(hit) = find_cached_checklist(&state.db, &cache_key).await? {
        info!("Checklist cache hit for {visa_type} ({cache_key})");
        return Ok(Json(ChecklistResponse {
            checklist: hit.checklist,
            cached: true,
            cache_key,
        }));
    }

    let llm = state.llm()?;
    let steps = generate_checklist(llm, &option).await?;
    let checklist = serde_json::to_value(&steps)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode checklist: {e}")))?;
    let row = cache_checklist(&state.db, &cache_key, visa_type.trim(), &checklist).await?;

    Ok(Json(ChecklistResponse {
        checklist: row.checklist,
        cached: false,
        cache_key,
    }))
}

/// GET /checklist/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ProgressQuery>,
) -> Result<Json<ProgressResponse>, AppError> {
    let visa_type = required_visa_type(&params.visa_type)?;
    let completed_steps = find_progress(&state.db, user.id(), visa_type)
        .await?
        .map(|row| stored_steps(&row.completed_steps))
        .unwrap_or_default();

    Ok(Json(ProgressResponse {
        visa_type: visa_type.to_string(),
        completed_steps,
    }))
}

/// PUT /checklist/progress
pub async fn handle_update_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ProgressUpdate>,
) -> Result<Json<ProgressResponse>, AppError> {
    let visa_type = required_visa_type(&req.visa_type)?;
    let steps = normalise_steps(&req.completed_steps)?;
    let row = upsert_progress(&state.db, user.id(), visa_type, &steps).await?;

    Ok(Json(ProgressResponse {
        visa_type: row.visa_type,
        completed_steps: stored_steps(&row.completed_steps),
    }))
}

fn required_visa_type(visa_type: &str) -> Result<&str, AppError> {
    let trimmed = visa_type.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("visa_type is required".to_string()));
    }
    Ok(trimmed)
}
