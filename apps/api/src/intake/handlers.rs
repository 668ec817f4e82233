use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::intake::models::{IntakeCreate, IntakeRecord};
use crate::state::AppState;

/// POST /intakes
pub async fn handle_create_intake(
    State(state): State<AppState>,
    Json(req): Json<IntakeCreate>,
) -> (StatusCode, Json<IntakeRecord>) {
    let record = state.intakes.create(req.intake, req.user_id);
    (StatusCode::CREATED, Json(record))
}

/// GET /intakes/:id
pub async fn handle_get_intake(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IntakeRecord>, AppError> {
    state
        .intakes
        .get_str(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))
}
