//! Recommendation pipeline: intake answers → prompt → LLM → parse → persist.

use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::intake::models::IntakeData;
use crate::llm_client::LlmClient;
use crate::models::recommendation::RecommendationRow;
use crate::recommendation::parser::{
    fallback_response, parse_recommendation, RecommendationResponse, CACHE_SOURCE,
};
use crate::recommendation::prompts::{build_prompt, RECOMMENDATION_SYSTEM};

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// A generated recommendation together with the text it was parsed from.
pub struct Generated {
    pub response: RecommendationResponse,
    pub raw: String,
}

/// Normalises stored onboarding JSON into prompt-ready intake answers.
/// Known fields go through `IntakeData`; payloads that do not fit the form
/// are passed on with nulls removed.
pub fn answers_from_value(value: &Value) -> Value {
    match serde_json::from_value::<IntakeData>(value.clone()) {
        Ok(intake) => intake.answered_fields(),
        Err(e) => {
            warn!("Onboarding data does not match the intake form ({e}); sending as-is");
            match value {
                Value::Object(map) => {
                    let mut map: Map<String, Value> = map.clone();
                    map.retain(|_, v| !v.is_null());
                    Value::Object(map)
                }
                other => other.clone(),
            }
        }
    }
}

/// Calls the LLM with the strategist prompt and parses the reply.
/// Unparseable replies produce the raw-output fallback, never an error.
pub async fn generate_recommendation(
    llm: &LlmClient,
    answers: &Value,
) -> Result<Generated, AppError> {
    let prompt = build_prompt(answers);
    let raw = llm
        .complete(RECOMMENDATION_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let response = match parse_recommendation(&raw) {
        Some(parsed) => {
            info!(
                "Parsed recommendation with {} options (model: {})",
                parsed.options.len(),
                llm.model()
            );
            parsed
        }
        None => {
            warn!("LLM returned unstructured recommendation text; using fallback");
            fallback_response(&raw)
        }
    };

    Ok(Generated { response, raw })
}

pub async fn store_recommendation(
    pool: &PgPool,
    user_id: i64,
    input: &Value,
    generated: &Generated,
) -> Result<RecommendationRow, AppError> {
    let output = serde_json::to_value(&generated.response).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to serialize recommendation: {e}"))
    })?;

    let row = sqlx::query_as::<_, RecommendationRow>(
        r#"
        INSERT INTO recommendations (user_id, input_data, output_data, raw_response)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(input)
    .bind(&output)
    .bind(&generated.raw)
    .fetch_one(pool)
    .await?;

    info!("Stored recommendation {} for user {}", row.id, user_id);
    Ok(row)
}

pub async fn latest_recommendation(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<RecommendationRow>, AppError> {
    Ok(sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT * FROM recommendations
        WHERE user_id = $1 AND output_data IS NOT NULL
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn recommendation_history(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<RecommendationRow>, AppError> {
    Ok(sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT * FROM recommendations
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn find_recommendation(
    pool: &PgPool,
    user_id: i64,
    id: i64,
) -> Result<Option<RecommendationRow>, AppError> {
    Ok(sqlx::query_as::<_, RecommendationRow>(
        "SELECT * FROM recommendations WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

/// Reads a stored `output_data` back into the response type. Rows written by
/// older builds that no longer deserialize are treated as absent.
pub fn stored_response(row: &RecommendationRow) -> Option<RecommendationResponse> {
    let output = row.output_data.clone()?;
    match serde_json::from_value(output) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!("Stored recommendation {} is unreadable: {e}", row.id);
            None
        }
    }
}

/// Replays the caller's latest stored recommendation, tagged as cached.
pub fn cached_response(
    latest: Option<&RecommendationRow>,
) -> Result<RecommendationResponse, AppError> {
    let mut response = latest.and_then(stored_response).ok_or_else(|| {
        AppError::NotFound(
            "No cached recommendation found. Send use_cached: false to generate a new one."
                .to_string(),
        )
    })?;
    response.source = CACHE_SOURCE.to_string();
    Ok(response)
}
