use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::checklist::{ChecklistCacheRow, ChecklistProgressRow};

pub async fn find_cached_checklist(
    pool: &PgPool,
    cache_key: &str,
) -> Result<Option<ChecklistCacheRow>, AppError> {
    Ok(
        sqlx::query_as::<_, ChecklistCacheRow>(
            "SELECT * FROM checklist_cache WHERE cache_key = $1",
        )
        .bind(cache_key)
        .fetch_optional(pool)
        .await?,
    )
}

/// Inserts the checklist unless another request cached this key first, then
/// returns whichever row won.
pub async fn cache_checklist(
    pool: &PgPool,
    cache_key: &str,
    visa_type: &str,
    checklist: &Value,
) -> Result<ChecklistCacheRow, AppError> {
    sqlx::query(
        r#"
        INSERT INTO checklist_cache (cache_key, visa_type, checklist)
        VALUES ($1, $2, $3)
        ON CONFLICT (cache_key) DO NOTHING
        "#,
    )
    .bind(cache_key)
    .bind(visa_type)
    .bind(checklist)
    .execute(pool)
    .await?;

    find_cached_checklist(pool, cache_key)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Cached checklist {cache_key} vanished")))
}

pub async fn find_progress(
    pool: &PgPool,
    user_id: i64,
    visa_type: &str,
) -> Result<Option<ChecklistProgressRow>, AppError> {
    Ok(sqlx::query_as::<_, ChecklistProgressRow>(
        "SELECT * FROM checklist_progress WHERE user_id = $1 AND visa_type = $2",
    )
    .bind(user_id)
    .bind(visa_type)
    .fetch_optional(pool)
    .await?)
}

pub async fn upsert_progress(
    pool: &PgPool,
    user_id: i64,
    visa_type: &str,
    completed_steps: &[i64],
) -> Result<ChecklistProgressRow, AppError> {
    let steps = serde_json::to_value(completed_steps)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode steps: {e}")))?;

    Ok(sqlx::query_as::<_, ChecklistProgressRow>(
        r#"
        INSERT INTO checklist_progress (user_id, visa_type, completed_steps)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, visa_type) DO UPDATE
        SET completed_steps = EXCLUDED.completed_steps, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(visa_type)
    .bind(&steps)
    .fetch_one(pool)
    .await?)
}

/// Sorted, de-duplicated step indices. Negative indices are rejected.
pub fn normalise_steps(steps: &[i64]) -> Result<Vec<i64>, AppError> {
    if let Some(bad) = steps.iter().find(|s| **s < 0) {
        return Err(AppError::Validation(format!(
            "Step indices must be non-negative (got {bad})"
        )));
    }
    let mut steps = steps.to_vec();
    steps.sort_unstable();
    steps.dedup();
    Ok(steps)
}

/// Reads stored step indices, ignoring anything that is not a non-negative integer.
pub fn stored_steps(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_i64)
        .filter(|s| *s >= 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalise_steps() {
        assert_eq!(normalise_steps(&[3, 1, 3, 0]).unwrap(), vec![0, 1, 3]);
        assert!(normalise_steps(&[]).unwrap().is_empty());
        assert!(matches!(
            normalise_steps(&[1, -2]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_stored_steps_skips_junk() {
        assert_eq!(stored_steps(&json!([0, "1", 2, -1, null])), vec![0, 2]);
        assert!(stored_steps(&json!({"not": "an array"})).is_empty());
    }
}
