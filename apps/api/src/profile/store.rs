use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::profile::UserProfileRow;

pub async fn find_profile(pool: &PgPool, user_id: i64) -> Result<Option<UserProfileRow>, AppError> {
    Ok(
        sqlx::query_as::<_, UserProfileRow>("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Inserts a profile; `None` when the user already has one.
pub async fn insert_profile(
    pool: &PgPool,
    user_id: i64,
    onboarding_data: &Value,
) -> Result<Option<UserProfileRow>, AppError> {
    Ok(sqlx::query_as::<_, UserProfileRow>(
        r#"
        INSERT INTO user_profiles (user_id, onboarding_data)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(onboarding_data)
    .fetch_optional(pool)
    .await?)
}

pub async fn upsert_profile(
    pool: &PgPool,
    user_id: i64,
    onboarding_data: &Value,
) -> Result<UserProfileRow, AppError> {
    Ok(sqlx::query_as::<_, UserProfileRow>(
        r#"
        INSERT INTO user_profiles (user_id, onboarding_data)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET onboarding_data = EXCLUDED.onboarding_data, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(onboarding_data)
    .fetch_one(pool)
    .await?)
}
