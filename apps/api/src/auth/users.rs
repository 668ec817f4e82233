use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::user::{User, UserRole};

/// Fields accepted by `update_user`; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
}

/// Lowercases and trims an email. Only the `local@domain` shape is checked;
/// single-label domains such as `localhost` are accepted.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("A valid email address is required".to_string())),
    }
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    hashed_password: &str,
    role: UserRole,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, hashed_password, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(hashed_password)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(map_unique_email)?;

    info!("Created user {} with role {}", user.id, user.role);
    Ok(user)
}

pub async fn update_user(pool: &PgPool, id: i64, changes: UserChanges) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            hashed_password = COALESCE($4, hashed_password),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.email)
    .bind(changes.hashed_password)
    .fetch_optional(pool)
    .await
    .map_err(map_unique_email)?
    .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

fn map_unique_email(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ada@").is_err());
        assert!(normalize_email("@x").is_err());
        assert_eq!(normalize_email("ada@localhost").unwrap(), "ada@localhost");
    }
}
