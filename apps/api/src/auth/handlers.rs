use axum::{extract::State, http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::extractor::CurrentUser;
use crate::auth::password::{hash_password, unusable_password, validate_password, verify_password};
use crate::auth::token::issue_token;
use crate::auth::users::{
    create_user, find_by_email, normalize_email, update_user, UserChanges,
};
use crate::errors::AppError;
use crate::models::user::{User, UserResponse, UserRole};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// OAuth2 password-flow form: the email travels as `username`.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    pub picture: Option<String>,
    pub is_new_user: bool,
}

fn token_response(state: &AppState, user: User) -> Result<TokenResponse, AppError> {
    let access_token = issue_token(
        &user,
        &state.config.jwt_secret,
        state.config.access_token_minutes,
    )?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        user: user.into(),
    })
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let email = normalize_email(&req.email)?;
    let name = required_name(&req.name)?;
    validate_password(&req.password)?;

    if find_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let hashed = hash_password(&req.password).await?;
    let user = create_user(
        &state.db,
        &email,
        &name,
        &hashed,
        req.role.unwrap_or_default(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let bad_credentials = || AppError::Unauthorized("Incorrect email or password".to_string());

    let email = normalize_email(&form.username).map_err(|_| bad_credentials())?;
    let user = find_by_email(&state.db, &email)
        .await?
        .ok_or_else(bad_credentials)?;

    if !verify_password(&form.password, &user.hashed_password).await? {
        return Err(bad_credentials());
    }
    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    info!("User {} logged in", user.id);
    Ok(Json(token_response(&state, user)?))
}

/// GET /auth/me
pub async fn handle_get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /auth/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut changes = UserChanges::default();

    if let Some(name) = req.name.as_deref() {
        changes.name = Some(required_name(name)?);
    }
    if let Some(email) = req.email.as_deref() {
        let email = normalize_email(email)?;
        if email != current.0.email {
            if find_by_email(&state.db, &email).await?.is_some() {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
            changes.email = Some(email);
        }
    }
    if let Some(password) = req.password.as_deref() {
        validate_password(password)?;
        changes.hashed_password = Some(hash_password(password).await?);
    }

    let user = update_user(&state.db, current.id(), changes).await?;
    Ok(Json(user.into()))
}

/// POST /auth/google
pub async fn handle_google_login(
    State(state): State<AppState>,
    Json(req): Json<GoogleLoginRequest>,
) -> Result<Json<GoogleLoginResponse>, AppError> {
    if req.id_token.trim().is_empty() {
        return Err(AppError::Validation("id_token is required".to_string()));
    }

    let identity = state.google.verify(req.id_token.trim()).await?;
    let email = normalize_email(&identity.email)?;

    let (user, is_new_user) = match find_by_email(&state.db, &email).await? {
        Some(user) => (user, false),
        None => {
            let hashed = hash_password(&unusable_password()).await?;
            let user = create_user(
                &state.db,
                &email,
                &identity.name,
                &hashed,
                req.role.unwrap_or_default(),
            )
            .await?;
            (user, true)
        }
    };

    if !user.is_active {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    info!("Google sign-in for user {} (new: {})", user.id, is_new_user);
    Ok(Json(GoogleLoginResponse {
        token: token_response(&state, user)?,
        picture: identity.picture,
        is_new_user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_role_optional() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "a@b.com", "name": "A", "password": "password1"}"#,
        )
        .unwrap();
        assert!(req.role.is_none());

        let req: RegisterRequest = serde_json::from_str(
            r#"{"email": "a@b.com", "name": "A", "password": "password1", "role": "TRAVEL_AGENT"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Some(UserRole::TravelAgent));
    }

    #[test]
    fn test_required_name_trims() {
        assert_eq!(required_name("  Ada ").unwrap(), "Ada");
        assert!(required_name("   ").is_err());
    }
}
