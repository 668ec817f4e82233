use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tracing::info;

use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::models::agent::{onboarding_text, TravelAgentProfileRow};
use crate::models::user::UserRole;
use crate::state::AppState;

/// Onboarding keys copied onto each directory entry.
const LISTED_FIELDS: &[&str] = &[
    "bio",
    "country_of_operation",
    "cities_covered",
    "years_of_experience",
    "specializations",
    "supported_destination_countries",
    "languages_spoken",
    "availability_status",
    "profile_photo_url",
];

#[derive(Debug, Deserialize)]
pub struct AgentProfileRequest {
    #[serde(default)]
    pub onboarding_data: Value,
}

#[derive(Debug, FromRow)]
struct AgentListingRow {
    user_id: i64,
    name: String,
    email: String,
    onboarding_data: Option<Value>,
    is_verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub business_name: Option<String>,
    pub owner_name: Option<String>,
    pub is_verified: bool,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl From<AgentListingRow> for AgentSummary {
    fn from(row: AgentListingRow) -> Self {
        let data = row.onboarding_data.unwrap_or(Value::Null);
        let details = LISTED_FIELDS
            .iter()
            .filter_map(|key| {
                let value = data.get(*key)?;
                (!value.is_null()).then(|| (key.to_string(), value.clone()))
            })
            .collect();

        AgentSummary {
            id: row.user_id,
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            business_name: onboarding_text(&data, "business_name"),
            owner_name: onboarding_text(&data, "full_name"),
            is_verified: row.is_verified.unwrap_or(false),
            details,
        }
    }
}

/// GET /travel-agent/profile
pub async fn handle_get_agent_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<TravelAgentProfileRow>, AppError> {
    user.require_role(UserRole::TravelAgent)?;
    find_agent_profile(&state, user.id())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Travel agent profile not found".to_string()))
}

/// PUT /travel-agent/profile
pub async fn handle_update_agent_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AgentProfileRequest>,
) -> Result<Json<TravelAgentProfileRow>, AppError> {
    user.require_role(UserRole::TravelAgent)?;

    let row = sqlx::query_as::<_, TravelAgentProfileRow>(
        r#"
        INSERT INTO travel_agent_profiles (user_id, onboarding_data)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET onboarding_data = EXCLUDED.onboarding_data, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user.id())
    .bind(&req.onboarding_data)
    .fetch_one(&state.db)
    .await?;

    info!("Travel agent {} updated their profile", user.id());
    Ok(Json(row))
}

/// GET /travel-agents
pub async fn handle_list_agents(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<AgentSummary>>, AppError> {
    let rows = sqlx::query_as::<_, AgentListingRow>(
        r#"
        SELECT u.id AS user_id, u.name, u.email, p.onboarding_data, p.is_verified
        FROM users u
        LEFT JOIN travel_agent_profiles p ON p.user_id = u.id
        WHERE u.role = $1 AND u.is_active
        ORDER BY COALESCE(p.is_verified, FALSE) DESC, u.name ASC, u.id ASC
        "#,
    )
    .bind(UserRole::TravelAgent.as_str())
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(AgentSummary::from).collect()))
}

async fn find_agent_profile(
    state: &AppState,
    user_id: i64,
) -> Result<Option<TravelAgentProfileRow>, AppError> {
    Ok(sqlx::query_as::<_, TravelAgentProfileRow>(
        "SELECT * FROM travel_agent_profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_reads_onboarding_fields() {
        let summary = AgentSummary::from(AgentListingRow {
            user_id: 5,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            onboarding_data: Some(json!({
                "business_name": "Ada Visas",
                "full_name": "  ",
                "bio": "Ten years of UK filings.",
                "specializations": ["study"],
                "contact_details": {"phone": "123"}
            })),
            is_verified: None,
        });

        assert_eq!(summary.id, 5);
        assert_eq!(summary.business_name.as_deref(), Some("Ada Visas"));
        assert!(summary.owner_name.is_none());
        assert!(!summary.is_verified);

        let body = serde_json::to_value(&summary).unwrap();
        assert_eq!(body["bio"], "Ten years of UK filings.");
        assert_eq!(body["specializations"], json!(["study"]));
        assert!(body.get("contact_details").is_none());
    }

    #[test]
    fn test_summary_without_profile() {
        let summary = AgentSummary::from(AgentListingRow {
            user_id: 9,
            name: "Bo".into(),
            email: "bo@example.com".into(),
            onboarding_data: None,
            is_verified: Some(true),
        });
        assert!(summary.is_verified);
        assert!(summary.details.is_empty());
        assert!(summary.business_name.is_none());
    }
}
