use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::extractor::CurrentUser;
use crate::auth::users::find_by_id;
use crate::errors::AppError;
use crate::messaging::store::{
    ensure_conversation, find_conversation, insert_message, list_conversations, read_messages,
    validate_content, ConversationSummary,
};
use crate::models::messaging::{ConversationRow, MessageRow};
use crate::models::user::UserRole;
use crate::profile::store::find_profile;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub agent_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// What an agent may see about the applicant they are talking to.
#[derive(Debug, Serialize)]
pub struct ConversationUserProfile {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub onboarding_data: Option<Value>,
}

/// POST /conversations
pub async fn handle_start_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<StartConversationRequest>,
) -> Result<Json<ConversationSummary>, AppError> {
    user.require_role(UserRole::User)?;

    let agent = find_by_id(&state.db, req.agent_id)
        .await?
        .filter(|a| a.is_active && a.role() == UserRole::TravelAgent)
        .ok_or_else(|| AppError::NotFound("Travel agent not found".to_string()))?;

    let conversation = ensure_conversation(&state.db, user.id(), agent.id).await?;
    info!(
        "Conversation {} between user {} and agent {}",
        conversation.id,
        user.id(),
        agent.id
    );
    summary_for(&state, user.id(), conversation.id).await.map(Json)
}

/// GET /conversations
pub async fn handle_list_conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(list_conversations(&state.db, user.id(), None).await?))
}

/// GET /conversations/:id
pub async fn handle_get_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ConversationSummary>, AppError> {
    summary_for(&state, user.id(), id).await.map(Json)
}

/// GET /conversations/:id/messages
pub async fn handle_list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MessageRow>>, AppError> {
    let conversation = participant_conversation(&state, user.id(), id).await?;
    Ok(Json(read_messages(&state.db, conversation.id, user.id()).await?))
}

/// POST /conversations/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let content = validate_content(&req.content)?;
    let conversation = participant_conversation(&state, user.id(), id).await?;
    let message = insert_message(&state.db, conversation.id, user.id(), content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /conversations/:id/user-profile
pub async fn handle_conversation_user_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ConversationUserProfile>, AppError> {
    let conversation = participant_conversation(&state, user.id(), id).await?;
    if conversation.agent_id != user.id() {
        return Err(AppError::Forbidden(
            "Only the travel agent in this conversation can view the applicant profile"
                .to_string(),
        ));
    }

    let applicant = find_by_id(&state.db, conversation.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let onboarding_data = find_profile(&state.db, applicant.id)
        .await?
        .and_then(|p| p.onboarding_data);

    Ok(Json(ConversationUserProfile {
        user_id: applicant.id,
        name: applicant.name,
        email: applicant.email,
        onboarding_data,
    }))
}

/// The conversation when `caller` takes part in it; 404 otherwise.
async fn participant_conversation(
    state: &AppState,
    caller: i64,
    id: i64,
) -> Result<ConversationRow, AppError> {
    find_conversation(&state.db, id)
        .await?
        .filter(|c| c.has_participant(caller))
        .ok_or_else(conversation_not_found)
}

async fn summary_for(
    state: &AppState,
    caller: i64,
    id: i64,
) -> Result<ConversationSummary, AppError> {
    list_conversations(&state.db, caller, Some(id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(conversation_not_found)
}

fn conversation_not_found() -> AppError {
    AppError::NotFound("Conversation not found".to_string())
}
