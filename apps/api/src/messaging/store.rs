use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::errors::AppError;
use crate::models::agent::onboarding_text;
use crate::models::messaging::{ConversationRow, MessageRow};

pub const PREVIEW_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, FromRow)]
struct ConversationListingRow {
    id: i64,
    user_id: i64,
    agent_id: i64,
    last_message_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    user_name: String,
    agent_name: String,
    agent_onboarding: Option<Value>,
    last_message: Option<String>,
    unread_count: i64,
}

/// A conversation as seen by one participant.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub user_id: i64,
    pub agent_id: i64,
    pub user_name: String,
    pub agent_name: String,
    pub agent_business_name: Option<String>,
    pub agent_owner_name: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub last_message_preview: Option<String>,
    /// Messages from the other participant the caller has not read.
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationListingRow> for ConversationSummary {
    fn from(row: ConversationListingRow) -> Self {
        let onboarding = row.agent_onboarding.unwrap_or(Value::Null);
        ConversationSummary {
            id: row.id,
            user_id: row.user_id,
            agent_id: row.agent_id,
            user_name: row.user_name,
            agent_name: row.agent_name,
            agent_business_name: onboarding_text(&onboarding, "business_name"),
            agent_owner_name: onboarding_text(&onboarding, "full_name"),
            last_message_at: row.last_message_at,
            last_message_preview: row.last_message.as_deref().map(preview),
            unread_count: row.unread_count,
            created_at: row.created_at,
        }
    }
}

/// At most `PREVIEW_CHARS` characters, ellipsised when cut.
pub fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(PREVIEW_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Trimmed message body; empty → 400, too long → 422.
pub fn validate_content(content: &str) -> Result<&str, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::UnprocessableEntity(format!(
            "Message cannot exceed {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// Conversations where `caller` is either participant, newest activity first.
/// `only` narrows the listing to one conversation id.
pub async fn list_conversations(
    pool: &PgPool,
    caller: i64,
    only: Option<i64>,
) -> Result<Vec<ConversationSummary>, AppError> {
    let rows = sqlx::query_as::<_, ConversationListingRow>(
        r#"
        SELECT
            c.id, c.user_id, c.agent_id, c.last_message_at, c.created_at,
            u.name AS user_name,
            a.name AS agent_name,
            p.onboarding_data AS agent_onboarding,
            (SELECT m.content FROM messages m
              WHERE m.conversation_id = c.id
              ORDER BY m.created_at DESC, m.id DESC
              LIMIT 1) AS last_message,
            (SELECT COUNT(*) FROM messages m
              WHERE m.conversation_id = c.id
                AND m.sender_id <> $1
                AND NOT m.is_read) AS unread_count
        FROM conversations c
        JOIN users u ON u.id = c.user_id
        JOIN users a ON a.id = c.agent_id
        LEFT JOIN travel_agent_profiles p ON p.user_id = c.agent_id
        WHERE (c.user_id = $1 OR c.agent_id = $1)
          AND ($2::BIGINT IS NULL OR c.id = $2)
        ORDER BY c.last_message_at DESC, c.id DESC
        "#,
    )
    .bind(caller)
    .bind(only)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ConversationSummary::from).collect())
}

pub async fn find_conversation(
    pool: &PgPool,
    id: i64,
) -> Result<Option<ConversationRow>, AppError> {
    Ok(
        sqlx::query_as::<_, ConversationRow>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Returns the conversation for the pair, creating it when absent.
pub async fn ensure_conversation(
    pool: &PgPool,
    user_id: i64,
    agent_id: i64,
) -> Result<ConversationRow, AppError> {
    sqlx::query(
        r#"
        INSERT INTO conversations (user_id, agent_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, agent_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(agent_id)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, ConversationRow>(
        "SELECT * FROM conversations WHERE user_id = $1 AND agent_id = $2",
    )
    .bind(user_id)
    .bind(agent_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Conversation vanished after insert")))
}

/// Marks the other participant's messages read, then returns the thread oldest first.
pub async fn read_messages(
    pool: &PgPool,
    conversation_id: i64,
    reader: i64,
) -> Result<Vec<MessageRow>, AppError> {
    sqlx::query(
        r#"
        UPDATE messages SET is_read = TRUE
        WHERE conversation_id = $1 AND sender_id <> $2 AND NOT is_read
        "#,
    )
    .bind(conversation_id)
    .bind(reader)
    .execute(pool)
    .await?;

    Ok(sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT * FROM messages
        WHERE conversation_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?)
}

/// Inserts a message and bumps the conversation's activity time in one statement.
pub async fn insert_message(
    pool: &PgPool,
    conversation_id: i64,
    sender_id: i64,
    content: &str,
) -> Result<MessageRow, AppError> {
    Ok(sqlx::query_as::<_, MessageRow>(
        r#"
        WITH inserted AS (
            INSERT INTO messages (conversation_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
        ), bumped AS (
            UPDATE conversations
            SET last_message_at = NOW(), updated_at = NOW()
            WHERE id = $1
        )
        SELECT * FROM inserted
        "#,
    )
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .fetch_one(pool)
    .await?)
}
