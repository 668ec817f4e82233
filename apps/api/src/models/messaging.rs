use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationRow {
    pub id: i64,
    pub user_id: i64,
    pub agent_id: i64,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRow {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.user_id == user_id || self.agent_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_participant() {
        let now = Utc::now();
        let conv = ConversationRow {
            id: 1,
            user_id: 10,
            agent_id: 20,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        };
        assert!(conv.has_participant(10));
        assert!(conv.has_participant(20));
        assert!(!conv.has_participant(30));
    }
}
