use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChecklistCacheRow {
    pub id: i64,
    /// SHA-256 hex of the canonical visa option.
    pub cache_key: String,
    pub visa_type: String,
    pub checklist: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChecklistProgressRow {
    pub id: i64,
    pub user_id: i64,
    pub visa_type: String,
    /// JSON array of completed step indices.
    pub completed_steps: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
