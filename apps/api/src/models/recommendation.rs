use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecommendationRow {
    pub id: i64,
    pub user_id: i64,
    /// The intake JSON sent to the LLM.
    pub input_data: Option<Value>,
    /// The parsed `RecommendationResponse`.
    pub output_data: Option<Value>,
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
}
