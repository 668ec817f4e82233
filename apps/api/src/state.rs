use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::google::GoogleVerifier;
use crate::config::Config;
use crate::documents::storage::DocumentStorage;
use crate::errors::AppError;
use crate::intake::store::IntakeStore;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// `None` when no OpenAI key is configured.
    pub llm: Option<LlmClient>,
    pub intakes: IntakeStore,
    /// Pluggable object storage for uploaded documents. Default: S3.
    pub storage: Arc<dyn DocumentStorage>,
    pub google: GoogleVerifier,
    pub config: Config,
}

impl AppState {
    /// Returns the LLM client or 503 when the service runs without an API key.
    pub fn llm(&self) -> Result<&LlmClient, AppError> {
        self.llm.as_ref().ok_or(AppError::LlmUnavailable)
    }
}
