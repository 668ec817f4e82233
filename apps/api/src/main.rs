mod agents;
mod auth;
mod chat;
mod checklist;
mod config;
mod db;
mod documents;
mod errors;
mod intake;
mod llm_client;
mod messaging;
mod models;
mod profile;
mod recommendation;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::google::GoogleVerifier;
use crate::config::Config;
use crate::db::create_pool;
use crate::documents::storage::S3DocumentStorage;
use crate::intake::store::IntakeStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting JAPA API v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO document storage
    let s3 = build_s3_client(&config).await;
    let storage = Arc::new(S3DocumentStorage::new(
        s3,
        config.s3_bucket.clone(),
        &config.s3_endpoint,
    ));
    info!("Document storage initialized (bucket: {})", config.s3_bucket);

    // LLM-backed endpoints answer 503 without a key
    let llm = if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY not set; recommendation, checklist and chat endpoints are disabled");
        None
    } else {
        let client = LlmClient::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            &config.openai_base_url,
        )?;
        info!("LLM client initialized (model: {})", client.model());
        Some(client)
    };

    let google = GoogleVerifier::new(config.google_client_id.clone())?;
    if config.google_client_id.is_empty() {
        warn!("GOOGLE_CLIENT_ID not set; Google sign-in is disabled");
    }

    let cors = build_cors(&config)?;

    let state = AppState {
        db,
        llm,
        intakes: IntakeStore::new(),
        storage,
        google,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "japa-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO only serves path-style URLs.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

/// Credentialed CORS for the configured web origins.
fn build_cors(config: &Config) -> Result<CorsLayer> {
    let origins = config
        .cors_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]))
}
