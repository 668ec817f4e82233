pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::agents::handlers as agents;
use crate::auth::handlers as auth;
use crate::chat::handlers as chat;
use crate::checklist::handlers as checklist;
use crate::documents::handlers as documents;
use crate::intake::handlers as intake;
use crate::messaging::handlers as messaging;
use crate::profile::handlers as profile;
use crate::recommendation::handlers as recommendation;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = documents::MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Intakes
        .route("/intakes", post(intake::handle_create_intake))
        .route("/intakes/:id", get(intake::handle_get_intake))
        // Recommendations & checklists
        .route(
            "/recommendations",
            post(recommendation::handle_create_recommendation),
        )
        .route(
            "/recommendations/history",
            get(recommendation::handle_recommendation_history),
        )
        .route(
            "/recommendations/checklist",
            post(checklist::handle_generate_checklist),
        )
        .route(
            "/recommendations/:id",
            get(recommendation::handle_get_recommendation),
        )
        .route(
            "/checklist/progress",
            get(checklist::handle_get_progress).put(checklist::handle_update_progress),
        )
        // Accounts
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/google", post(auth::handle_google_login))
        .route(
            "/auth/me",
            get(auth::handle_get_me).put(auth::handle_update_me),
        )
        .route(
            "/profile",
            get(profile::handle_get_profile)
                .post(profile::handle_create_profile)
                .put(profile::handle_update_profile),
        )
        // Documents
        .route(
            "/documents",
            get(documents::handle_list_documents).post(documents::handle_create_document),
        )
        .route(
            "/documents/upload",
            post(documents::handle_upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/documents/:id",
            get(documents::handle_get_document)
                .put(documents::handle_update_document)
                .delete(documents::handle_delete_document),
        )
        // Travel agents & messaging
        .route(
            "/travel-agent/profile",
            get(agents::handle_get_agent_profile).put(agents::handle_update_agent_profile),
        )
        .route("/travel-agents", get(agents::handle_list_agents))
        .route(
            "/conversations",
            get(messaging::handle_list_conversations).post(messaging::handle_start_conversation),
        )
        .route("/conversations/:id", get(messaging::handle_get_conversation))
        .route(
            "/conversations/:id/messages",
            get(messaging::handle_list_messages).post(messaging::handle_send_message),
        )
        .route(
            "/conversations/:id/user-profile",
            get(messaging::handle_conversation_user_profile),
        )
        // Assistant
        .route("/chat", post(chat::handle_chat))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::google::GoogleVerifier;
    use crate::config::Config;
    use crate::documents::storage::memory::MemoryStorage;
    use crate::intake::store::IntakeStore;
    use crate::llm_client::LlmClient;

    fn test_state(llm: Option<LlmClient>) -> AppState {
        AppState {
            db: crate::db::lazy_pool(),
            llm,
            intakes: IntakeStore::new(),
            storage: Arc::new(MemoryStorage::default()),
            google: GoogleVerifier::new(String::new()).unwrap(),
            config: Config::for_tests(),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn mock_llm(server: &mut mockito::ServerGuard, content: &str) -> LlmClient {
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
                    .to_string(),
            )
            .create_async()
            .await;
        LlmClient::new("test-key".into(), "gpt-4o-mini".into(), &server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(build_router(test_state(None)), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "japa-api");
    }

    #[tokio::test]
    async fn test_intake_create_then_fetch() {
        let app = build_router(test_state(None));
        let (status, created) = send(
            app.clone(),
            json_request(
                "/intakes",
                json!({"user_id": "u-1", "intake": {"nationality": "Ghanaian", "age": 27}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["payload"]["nationality"], "Ghanaian");

        let id = created["id"].as_str().unwrap();
        let (status, fetched) = send(app.clone(), get_request(&format!("/intakes/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], created["id"]);

        let (status, body) = send(app, get_request("/intakes/not-a-uuid")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Not found.");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = build_router(test_state(None));
        let (status, body) = send(app.clone(), get_request("/auth/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Not authenticated");

        let request = Request::builder()
            .uri("/documents")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_recommendation_requires_some_intake() {
        let (status, body) = send(
            build_router(test_state(None)),
            json_request("/recommendations", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Provide either intake_id or intake payload.");
    }

    #[tokio::test]
    async fn test_recommendation_rejects_invalid_token() {
        let request = Request::builder()
            .method("POST")
            .uri("/recommendations")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::from(json!({"intake": {"nationality": "Indian"}}).to_string()))
            .unwrap();
        let (status, body) = send(build_router(test_state(None)), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Could not validate credentials");
    }

    #[tokio::test]
    async fn test_recommendation_unknown_intake_id() {
        let (status, body) = send(
            build_router(test_state(None)),
            json_request(
                "/recommendations",
                json!({"intake_id": "00000000-0000-0000-0000-000000000000"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Intake not found.");
    }

    #[tokio::test]
    async fn test_recommendation_without_api_key() {
        let (status, body) = send(
            build_router(test_state(None)),
            json_request("/recommendations", json!({"intake": {"nationality": "Nigerian"}})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "OpenAI API key not configured.");
    }

    #[tokio::test]
    async fn test_recommendation_from_stored_intake() {
        let mut server = mockito::Server::new_async().await;
        let content = json!({
            "summary": "Two realistic routes.",
            "options": [
                {"visa_type": "Skilled Worker", "reasoning": "Has a job offer", "likelihood": "high"},
                {"reasoning": "no visa type"}
            ],
            "notes": "Check salary thresholds."
        })
        .to_string();
        let llm = mock_llm(&mut server, &format!("```json\n{content}\n```")).await;

        let state = test_state(Some(llm));
        let record = state.intakes.create(
            crate::intake::models::IntakeData {
                nationality: Some("Nigerian".into()),
                ..Default::default()
            },
            None,
        );
        let app = build_router(state);

        let (status, body) = send(
            app,
            json_request("/recommendations", json!({"intake_id": record.id.to_string()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "Two realistic routes.");
        assert_eq!(body["options"].as_array().unwrap().len(), 1);
        assert_eq!(body["options"][0]["visa_type"], "Skilled Worker");
        assert_eq!(body["notes"], json!(["Check salary thresholds."]));
        assert_eq!(body["source"], "openai");
    }

    #[tokio::test]
    async fn test_recommendation_llm_failure_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
            .create_async()
            .await;
        let llm = LlmClient::new("bad".into(), "gpt-4o-mini".into(), &server.url()).unwrap();

        let (status, body) = send(
            build_router(test_state(Some(llm))),
            json_request("/recommendations", json!({"intake": {"age": 40}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("OpenAI request failed"));
    }

    #[tokio::test]
    async fn test_checklist_requires_visa_type() {
        let (status, body) = send(
            build_router(test_state(None)),
            json_request("/recommendations/checklist", json!({"reasoning": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "visa_type is required");
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let llm = mock_llm(&mut server, "  You will need a valid passport.  ").await;

        let (status, body) = send(
            build_router(test_state(Some(llm))),
            json_request(
                "/chat",
                json!({
                    "message": "What do I need for a UK visit visa?",
                    "conversation_history": [{"role": "assistant", "content": "Hi! How can I help?"}]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "You will need a valid passport.");
        let history = body["conversation_history"].as_array().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1]["role"], "user");
        assert_eq!(history[2]["content"], "You will need a valid passport.");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let (status, _) = send(
            build_router(test_state(None)),
            json_request("/chat", json!({"message": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
