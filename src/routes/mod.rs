//! API routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::conversation::Message;
use crate::core::{ChatError, ReplySource};
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    remote: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub source: ReplySource,
    pub display_delay_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

/// Chat errors rendered as JSON bodies
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::Busy => StatusCode::CONFLICT,
            ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.config.settings.llm.model.clone(),
        remote: state.sessions.factory().is_remote(),
    })
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let (session_id, greeting) = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            greeting,
        }),
    )
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let reply = state.sessions.submit(id, &request.message).await?;

    Ok(Json(MessageResponse {
        display_delay_ms: reply.display_delay.as_millis() as u64,
        message: reply.message,
        source: reply.source,
    }))
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.sessions.history(id).await?;
    Ok(Json(HistoryResponse { messages }))
}

async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.reset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ChatError::SessionNotFound(id).into())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session))
        .route("/v1/sessions/:id", delete(end_session))
        .route(
            "/v1/sessions/:id/messages",
            post(send_message).get(history).delete(reset),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PromptTemplate};
    use crate::core::{SessionFactory, SessionRegistry};
    use crate::providers::OfflineBackend;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        let factory = SessionFactory::from_config(
            &config,
            PromptTemplate::default(),
            Arc::new(OfflineBackend::new("DEEPSEEK_API_KEY")),
        );
        router().with_state(AppState {
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new(factory)),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health_reports_offline_mode() {
        let app = app();
        let (status, body) = call(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["remote"], false);
        assert_eq!(body["model"], "deepseek-r1-distill-llama-70b");
    }

    #[tokio::test]
    async fn test_conversation_flow() {
        let app = app();

        let (status, created) = call(&app, "POST", "/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["session_id"].as_str().unwrap().to_string();
        let messages_uri = format!("/v1/sessions/{id}/messages");

        let (status, reply) = call(
            &app,
            "POST",
            &messages_uri,
            Some(json!({"message": "Emergency help needed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["source"], "fallback");
        assert!(reply["message"].as_str().unwrap().contains("1122"));
        assert!(reply["display_delay_ms"].as_u64().unwrap() > 0);

        let (_, history) = call(&app, "GET", &messages_uri, None).await;
        let messages = history["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");

        let (status, _) = call(&app, "DELETE", &messages_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, history) = call(&app, "GET", &messages_uri, None).await;
        assert!(history["messages"].as_array().unwrap().is_empty());

        let (status, _) = call(&app, "DELETE", &format!("/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &messages_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_message_is_bad_request() {
        let app = app();
        let (_, created) = call(&app, "POST", "/v1/sessions", None).await;
        let id = created["session_id"].as_str().unwrap();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/v1/sessions/{id}/messages"),
            Some(json!({"message": "  "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is empty");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app();
        let uri = format!("/v1/sessions/{}/messages", Uuid::new_v4());

        let (status, _) = call(&app, "POST", &uri, Some(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
