//! HTTP API 서버 - 챗봇 파이프라인 노출
//!
//! - `POST /api/chat` : 메시지 처리
//! - `POST /api/feedback` : 피드백 저장
//! - `GET /health` : 상태 확인
//!
//! CORS는 설정된 오리진만 허용합니다 (기본: 로컬 프론트엔드).

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chatbot::{ChatResponse, FaqChatbot};
use crate::feedback::NewFeedback;

// ============================================================================
// Configuration
// ============================================================================

/// 서버 설정
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 바인드 주소 (host:port)
    pub bind_addr: String,
    /// CORS 허용 오리진
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

// ============================================================================
// State & Errors
// ============================================================================

/// 공유 애플리케이션 상태
pub struct AppState {
    pub chatbot: Arc<FaqChatbot>,
}

/// API 에러
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

/// 라우터 구성
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/feedback", post(feedback))
        .with_state(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// CORS 레이어 구성
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

// ============================================================================
// Handlers
// ============================================================================

/// 채팅 요청
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// 피드백 요청
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: String,
    pub session_id: String,
    pub is_helpful: bool,
    #[serde(default)]
    pub comments: Option<String>,
}

/// 상태 확인
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "faq_count": state.chatbot.faq_count(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 채팅 엔드포인트
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .chatbot
        .handle_message(&request.message, request.session_id)
        .await;

    Ok(Json(response))
}

/// 피드백 엔드포인트
async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.message_id.trim().is_empty() || request.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "message_id and session_id are required".to_string(),
        ));
    }

    state
        .chatbot
        .store_feedback(NewFeedback {
            message_id: request.message_id,
            session_id: request.session_id,
            is_helpful: request.is_helpful,
            comments: request.comments,
        })
        .map_err(ApiError::internal)?;

    Ok(Json(json!({ "message": "Feedback stored successfully" })))
}

// ============================================================================
// Bootstrap
// ============================================================================

/// 서버 실행 (종료될 때까지 블록)
pub async fn serve(chatbot: Arc<FaqChatbot>, config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState { chatbot });
    let app = router(state, &config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!("FAQ chatbot API listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
