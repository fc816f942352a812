use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chatrelay_agents::catalog;
use chatrelay_common::Error;
use chatrelay_engine::{ChatResult, Personality, TurnAttachment, TurnOptions};
use chatrelay_facts::{FactCategory, FactParams};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use crate::state::SharedState;

type ApiResponse = (StatusCode, Json<Value>);

/// Map engine failures to HTTP statuses. Internal errors are logged and
/// replaced by a generic message so upstream details never reach the caller.
fn error_response(err: Error) -> ApiResponse {
    let (status, message) = match &err {
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        Error::RateLimited { retry_after_secs } => {
            let body = json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after": retry_after_secs,
            });
            return (StatusCode::TOO_MANY_REQUESTS, Json(body));
        }
        Error::Config(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        Error::Upstream {
            provider, status, ..
        } => (
            StatusCode::BAD_GATEWAY,
            format!("{provider} request failed (upstream status {status})"),
        ),
        Error::Internal(msg) => {
            error!(error = msg, "internal error during request");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        }
    };
    (status, Json(json!({ "error": message })))
}

fn ok(body: Value) -> ApiResponse {
    (StatusCode::OK, Json(body))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub personality: Option<String>,
    pub use_memory: Option<bool>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl ChatRequest {
    fn options(&self) -> TurnOptions {
        TurnOptions {
            personality: self.personality.clone(),
            use_memory: self.use_memory.unwrap_or(true),
            provider: self.provider.clone(),
            model: self.model.clone(),
            attachment: None,
        }
    }

    fn identity(&self, addr: &SocketAddr) -> String {
        self.user_id
            .clone()
            .unwrap_or_else(|| addr.ip().to_string())
    }
}

fn chat_result_body(result: &ChatResult) -> Value {
    json!({
        "response": result.response,
        "model_used": result.model_used,
        "provider": result.provider,
        "tokens_used": result.tokens_used,
        "conversation_length": result.conversation_length,
    })
}

/// POST /api/chat
pub async fn chat(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChatRequest>,
) -> ApiResponse {
    let user_id = body.identity(&addr);
    if let Err(e) = state.engine.admit(&addr.ip().to_string()) {
        return error_response(e);
    }

    match state.engine.turn(&user_id, &body.message, body.options()).await {
        Ok(result) => ok(chat_result_body(&result)),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct ChatWithImageRequest {
    #[serde(flatten)]
    pub chat: ChatRequest,
    pub image_data: String,
}

/// Accept either a full data URL or a bare base64 payload; bare payloads are
/// validated and wrapped.
fn normalize_image(image_data: &str) -> Result<String, Error> {
    if image_data.starts_with("data:image/") {
        return Ok(image_data.to_string());
    }
    BASE64
        .decode(image_data.trim())
        .map_err(|_| Error::Validation("image_data is not valid base64".to_string()))?;
    Ok(format!("data:image/jpeg;base64,{}", image_data.trim()))
}

/// POST /api/chat-with-image
pub async fn chat_with_image(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChatWithImageRequest>,
) -> ApiResponse {
    let user_id = body.chat.identity(&addr);
    if let Err(e) = state.engine.admit(&addr.ip().to_string()) {
        return error_response(e);
    }

    let data_url = match normalize_image(&body.image_data) {
        Ok(url) => url,
        Err(e) => return error_response(e),
    };

    let mut options = body.chat.options();
    options.attachment = Some(TurnAttachment::Image { data_url });

    match state.engine.turn(&user_id, &body.chat.message, options).await {
        Ok(result) => {
            let mut body = chat_result_body(&result);
            body["image_analyzed"] = json!(true);
            ok(body)
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct ChatWithDocumentRequest {
    #[serde(flatten)]
    pub chat: ChatRequest,
    pub document_data: String,
    pub document_name: String,
}

/// POST /api/chat-with-document
pub async fn chat_with_document(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChatWithDocumentRequest>,
) -> ApiResponse {
    let user_id = body.chat.identity(&addr);
    if let Err(e) = state.engine.admit(&addr.ip().to_string()) {
        return error_response(e);
    }

    let mut options = body.chat.options();
    options.attachment = Some(TurnAttachment::Document {
        name: body.document_name.clone(),
        text: body.document_data.clone(),
    });

    match state.engine.turn(&user_id, &body.chat.message, options).await {
        Ok(result) => {
            let mut body = chat_result_body(&result);
            body["document_analyzed"] = json!(true);
            ok(body)
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct CompareModelsRequest {
    pub message: String,
    pub models: Vec<String>,
}

/// POST /api/compare-models
pub async fn compare_models(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<CompareModelsRequest>,
) -> ApiResponse {
    if let Err(e) = state.engine.admit(&addr.ip().to_string()) {
        return error_response(e);
    }

    match state.engine.compare_models(&body.message, &body.models).await {
        Ok(responses) => ok(json!({ "responses": responses })),
        Err(e) => error_response(e),
    }
}

/// GET /api/models — the static catalog.
pub async fn models() -> ApiResponse {
    ok(json!({ "models": catalog::CATALOG }))
}

/// GET /api/personalities
pub async fn personalities() -> ApiResponse {
    let tags: Vec<Value> = Personality::ALL
        .iter()
        .map(|p| json!({ "tag": p.as_str(), "prompt": p.template() }))
        .collect();
    ok(json!({ "personalities": tags }))
}

#[derive(Deserialize)]
pub struct ChangePersonalityRequest {
    pub personality: String,
    pub user_id: Option<String>,
}

/// POST /api/personality — strict validation, unknown tags are a 400.
pub async fn change_personality(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ChangePersonalityRequest>,
) -> ApiResponse {
    let user_id = body.user_id.unwrap_or_else(|| addr.ip().to_string());
    match state.engine.change_personality(&user_id, &body.personality) {
        Ok(p) => ok(json!({ "status": "ok", "personality": p.as_str() })),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// POST /api/clear-conversation
pub async fn clear_conversation(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<UserQuery>,
) -> ApiResponse {
    let user_id = body.user_id.unwrap_or_else(|| addr.ip().to_string());
    state.engine.clear(&user_id);
    ok(json!({ "status": "cleared" }))
}

/// GET /api/conversation-info
pub async fn conversation_info(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<UserQuery>,
) -> ApiResponse {
    let user_id = query.user_id.unwrap_or_else(|| addr.ip().to_string());
    let info = state.engine.conversation_info(&user_id);
    ok(json!({
        "length": info.length,
        "personality": info.personality.as_str(),
    }))
}

/// GET /api/real-time-capabilities
pub async fn real_time_capabilities(State(state): State<SharedState>) -> ApiResponse {
    ok(json!({ "capabilities": state.engine.facts().capabilities() }))
}

/// GET /api/real-time/{category}
pub async fn real_time_lookup(
    State(state): State<SharedState>,
    Path(category): Path<String>,
    Query(params): Query<FactParams>,
) -> ApiResponse {
    let Some(category) = FactCategory::parse(&category) else {
        return error_response(Error::Validation(format!(
            "unknown real-time category: {category}"
        )));
    };

    let result = state.engine.facts().fetch(category, &params).await;
    ok(serde_json::to_value(&result).unwrap_or_else(|_| json!({ "status": "unavailable" })))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/status — which providers and fact categories are usable, without
/// echoing any key material.
pub async fn status(State(state): State<SharedState>) -> ApiResponse {
    let providers: Vec<&str> = state
        .engine
        .configured_providers()
        .into_iter()
        .map(|p| p.as_str())
        .collect();

    ok(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": providers,
        "real_time": state.engine.facts().capabilities(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
