use std::time::Duration;

use axum::http::{header, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::api;
use crate::state::SharedState;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

async fn security_headers(request: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

/// Build the full route table and spawn the rate-window janitor.
pub fn build_router(state: SharedState) -> Router {
    let janitor_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            janitor_state.engine.prune_rate_windows();
            debug!("pruned idle rate-limit windows");
        }
    });

    Router::new()
        .route("/health", get(api::health))
        .route("/api/status", get(api::status))
        .route("/api/chat", post(api::chat))
        .route("/api/chat-with-image", post(api::chat_with_image))
        .route("/api/chat-with-document", post(api::chat_with_document))
        .route("/api/compare-models", post(api::compare_models))
        .route("/api/models", get(api::models))
        .route("/api/personalities", get(api::personalities))
        .route("/api/personality", post(api::change_personality))
        .route("/api/clear-conversation", post(api::clear_conversation))
        .route("/api/conversation-info", get(api::conversation_info))
        .route("/api/real-time-capabilities", get(api::real_time_capabilities))
        .route("/api/real-time/{category}", get(api::real_time_lookup))
        .fallback(api::not_found)
        .layer(middleware::from_fn(security_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
