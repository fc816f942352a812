use axum::{extract::Json, http::StatusCode, response::IntoResponse, routing::post, Router};
use chatrelay_common::Error;
use chatrelay_config::AppConfig;
use chatrelay_engine::{Engine, TurnAttachment, TurnOptions};
use serde_json::json;
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock OpenAI-style upstream. Fails "gpt-4o" with a retryable status; for
/// everything else it answers with a summary of the prompt it received, so
/// tests can observe how much context actually went out.
async fn mock_completions(Json(payload): Json<serde_json::Value>) -> impl IntoResponse {
    let model = payload["model"].as_str().unwrap_or_default().to_string();

    if model == "gpt-4o" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": { "message": "overloaded" } })),
        )
            .into_response();
    }

    let messages = payload["messages"].as_array().cloned().unwrap_or_default();
    let system_has_disclosure = messages
        .first()
        .and_then(|m| m["content"].as_str())
        .map(|s| s.contains("no such data is attached"))
        .unwrap_or(false);
    // Count everything after the system turn: history plus the new message.
    let chat_messages = messages.len().saturating_sub(1);

    Json(json!({
        "id": "chatcmpl-1",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": format!("echo:{chat_messages}:{system_has_disclosure}")
            },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 5, "completion_tokens": 5, "total_tokens": 10 }
    }))
    .into_response()
}

async fn start_engine() -> (Engine, oneshot::Sender<()>) {
    let (tx, rx) = oneshot::channel::<()>();
    let app = Router::new().route("/chat/completions", post(mock_completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .unwrap();
    });

    let mut config = AppConfig::default();
    config.llm.openai_api_key = Some("test-key".to_string());
    config.llm.openai_base_url = Some(format!("http://{addr}"));

    (Engine::new(&config), tx)
}

fn mini() -> TurnOptions {
    TurnOptions {
        model: Some("gpt-4o-mini".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn successful_turn_appends_user_and_assistant_pair() {
    let (engine, _shutdown) = start_engine().await;

    let result = engine.turn("alice", "hello there", mini()).await.unwrap();

    assert_eq!(result.conversation_length, 2);
    assert_eq!(result.model_used, "gpt-4o-mini");
    assert_eq!(result.tokens_used, 10);
    assert_eq!(engine.conversation_info("alice").length, 2);
}

#[tokio::test]
async fn fallback_turn_appends_exactly_one_pair() {
    let (engine, _shutdown) = start_engine().await;

    // Default model gpt-4o fails retryably; the fallback answers.
    let result = engine
        .turn("bob", "hello", TurnOptions::default())
        .await
        .unwrap();

    assert_eq!(result.model_used, "gpt-4o-mini");
    assert_eq!(result.conversation_length, 2);
}

#[tokio::test]
async fn failed_dispatch_appends_nothing() {
    let (engine, _shutdown) = start_engine().await;

    // gpt-3.5-turbo succeeds upstream, but claude is unconfigured here.
    let err = engine
        .turn(
            "carol",
            "hello",
            TurnOptions {
                provider: Some("claude".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(engine.conversation_info("carol").length, 0);
}

#[tokio::test]
async fn use_memory_false_skips_read_but_still_writes() {
    let (engine, _shutdown) = start_engine().await;

    // Turn 1: empty history, payload carries 1 chat message.
    let r1 = engine.turn("dave", "first", mini()).await.unwrap();
    assert!(r1.response.starts_with("echo:1:"));

    // Turn 2 with memory off: history (2 entries) is not read, payload again
    // carries only the new message...
    let r2 = engine
        .turn(
            "dave",
            "second",
            TurnOptions {
                use_memory: false,
                ..mini()
            },
        )
        .await
        .unwrap();
    assert!(r2.response.starts_with("echo:1:"));
    // ...but the turn was still recorded.
    assert_eq!(r2.conversation_length, 4);

    // Turn 3 with memory on sees all four prior messages.
    let r3 = engine.turn("dave", "third", mini()).await.unwrap();
    assert!(r3.response.starts_with("echo:5:"));
}

#[tokio::test]
async fn long_history_is_trimmed_to_ten_messages_in_prompt() {
    let (engine, _shutdown) = start_engine().await;

    // Seven turns leave 14 stored messages, above the 10-message prompt
    // window (counting user and assistant entries individually).
    for i in 0..7 {
        engine.turn("kate", &format!("turn {i}"), mini()).await.unwrap();
    }
    assert_eq!(engine.conversation_info("kate").length, 14);

    // Next dispatch carries the 10 newest plus the fresh message.
    let result = engine.turn("kate", "latest", mini()).await.unwrap();
    assert!(result.response.starts_with("echo:11:"), "got {}", result.response);
}

#[tokio::test]
async fn missing_weather_credential_degrades_not_crashes() {
    let (engine, _shutdown) = start_engine().await;

    // The message triggers the weather category, but no OPENWEATHER_API_KEY
    // is configured: the turn succeeds and the system prompt carries the
    // generic disclosure note instead of weather data.
    let result = engine
        .turn("erin", "what is the weather in London?", mini())
        .await
        .unwrap();

    assert!(result.response.ends_with(":true"), "got {}", result.response);
    assert_eq!(result.conversation_length, 2);
}

#[tokio::test]
async fn image_to_claude_is_validation_error_with_no_writes() {
    let (engine, _shutdown) = start_engine().await;

    let err = engine
        .turn(
            "frank",
            "what is this?",
            TurnOptions {
                provider: Some("claude".to_string()),
                attachment: Some(TurnAttachment::Image {
                    data_url: "data:image/png;base64,aGk=".to_string(),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(engine.conversation_info("frank").length, 0);
}

#[tokio::test]
async fn document_attachment_folds_into_message() {
    let (engine, _shutdown) = start_engine().await;

    engine
        .turn(
            "grace",
            "summarize this",
            TurnOptions {
                attachment: Some(TurnAttachment::Document {
                    name: "notes.txt".to_string(),
                    text: "alpha beta gamma".to_string(),
                }),
                ..mini()
            },
        )
        .await
        .unwrap();

    // The stored user message is the folded form.
    let info = engine.conversation_info("grace");
    assert_eq!(info.length, 2);
}

#[tokio::test]
async fn personality_change_is_strict_and_sticky() {
    let (engine, _shutdown) = start_engine().await;

    assert!(engine.change_personality("henry", "sarcastic").is_err());
    engine.change_personality("henry", "creative").unwrap();
    assert_eq!(
        engine.conversation_info("henry").personality.as_str(),
        "creative"
    );
}

#[tokio::test]
async fn clear_resets_history() {
    let (engine, _shutdown) = start_engine().await;

    engine.turn("iris", "hello", mini()).await.unwrap();
    assert_eq!(engine.conversation_info("iris").length, 2);

    engine.clear("iris");
    assert_eq!(engine.conversation_info("iris").length, 0);
    // Clearing again is a no-op.
    engine.clear("iris");
}

#[tokio::test]
async fn compare_models_isolates_failures() {
    let (engine, _shutdown) = start_engine().await;

    let models = vec![
        "gpt-4o-mini".to_string(),
        "gpt-4o".to_string(),                  // fails upstream, rescued by fallback
        "claude-3-haiku-20240307".to_string(), // unconfigured provider
        "made-up-model".to_string(),
    ];
    let responses = engine.compare_models("hello", &models).await.unwrap();

    assert_eq!(responses.len(), 4);
    assert!(responses["gpt-4o-mini"].starts_with("echo:"));
    assert!(responses["gpt-4o"].starts_with("echo:"));
    assert!(responses["claude-3-haiku-20240307"].starts_with("error:"));
    assert!(responses["made-up-model"].starts_with("error:"));
    // Nothing was written to any conversation.
    assert_eq!(engine.conversation_info("anonymous").length, 0);
}

#[tokio::test]
async fn rate_limit_gate_rejects_after_limit() {
    let (engine, _shutdown) = start_engine().await;

    let admitted = (0..15).filter(|_| engine.admit("10.0.0.1").is_ok()).count();
    assert_eq!(admitted, 10);

    match engine.admit("10.0.0.1").unwrap_err() {
        Error::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
        other => panic!("expected rate limit error, got {other:?}"),
    }

    // Other clients are unaffected.
    assert!(engine.admit("10.0.0.2").is_ok());
}
