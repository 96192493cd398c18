//! Shared fixtures: a fake upstream completion API and relay wiring.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};

use openrouter_chat_relay::AppState;
use openrouter_chat_relay::llm::{ChatCompletionsDriver, LlmSettings, Provider};

/// How the fake upstream answers.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// 200 with this assistant text.
    Reply(&'static str),
    /// This status with this body.
    Status(u16, &'static str),
    /// Sleep before replying.
    Stall(Duration),
}

/// One request the fake upstream received.
#[derive(Debug, Clone)]
pub struct Captured {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct UpstreamState {
    behavior: Behavior,
    captured: Arc<Mutex<Vec<Captured>>>,
}

/// A running fake `/v1/chat/completions` server.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    pub base_url: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub async fn start(behavior: Behavior) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(UpstreamState {
                behavior,
                captured: Arc::clone(&captured),
            });

        Self {
            base_url: serve(app).await,
            captured,
        }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    /// Settings pointing a driver at this upstream with a test key.
    pub fn settings(&self) -> LlmSettings {
        LlmSettings {
            base_url: self.base_url.clone(),
            api_key: Some("test-key".to_string()),
            model: "test/model".to_string(),
            provider: Provider::Generic,
            ..LlmSettings::default()
        }
    }
}

async fn completions(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.captured.lock().unwrap().push(Captured {
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        body,
    });

    match state.behavior {
        Behavior::Reply(text) => Json(json!({
            "id": "gen-1",
            "model": "test/model-2025",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }))
        .into_response(),
        Behavior::Status(code, body) => {
            (StatusCode::from_u16(code).unwrap(), body.to_string()).into_response()
        }
        Behavior::Stall(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({"choices": [{"message": {"content": "too late"}}]})).into_response()
        }
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Relay state backed by the real HTTP driver.
pub fn relay_state(settings: LlmSettings) -> AppState {
    AppState {
        llm: Arc::new(ChatCompletionsDriver::new(settings)),
    }
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
