//! HTTP proxy in front of the AI gateway and the search API.
//!
//! - `POST /api/chat`   `{message}` -> `{reply}`
//! - `POST /api/search` `{query}`   -> `{result}`
//!
//! Every failure answers 500 with a fixed fallback body; see [`crate::error`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{Endpoint, EndpointError, ProxyError};
use crate::gateway::{GatewayClient, SearchClient};

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SearchReply {
    pub result: String,
}

pub struct ServerState {
    pub config: Config,
    pub gateway: GatewayClient,
    pub search: SearchClient,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        let gateway = GatewayClient::new(&config.gateway_url, &config.model);
        let search = SearchClient::new(&config.search_url);
        Self { config, gateway, search }
    }
}

pub fn routes(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/search", post(search))
        .with_state(state)
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<ChatReply>, EndpointError> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::BadRequest(e).on(Endpoint::Chat))?;
    log::debug!("Incoming message: {}", request.message);

    let api_key = state.config.resolve_api_key();
    let shape = state
        .gateway
        .complete(&request.message, api_key.as_deref())
        .await
        .map_err(|e| e.on(Endpoint::Chat))?;

    Ok(Json(ChatReply { reply: shape.into_reply() }))
}

async fn search(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<SearchReply>, EndpointError> {
    let request: SearchRequest = serde_json::from_slice(&body)
        .map_err(|e| ProxyError::BadRequest(e).on(Endpoint::Search))?;
    log::debug!("Incoming search: {}", request.query);

    let result = state
        .search
        .search(&request.query)
        .await
        .map_err(|e| e.on(Endpoint::Search))?;

    Ok(Json(SearchReply { result }))
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let app = routes(Arc::new(ServerState::new(config)));

    log::info!("Proxy listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("Proxy on {} shut down", addr);
    Ok(())
}

/// Starts a proxy on an ephemeral loopback port for the editor's own use.
pub async fn spawn_local(config: Config) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, config, std::future::pending()).await {
            log::error!("Embedded proxy failed: {}", e);
        }
    });

    Ok((addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_ENV;
    use crate::error::{CHAT_FALLBACK, SEARCH_FALLBACK};
    use crate::gateway::NO_REPLY_PLACEHOLDER;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// A gateway that always answers with `body`.
    async fn fixed_gateway(body: Value) -> String {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        format!("http://{}/v1/chat/completions", spawn(router).await)
    }

    async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/v1/chat/completions", addr)
    }

    async fn proxy(config: Config) -> String {
        let (addr, _handle) = spawn_local(config).await.unwrap();
        format!("http://{}", addr)
    }

    fn config_with_gateway(url: String) -> Config {
        let mut config = Config::new();
        config.gateway_url = url;
        config
    }

    async fn post_chat(base: &str, body: Value) -> (reqwest::StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_chat_returns_message_content() {
        let gateway = fixed_gateway(json!({"choices": [{"message": {"content": "X"}}]})).await;
        let base = proxy(config_with_gateway(gateway)).await;

        let (status, body) = post_chat(&base, json!({"message": "hello"})).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body, json!({"reply": "X"}));
    }

    #[tokio::test]
    async fn test_chat_returns_text_shape() {
        let gateway = fixed_gateway(json!({"choices": [{"text": "Y"}]})).await;
        let base = proxy(config_with_gateway(gateway)).await;

        let (status, body) = post_chat(&base, json!({"message": "hello"})).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body, json!({"reply": "Y"}));
    }

    #[tokio::test]
    async fn test_chat_placeholder_when_no_choices() {
        let gateway = fixed_gateway(json!({"error": {"message": "bad key"}})).await;
        let base = proxy(config_with_gateway(gateway)).await;

        let (status, body) = post_chat(&base, json!({"message": "hello"})).await;
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body["reply"], NO_REPLY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_chat_network_failure_is_500() {
        let base = proxy(config_with_gateway(closed_port_url().await)).await;

        let (status, body) = post_chat(&base, json!({"message": "hello"})).await;
        assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"reply": CHAT_FALLBACK}));
    }

    #[tokio::test]
    async fn test_chat_malformed_upstream_is_500() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream down</html>") }),
        );
        let gateway = format!("http://{}/v1/chat/completions", spawn(router).await);
        let base = proxy(config_with_gateway(gateway)).await;

        let (status, body) = post_chat(&base, json!({"message": "hello"})).await;
        assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"reply": CHAT_FALLBACK}));
    }

    #[tokio::test]
    async fn test_chat_bad_request_body_is_500() {
        let gateway = fixed_gateway(json!({"choices": [{"text": "unused"}]})).await;
        let base = proxy(config_with_gateway(gateway)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/chat", base))
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"reply": CHAT_FALLBACK}));
    }

    #[tokio::test]
    async fn test_chat_forwards_model_and_credential() {
        let seen: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let router = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(request): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    captured.lock().unwrap().push((auth, request));
                    Json(json!({"choices": [{"message": {"content": "ok"}}]}))
                }
            }),
        );
        let mut config = config_with_gateway(format!(
            "http://{}/v1/chat/completions",
            spawn(router).await
        ));
        config.api_key = Some("test-key".to_string());
        let base = proxy(config).await;

        let (status, _) = post_chat(&base, json!({"message": "rewrite me"})).await;
        assert_eq!(status, reqwest::StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, request) = &seen[0];
        assert_eq!(request["model"], "openai/gpt-3.5-turbo");
        assert_eq!(request["messages"], json!([{"role": "user", "content": "rewrite me"}]));
        if std::env::var(API_KEY_ENV).is_err() {
            assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        }
    }

    #[tokio::test]
    async fn test_search_summarizes_instant_answer() {
        let router = Router::new().route(
            "/",
            get(|| async { Json(json!({"AbstractText": "Rust is a systems language."})) }),
        );
        let mut config = Config::new();
        config.search_url = format!("http://{}/", spawn(router).await);
        let base = proxy(config).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/search", base))
            .json(&json!({"query": "find rust"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: SearchReply = response.json().await.unwrap();
        assert_eq!(body.result, "Rust is a systems language.");
    }

    #[tokio::test]
    async fn test_search_failure_is_500() {
        let mut config = Config::new();
        config.search_url = closed_port_url().await;
        let base = proxy(config).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/search", base))
            .json(&json!({"query": "search anything"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"result": SEARCH_FALLBACK}));
    }
}
