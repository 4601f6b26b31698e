use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const CHAT_FALLBACK: &str = "Error talking to AI";
pub const SEARCH_FALLBACK: &str = "Error performing search";

/// Failures while serving a proxy request. None of them are retried; every
/// variant ends up as the same fallback body for the endpoint that hit it.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request body: {0}")]
    BadRequest(#[source] serde_json::Error),
    #[error("upstream unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned malformed JSON: {0}")]
    UpstreamFormat(#[source] serde_json::Error),
}

impl ProxyError {
    pub fn on(self, endpoint: Endpoint) -> EndpointError {
        EndpointError { endpoint, source: self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    Search,
}

#[derive(Debug)]
pub struct EndpointError {
    pub endpoint: Endpoint,
    pub source: ProxyError,
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let body = match self.endpoint {
            Endpoint::Chat => {
                log::error!("Gateway error: {}", self.source);
                json!({ "reply": CHAT_FALLBACK })
            }
            Endpoint::Search => {
                log::error!("Search API error: {}", self.source);
                json!({ "result": SEARCH_FALLBACK })
            }
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
