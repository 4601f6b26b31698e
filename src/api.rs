use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Client for the proxy's `/api/chat` and `/api/search` routes.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    reply: String,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The proxy answers failures with a 500 that still carries a `reply`,
    /// so the body is decoded regardless of status.
    pub async fn chat(&self, message: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChatBody { message })
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Chat request returned {}", response.status());
        }

        let body: ChatResponse = response.json().await?;
        Ok(body.reply)
    }

    pub async fn search(&self, query: &str) -> Result<String> {
        let url = format!("{}/api/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SearchBody { query })
            .send()
            .await?;

        if !response.status().is_success() {
            log::warn!("Search request returned {}", response.status());
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.result)
    }
}
