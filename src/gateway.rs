use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProxyError;

pub const NO_REPLY_PLACEHOLDER: &str = "⚠️ No response from AI";
pub const NO_RESULTS_PLACEHOLDER: &str = "No results found";

#[derive(Serialize)]
struct GatewayMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    model: &'a str,
    messages: Vec<GatewayMessage<'a>>,
}

/// The reply shapes a chat-completion gateway may answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyShape {
    /// `choices[0].message.content`
    Message(String),
    /// `choices[0].text`, legacy completion format
    Text(String),
    Missing,
}

impl ReplyShape {
    /// Decodes in fixed order: message content, then text, then nothing.
    /// Empty strings count as absent.
    pub fn decode(body: &Value) -> Self {
        let choice = body.get("choices").and_then(|c| c.get(0));
        let non_empty = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(content) = non_empty(choice.and_then(|c| c.pointer("/message/content"))) {
            return ReplyShape::Message(content);
        }
        if let Some(text) = non_empty(choice.and_then(|c| c.get("text"))) {
            return ReplyShape::Text(text);
        }
        ReplyShape::Missing
    }

    pub fn into_reply(self) -> String {
        match self {
            ReplyShape::Message(s) | ReplyShape::Text(s) => s,
            ReplyShape::Missing => NO_REPLY_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    url: String,
    model: String,
}

impl GatewayClient {
    pub fn new(url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            model: model.to_string(),
        }
    }

    /// Single best-effort forward of one user message. The upstream status is
    /// not inspected; whatever JSON comes back is searched for a reply.
    pub async fn complete(&self, message: &str, api_key: Option<&str>) -> Result<ReplyShape, ProxyError> {
        let request = GatewayRequest {
            model: &self.model,
            messages: vec![GatewayMessage {
                role: "user",
                content: message,
            }],
        };

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request);
        match api_key {
            Some(key) => builder = builder.bearer_auth(key),
            None => log::warn!("No gateway credential set; forwarding without one"),
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(ProxyError::UpstreamFormat)?;
        log::debug!("Gateway response ({}): {}", status, body);

        Ok(ReplyShape::decode(&body))
    }
}

#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    url: String,
}

impl SearchClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<String, ProxyError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes).map_err(ProxyError::UpstreamFormat)?;
        Ok(summarize_search(&body))
    }
}

/// Picks one line of text out of an instant-answer payload.
pub fn summarize_search(body: &Value) -> String {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    field("AbstractText")
        .or_else(|| field("Answer"))
        .or_else(|| {
            body.get("RelatedTopics")
                .and_then(Value::as_array)
                .and_then(|topics| {
                    topics.iter().find_map(|t| {
                        t.get("Text")
                            .and_then(Value::as_str)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                    })
                })
        })
        .unwrap_or_else(|| NO_RESULTS_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message_content() {
        let body = json!({"choices": [{"message": {"content": "X"}}]});
        assert_eq!(ReplyShape::decode(&body), ReplyShape::Message("X".into()));
    }

    #[test]
    fn test_decode_text_without_message() {
        let body = json!({"choices": [{"text": "Y"}]});
        assert_eq!(ReplyShape::decode(&body), ReplyShape::Text("Y".into()));
    }

    #[test]
    fn test_empty_content_falls_through_to_text() {
        let body = json!({"choices": [{"message": {"content": ""}, "text": "Z"}]});
        assert_eq!(ReplyShape::decode(&body), ReplyShape::Text("Z".into()));
    }

    #[test]
    fn test_error_payload_is_missing() {
        let body = json!({"error": {"message": "No auth credentials found", "code": 401}});
        assert_eq!(ReplyShape::decode(&body), ReplyShape::Missing);
        assert_eq!(ReplyShape::Missing.into_reply(), NO_REPLY_PLACEHOLDER);
    }

    #[test]
    fn test_non_string_content_is_ignored() {
        let body = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(ReplyShape::decode(&body), ReplyShape::Missing);
    }

    #[test]
    fn test_summarize_prefers_abstract() {
        let body = json!({
            "AbstractText": "Rust is a language.",
            "Answer": "ignored",
            "RelatedTopics": [{"Text": "also ignored"}]
        });
        assert_eq!(summarize_search(&body), "Rust is a language.");
    }

    #[test]
    fn test_summarize_related_topic_fallback() {
        let body = json!({
            "AbstractText": "",
            "Answer": "",
            "RelatedTopics": [{"Name": "group", "Topics": []}, {"Text": "Ferris the crab"}]
        });
        assert_eq!(summarize_search(&body), "Ferris the crab");
    }

    #[test]
    fn test_summarize_nothing() {
        assert_eq!(summarize_search(&json!({})), NO_RESULTS_PLACEHOLDER);
    }
}
