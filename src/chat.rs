//! Chat sidebar: message log, input line and the search/chat router.

use serde::{Deserialize, Serialize};

pub const SEARCH_LABEL: &str = "🔎 Web Search Result:";
pub const SEND_FAILED: &str = "⚠️ Error: could not reach AI or search API";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Chat,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub kind: Option<MessageKind>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self { sender: Sender::User, text: text.to_string(), kind: None }
    }

    pub fn ai(text: &str, kind: Option<MessageKind>) -> Self {
        Self { sender: Sender::Ai, text: text.to_string(), kind }
    }
}

/// Which backend a message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    Search,
}

impl Route {
    /// Plain substring match on the lowercased text. "don't search" still
    /// routes to search.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("find") || lower.contains("search") {
            Route::Search
        } else {
            Route::Chat
        }
    }
}

/// A message the panel wants sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub route: Route,
    pub text: String,
}

/// Outcome of one round-trip, as delivered back to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Reply(String),
    SearchResult(String),
    Failed,
}

#[derive(Debug, Default)]
pub struct ChatPanel {
    messages: Vec<ChatMessage>,
    pub input: String,
    pub cursor: usize,
    pub scroll: u16,
    in_flight: usize,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Takes the input line, logs it as a user message and returns what to
    /// send. Whitespace-only input is left alone.
    pub fn submit(&mut self) -> Option<Outgoing> {
        if self.input.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.messages.push(ChatMessage::user(&text));
        self.in_flight += 1;

        Some(Outgoing { route: Route::classify(&text), text })
    }

    /// Appends the answer in arrival order. Returns text to insert into the
    /// document, if any.
    pub fn receive(&mut self, outcome: ChatOutcome) -> Option<String> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            ChatOutcome::Reply(reply) => {
                self.messages.push(ChatMessage::ai(&reply, Some(MessageKind::Chat)));
                None
            }
            ChatOutcome::SearchResult(result) => {
                let text = format!("{} {}", SEARCH_LABEL, result);
                self.messages.push(ChatMessage::ai(&text, Some(MessageKind::Search)));
                Some(text)
            }
            ChatOutcome::Failed => {
                self.messages.push(ChatMessage::ai(SEND_FAILED, None));
                None
            }
        }
    }

    pub fn last_ai_reply(&self) -> Option<&ChatMessage> {
        self
            .messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Ai && m.kind.is_some())
    }
}
