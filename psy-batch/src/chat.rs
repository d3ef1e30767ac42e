//! One correlation-tagged chat completion exchange

use crate::score::{select_scores, Selection};
use psy_core::{ChatRequest, ChatResponse, Message};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Mint a globally unique, time-ordered correlation ID
pub fn new_chat_id() -> String {
    Uuid::now_v7().to_string()
}

/// A chat completion unit: request, and once resolved, response or error
///
/// A chat is pending until [`resolve`](Chat::resolve) records exactly one of
/// a response (with its scores) or an error message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Correlation ID, unique within a run
    pub id: String,
    /// The completion request, tagged with the ID as its user
    pub request: ChatRequest,
    /// The completion, when the call succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChatResponse>,
    /// Scores extracted from the completion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<f32>,
    /// Error text, when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent on the call, in milliseconds
    #[serde(default)]
    pub millis: u64,
}

impl Chat {
    /// Create a pending chat: an optional system message, then the prompt
    pub fn new(
        id: impl Into<String>,
        system: &str,
        prompt: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        let id = id.into();
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        let request = ChatRequest::new(model, messages)
            .with_temperature(temperature)
            .with_max_tokens(max_tokens)
            .with_user(id.clone());
        Self {
            id,
            request,
            ..Default::default()
        }
    }

    /// Whether neither a response nor an error has been recorded
    pub fn is_pending(&self) -> bool {
        self.response.is_none() && self.error.is_none()
    }

    /// Whether the call failed
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Record the outcome of a completion call
    ///
    /// Any earlier outcome is replaced, so a retried chat reflects only its
    /// latest attempt.
    pub fn resolve(
        &mut self,
        result: psy_core::Result<ChatResponse>,
        selection: Selection,
        elapsed: Duration,
    ) {
        self.millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(response) => {
                self.scores = response
                    .first_message_content()
                    .map(|text| select_scores(text, selection))
                    .unwrap_or_default();
                self.response = Some(response);
                self.error = None;
            }
            Err(e) => {
                self.scores.clear();
                self.response = None;
                self.error = Some(e.to_string());
            }
        }
    }

    /// Text for the result table's completion column
    ///
    /// Failed chats and responses without content yield their error text.
    /// Pending chats yield `None`.
    pub fn completion(&self) -> Option<Result<String, String>> {
        if let Some(error) = &self.error {
            return Some(Err(error.clone()));
        }
        let response = self.response.as_ref()?;
        Some(
            response
                .first_message_content()
                .map(str::to_string)
                .map_err(|e| e.to_string()),
        )
    }

    /// The user prompt, i.e. the last message content
    pub fn prompt(&self) -> &str {
        self.request
            .messages
            .last()
            .map_or("", |m| m.content.as_str())
    }
}

impl fmt::Display for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chat")?;
        if !self.id.is_empty() {
            write!(f, " {}", self.id)?;
        }
        if self.millis > 0 {
            write!(f, " ({}ms)", self.millis)?;
        }
        if !self.scores.is_empty() {
            write!(f, " scores: {:?}", self.scores)?;
        }
        if let Some(error) = &self.error {
            write!(f, " error: {error}")?;
        }
        writeln!(f)?;
        write!(f, "{}", self.request)?;
        if let Some(response) = &self.response {
            write!(f, "{response}")?;
        }
        Ok(())
    }
}
