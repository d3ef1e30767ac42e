//! Chat completion request and response types

use crate::error::{Error, Result};
use crate::types::message::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to the chat completion endpoint
///
/// Only the text-completion subset of the API is modelled; unset sampling
/// parameters are omitted from the wire format so the provider defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model ID, e.g. "gpt-4o"
    pub model: String,
    /// Ordered conversation messages
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Top-p nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Number of completions to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Presence penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// End-user tag; the batch pipeline stores the correlation id here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatRequest {
    /// Create a request for the given model and messages
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Set the sampling temperature; zero leaves the provider default
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = (temperature > 0.0).then_some(temperature);
        self
    }

    /// Set the token cap; zero means unlimited
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = (max_tokens > 0).then_some(max_tokens);
        self
    }

    /// Set the end-user tag
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

impl fmt::Display for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--------------------\n{}", self.model)?;
        if let Some(temperature) = self.temperature {
            write!(f, " temp={temperature:.2}")?;
        }
        if let Some(max_tokens) = self.max_tokens {
            write!(f, " max={max_tokens}")?;
        }
        if let Some(user) = &self.user {
            write!(f, " user={user}")?;
        }
        writeln!(f)?;
        for message in &self.messages {
            write!(f, "{message}")?;
        }
        Ok(())
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prompt={} completion={} total={}",
            self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}

/// One completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageChoice {
    /// The generated message
    pub message: Message,
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Why generation stopped, e.g. "stop"
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A chat completion response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Response ID, e.g. "chatcmpl-6p9XYPYSTTRi0xEviKjjilqrWU2Ve"
    #[serde(default)]
    pub id: String,
    /// Object type, e.g. "chat.completion"
    #[serde(default)]
    pub object: String,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created: i64,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Token usage
    #[serde(default)]
    pub usage: Usage,
    /// Completion choices
    #[serde(default)]
    pub choices: Vec<MessageChoice>,
}

impl ChatResponse {
    /// Content of the first choice's message
    ///
    /// # Errors
    ///
    /// Returns a response error when there are no choices or the first
    /// message is empty.
    pub fn first_message_content(&self) -> Result<&str> {
        let choice = self
            .choices
            .first()
            .ok_or_else(|| Error::validation("chat: no choices found"))?;
        if choice.message.content.is_empty() {
            return Err(Error::validation("chat: no content found"));
        }
        Ok(&choice.message.content)
    }
}

impl fmt::Display for ChatResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for choice in &self.choices {
            write!(f, "{}", choice.message)?;
        }
        write!(f, "--------------------\n{} {}", self.model, self.usage)?;
        if let Some(reason) = self.choices.first().and_then(|c| c.finish_reason.as_ref()) {
            write!(f, " finish={reason}")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_omits_unset_parameters() {
        let request = ChatRequest::new("gpt-4o", vec![Message::user("Hi")])
            .with_temperature(0.0)
            .with_max_tokens(0);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Hi"}],
            })
        );
    }

    #[test]
    fn test_request_with_parameters() {
        let request = ChatRequest::new("gpt-4o", vec![Message::user("Hi")])
            .with_temperature(0.5)
            .with_max_tokens(64)
            .with_user("01J9Z");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["temperature"], serde_json::json!(0.5));
        assert_eq!(json["max_tokens"], serde_json::json!(64));
        assert_eq!(json["user"], serde_json::json!("01J9Z"));
    }

    #[test]
    fn test_first_message_content() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_677_966_478,
            "model": "gpt-4o",
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12},
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Score: 4"}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(response.first_message_content().unwrap(), "Score: 4");
        assert_eq!(response.usage.to_string(), "prompt=10 completion=2 total=12");

        let empty = ChatResponse::default();
        assert!(empty.first_message_content().is_err());
    }
}
