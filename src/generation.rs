//! Text generation service seam.
//!
//! [`ChatModel`] takes a model identifier, a temperature, and an ordered list
//! of role-tagged messages, and returns a single text completion. The query
//! refiner and the answer synthesizer both go through it with their own
//! settings.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::models::Message;
use crate::openai::OpenAIEndpoint;

/// A single chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<Message>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the text of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Chat client for the OpenAI (or Azure OpenAI) chat completions endpoint.
pub struct OpenAIChat {
    client: reqwest::Client,
    endpoint: OpenAIEndpoint,
}

impl OpenAIChat {
    pub fn new(client: reqwest::Client, endpoint: OpenAIEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        debug!(
            model = %request.model,
            temperature = request.temperature,
            messages = request.messages.len(),
            "requesting chat completion"
        );
        let body = serde_json::to_value(request)?;
        let json = self
            .endpoint
            .post_json(&self.client, &request.model, "chat/completions", &body)
            .await?;
        parse_completion(&json)
    }
}

fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}
