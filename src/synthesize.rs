//! Grounded answer synthesis.
//!
//! The synthesizer replays the conversation, appends the domain directive
//! as a system turn, and then sends one user turn holding the (refined) query
//! and the retrieved context:
//!
//! ```text
//! Query: <query>
//!
//! Filename: <filename 1>
//! Text: <text 1>
//!
//! Filename: <filename 2>
//! Text: <text 2>
//! ```
//!
//! The history passed in is the conversation before this turn, so the user's
//! raw wording is not part of it. When refinement is on, the model sees only
//! the refined query for the current turn.
//!
//! The topical restriction lives only in the directive. Nothing here checks
//! whether the answer stays on topic.

use anyhow::Result;
use std::sync::Arc;

use crate::config::SynthesisConfig;
use crate::generation::{ChatModel, ChatRequest};
use crate::models::{Message, SearchResult};

/// Concatenate results into the context block, in result order.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("Filename: {}\nText: {}\n", r.filename, r.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct AnswerSynthesizer {
    chat: Arc<dyn ChatModel>,
    model: String,
    temperature: f32,
    directive: String,
}

impl AnswerSynthesizer {
    pub fn new(chat: Arc<dyn ChatModel>, config: &SynthesisConfig) -> Self {
        Self {
            chat,
            model: config.model.clone(),
            temperature: config.temperature,
            directive: config.directive.clone(),
        }
    }

    pub fn request(
        &self,
        history: &[Message],
        query: &str,
        results: &[SearchResult],
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.extend_from_slice(history);
        messages.push(Message::system(self.directive.clone()));
        messages.push(Message::user(format!(
            "Query: {}\n\n{}",
            query,
            build_context(results)
        )));
        ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages,
        }
    }

    pub async fn synthesize(
        &self,
        history: &[Message],
        query: &str,
        results: &[SearchResult],
    ) -> Result<String> {
        self.chat
            .complete(&self.request(history, query, results))
            .await
    }
}
