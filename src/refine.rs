//! Query refinement.
//!
//! Rewrites the user's latest query into a search-optimized form, using the
//! conversation so far to resolve references like "that card" or "what about
//! the fee".

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::RefineConfig;
use crate::generation::{ChatModel, ChatRequest};
use crate::models::Message;

pub struct QueryRefiner {
    chat: Arc<dyn ChatModel>,
    model: String,
    temperature: f32,
    instruction: String,
}

impl QueryRefiner {
    pub fn new(chat: Arc<dyn ChatModel>, config: &RefineConfig) -> Self {
        Self {
            chat,
            model: config.model.clone(),
            temperature: config.temperature,
            instruction: config.instruction.clone(),
        }
    }

    /// Build the request: instruction, then history, then the new query.
    pub fn request(&self, history: &[Message], query: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.instruction.clone()));
        messages.extend_from_slice(history);
        messages.push(Message::user(query));
        ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages,
        }
    }

    /// Return the refined query text.
    ///
    /// # Errors
    ///
    /// Propagates service errors. A blank completion is also an error, since
    /// it cannot be embedded.
    pub async fn refine(&self, history: &[Message], query: &str) -> Result<String> {
        let refined = self.chat.complete(&self.request(history, query)).await?;
        let refined = refined.trim();
        if refined.is_empty() {
            bail!("query refinement returned an empty completion");
        }
        Ok(refined.to_string())
    }
}
