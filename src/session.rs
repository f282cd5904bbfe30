//! Conversation state and the interactive session that owns it.
//!
//! A [`Session`] holds the only mutable state in the application: the
//! append-only [`Conversation`] and (through its [`Pipeline`]) the embedding
//! cache. Both live exactly as long as the session value.

use std::time::Duration;
use tracing::warn;

use crate::models::{Message, Role};
use crate::pipeline::{Pipeline, PipelineError, PipelineOutput, RunOptions};
use crate::progress::ProgressReporter;

/// Ordered, append-only log of role-tagged messages, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Result of one submitted turn.
#[derive(Debug)]
pub enum TurnOutcome {
    Answered(PipelineOutput),
    Failed(PipelineError),
}

impl TurnOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}

pub struct Session {
    pipeline: Pipeline,
    conversation: Conversation,
    defaults: RunOptions,
    timeout: Option<Duration>,
}

impl Session {
    pub fn new(pipeline: Pipeline, defaults: RunOptions) -> Self {
        Self {
            pipeline,
            conversation: Conversation::new(),
            defaults,
            timeout: None,
        }
    }

    /// Bound every turn's pipeline run. A run that exceeds it fails with
    /// [`PipelineError::TimedOut`] and is recorded like any upstream failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn defaults(&self) -> RunOptions {
        self.defaults
    }

    /// Run one turn and record it.
    ///
    /// The pipeline sees the conversation as it was before this turn. On
    /// success the user query and the answer are appended. On an upstream
    /// failure the query is appended followed by an assistant notice
    /// describing the error; a run cut off by the session timeout counts as
    /// such a failure. Invalid input records nothing. If the returned
    /// future is dropped before completion, nothing is recorded.
    pub async fn ask(
        &mut self,
        query: &str,
        options: Option<RunOptions>,
        progress: &dyn ProgressReporter,
    ) -> TurnOutcome {
        let options = options.unwrap_or(self.defaults);
        let run = self
            .pipeline
            .run(self.conversation.messages(), query, options, progress);
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or(Err(PipelineError::TimedOut(limit))),
            None => run.await,
        };

        match outcome {
            Ok(output) => {
                self.conversation.push(Message::user(query));
                self.conversation
                    .push(Message::new(Role::Assistant, output.answer.clone()));
                TurnOutcome::Answered(output)
            }
            Err(err @ PipelineError::InvalidInput(_)) => TurnOutcome::Failed(err),
            Err(err) => {
                warn!(error = %err, "query turn failed");
                self.conversation.push(Message::user(query));
                self.conversation
                    .push(Message::assistant(error_notice(&err)));
                TurnOutcome::Failed(err)
            }
        }
    }
}

/// Assistant-visible text recorded for a failed turn.
pub fn error_notice(err: &PipelineError) -> String {
    format!("An error occurred: {}", err)
}
