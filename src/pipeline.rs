//! The four-step query pipeline.
//!
//! ```text
//! query ─▶ refine? ─▶ embed ─▶ search ─▶ project ─▶ synthesize ─▶ (answer, results)
//! ```
//!
//! Each step awaits the previous one; there is no fan-out. The pipeline
//! borrows the conversation history and never writes to it. Recording the
//! turn is the caller's job (see [`crate::session`]). The first failing
//! step aborts the run with a [`PipelineError`] naming that step.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::embedding::{CachedEmbedder, Embedder, OpenAIEmbedder};
use crate::generation::{ChatModel, OpenAIChat};
use crate::models::{Message, SearchResult};
use crate::openai::{http_client, OpenAIEndpoint};
use crate::progress::{ProgressReporter, Stage};
use crate::refine::QueryRefiner;
use crate::results::project;
use crate::synthesize::AnswerSynthesizer;
use crate::vector::{PineconeIndex, VectorIndex, VectorSearch};

/// Why a pipeline run stopped.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("query refinement failed: {0:#}")]
    Refine(#[source] anyhow::Error),

    #[error("embedding failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    #[error("vector search failed: {0:#}")]
    Search(#[source] anyhow::Error),

    #[error("answer synthesis failed: {0:#}")]
    Synthesis(#[source] anyhow::Error),

    /// Set by [`crate::session::Session`] when a run outlives its timeout.
    #[error("query timed out after {0:?}")]
    TimedOut(Duration),
}

/// Per-run knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub top_k: usize,
    pub refine: bool,
}

/// What a successful run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// The query as the user typed it.
    pub query: String,
    /// The query that was embedded and answered (equal to `query` when
    /// refinement is off).
    pub refined_query: String,
    pub answer: String,
    pub results: Vec<SearchResult>,
}

pub struct Pipeline {
    refiner: QueryRefiner,
    embedder: CachedEmbedder,
    search: VectorSearch,
    synthesizer: AnswerSynthesizer,
}

impl Pipeline {
    pub fn new(
        refiner: QueryRefiner,
        embedder: CachedEmbedder,
        search: VectorSearch,
        synthesizer: AnswerSynthesizer,
    ) -> Self {
        Self {
            refiner,
            embedder,
            search,
            synthesizer,
        }
    }

    /// Assemble a pipeline from explicit service seams.
    pub fn with_services(
        config: &Config,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self::new(
            QueryRefiner::new(Arc::clone(&chat), &config.refine),
            CachedEmbedder::new(embedder),
            VectorSearch::new(index, config.vector.dims),
            AnswerSynthesizer::new(chat, &config.synthesis),
        )
    }

    /// Build HTTP-backed clients for the configured OpenAI and Pinecone services.
    ///
    /// # Errors
    ///
    /// Returns an error if an API key environment variable is missing or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let endpoint = OpenAIEndpoint::from_config(&config.openai)?;
        let openai_client = http_client(config.openai.timeout_secs)?;
        let vector_client = http_client(config.vector.timeout_secs)?;

        let chat: Arc<dyn ChatModel> =
            Arc::new(OpenAIChat::new(openai_client.clone(), endpoint.clone()));
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(
            openai_client,
            endpoint,
            config.embedding.model.clone(),
        ));
        let index: Arc<dyn VectorIndex> =
            Arc::new(PineconeIndex::from_config(vector_client, &config.vector)?);

        Ok(Self::with_services(config, chat, embedder, index))
    }

    pub fn embedder(&self) -> &CachedEmbedder {
        &self.embedder
    }

    /// Run one query against `history`.
    pub async fn run(
        &self,
        history: &[Message],
        query: &str,
        options: RunOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineOutput, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::InvalidInput("query must not be empty".into()));
        }
        if options.top_k == 0 {
            return Err(PipelineError::InvalidInput("top_k must be >= 1".into()));
        }
        let started = Instant::now();

        let refined_query = if options.refine {
            progress.report(Stage::RefineStarted);
            self.refiner
                .refine(history, query)
                .await
                .map_err(PipelineError::Refine)?
        } else {
            query.to_string()
        };

        progress.report(Stage::EmbeddingStarted);
        let vector = self
            .embedder
            .embed(&refined_query)
            .await
            .map_err(PipelineError::Embedding)?;

        progress.report(Stage::SearchStarted);
        let matches = self
            .search
            .search(&vector, options.top_k)
            .await
            .map_err(PipelineError::Search)?;
        let results = project(&matches);

        progress.report(Stage::SynthesisStarted);
        let answer = self
            .synthesizer
            .synthesize(history, &refined_query, &results)
            .await
            .map_err(PipelineError::Synthesis)?;

        progress.report(Stage::Done);
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            results = results.len(),
            refined = options.refine,
            "query pipeline complete"
        );

        Ok(PipelineOutput {
            query: query.to_string(),
            refined_query,
            answer,
            results,
        })
    }
}
