//! TOML configuration parsing and validation.
//!
//! Every section except `[vector]` is optional and falls back to the
//! reference deployment (OpenAI models, 1536-dimensional index). API keys are
//! never stored in the file; each section names the environment variable
//! that holds its key.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Refusal the synthesis model is told to return for off-topic questions.
pub const REFUSAL: &str = "Your question is unrelated, please ask me another question";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub refine: RefineConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    pub vector: VectorConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default = "default_flavor")]
    pub flavor: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            flavor: default_flavor(),
            base_url: default_base_url(),
            api_version: None,
            api_key_env: default_openai_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_flavor() -> String {
    "openai".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefineConfig {
    #[serde(default = "default_refine_model")]
    pub model: String,
    #[serde(default = "default_refine_temperature")]
    pub temperature: f32,
    #[serde(default = "default_refine_instruction")]
    pub instruction: String,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            model: default_refine_model(),
            temperature: default_refine_temperature(),
            instruction: default_refine_instruction(),
        }
    }
}

fn default_refine_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_refine_temperature() -> f32 {
    0.5
}
fn default_refine_instruction() -> String {
    "Refine this query for semantic search.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_model")]
    pub model: String,
    #[serde(default = "default_synthesis_temperature")]
    pub temperature: f32,
    #[serde(default = "default_directive")]
    pub directive: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: default_synthesis_model(),
            temperature: default_synthesis_temperature(),
            directive: default_directive(),
        }
    }
}

fn default_synthesis_model() -> String {
    "gpt-4o".to_string()
}
fn default_synthesis_temperature() -> f32 {
    0.2
}

/// The Hong Kong credit card directive used when none is configured.
pub fn default_directive() -> String {
    format!(
        "You are a helpful assistant to answer about Credit card terms for banks only in Hong Kong. \
         Use the following results to answer the user's query, and you may search for more \
         relatable context to give the best answer to your user, and if chat history is not \
         related you can define context from query. Only answer queries related to Credit Card \
         in Hong Kong. Answer unrelated queries as \"{}\"",
        REFUSAL
    )
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorConfig {
    pub host: String,
    #[serde(default = "default_pinecone_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_pinecone_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}
fn default_dims() -> usize {
    1536
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_refine")]
    pub refine: bool,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            refine: default_refine(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_refine() -> bool {
    true
}
fn default_query_timeout_secs() -> u64 {
    120
}

impl OpenAIConfig {
    pub fn is_azure(&self) -> bool {
        self.flavor == "azure"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate a configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate service endpoint
    match config.openai.flavor.as_str() {
        "openai" | "azure" => {}
        other => bail!(
            "Unknown openai.flavor: '{}'. Must be openai or azure.",
            other
        ),
    }
    if config.openai.is_azure() && config.openai.api_version.is_none() {
        bail!("openai.api_version must be set when flavor is 'azure'");
    }
    if config.openai.base_url.trim().is_empty() {
        bail!("openai.base_url must not be empty");
    }

    // Validate models
    for (key, model) in [
        ("embedding.model", &config.embedding.model),
        ("refine.model", &config.refine.model),
        ("synthesis.model", &config.synthesis.model),
    ] {
        if model.trim().is_empty() {
            bail!("{} must not be empty", key);
        }
    }

    for (key, temperature) in [
        ("refine.temperature", config.refine.temperature),
        ("synthesis.temperature", config.synthesis.temperature),
    ] {
        if !(0.0..=2.0).contains(&temperature) {
            bail!("{} must be in [0.0, 2.0]", key);
        }
    }

    // Validate vector index
    if config.vector.host.trim().is_empty() {
        bail!("vector.host must not be empty");
    }
    if config.vector.dims == 0 {
        bail!("vector.dims must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    Ok(config)
}
