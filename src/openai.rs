//! Shared plumbing for OpenAI-compatible endpoints.
//!
//! Both the embedding and chat clients talk to the same service, which is
//! either the public OpenAI API or an Azure OpenAI deployment:
//!
//! | Flavor | URL | Auth |
//! |--------|-----|------|
//! | `openai` | `{base_url}/{op}` | `Authorization: Bearer <key>` |
//! | `azure` | `{base_url}/openai/deployments/{model}/{op}?api-version=<v>` | `api-key: <key>` |
//!
//! Requests are sent once. Any non-2xx status becomes an error carrying the
//! status and response body.

use anyhow::{anyhow, bail, Context, Result};
use std::time::Duration;

use crate::config::OpenAIConfig;

/// Resolved endpoint: base URL, flavor, and API key.
#[derive(Clone)]
pub struct OpenAIEndpoint {
    base_url: String,
    azure_api_version: Option<String>,
    api_key: String,
}

impl std::fmt::Debug for OpenAIEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEndpoint")
            .field("base_url", &self.base_url)
            .field("azure_api_version", &self.azure_api_version)
            .finish_non_exhaustive()
    }
}

impl OpenAIEndpoint {
    /// Build an endpoint from config, reading the key from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable named by
    /// `openai.api_key_env` is not set.
    pub fn from_config(config: &OpenAIConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow!("{} environment variable not set", config.api_key_env))?;
        let azure_api_version = if config.is_azure() {
            Some(
                config
                    .api_version
                    .clone()
                    .ok_or_else(|| anyhow!("openai.api_version required for azure"))?,
            )
        } else {
            None
        };
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            azure_api_version,
            api_key,
        })
    }

    /// Endpoint for the public OpenAI API (or a compatible proxy).
    pub fn openai(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            azure_api_version: None,
            api_key: api_key.into(),
        }
    }

    /// Endpoint for an Azure OpenAI resource.
    pub fn azure(
        base_url: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            azure_api_version: Some(api_version.into()),
            api_key: api_key.into(),
        }
    }

    /// URL for an operation (`embeddings`, `chat/completions`) on a model.
    pub fn url(&self, model: &str, op: &str) -> String {
        match &self.azure_api_version {
            Some(version) => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                self.base_url, model, op, version
            ),
            None => format!("{}/{}", self.base_url, op),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.azure_api_version {
            Some(_) => request.header("api-key", &self.api_key),
            None => request.header("Authorization", format!("Bearer {}", self.api_key)),
        }
    }

    /// POST a JSON body to `op` for `model` and return the parsed JSON response.
    pub async fn post_json(
        &self,
        client: &reqwest::Client,
        model: &str,
        op: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = client
            .post(self.url(model, op))
            .header("Content-Type", "application/json")
            .json(body);

        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("OpenAI request to '{}' failed", op))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        Ok(response.json().await?)
    }
}

/// Build an HTTP client with a bounded per-request timeout.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}
