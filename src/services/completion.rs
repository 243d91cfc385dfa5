//! Text-completion collaborator client
//!
//! The completion service is opaque: we send a system instruction and a
//! prompt, we get text back. When no API key is configured the client is
//! never constructed and callers degrade to a fixed explanatory message
//! instead of erroring.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Result, TransferableError};

/// Message returned by advisory endpoints when the completion service is
/// not configured
pub const DEGRADED_MESSAGE: &str =
    "AI assistance is temporarily unavailable. Your counselor tools will be back shortly.";

/// Opaque text-completion collaborator
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion: system instruction + user prompt, text out
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    system: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

/// HTTP implementation of the completion collaborator
pub struct HttpCompletionClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/completions", self.base_url);
        debug!(url = %url, "Requesting completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { system, prompt })
            .send()
            .await
            .map_err(|e| TransferableError::Upstream(format!("completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Completion service returned an error");
            return Err(TransferableError::Upstream(format!(
                "completion service returned {status}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| TransferableError::Upstream(format!("completion response invalid: {e}")))?;

        Ok(body.text)
    }
}
