//! Local Ollama server backend.

use crate::http::{build_client, error_from_response, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use testscribe_core::TokenUsage;
use testscribe_error::{ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::{Completion, CompletionBackend, PromptRequest};
use tracing::{debug, instrument};

/// Model used when configuration names none.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

/// Client for `ollama serve`.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    host: String,
}

impl OllamaBackend {
    /// Backend for the server at `host` (e.g. `http://127.0.0.1:11434`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>, timeout: Duration) -> ScribeResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            host: host.into().trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL.
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn default_model(&self) -> &'static str {
        OLLAMA_DEFAULT_MODEL
    }

    #[instrument(skip(self, request), fields(host = %self.host))]
    async fn complete(
        &self,
        model: &str,
        request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        let body = GenerateRequest {
            model,
            prompt: request.prompt(),
            system: request.system(),
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::InvalidResponse(format!(
                "unexpected Ollama response: {}",
                e
            )))
        })?;

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage::new(
                prompt.unwrap_or_default(),
                completion.unwrap_or_default(),
            )),
        };
        debug!(chars = parsed.response.len(), ?usage, "Ollama completion received");
        Ok(Completion::new(parsed.response, usage))
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::ModelDiscovery(e.to_string())))?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            return Err(ProviderError::new(ProviderErrorKind::ModelDiscovery(
                err.kind.to_string(),
            )));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::ModelDiscovery(e.to_string()))
        })?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    async fn is_reachable(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Ollama server not reachable");
                false
            }
        }
    }
}
