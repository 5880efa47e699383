//! Google Gemini `generateContent` backend.

use crate::http::{build_client, env_key, error_from_response, transport_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use testscribe_core::TokenUsage;
use testscribe_error::{ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::{Completion, CompletionBackend, PromptRequest};
use tracing::{debug, instrument};

/// Public Gemini REST endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when configuration names none.
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Environment variables consulted for the API key, in order.
pub const GEMINI_KEY_VARS: &[&str] = &["GEMINI_API_TOKEN", "GEMINI_API_KEY"];

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(rename = "system_instruction")]
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        if usage.prompt_token_count + usage.candidates_token_count > 0 {
            TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count)
        } else {
            TokenUsage::total(usage.total_token_count)
        }
    }
}

/// Gemini REST client.
///
/// The API key comes from `GEMINI_API_TOKEN` (or `GEMINI_API_KEY`). A missing
/// key is reported by [`CompletionBackend::check_ready`], never at
/// construction, so a run can fail cleanly with one message.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiBackend {
    /// Backend reading its key from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env(timeout: Duration) -> ScribeResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: env_key(GEMINI_KEY_VARS),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Replace the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point the backend at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MissingApiKey(
                GEMINI_KEY_VARS[0].to_string(),
            ))
        })
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &'static str {
        GEMINI_DEFAULT_MODEL
    }

    #[instrument(skip(self, request), fields(estimated_tokens = request.budget().estimated_tokens()))]
    async fn complete(
        &self,
        model: &str,
        request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        let body = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: request.system(),
                }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart {
                    text: request.prompt(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.key()?)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::InvalidResponse(format!(
                "unexpected Gemini response: {}",
                e
            )))
        })?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::InvalidResponse(
                    "Gemini response has no candidate text".to_string(),
                ))
            })?;

        let usage = parsed.usage_metadata.map(TokenUsage::from);
        debug!(chars = text.len(), ?usage, "Gemini completion received");
        Ok(Completion::new(text, usage))
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("x-goog-api-key", self.key()?)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            return Err(ProviderError::new(ProviderErrorKind::ModelDiscovery(
                err.kind.to_string(),
            )));
        }

        let listing: ListModelsResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::ModelDiscovery(e.to_string()))
        })?;

        let models: Vec<String> = listing
            .models
            .into_iter()
            .filter(|model| {
                model
                    .supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|model| {
                model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(&model.name)
                    .to_string()
            })
            .collect();

        debug!(count = models.len(), "Discovered Gemini models");
        Ok(models)
    }

    async fn check_ready(&self) -> Result<(), ProviderError> {
        self.key().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_rest_shape() {
        let body = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![TextPart { text: "sys" }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: "hi" }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["system_instruction"]["parts"][0]["text"], "sys");
        assert_eq!(value["contents"][0]["role"], "user");
        assert!(value["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn usage_prefers_split_counts() {
        let usage: UsageMetadata = serde_json::from_str(
            r#"{"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}"#,
        )
        .unwrap();
        assert_eq!(*TokenUsage::from(usage).total_tokens(), 15);

        let usage: UsageMetadata = serde_json::from_str(r#"{"totalTokenCount": 9}"#).unwrap();
        assert_eq!(*TokenUsage::from(usage).total_tokens(), 9);
    }

    #[tokio::test]
    async fn missing_key_fails_readiness() {
        let backend = GeminiBackend {
            client: Client::new(),
            api_key: None,
            base_url: GEMINI_API_BASE.to_string(),
        };
        let err = backend.check_ready().await.unwrap_err();
        assert_eq!(
            err.kind,
            ProviderErrorKind::MissingApiKey("GEMINI_API_TOKEN".to_string())
        );
    }
}
