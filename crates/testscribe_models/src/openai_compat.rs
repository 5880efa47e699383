//! OpenAI-compatible chat completions backend (LiteLLM proxy, OpenAI, vLLM).

use crate::http::{build_client, env_key, error_from_response, transport_error};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use testscribe_core::TokenUsage;
use testscribe_error::{ProviderError, ProviderErrorKind, ScribeResult};
use testscribe_interface::{Completion, CompletionBackend, PromptRequest};
use tracing::{debug, instrument};

/// Model used when configuration names none.
pub const OPENAI_COMPAT_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variables consulted for the bearer token, in order.
pub const OPENAI_COMPAT_KEY_VARS: &[&str] = &["LITELLM_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

/// Chat completions client for any endpoint speaking the OpenAI wire format.
///
/// The bearer token is optional; local proxies often run without one.
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatBackend {
    /// Backend for `base_url` with the token taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ScribeResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: env_key(OPENAI_COMPAT_KEY_VARS),
        })
    }

    /// Replace the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    fn name(&self) -> &'static str {
        "litellm"
    }

    fn default_model(&self) -> &'static str {
        OPENAI_COMPAT_DEFAULT_MODEL
    }

    #[instrument(skip(self, request), fields(base_url = %self.base_url))]
    async fn complete(
        &self,
        model: &str,
        request: &PromptRequest,
    ) -> Result<Completion, ProviderError> {
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system(),
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt(),
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .authorize(self.client.post(format!("{}/chat/completions", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::InvalidResponse(format!(
                "unexpected chat completion response: {}",
                e
            )))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::InvalidResponse(
                    "chat completion has no message content".to_string(),
                ))
            })?;

        let usage = parsed
            .usage
            .map(|usage| TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
        debug!(chars = text.len(), ?usage, "Chat completion received");
        Ok(Completion::new(text, usage))
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .authorize(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::ModelDiscovery(e.to_string())))?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            return Err(ProviderError::new(ProviderErrorKind::ModelDiscovery(
                err.kind.to_string(),
            )));
        }

        let list: ModelList = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::ModelDiscovery(e.to_string()))
        })?;
        Ok(list.data.into_iter().map(|entry| entry.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_carries_system_then_user() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: 0.3,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "u");
    }

    #[test]
    fn response_without_usage_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "{}"}}]}"#).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{}"));
    }
}
