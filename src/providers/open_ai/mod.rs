use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::{
    config::CompletionConfig,
    models::ChatMessage,
    providers::{CompletionProvider, ProviderError},
};

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAICompatibleProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAICompatibleProvider {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &CompletionConfig, client: reqwest::Client) -> Option<Self> {
        let api_key = config.api_key()?;

        Some(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Check response status and capture diagnostics on failure.
    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("(empty body)"));

        Err(ProviderError::Status {
            status,
            request_id,
            body,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatibleProvider {
    #[tracing::instrument(
        skip(self, messages),
        fields(provider = "openai", messages = messages.len())
    )]
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::to_vec(&ChatCompletionRequest { model, messages })
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
