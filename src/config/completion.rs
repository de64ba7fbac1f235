use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upstream chat-completion endpoint (OpenAI-compatible).
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. When absent no upstream call is made and a placeholder
    /// reply is stored instead.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for replies.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for conversation titles. Defaults to `model`.
    #[serde(default)]
    pub title_model: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Optional system message prepended to every reply context.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Characters of an upstream error body kept in message metadata.
    #[serde(default = "default_error_body_limit")]
    pub error_body_limit: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            title_model: None,
            timeout_secs: default_timeout(),
            system_prompt: None,
            error_body_limit: default_error_body_limit(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("model", &self.model)
            .field("title_model", &self.title_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("system_prompt", &self.system_prompt)
            .field("error_body_limit", &self.error_body_limit)
            .finish()
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "completion.base_url cannot be empty".into(),
            ));
        }
        if self.model.is_empty() {
            return Err(ConfigError::Validation(
                "completion.model cannot be empty".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "completion.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The key, treating a blank value as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn title_model(&self) -> &str {
        self.title_model.as_deref().unwrap_or(&self.model)
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_error_body_limit() -> usize {
    500
}
