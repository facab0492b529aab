//! Chat-completion API client.
//!
//! Speaks the `/chat/completions` wire shape: a model id, a message list,
//! and a token budget, with bearer auth. The endpoint is configurable so
//! tests and self-hosted deployments can point it anywhere.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AssistError;

/// Default completion endpoint.
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model id.
pub const DEFAULT_MODEL: &str = "mistralai/mistral-small-24b-instruct-2501";

/// Default per-reply token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default upstream timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Completion endpoint configuration.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Full URL of the chat-completions endpoint.
    pub api_url: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Model id sent with every request.
    pub model: String,
    /// Token budget per reply.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One chat message in completion-API form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user`, or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Builds a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// HTTP client for the completion endpoint.
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Creates a client from configuration.
    pub fn new(config: CompletionConfig) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Requests one completion for the given message list.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
        };

        let mut request = self.client.post(&self.config.api_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AssistError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssistError::Upstream(format!(
                "completion endpoint returned {}",
                response.status()
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AssistError::Upstream(format!("unreadable completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AssistError::Upstream("completion response had no choices".to_string()))
    }
}
