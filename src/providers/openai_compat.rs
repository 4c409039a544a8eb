//! OpenAI-compatible completion client
//!
//! Talks to any endpoint implementing the chat completions format. The default target is
//! DeepSeek, but OpenAI, Groq, vLLM and LM Studio accept the same request.
//!
//! # Configuration
//!
//! ```toml
//! [llm]
//! endpoint = "https://api.deepseek.com/v1/chat/completions"
//! api_key_env = "DEEPSEEK_API_KEY"
//! model = "deepseek-r1-distill-llama-70b"
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError, GenerationConfig};
use crate::conversation::Message;

use super::{CompletionBackend, RemoteUnavailable};

/// Longest error body kept in a `Status` error
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ChatMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Completion client configuration
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Full chat-completions URL
    pub endpoint: String,
    /// Bearer credential
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling parameters
    pub generation: GenerationConfig,
    /// Request timeout
    pub timeout: Duration,
}

impl CompletionConfig {
    /// Derive the client configuration; fails when no credential is available
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.credential()?.to_string(),
            model: config.settings.llm.model.clone(),
            generation: config.settings.generation,
            timeout: Duration::from_secs(config.settings.llm.timeout_secs),
        })
    }
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct CompletionClient {
    config: CompletionConfig,
    client: Client,
}

impl CompletionClient {
    /// Create a new client with the given configuration
    pub fn new(config: CompletionConfig) -> Result<Self, RemoteUnavailable> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send the log and return the first choice's content verbatim
    pub async fn complete(&self, log: &[Message]) -> Result<String, RemoteUnavailable> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: log.iter().map(ChatMessage::from).collect(),
            max_tokens: self.config.generation.max_tokens,
            temperature: self.config.generation.temperature,
            top_p: self.config.generation.top_p,
            stream: false,
        };

        tracing::debug!(
            model = %self.config.model,
            messages = log.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let body = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error_resp) => error_resp.error.message,
                Err(_) => truncate(body, MAX_ERROR_BODY),
            };
            return Err(RemoteUnavailable::Status { status, body });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            RemoteUnavailable::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(RemoteUnavailable::NoChoices)?;

        let content = choice
            .message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                RemoteUnavailable::InvalidResponse("First choice has no content".to_string())
            })?;

        tracing::debug!(bytes = content.len(), "chat completion received");
        Ok(content)
    }

    fn classify(&self, err: reqwest::Error) -> RemoteUnavailable {
        if err.is_timeout() {
            RemoteUnavailable::Timeout(self.config.timeout)
        } else {
            RemoteUnavailable::RequestFailed(err)
        }
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, log: &[Message]) -> Result<String, RemoteUnavailable> {
        CompletionClient::complete(self, log).await
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
