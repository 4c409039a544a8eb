//! Remote completion providers

mod openai_compat;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::conversation::Message;

pub use openai_compat::{CompletionClient, CompletionConfig};

/// Every way the completion endpoint can fail to produce a reply.
///
/// All variants are recovered locally by the chat session; none reaches the end user.
#[derive(Debug, Error)]
pub enum RemoteUnavailable {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No choices in response")]
    NoChoices,
}

/// Something that can turn a conversation log into the next assistant turn
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete the log; performs at most one remote request and never retries
    async fn complete(&self, log: &[Message]) -> Result<String, RemoteUnavailable>;

    /// Whether this backend can ever reach a remote model
    fn is_remote(&self) -> bool {
        true
    }
}

/// Backend used when no credential is configured: every call fails without network I/O
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    missing: String,
}

impl OfflineBackend {
    pub fn new(missing: impl Into<String>) -> Self {
        Self {
            missing: missing.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OfflineBackend {
    async fn complete(&self, _log: &[Message]) -> Result<String, RemoteUnavailable> {
        Err(RemoteUnavailable::NotConfigured(self.missing.clone()))
    }

    fn is_remote(&self) -> bool {
        false
    }
}
