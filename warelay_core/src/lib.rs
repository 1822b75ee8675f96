#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Turn author, using the completion API's wire names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Failure classes of the completion API.
///
/// `Transient` is the retry signal (rate limit, temporary unavailability);
/// everything else is `Permanent` and must not be retried.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API temporarily unavailable: {0}")]
    Transient(String),

    #[error("completion request failed: {0}")]
    Permanent(anyhow::Error),
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate the next reply for an ordered role/text history.
    async fn generate(&self, history: &[ChatMessage]) -> Result<String, CompletionError>;
}

/// Outbound half of the chat transport.
///
/// The concrete transport (socket handling, pairing, credential persistence)
/// lives behind this trait; the pipeline only ever asks it to deliver text.
#[async_trait]
pub trait TransportSender: Send + Sync {
    async fn send_text(&self, jid: &str, text: &str) -> anyhow::Result<()>;
}
