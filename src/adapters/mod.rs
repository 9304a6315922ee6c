//! Adapter interfaces for text-generation backends.
//!
//! Agents never talk to a model service directly. They hand a
//! [`GenerationRequest`] to a [`Generator`] and get plain text back.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export the chat-completions client
pub use openai::OpenAiCompatibleClient;

/// A single prompt sent to a generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Role instruction (system message)
    pub system: String,

    /// Task content (user message)
    pub user: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens (backend default if not set)
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a request with no token bound
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
            max_tokens: None,
        }
    }

    /// Set the token bound
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Size of the prompt in bytes (system + user)
    pub fn prompt_bytes(&self) -> u64 {
        (self.system.len() + self.user.len()) as u64
    }
}

/// Output from a generation backend
#[derive(Debug, Clone)]
pub struct Generation {
    /// The generated text
    pub content: String,

    /// Model that served the request (if reported)
    pub model: Option<String>,

    /// Tokens used (if reported)
    pub tokens_used: Option<u64>,
}

impl Generation {
    /// Create a generation with just content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            tokens_used: None,
        }
    }
}

/// Failures of the generation backend.
///
/// None of these are retried anywhere in the crate.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    #[error("quota or rate limit exceeded")]
    Quota,

    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("backend returned empty content")]
    Empty,

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation cancelled")]
    Cancelled,
}

/// Trait for text-generation backends
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Generate text for a prompt
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError>;

    /// Reachability probe
    async fn health_check(&self) -> Result<(), GenerationError>;
}
