//! Role-bound agents.
//!
//! Three agents work the pipelines:
//!
//! 1. **Researcher**: gathers findings on a topic (always unverified)
//! 2. **FactChecker**: reviews findings, verifies claims, cross-checks sources
//! 3. **Writer**: turns checked research into articles, summaries, comparisons
//!
//! Each agent is a fixed system instruction and temperature bound to a shared
//! [`Generator`]. Failures of the generator are not caught or retried here;
//! an operation either returns a complete [`StepResult`](crate::domain::StepResult)
//! or fails.

pub mod fact_checker;
pub mod researcher;
pub mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::adapters::{GenerationError, GenerationRequest, Generator};
use crate::core::limits::{Deadline, LimitViolation, Limits};
use crate::domain::AgentRole;

pub use fact_checker::FactChecker;
pub use researcher::Researcher;
pub use writer::{ContentLength, Writer};

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Agent error types
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Limit(#[from] LimitViolation),
}

/// Generator plus the sampling settings of one agent
#[derive(Clone)]
pub struct AgentBackend {
    generator: Arc<dyn Generator>,
    temperature: f32,
    max_tokens: Option<u32>,
    limits: Limits,
}

impl AgentBackend {
    pub fn new(generator: Arc<dyn Generator>, temperature: f32) -> Self {
        Self {
            generator,
            temperature,
            max_tokens: None,
            limits: Limits::default(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }
}

/// Base trait for all agents
#[async_trait]
pub trait Agent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Fixed role instruction sent as the system message
    fn system_prompt(&self) -> &str;

    fn backend(&self) -> &AgentBackend;

    /// Send one prompt under this agent's role and return the raw text
    async fn generate(&self, user: String, deadline: &Deadline) -> AgentResult<String> {
        let backend = self.backend();
        let request = GenerationRequest::new(self.system_prompt(), user, backend.temperature)
            .with_max_tokens(backend.max_tokens);

        backend.limits.validate_prompt(&request)?;

        debug!(
            agent = %self.role(),
            backend = backend.generator.name(),
            prompt_bytes = request.prompt_bytes(),
            timeout_ms = deadline.timeout().as_millis() as u64,
            "Sending prompt"
        );

        let generation = deadline.run(backend.generator.generate(&request)).await?;
        if generation.content.trim().is_empty() {
            return Err(GenerationError::Empty.into());
        }
        backend.limits.validate_output(&generation.content)?;

        Ok(generation.content)
    }
}

/// Reject blank required inputs
pub(crate) fn require_non_blank(value: &str, what: &str) -> AgentResult<()> {
    if value.trim().is_empty() {
        Err(AgentError::InvalidInput(format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}

/// "1. first\n2. second"
pub(crate) fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}
