//! Workflow requests and their validation.
//!
//! A request names one of the fixed pipelines plus its inputs. Requests can
//! be built in code or loaded from YAML:
//!
//! ```yaml
//! workflow: comparative
//! topic: Remote work vs. office work
//! perspectives:
//!   - Employees
//!   - Employers
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agents::writer::DEFAULT_STYLE;
use crate::agents::ContentLength;
use crate::domain::WorkflowType;

/// Research -> Fact-Check -> Write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleRequest {
    pub topic: String,

    /// Extra research context
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default = "default_style")]
    pub style: String,

    #[serde(default)]
    pub length: ContentLength,
}

/// Research -> Fact-Check -> Refined Research -> Fact-Check -> Write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterativeRequest {
    pub topic: String,

    /// Context for the first research pass
    #[serde(default)]
    pub initial_context: Option<String>,

    #[serde(default = "default_style")]
    pub style: String,

    #[serde(default)]
    pub length: ContentLength,
}

/// Research per perspective -> Cross-Check -> Fact-Check -> Compare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeRequest {
    pub topic: String,

    /// Perspective labels, in the order they are researched
    pub perspectives: Vec<String>,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

impl SimpleRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: None,
            style: default_style(),
            length: ContentLength::default(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>, length: ContentLength) -> Self {
        self.style = style.into();
        self.length = length;
        self
    }
}

impl IterativeRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            initial_context: None,
            style: default_style(),
            length: ContentLength::default(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.initial_context = Some(context.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>, length: ContentLength) -> Self {
        self.style = style.into();
        self.length = length;
        self
    }
}

impl ComparativeRequest {
    pub fn new<I, S>(topic: impl Into<String>, perspectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topic: topic.into(),
            perspectives: perspectives.into_iter().map(Into::into).collect(),
        }
    }
}

/// A request for any of the pipelines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "workflow", rename_all = "lowercase")]
pub enum WorkflowRequest {
    Simple(SimpleRequest),
    Iterative(IterativeRequest),
    Comparative(ComparativeRequest),
}

impl WorkflowRequest {
    /// Load a request from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))?;

        Self::from_yaml(&content)
    }

    /// Parse a request from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse request YAML")
    }

    pub fn workflow_type(&self) -> WorkflowType {
        match self {
            Self::Simple(_) => WorkflowType::Simple,
            Self::Iterative(_) => WorkflowType::Iterative,
            Self::Comparative(_) => WorkflowType::Comparative,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::Simple(r) => &r.topic,
            Self::Iterative(r) => &r.topic,
            Self::Comparative(r) => &r.topic,
        }
    }

    /// Check the request before anything runs
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Simple(r) => validate_topic(&r.topic),
            Self::Iterative(r) => validate_topic(&r.topic),
            Self::Comparative(r) => {
                validate_topic(&r.topic)?;
                validate_perspectives(&r.perspectives)
            }
        }
    }
}

impl From<SimpleRequest> for WorkflowRequest {
    fn from(request: SimpleRequest) -> Self {
        Self::Simple(request)
    }
}

impl From<IterativeRequest> for WorkflowRequest {
    fn from(request: IterativeRequest) -> Self {
        Self::Iterative(request)
    }
}

impl From<ComparativeRequest> for WorkflowRequest {
    fn from(request: ComparativeRequest) -> Self {
        Self::Comparative(request)
    }
}

pub(crate) fn validate_topic(topic: &str) -> Result<(), String> {
    if topic.trim().is_empty() {
        return Err("topic cannot be empty".to_string());
    }
    Ok(())
}

/// Perspectives must be non-empty, non-blank and unique after trimming
pub(crate) fn validate_perspectives(perspectives: &[String]) -> Result<(), String> {
    if perspectives.is_empty() {
        return Err("at least one perspective is required".to_string());
    }

    let mut seen = HashSet::new();
    for (i, label) in perspectives.iter().enumerate() {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(format!("perspective {} is blank", i + 1));
        }
        if !seen.insert(trimmed) {
            return Err(format!("duplicate perspective '{}'", trimmed));
        }
    }

    Ok(())
}
