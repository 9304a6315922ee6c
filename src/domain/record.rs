//! Workflow records: the pipeline-shaped result of one run.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::log::StepLogEntry;
use super::step::StepResult;

/// The three fixed pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    /// Research -> Fact-Check -> Write
    Simple,
    /// Research -> Fact-Check -> Refined Research -> Fact-Check -> Write
    Iterative,
    /// Research per perspective -> Cross-Check -> Fact-Check -> Compare
    Comparative,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Iterative => "iterative",
            Self::Comparative => "comparative",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The finished result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_type: WorkflowType,

    /// Ties the record to its step-log entries
    pub run_id: Uuid,

    pub topic: String,

    /// Named step results, shaped by the pipeline
    #[serde(flatten)]
    pub steps: WorkflowSteps,

    /// Step-log entries of this run, in execution order
    pub workflow_history: Vec<StepLogEntry>,
}

/// Pipeline-specific step results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowSteps {
    Simple {
        research: StepResult,
        fact_check: StepResult,
        article: StepResult,
    },
    Iterative {
        initial_research: StepResult,
        initial_fact_check: StepResult,
        refined_research: StepResult,
        final_fact_check: StepResult,
        article: StepResult,
    },
    Comparative {
        perspectives: Vec<String>,
        research_results: PerspectiveFindings,
        cross_check: Option<StepResult>,
        overall_fact_check: StepResult,
        comparison: StepResult,
    },
}

impl WorkflowSteps {
    pub fn workflow_type(&self) -> WorkflowType {
        match self {
            Self::Simple { .. } => WorkflowType::Simple,
            Self::Iterative { .. } => WorkflowType::Iterative,
            Self::Comparative { .. } => WorkflowType::Comparative,
        }
    }
}

impl WorkflowRecord {
    /// Build a record; the workflow type follows from the step shape
    pub fn new(
        run_id: Uuid,
        topic: impl Into<String>,
        steps: WorkflowSteps,
        workflow_history: Vec<StepLogEntry>,
    ) -> Self {
        Self {
            workflow_type: steps.workflow_type(),
            run_id,
            topic: topic.into(),
            steps,
            workflow_history,
        }
    }

    /// The main artifact: article content, or the comparison content
    pub fn primary_content(&self) -> &str {
        match &self.steps {
            WorkflowSteps::Simple { article, .. } | WorkflowSteps::Iterative { article, .. } => {
                article.text()
            }
            WorkflowSteps::Comparative { comparison, .. } => comparison.text(),
        }
    }

    /// Every step result in the record, in pipeline order
    pub fn step_results(&self) -> Vec<&StepResult> {
        match &self.steps {
            WorkflowSteps::Simple {
                research,
                fact_check,
                article,
            } => vec![research, fact_check, article],
            WorkflowSteps::Iterative {
                initial_research,
                initial_fact_check,
                refined_research,
                final_fact_check,
                article,
            } => vec![
                initial_research,
                initial_fact_check,
                refined_research,
                final_fact_check,
                article,
            ],
            WorkflowSteps::Comparative {
                cross_check,
                overall_fact_check,
                comparison,
                ..
            } => {
                let mut results = Vec::with_capacity(3);
                results.extend(cross_check.as_ref());
                results.push(overall_fact_check);
                results.push(comparison);
                results
            }
        }
    }

    /// Whether every step result refers to the record's topic
    pub fn is_topic_consistent(&self) -> bool {
        self.step_results()
            .into_iter()
            .chain(self.workflow_history.iter().map(|e| &e.data))
            .all(|r| r.topic() == Some(self.topic.as_str()))
    }
}

/// Perspective label -> findings, in insertion order.
///
/// Labels are unique; inserting a duplicate is rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerspectiveFindings {
    entries: Vec<(String, String)>,
}

impl PerspectiveFindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a perspective. Returns false (and changes nothing) if the
    /// label is already present.
    pub fn insert(&mut self, label: impl Into<String>, findings: impl Into<String>) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.entries.push((label, findings.into()));
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, f)| f.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, f)| (l.as_str(), f.as_str()))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }
}

impl Serialize for PerspectiveFindings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, findings) in &self.entries {
            map.serialize_entry(label, findings)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PerspectiveFindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FindingsVisitor;

        impl<'de> Visitor<'de> for FindingsVisitor {
            type Value = PerspectiveFindings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of perspective label to findings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut findings = PerspectiveFindings::new();
                while let Some((label, text)) = access.next_entry::<String, String>()? {
                    if !findings.insert(label.clone(), text) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate perspective '{}'",
                            label
                        )));
                    }
                }
                Ok(findings)
            }
        }

        deserializer.deserialize_map(FindingsVisitor)
    }
}
