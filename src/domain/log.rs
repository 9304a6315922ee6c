//! Chronological step log.
//!
//! The log is append-only and owned by the caller, who threads it through
//! every pipeline and summary call. Entries carry the run they belong to,
//! so one log can hold several runs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{AgentRole, StepResult};

/// A single executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// When the step finished (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this step belongs to
    pub run_id: Uuid,

    /// Step name, e.g. "research" or "research_perspective_2"
    pub step: String,

    /// Agent that performed the step
    pub agent: AgentRole,

    /// The step's result
    pub data: StepResult,

    /// Wall time of the agent call in milliseconds
    pub duration_ms: u64,
}

/// Append-only list of step entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog {
    entries: Vec<StepLogEntry>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a finished step.
    ///
    /// Timestamps never go backwards: an entry stamped earlier than its
    /// predecessor takes the predecessor's timestamp.
    pub fn append(
        &mut self,
        run_id: Uuid,
        step: impl Into<String>,
        data: &StepResult,
        duration: Duration,
    ) -> &StepLogEntry {
        let mut timestamp = Utc::now();
        if let Some(last) = self.entries.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        self.entries.push(StepLogEntry {
            timestamp,
            run_id,
            step: step.into(),
            agent: data.agent,
            data: data.clone(),
            duration_ms: duration.as_millis() as u64,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[StepLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepLogEntry> {
        self.entries.iter()
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.step.as_str()).collect()
    }

    /// Copies of the entries belonging to one run
    pub fn for_run(&self, run_id: Uuid) -> Vec<StepLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<&StepLogEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StepResult;

    fn findings(text: &str) -> StepResult {
        StepResult::findings("T", text.to_string(), vec![])
    }

    #[test]
    fn test_append_order() {
        let mut log = StepLog::new();
        let run_id = Uuid::new_v4();

        for i in 0..5 {
            log.append(run_id, format!("step{}", i), &findings("x"), Duration::from_millis(3));
        }

        assert_eq!(log.len(), 5);
        assert_eq!(
            log.step_names(),
            vec!["step0", "step1", "step2", "step3", "step4"]
        );
        for pair in log.entries().windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_entry_carries_agent_and_data() {
        let mut log = StepLog::new();
        let run_id = Uuid::new_v4();
        let result = findings("payload");

        let entry = log.append(run_id, "research", &result, Duration::from_millis(1500));
        assert_eq!(entry.agent, AgentRole::Researcher);
        assert_eq!(entry.data, result);
        assert_eq!(entry.duration_ms, 1500);
        assert_eq!(entry.run_id, run_id);
    }

    #[test]
    fn test_for_run_filters() {
        let mut log = StepLog::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        log.append(first, "research", &findings("a"), Duration::ZERO);
        log.append(second, "research", &findings("b"), Duration::ZERO);
        log.append(first, "summary", &findings("c"), Duration::ZERO);

        let entries = log.for_run(first);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].step, "summary");
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_log_serializes_as_list() {
        let mut log = StepLog::new();
        log.append(Uuid::new_v4(), "research", &findings("a"), Duration::ZERO);

        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["step"], "research");
        assert_eq!(json[0]["agent"], "Researcher");
        assert!(json[0]["timestamp"].as_str().unwrap().contains('T'));
    }
}
