//! Domain types for the veritas orchestrator.
//!
//! This module contains the core data structures:
//! - StepResult: Immutable output of one agent operation
//! - StepLog: Append-only record of executed steps
//! - WorkflowRecord: Pipeline-shaped result of a run

pub mod log;
pub mod record;
pub mod step;

// Re-export commonly used types
pub use log::{StepLog, StepLogEntry};
pub use record::{PerspectiveFindings, WorkflowRecord, WorkflowSteps, WorkflowType};
pub use step::{
    AccuracyRating, AgentRole, ClaimStatus, ContentType, ReviewStatus, StepOutput, StepResult,
};
