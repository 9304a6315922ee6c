//! Core orchestration logic.
//!
//! This module contains:
//! - Orchestrator: runs the fixed pipelines and the summary step
//! - Request: pipeline requests and input validation
//! - Limits: run budgets, deadlines and cancellation
//! - Sink: record and step-log persistence

pub mod limits;
pub mod orchestrator;
pub mod request;
pub mod sink;

// Re-export commonly used types
pub use limits::{cancellation, CancelHandle, CancelSignal, Deadline, LimitViolation, Limits};
pub use orchestrator::{Orchestrator, WorkflowError};
pub use request::{ComparativeRequest, IterativeRequest, SimpleRequest, WorkflowRequest};
pub use sink::{load_record, save_record, write_log_jsonl};
