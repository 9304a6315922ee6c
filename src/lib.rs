//! veritas - multi-agent research, fact-checking and writing
//!
//! Three role-specialized agents (researcher, fact-checker, writer) share one
//! OpenAI-compatible generation backend and are driven through fixed
//! pipelines.
//!
//! # Architecture
//!
//! - Every pipeline is a linear sequence of agent calls
//! - Each finished step appends one entry to a caller-owned step log
//! - A failed step aborts the pipeline; entries already written stay
//! - Runs are bounded by per-step and whole-run deadlines and can be cancelled
//!
//! # Modules
//!
//! - `adapters`: Generation backends (OpenAI-compatible chat completions)
//! - `agents`: Researcher, FactChecker, Writer
//! - `core`: Orchestration logic (Orchestrator, Limits, Sink)
//! - `domain`: Data structures (StepResult, StepLog, WorkflowRecord)
//! - `config`: Credential and config-file resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Research -> Fact-Check -> Write
//! veritas simple "The impact of AI on healthcare" --output record.json
//!
//! # Compare perspectives
//! veritas comparative "Remote work" -p Employees -p Employers --summary
//!
//! # Summarize a saved record
//! veritas summarize record.json
//! ```

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Generation, GenerationError, GenerationRequest, Generator};
pub use agents::{AgentError, ContentLength, FactChecker, Researcher, Writer};
pub use config::{ConfigError, ResolvedConfig, Settings};
pub use core::{
    ComparativeRequest, IterativeRequest, Orchestrator, SimpleRequest, WorkflowError,
    WorkflowRequest,
};
pub use domain::{StepLog, StepLogEntry, StepResult, WorkflowRecord, WorkflowType};
