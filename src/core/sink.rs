//! File persistence for workflow records and step logs.
//!
//! Records are written as pretty JSON with a trailing newline. The write
//! goes to a temporary file in the target directory which is then renamed
//! over the target, so readers never see a partial record. Step logs are
//! exported as newline-delimited JSON (JSONL), one entry per line.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::{StepLog, StepLogEntry, WorkflowRecord};

use super::orchestrator::WorkflowError;

/// Serialize a record exactly as [`save_record`] writes it
pub fn render_record(record: &WorkflowRecord) -> Result<String, WorkflowError> {
    let mut json = serde_json::to_string_pretty(record)
        .map_err(|e| WorkflowError::Persist(format!("failed to serialize record: {}", e)))?;
    json.push('\n');
    Ok(json)
}

/// Atomically write a record to `path`
pub fn save_record(record: &WorkflowRecord, path: &Path) -> Result<(), WorkflowError> {
    let json = render_record(record)?;
    write_atomic(path, json.as_bytes())?;

    info!(path = %path.display(), run_id = %record.run_id, "Record saved");
    Ok(())
}

/// Read a record written by [`save_record`]
pub fn load_record(path: &Path) -> Result<WorkflowRecord, WorkflowError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| persist_error("failed to read", path, e))?;

    serde_json::from_str(&content).map_err(|e| persist_error("failed to parse", path, e))
}

/// Export a step log as JSONL
pub fn write_log_jsonl(log: &StepLog, path: &Path) -> Result<(), WorkflowError> {
    let mut buffer = String::new();
    for entry in log.iter() {
        let line = serde_json::to_string(entry)
            .map_err(|e| WorkflowError::Persist(format!("failed to serialize entry: {}", e)))?;
        buffer.push_str(&line);
        buffer.push('\n');
    }

    write_atomic(path, buffer.as_bytes())?;

    info!(path = %path.display(), entries = log.len(), "Step log exported");
    Ok(())
}

/// Read a JSONL step log back. Blank lines are skipped.
pub fn read_log_jsonl(path: &Path) -> Result<Vec<StepLogEntry>, WorkflowError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| persist_error("failed to read", path, e))?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| persist_error("failed to parse entry in", path, e))
        })
        .collect()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WorkflowError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .map_err(|e| persist_error("failed to create temp file for", path, e))?;
    file.write_all(bytes)
        .map_err(|e| persist_error("failed to write", path, e))?;
    file.flush()
        .map_err(|e| persist_error("failed to flush", path, e))?;
    file.persist(path)
        .map_err(|e| persist_error("failed to replace", path, e.error))?;

    Ok(())
}

fn persist_error(action: &str, path: &Path, error: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::Persist(format!("{} {}: {}", action, path.display(), error))
}
