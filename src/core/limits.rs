//! Run limits, per-call deadlines and cancellation.
//!
//! Every agent call receives an explicit [`Deadline`]: the smaller of the
//! per-step timeout and whatever is left of the run budget, plus an
//! optional cancellation signal shared by the whole run.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::adapters::{GenerationError, GenerationRequest};

/// Budgets for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Per-step timeout in seconds (default: 300 = 5 min)
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,

    /// Total run timeout in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,

    /// Maximum prompt size in bytes, system + user (default: 1MB)
    #[serde(default = "default_max_prompt_bytes")]
    pub max_prompt_bytes: u64,

    /// Maximum generated output in bytes (default: 1MB)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,
}

fn default_step_timeout() -> u64 {
    300
}
fn default_run_timeout() -> u64 {
    3600
}
fn default_max_prompt_bytes() -> u64 {
    1024 * 1024
}
fn default_max_output_bytes() -> u64 {
    1024 * 1024
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            run_timeout_seconds: default_run_timeout(),
            max_prompt_bytes: default_max_prompt_bytes(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl Limits {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    /// Validate a prompt against the size limit
    pub fn validate_prompt(&self, request: &GenerationRequest) -> Result<(), LimitViolation> {
        let size = request.prompt_bytes();
        if size > self.max_prompt_bytes {
            return Err(LimitViolation::PromptTooLarge {
                actual: size,
                limit: self.max_prompt_bytes,
            });
        }
        Ok(())
    }

    /// Validate generated output against the size limit
    pub fn validate_output(&self, output: &str) -> Result<(), LimitViolation> {
        let size = output.len() as u64;
        if size > self.max_output_bytes {
            return Err(LimitViolation::OutputTooLarge {
                actual: size,
                limit: self.max_output_bytes,
            });
        }
        Ok(())
    }

    /// Check the run budget and build the deadline for the next step
    pub fn next_deadline(
        &self,
        tracker: &RunTracker,
        cancel: Option<&CancelSignal>,
    ) -> Result<Deadline, LimitViolation> {
        let elapsed = tracker.elapsed();
        let run_timeout = self.run_timeout();
        if elapsed >= run_timeout {
            return Err(LimitViolation::RunTimeout {
                elapsed_seconds: elapsed.as_secs(),
                limit_seconds: self.run_timeout_seconds,
            });
        }

        let budget = self.step_timeout().min(run_timeout - elapsed);
        let deadline = Deadline::after(budget);
        Ok(match cancel {
            Some(signal) => deadline.with_cancel(signal.clone()),
            None => deadline,
        })
    }
}

/// Tracks elapsed time and step count during a run
#[derive(Debug, Clone)]
pub struct RunTracker {
    /// Number of steps executed
    pub steps_executed: u32,

    /// When the run started
    pub started_at: Instant,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            steps_executed: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_step(&mut self) {
        self.steps_executed += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Limit violations
#[derive(Debug, Clone, Error)]
pub enum LimitViolation {
    #[error("prompt too large: {actual} > {limit} bytes")]
    PromptTooLarge { actual: u64, limit: u64 },

    #[error("output too large: {actual} > {limit} bytes")]
    OutputTooLarge { actual: u64, limit: u64 },

    #[error("run timeout: {elapsed_seconds}s >= {limit_seconds}s")]
    RunTimeout {
        elapsed_seconds: u64,
        limit_seconds: u64,
    },
}

/// Owner side of a run cancellation
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a run cancellation
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked cancellation handle and signal
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    /// Cancel every call observing this handle
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal linked to this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Time budget and cancellation for one agent call
#[derive(Debug, Clone)]
pub struct Deadline {
    timeout: Duration,
    cancel: Option<CancelSignal>,
}

impl Default for Deadline {
    fn default() -> Self {
        Self::after(Duration::from_secs(default_step_timeout()))
    }
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drive a generation future to completion within this deadline
    pub async fn run<F, T>(&self, fut: F) -> Result<T, GenerationError>
    where
        F: Future<Output = Result<T, GenerationError>>,
    {
        let timed = async {
            match tokio::time::timeout(self.timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(self.timeout)),
            }
        };

        match &self.cancel {
            Some(signal) => {
                if signal.is_cancelled() {
                    return Err(GenerationError::Cancelled);
                }
                tokio::select! {
                    result = timed => result,
                    _ = signal.cancelled() => Err(GenerationError::Cancelled),
                }
            }
            None => timed.await,
        }
    }
}
