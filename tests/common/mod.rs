//! Shared test generators.
//!
//! `StubGenerator` answers every request with `"R:<role tag>\n<user prompt>"`
//! where the role tag is the first 16 hex chars of SHA-256 over the system
//! instruction. Because each answer echoes its prompt, the final content of a
//! pipeline carries the tag of every role that contributed to it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use veritas::adapters::{Generation, GenerationError, GenerationRequest, Generator};
use veritas::agents::fact_checker::FACT_CHECKER_SYSTEM_PROMPT;
use veritas::agents::researcher::RESEARCHER_SYSTEM_PROMPT;
use veritas::agents::writer::WRITER_SYSTEM_PROMPT;
use veritas::config::Settings;
use veritas::Orchestrator;

/// Tag identifying a role instruction
pub fn role_tag(system: &str) -> String {
    let digest = hex::encode(Sha256::digest(system.as_bytes()));
    format!("R:{}", &digest[..16])
}

pub fn researcher_tag() -> String {
    role_tag(RESEARCHER_SYSTEM_PROMPT)
}

pub fn fact_checker_tag() -> String {
    role_tag(FACT_CHECKER_SYSTEM_PROMPT)
}

pub fn writer_tag() -> String {
    role_tag(WRITER_SYSTEM_PROMPT)
}

/// Echoing generator with optional failures, delays and call accounting
#[derive(Default)]
pub struct StubGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,

    /// Fail the n-th call (1-based)
    fail_on: Option<usize>,

    /// Fail calls whose user prompt contains the marker
    fail_marker: Option<String>,

    /// Delay every call
    delay: Option<Duration>,

    /// Delay calls whose user prompt contains the marker
    delays: Vec<(String, Duration)>,
}

impl StubGenerator {
    pub fn echo() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(call),
            ..Default::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn with_delays(delays: &[(&str, Duration)]) -> Arc<Self> {
        Arc::new(Self {
            delays: delays
                .iter()
                .map(|(marker, d)| (marker.to_string(), *d))
                .collect(),
            ..Default::default()
        })
    }

    pub fn failing_on_marker(marker: &str, delays: &[(&str, Duration)]) -> Arc<Self> {
        Arc::new(Self {
            fail_marker: Some(marker.to_string()),
            delays: delays
                .iter()
                .map(|(marker, d)| (marker.to_string(), *d))
                .collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn delay_for(&self, user: &str) -> Option<Duration> {
        self.delays
            .iter()
            .find(|(marker, _)| user.contains(marker.as_str()))
            .map(|(_, d)| *d)
            .or(self.delay)
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay_for(&request.user) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let marked = self
            .fail_marker
            .as_deref()
            .is_some_and(|marker| request.user.contains(marker));
        if self.fail_on == Some(call) || marked {
            return Err(GenerationError::Http {
                status: 500,
                body: "stub failure".to_string(),
            });
        }

        Ok(Generation {
            content: format!("{}\n{}", role_tag(&request.system), request.user),
            model: Some("stub-model".to_string()),
            tokens_used: None,
        })
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}

pub fn orchestrator(generator: Arc<StubGenerator>) -> Orchestrator {
    Orchestrator::new(generator, &Settings::default())
}

pub fn orchestrator_with(generator: Arc<StubGenerator>, settings: Settings) -> Orchestrator {
    Orchestrator::new(generator, &settings)
}
