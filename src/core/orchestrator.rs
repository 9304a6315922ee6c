//! Main orchestrator for pipeline execution.
//!
//! Coordinates the three agents through the fixed pipelines, appends one
//! step-log entry per finished step and enforces run limits.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::adapters::{Generator, OpenAiCompatibleClient};
use crate::agents::{AgentBackend, AgentError, AgentResult, FactChecker, Researcher, Writer};
use crate::config::{ConfigError, ResolvedConfig, Settings};
use crate::domain::{
    AgentRole, PerspectiveFindings, StepLog, StepResult, WorkflowRecord, WorkflowSteps,
};

use super::limits::{CancelSignal, Deadline, LimitViolation, Limits, RunTracker};
use super::request::{
    validate_perspectives, validate_topic, ComparativeRequest, IterativeRequest, SimpleRequest,
    WorkflowRequest,
};

/// Paragraph bound for record summaries
pub const SUMMARY_PARAGRAPHS: u32 = 3;

/// Workflow error types
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("step '{step}' ({agent}) failed: {source}")]
    Step {
        step: String,
        agent: AgentRole,
        #[source]
        source: AgentError,
    },

    #[error(transparent)]
    Limit(#[from] LimitViolation),

    #[error("failed to persist: {0}")]
    Persist(String),
}

/// Per-run bookkeeping threaded through a pipeline
struct RunContext<'a> {
    run_id: Uuid,
    tracker: RunTracker,
    log: &'a mut StepLog,
}

impl<'a> RunContext<'a> {
    fn new(log: &'a mut StepLog) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            tracker: RunTracker::new(),
            log,
        }
    }

    /// Append a finished step to the caller's log
    fn record(&mut self, step: &str, result: &StepResult, elapsed: Duration) {
        self.log.append(self.run_id, step, result, elapsed);
        self.tracker.record_step();
        info!(
            step,
            agent = %result.agent,
            duration_ms = elapsed.as_millis() as u64,
            "Step completed"
        );
    }
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    researcher: Researcher,
    fact_checker: FactChecker,
    writer: Writer,
    limits: Limits,
    research_concurrency: usize,
    cancel: Option<CancelSignal>,
}

impl Orchestrator {
    /// Create an orchestrator whose agents share one generator
    pub fn new(generator: Arc<dyn Generator>, settings: &Settings) -> Self {
        let backend = |temperature: f32| {
            AgentBackend::new(generator.clone(), temperature)
                .with_max_tokens(settings.max_tokens)
                .with_limits(settings.limits.clone())
        };

        Self {
            researcher: Researcher::new(backend(settings.temperatures.researcher)),
            fact_checker: FactChecker::new(backend(settings.temperatures.fact_checker)),
            writer: Writer::new(backend(settings.temperatures.writer)),
            limits: settings.limits.clone(),
            research_concurrency: settings.research_concurrency.max(1),
            cancel: None,
        }
    }

    /// Create an orchestrator backed by the OpenAI-compatible client
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let client = OpenAiCompatibleClient::from_credentials(&config.credentials, &config.model);
        Self::new(Arc::new(client), &config.settings)
    }

    /// Resolve configuration from the environment and build the orchestrator.
    ///
    /// Fails before any step runs when no credential is available.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = ResolvedConfig::load()?;
        Ok(Self::from_config(&config))
    }

    /// Observe a cancellation signal during every agent call
    pub fn with_cancellation(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn with_research_concurrency(mut self, concurrency: usize) -> Self {
        self.research_concurrency = concurrency.max(1);
        self
    }

    pub fn researcher(&self) -> &Researcher {
        &self.researcher
    }

    pub fn fact_checker(&self) -> &FactChecker {
        &self.fact_checker
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Deadline for a single call outside a pipeline
    pub fn deadline(&self) -> Deadline {
        let deadline = Deadline::after(self.limits.step_timeout());
        match &self.cancel {
            Some(signal) => deadline.with_cancel(signal.clone()),
            None => deadline,
        }
    }

    /// Run whichever pipeline the request names
    pub async fn run(
        &self,
        request: &WorkflowRequest,
        log: &mut StepLog,
    ) -> Result<WorkflowRecord, WorkflowError> {
        match request {
            WorkflowRequest::Simple(r) => self.run_simple(r, log).await,
            WorkflowRequest::Iterative(r) => self.run_iterative(r, log).await,
            WorkflowRequest::Comparative(r) => self.run_comparative(r, log).await,
        }
    }

    /// Research -> Fact-Check -> Write
    #[instrument(skip_all, fields(workflow = "simple", topic = %request.topic, run_id = tracing::field::Empty))]
    pub async fn run_simple(
        &self,
        request: &SimpleRequest,
        log: &mut StepLog,
    ) -> Result<WorkflowRecord, WorkflowError> {
        validate_topic(&request.topic).map_err(WorkflowError::InvalidInput)?;

        let mut ctx = RunContext::new(log);
        tracing::Span::current().record("run_id", tracing::field::display(ctx.run_id));
        info!("Starting simple workflow");

        let topic = request.topic.as_str();

        let research = self
            .execute_step(&mut ctx, "research", AgentRole::Researcher, |d| async move {
                self.researcher
                    .research(topic, request.context.as_deref(), &d)
                    .await
            })
            .await?;

        let fact_check = self
            .execute_step(&mut ctx, "fact_check", AgentRole::FactChecker, |d| {
                let findings = research.text();
                async move { self.fact_checker.fact_check(findings, topic, &d).await }
            })
            .await?;

        let article = self
            .execute_step(&mut ctx, "write", AgentRole::Writer, |d| {
                let findings = research.text();
                let report = fact_check.text();
                async move {
                    self.writer
                        .write_article(topic, findings, report, &request.style, request.length, &d)
                        .await
                }
            })
            .await?;

        info!(steps = ctx.tracker.steps_executed, "Simple workflow completed");
        let history = ctx.log.for_run(ctx.run_id);
        Ok(WorkflowRecord::new(
            ctx.run_id,
            topic,
            WorkflowSteps::Simple {
                research,
                fact_check,
                article,
            },
            history,
        ))
    }

    /// Research -> Fact-Check -> Refined Research -> Fact-Check -> Write
    #[instrument(skip_all, fields(workflow = "iterative", topic = %request.topic, run_id = tracing::field::Empty))]
    pub async fn run_iterative(
        &self,
        request: &IterativeRequest,
        log: &mut StepLog,
    ) -> Result<WorkflowRecord, WorkflowError> {
        validate_topic(&request.topic).map_err(WorkflowError::InvalidInput)?;

        let mut ctx = RunContext::new(log);
        tracing::Span::current().record("run_id", tracing::field::display(ctx.run_id));
        info!("Starting iterative workflow");

        let topic = request.topic.as_str();

        let initial_research = self
            .execute_step(&mut ctx, "initial_research", AgentRole::Researcher, |d| async move {
                self.researcher
                    .research(topic, request.initial_context.as_deref(), &d)
                    .await
            })
            .await?;

        let initial_fact_check = self
            .execute_step(&mut ctx, "fact_check", AgentRole::FactChecker, |d| {
                let findings = initial_research.text();
                async move { self.fact_checker.fact_check(findings, topic, &d).await }
            })
            .await?;

        let refined_context = refinement_context(initial_fact_check.text());
        let refined_research = self
            .execute_step(&mut ctx, "refined_research", AgentRole::Researcher, |d| {
                let context = refined_context.as_str();
                async move { self.researcher.research(topic, Some(context), &d).await }
            })
            .await?;

        let final_fact_check = self
            .execute_step(&mut ctx, "final_fact_check", AgentRole::FactChecker, |d| {
                let findings = refined_research.text();
                async move { self.fact_checker.fact_check(findings, topic, &d).await }
            })
            .await?;

        let article = self
            .execute_step(&mut ctx, "write", AgentRole::Writer, |d| {
                let findings = refined_research.text();
                let report = final_fact_check.text();
                async move {
                    self.writer
                        .write_article(topic, findings, report, &request.style, request.length, &d)
                        .await
                }
            })
            .await?;

        info!(steps = ctx.tracker.steps_executed, "Iterative workflow completed");
        let history = ctx.log.for_run(ctx.run_id);
        Ok(WorkflowRecord::new(
            ctx.run_id,
            topic,
            WorkflowSteps::Iterative {
                initial_research,
                initial_fact_check,
                refined_research,
                final_fact_check,
                article,
            },
            history,
        ))
    }

    /// Research per perspective -> Cross-Check -> Fact-Check -> Compare
    #[instrument(skip_all, fields(workflow = "comparative", topic = %request.topic, run_id = tracing::field::Empty))]
    pub async fn run_comparative(
        &self,
        request: &ComparativeRequest,
        log: &mut StepLog,
    ) -> Result<WorkflowRecord, WorkflowError> {
        validate_topic(&request.topic).map_err(WorkflowError::InvalidInput)?;
        validate_perspectives(&request.perspectives).map_err(WorkflowError::InvalidInput)?;

        let mut ctx = RunContext::new(log);
        tracing::Span::current().record("run_id", tracing::field::display(ctx.run_id));
        info!(
            perspectives = request.perspectives.len(),
            concurrency = self.research_concurrency,
            "Starting comparative workflow"
        );

        let topic = request.topic.as_str();
        let research_results = self.research_perspectives(&mut ctx, request).await?;

        let cross_check = if research_results.len() >= 2 {
            let result = self
                .execute_step(&mut ctx, "cross_check", AgentRole::FactChecker, |d| {
                    let mut findings = research_results.iter().map(|(_, f)| f);
                    let first = findings.next().unwrap_or_default();
                    let second = findings.next().unwrap_or_default();
                    async move { self.fact_checker.cross_check(first, second, topic, &d).await }
                })
                .await?;
            Some(result)
        } else {
            None
        };

        let combined = combined_findings(&research_results);
        let overall_fact_check = self
            .execute_step(&mut ctx, "overall_fact_check", AgentRole::FactChecker, |d| {
                let combined = combined.as_str();
                async move { self.fact_checker.fact_check(combined, topic, &d).await }
            })
            .await?;

        let comparison = self
            .execute_step(&mut ctx, "write_comparison", AgentRole::Writer, |d| {
                let perspectives = &research_results;
                let report = cross_check.as_ref().map(|r| r.text());
                async move {
                    self.writer
                        .write_comparison(topic, perspectives, report, &d)
                        .await
                }
            })
            .await?;

        info!(steps = ctx.tracker.steps_executed, "Comparative workflow completed");
        let history = ctx.log.for_run(ctx.run_id);
        Ok(WorkflowRecord::new(
            ctx.run_id,
            topic,
            WorkflowSteps::Comparative {
                perspectives: request.perspectives.clone(),
                research_results,
                cross_check,
                overall_fact_check,
                comparison,
            },
            history,
        ))
    }

    /// Summarize a finished record in at most three paragraphs.
    ///
    /// Appends a `summary` entry under the record's run id.
    #[instrument(skip_all, fields(run_id = %record.run_id, workflow = %record.workflow_type, topic = %record.topic))]
    pub async fn get_summary(
        &self,
        record: &WorkflowRecord,
        log: &mut StepLog,
    ) -> Result<StepResult, WorkflowError> {
        let mut ctx = RunContext {
            run_id: record.run_id,
            tracker: RunTracker::new(),
            log,
        };

        let topic = record.topic.as_str();
        let content = record.primary_content();

        self.execute_step(&mut ctx, "summary", AgentRole::Writer, |d| async move {
            self.writer
                .write_summary(topic, content, SUMMARY_PARAGRAPHS, &d)
                .await
        })
        .await
    }

    /// Run one agent call under the run limits and log its result
    async fn execute_step<F, Fut>(
        &self,
        ctx: &mut RunContext<'_>,
        step: &str,
        agent: AgentRole,
        call: F,
    ) -> Result<StepResult, WorkflowError>
    where
        F: FnOnce(Deadline) -> Fut,
        Fut: Future<Output = AgentResult<StepResult>>,
    {
        let deadline = self
            .limits
            .next_deadline(&ctx.tracker, self.cancel.as_ref())
            .map_err(|violation| {
                error!(step, error = %violation, "Run limit reached");
                violation
            })?;

        debug!(step, agent = %agent, timeout_ms = deadline.timeout().as_millis() as u64, "Step started");
        let started = Instant::now();

        match call(deadline).await {
            Ok(result) => {
                ctx.record(step, &result, started.elapsed());
                Ok(result)
            }
            Err(source) => Err(step_failure(step, agent, source)),
        }
    }

    /// Research every perspective, at most `research_concurrency` at a time.
    ///
    /// Results are consumed in perspective order, so log entries never
    /// follow completion order. The first failure ends the fan-out.
    async fn research_perspectives(
        &self,
        ctx: &mut RunContext<'_>,
        request: &ComparativeRequest,
    ) -> Result<PerspectiveFindings, WorkflowError> {
        let topic = request.topic.as_str();
        let tracker = ctx.tracker.clone();
        let tracker = &tracker;
        let limits = &self.limits;
        let cancel = self.cancel.as_ref();
        let researcher = &self.researcher;

        let mut outcomes = stream::iter(request.perspectives.iter().enumerate())
            .map(|(index, label)| async move {
                let step = format!("research_perspective_{}", index + 1);
                let deadline = match limits.next_deadline(tracker, cancel) {
                    Ok(deadline) => deadline,
                    Err(violation) => return (step, label, Err(WorkflowError::Limit(violation))),
                };

                debug!(step = %step, perspective = %label, "Step started");
                let context = format!("Focus on this perspective: {}", label);
                let started = Instant::now();
                let outcome = researcher
                    .research(topic, Some(&context), &deadline)
                    .await
                    .map(|result| (result, started.elapsed()))
                    .map_err(|source| step_failure(&step, AgentRole::Researcher, source));
                (step, label, outcome)
            })
            .buffered(self.research_concurrency);

        let mut findings = PerspectiveFindings::new();
        while let Some((step, label, outcome)) = outcomes.next().await {
            let (result, elapsed) = outcome?;
            ctx.record(&step, &result, elapsed);
            findings.insert(label.as_str(), result.text());
        }

        Ok(findings)
    }
}

fn step_failure(step: &str, agent: AgentRole, source: AgentError) -> WorkflowError {
    error!(step, agent = %agent, error = %source, "Step failed");
    WorkflowError::Step {
        step: step.to_string(),
        agent,
        source,
    }
}

/// Research context for the second pass of the iterative pipeline
pub fn refinement_context(fact_check_report: &str) -> String {
    format!(
        "Previous research was fact-checked. Address these points:\n{}",
        fact_check_report
    )
}

/// All perspective findings as one document for the overall fact-check
pub fn combined_findings(findings: &PerspectiveFindings) -> String {
    findings
        .iter()
        .map(|(label, text)| format!("{}:\n{}", label, text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
