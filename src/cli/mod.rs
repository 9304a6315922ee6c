//! Command-line interface for veritas.
//!
//! Provides commands for running the three pipelines, summarizing saved
//! records, verifying claims, refining content and inspecting configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::{Generator, OpenAiCompatibleClient};
use crate::agents::ContentLength;
use crate::config::ResolvedConfig;
use crate::core::{
    cancellation, load_record, save_record, write_log_jsonl, ComparativeRequest,
    IterativeRequest, Orchestrator, SimpleRequest, WorkflowRequest,
};
use crate::domain::{StepLog, StepOutput, WorkflowRecord};

/// veritas - research, fact-check and write with cooperating LLM agents
#[derive(Parser, Debug)]
#[command(name = "veritas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research -> Fact-Check -> Write
    Simple {
        /// Topic to research and write about
        topic: String,

        /// Additional research context
        #[arg(short, long)]
        context: Option<String>,

        #[command(flatten)]
        article: ArticleArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Research -> Fact-Check -> Refined Research -> Fact-Check -> Write
    Iterative {
        /// Topic to research and write about
        topic: String,

        /// Context for the first research pass
        #[arg(short, long)]
        context: Option<String>,

        #[command(flatten)]
        article: ArticleArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Research several perspectives and write a comparison
    Comparative {
        /// Topic to compare perspectives on
        topic: String,

        /// Perspective to research (repeat for each one)
        #[arg(short, long = "perspective", required = true)]
        perspectives: Vec<String>,

        /// Perspectives researched at the same time (overrides the config file)
        #[arg(long, env = "VERITAS_RESEARCH_CONCURRENCY")]
        concurrency: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a workflow described in a YAML request file
    Run {
        /// Request file (workflow: simple|iterative|comparative)
        request: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Summarize a saved workflow record
    Summarize {
        /// Record JSON written by --output
        record: PathBuf,
    },

    /// Verify specific claims
    Verify {
        /// Claim to verify (repeat for each one)
        #[arg(long = "claim", required = true)]
        claims: Vec<String>,

        /// Verification context
        #[arg(long)]
        context: Option<String>,
    },

    /// Refine existing content based on feedback
    Refine {
        /// File holding the content to refine
        #[arg(short, long)]
        input: PathBuf,

        /// Feedback to address
        #[arg(short, long)]
        feedback: String,

        /// Area to focus on (repeatable)
        #[arg(long = "focus")]
        focus: Vec<String>,
    },

    /// Show resolved configuration
    Config {
        /// Also probe the generation endpoint
        #[arg(long)]
        check: bool,
    },
}

/// Article options shared by the simple and iterative pipelines
#[derive(Args, Debug)]
pub struct ArticleArgs {
    /// Writing style
    #[arg(short, long, default_value = "informative")]
    pub style: String,

    /// Target length: short, medium or long
    #[arg(short, long, default_value = "medium")]
    pub length: String,
}

/// Where to write run results
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Save the workflow record as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export the step log as JSONL (also written when the run fails)
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Print a short summary after the main content
    #[arg(long)]
    pub summary: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Simple {
                topic,
                context,
                article,
                output,
            } => {
                let mut request = SimpleRequest::new(topic)
                    .with_style(article.style, ContentLength::from_label(&article.length));
                request.context = context;
                run_workflow(request.into(), None, output).await
            }
            Commands::Iterative {
                topic,
                context,
                article,
                output,
            } => {
                let mut request = IterativeRequest::new(topic)
                    .with_style(article.style, ContentLength::from_label(&article.length));
                request.initial_context = context;
                run_workflow(request.into(), None, output).await
            }
            Commands::Comparative {
                topic,
                perspectives,
                concurrency,
                output,
            } => {
                let request = ComparativeRequest::new(topic, perspectives);
                run_workflow(request.into(), concurrency, output).await
            }
            Commands::Run { request, output } => {
                let request = WorkflowRequest::from_file(&request)?;
                run_workflow(request, None, output).await
            }
            Commands::Summarize { record } => summarize(record).await,
            Commands::Verify { claims, context } => verify(claims, context).await,
            Commands::Refine {
                input,
                feedback,
                focus,
            } => refine(input, feedback, focus).await,
            Commands::Config { check } => show_config(check).await,
        }
    }
}

fn load_config() -> Result<ResolvedConfig> {
    ResolvedConfig::load().context("Failed to resolve configuration")
}

/// Run a pipeline, print its content and write the requested outputs
async fn run_workflow(
    request: WorkflowRequest,
    concurrency: Option<usize>,
    output: OutputArgs,
) -> Result<()> {
    let config = load_config()?;

    // Ctrl-C aborts the step in progress
    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let mut orchestrator = Orchestrator::from_config(&config).with_cancellation(signal);
    if let Some(concurrency) = concurrency {
        orchestrator = orchestrator.with_research_concurrency(concurrency);
    }
    let mut log = StepLog::new();

    let result = orchestrator.run(&request, &mut log).await;

    if let Some(path) = &output.log {
        write_log_jsonl(&log, path)
            .with_context(|| format!("Failed to export step log: {}", path.display()))?;
    }

    let record = result.with_context(|| {
        format!(
            "{} workflow failed after {} step(s)",
            request.workflow_type(),
            log.len()
        )
    })?;

    println!("{}", record.primary_content());

    if output.summary {
        let summary = orchestrator.get_summary(&record, &mut log).await?;
        println!("\n--- Summary ---\n{}", summary.text());
    }

    if let Some(path) = &output.output {
        save_record(&record, path)
            .with_context(|| format!("Failed to save record: {}", path.display()))?;
        eprintln!("[Record saved to {}]", path.display());
    }

    // Re-export so the log includes the summary step
    if output.summary {
        if let Some(path) = &output.log {
            write_log_jsonl(&log, path)?;
        }
    }

    eprintln!("\n[Run {} completed: {} steps]", record.run_id, log.len());
    Ok(())
}

/// Summarize a saved record
async fn summarize(path: PathBuf) -> Result<()> {
    let record: WorkflowRecord = load_record(&path)
        .with_context(|| format!("Failed to load record: {}", path.display()))?;

    let config = load_config()?;
    let orchestrator = Orchestrator::from_config(&config);
    let mut log = StepLog::new();

    let summary = orchestrator.get_summary(&record, &mut log).await?;
    println!("{}", summary.text());
    Ok(())
}

/// Verify claims directly with the fact-checker
async fn verify(claims: Vec<String>, context: Option<String>) -> Result<()> {
    let config = load_config()?;
    let orchestrator = Orchestrator::from_config(&config);

    let result = orchestrator
        .fact_checker()
        .verify_specific_claims(&claims, context.as_deref(), &orchestrator.deadline())
        .await
        .context("Claim verification failed")?;

    println!("{}", result.text());

    if let StepOutput::ClaimVerification { statuses, .. } = &result.output {
        if !statuses.is_empty() {
            eprintln!();
            for (claim, status) in claims.iter().zip(statuses) {
                eprintln!("  {:<20} {}", status.as_str(), claim);
            }
        }
    }

    Ok(())
}

/// Refine a file's content with the writer
async fn refine(input: PathBuf, feedback: String, focus: Vec<String>) -> Result<()> {
    let original = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let config = load_config()?;
    let orchestrator = Orchestrator::from_config(&config);
    let focus = (!focus.is_empty()).then_some(focus.as_slice());

    let result = orchestrator
        .writer()
        .refine_content(&original, &feedback, focus, &orchestrator.deadline())
        .await
        .context("Refinement failed")?;

    println!("{}", result.text());
    Ok(())
}

/// Show resolved configuration
async fn show_config(check: bool) -> Result<()> {
    let cfg = load_config()?;
    let settings = &cfg.settings;

    println!("veritas configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Provider:");
    println!("  Name:     {}", cfg.credentials.provider);
    println!("  Base URL: {}", cfg.credentials.base_url);
    println!("  API key:  {}", cfg.credentials.redacted_key());
    println!("  Model:    {}", cfg.model);
    println!(
        "  Max tokens: {}",
        settings
            .max_tokens
            .map(|t| t.to_string())
            .unwrap_or_else(|| "(provider default)".to_string())
    );
    println!();
    println!("Temperatures:");
    println!("  Researcher:   {}", settings.temperatures.researcher);
    println!("  Fact-checker: {}", settings.temperatures.fact_checker);
    println!("  Writer:       {}", settings.temperatures.writer);
    println!();
    println!("Limits:");
    println!("  Step timeout:     {}s", settings.limits.step_timeout_seconds);
    println!("  Run timeout:      {}s", settings.limits.run_timeout_seconds);
    println!("  Max prompt size:  {} bytes", settings.limits.max_prompt_bytes);
    println!("  Max output size:  {} bytes", settings.limits.max_output_bytes);
    println!("  Research concurrency: {}", settings.research_concurrency);

    if check {
        println!();
        let client = OpenAiCompatibleClient::from_credentials(&cfg.credentials, &cfg.model);
        match client.health_check().await {
            Ok(()) => println!("Endpoint: reachable"),
            Err(e) => anyhow::bail!("Endpoint check failed: {}", e),
        }
    }

    Ok(())
}
