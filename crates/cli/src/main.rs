// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oneshot - autonomous worker/auditor task loop

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod exit_error;
mod summary;

use anyhow::Result;
use clap::Parser;
use exit_error::{
    ExitError, EXIT_CONTEXT_CORRUPT, EXIT_FAILED, EXIT_INTERRUPTED, EXIT_REJECTED, EXIT_USAGE,
};
use oneshot_core::{OneshotId, OneshotState};
use oneshot_engine::{prepare_resume, Engine, EngineConfig, EngineError, ResumeError};
use oneshot_executors::{AgentExecutor, ExecutorError};
use oneshot_storage::{
    resolve_resume_target, ContextError, ExecutionContext, SessionMetadata,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "oneshot",
    version,
    about = "Run a task through a worker agent, audited until accepted"
)]
struct Cli {
    /// The task prompt (optional with --resume)
    prompt: Option<String>,

    /// Worker executor (cline|claude|gemini|aider|direct)
    #[arg(long, default_value = "claude")]
    executor: String,

    /// Auditor executor (defaults to the worker executor)
    #[arg(long)]
    auditor_executor: Option<String>,

    /// Model passed to the worker executor
    #[arg(long)]
    worker_model: Option<String>,

    /// Model passed to the auditor executor
    #[arg(long)]
    auditor_model: Option<String>,

    /// Maximum worker iterations before giving up
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Seconds without agent output before the watchdog kills it
    #[arg(long, default_value_t = 300)]
    inactivity_timeout: u64,

    /// Absolute wall-clock ceiling for the whole session, in seconds
    #[arg(long, default_value_t = 3600)]
    max_timeout: u64,

    /// Resume a session by id or context-file path (bare flag: most recent)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    resume: Option<String>,

    /// Override the auto-generated activity log path
    #[arg(long)]
    session_log: Option<PathBuf>,

    /// Keep the activity log after a successful session
    #[arg(long)]
    keep_log: bool,

    /// Header prepended to worker prompts (carries the correlation id)
    #[arg(long)]
    worker_prompt_header: Option<String>,

    /// Header prepended to auditor prompts
    #[arg(long)]
    auditor_prompt_header: Option<String>,

    /// Header prepended to reworker prompts
    #[arg(long)]
    reworker_prompt_header: Option<String>,

    /// Directory the agents run in (default: current directory)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Session variables, substituted into prompt headers ({key})
    #[arg(long = "var", value_parser = parse_key_value)]
    var: Vec<(String, String)>,

    /// Info-level logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Debug-level logging
    #[arg(long)]
    debug: bool,
}

/// Parse `key=value` pairs for `--var`.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<ExitError>().map_or(1, |c| c.code);
        let msg = e.to_string();
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    if !workdir.is_dir() {
        return Err(ExitError::new(
            EXIT_USAGE,
            format!("working directory does not exist: {}", workdir.display()),
        )
        .into());
    }

    let worker = build_executor(&cli.executor)?;
    let auditor_name = cli.auditor_executor.clone().unwrap_or_else(|| cli.executor.clone());
    let auditor = build_executor(&auditor_name)?;

    let mut ctx = if cli.resume.is_some() {
        load_resumed_context(&cli, &workdir)?
    } else {
        create_context(&cli, &workdir, &auditor_name)?
    };

    for (key, value) in &cli.var {
        ctx.set_variable(key.clone(), value.clone());
    }
    ctx.save().map_err(context_exit)?;

    let config = EngineConfig {
        inactivity_timeout: Duration::from_secs(cli.inactivity_timeout),
        max_timeout: Duration::from_secs(cli.max_timeout),
        worker_prompt_header: cli.worker_prompt_header.clone(),
        auditor_prompt_header: cli.auditor_prompt_header.clone(),
        reworker_prompt_header: cli.reworker_prompt_header.clone(),
        ..EngineConfig::default()
    };

    let mut engine = Engine::new(ctx, worker, auditor, config);

    // The one process-wide datum: a SIGINT trips the shared cancellation
    // flag; everything else observes it cooperatively.
    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    let outcome = match engine.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            // The engine already persisted a terminal state where it
            // could; report and exit by error class.
            let code = match &e {
                EngineError::Context(ContextError::Corrupt { .. })
                | EngineError::Context(ContextError::TooNew { .. }) => EXIT_CONTEXT_CORRUPT,
                EngineError::Executor(_) => EXIT_USAGE,
                _ => EXIT_FAILED,
            };
            return Err(ExitError::new(code, e.to_string()).into());
        }
    };

    // Keep the log by default; delete only the auto-named log of a
    // successful run the user showed no interest in.
    let delete_log = outcome.state == OneshotState::Completed
        && !cli.keep_log
        && cli.session_log.is_none();
    if delete_log {
        if let Err(e) = std::fs::remove_file(&engine.context().session_log_path) {
            tracing::debug!(error = %e, "could not delete session log");
        }
    }

    println!("{}", summary::render_summary(engine.context(), delete_log));

    match outcome.state {
        OneshotState::Completed => Ok(()),
        OneshotState::Rejected => Err(ExitError::silent(EXIT_REJECTED).into()),
        OneshotState::Interrupted => Err(ExitError::silent(EXIT_INTERRUPTED).into()),
        _ => Err(ExitError::silent(EXIT_FAILED).into()),
    }
}

fn init_tracing(cli: &Cli) {
    let default = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_executor(name: &str) -> Result<AgentExecutor> {
    AgentExecutor::from_name(name).map_err(|e| {
        let hint = match e {
            ExecutorError::UnknownExecutor(_) => format!(
                "{} (known executors: {})",
                e,
                AgentExecutor::known_names().join(", ")
            ),
            _ => e.to_string(),
        };
        ExitError::new(EXIT_USAGE, hint).into()
    })
}

fn create_context(cli: &Cli, workdir: &PathBuf, auditor_name: &str) -> Result<ExecutionContext> {
    let prompt = cli.prompt.clone().ok_or_else(|| {
        ExitError::new(EXIT_USAGE, "a task prompt is required (or pass --resume)")
    })?;

    let id = OneshotId::generate();
    let session_log_path = cli
        .session_log
        .clone()
        .unwrap_or_else(|| workdir.join(id.log_file_name()));

    let metadata = SessionMetadata {
        prompt,
        worker_executor: cli.executor.clone(),
        auditor_executor: auditor_name.to_string(),
        worker_model: cli.worker_model.clone(),
        auditor_model: cli.auditor_model.clone(),
        workdir: workdir.clone(),
        worker_prompt_header: cli.worker_prompt_header.clone(),
        auditor_prompt_header: cli.auditor_prompt_header.clone(),
        reworker_prompt_header: cli.reworker_prompt_header.clone(),
        git_commit: None,
        provider_settings: BTreeMap::new(),
    };

    Ok(ExecutionContext::create(
        workdir.join(id.context_file_name()),
        id,
        metadata,
        cli.max_iterations.unwrap_or(5),
        session_log_path,
    ))
}

fn load_resumed_context(cli: &Cli, workdir: &PathBuf) -> Result<ExecutionContext> {
    let arg = cli.resume.as_deref().filter(|s| !s.is_empty());
    let path = resolve_resume_target(arg, workdir).ok_or_else(|| {
        ExitError::new(
            EXIT_USAGE,
            match arg {
                Some(arg) => format!("no session found for '{}'", arg),
                None => format!("no session files in {}", workdir.display()),
            },
        )
    })?;

    let mut ctx = ExecutionContext::load(&path).map_err(context_exit)?;

    // A new prompt overwrites the stored task but keeps the history.
    if let Some(prompt) = &cli.prompt {
        ctx.metadata.prompt = prompt.clone();
        if matches!(ctx.state, OneshotState::Completed | OneshotState::Failed) {
            ctx.set_state(OneshotState::Created, "restarted with a new task", None);
        }
    }
    if let Some(max) = cli.max_iterations {
        ctx.max_iterations = max;
    }

    prepare_resume(&mut ctx).map_err(|e| {
        let code = match e {
            ResumeError::Rejected => EXIT_REJECTED,
            ResumeError::Finished(_) => EXIT_USAGE,
        };
        ExitError::new(code, e.to_string())
    })?;

    Ok(ctx)
}

/// Map context errors to their exit codes; corruption gets its own code
/// and the file is never overwritten.
fn context_exit(e: ContextError) -> ExitError {
    match e {
        ContextError::Corrupt { .. } | ContextError::TooNew { .. } => {
            ExitError::new(EXIT_CONTEXT_CORRUPT, e.to_string())
        }
        ContextError::NotFound(_) => ExitError::new(EXIT_USAGE, e.to_string()),
        other => ExitError::new(EXIT_FAILED, other.to_string()),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
