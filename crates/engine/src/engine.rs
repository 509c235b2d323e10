// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The main orchestration loop.
//!
//! One engine drives one session: ask the state machine for the next
//! action, run the worker or auditor, feed the resulting event back, and
//! persist the context after every transition. The engine is the only
//! writer of the context; the pipeline is the only writer of the log.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::extractor::extract_result;
use crate::pipeline::{pump, PipelineParams, PumpEnd};
use crate::recovery::reconcile_recovery;
use crate::UiSender;
use oneshot_core::{
    epoch_ms_now, next_action, transition, Action, OneshotState, ParsedVerdict, RoleResult,
    ScoreWeights, StateEvent, Verdict,
};
use oneshot_core::{parse_verdict, ActivityEnvelope, ExecutorRole};
use oneshot_executors::prompt::{format_prompt, substitute_vars, truncate_prompt, PromptInput};
use oneshot_executors::{ExecutionRequest, Executor, PromptRole};
use oneshot_storage::{read_envelopes, ActivityLogWriter, ExecutionContext};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub state: OneshotState,
    pub reason: String,
}

/// Why a session cannot be resumed.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    #[error("session was rejected by the auditor; re-running would reproduce the refusal")]
    Rejected,
    #[error("session already finished as {0}; pass a new prompt to restart it")]
    Finished(OneshotState),
}

/// Move a reloaded context to the state the loop should continue from.
///
/// A context found in `WORKER_EXECUTING` means the previous process may
/// have succeeded silently; forensic analysis decides (zombie success).
/// An interrupted session picks up from whatever it was doing when the
/// signal arrived.
pub fn prepare_resume(ctx: &mut ExecutionContext) -> Result<(), ResumeError> {
    let effective = match ctx.state {
        OneshotState::Rejected => return Err(ResumeError::Rejected),
        OneshotState::Completed | OneshotState::Failed => {
            return Err(ResumeError::Finished(ctx.state))
        }
        OneshotState::Interrupted => ctx
            .last_state_before_interrupt()
            .unwrap_or(OneshotState::Created),
        state => state,
    };

    let next = match effective {
        OneshotState::WorkerExecuting => OneshotState::RecoveryPending,
        // The worker result is already persisted; just re-run the audit.
        OneshotState::AuditorExecuting => OneshotState::AuditPending,
        state => state,
    };

    if next != ctx.state {
        ctx.set_state(next, "resumed", None);
    }
    Ok(())
}

/// One session's orchestration loop.
pub struct Engine<E: Executor> {
    ctx: ExecutionContext,
    worker: E,
    auditor: E,
    config: EngineConfig,
    log: ActivityLogWriter,
    ui: Option<UiSender>,
    cancel: CancellationToken,
    weights: ScoreWeights,
    deadline: Instant,
}

impl<E: Executor> Engine<E> {
    pub fn new(ctx: ExecutionContext, worker: E, auditor: E, config: EngineConfig) -> Self {
        let log = ActivityLogWriter::new(ctx.session_log_path.clone());
        let deadline = Instant::now() + config.max_timeout;
        Self {
            ctx,
            worker,
            auditor,
            config,
            log,
            ui: None,
            cancel: CancellationToken::new(),
            weights: ScoreWeights::default(),
            deadline,
        }
    }

    /// Subscribe a UI to pipeline envelopes (heartbeats included).
    pub fn with_ui(mut self, ui: UiSender) -> Self {
        self.ui = Some(ui);
        self
    }

    /// The shared cancellation flag. The CLI installs the signal handler
    /// that trips it; everything in the engine observes it.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Drive the session to a terminal state.
    pub async fn run(&mut self) -> Result<EngineOutcome, EngineError> {
        loop {
            // A signal between runs still interrupts the session.
            if self.cancel.is_cancelled() && !self.ctx.state.is_terminal() {
                self.apply(StateEvent::Interrupt, "interrupted by user", None)?;
                continue;
            }

            match next_action(self.ctx.state) {
                Action::Exit => {
                    self.log.cleanup_if_empty();
                    return Ok(EngineOutcome {
                        state: self.ctx.state,
                        reason: self.ctx.last_reason().unwrap_or_default().to_string(),
                    });
                }
                Action::Wait => return Err(EngineError::LogicError(self.ctx.state)),
                Action::RunWorker => self.dispatch_worker().await?,
                Action::RunAuditor => self.dispatch_auditor().await?,
                Action::Recover => self.dispatch_recovery().await?,
            }
        }
    }

    // ---- worker -------------------------------------------------------

    async fn dispatch_worker(&mut self) -> Result<(), EngineError> {
        if self.ctx.state == OneshotState::ReiterationPending {
            if self.ctx.iteration_count >= self.ctx.max_iterations {
                let reason = format!(
                    "iteration cap of {} reached without acceptance",
                    self.ctx.max_iterations
                );
                self.apply(StateEvent::MaxIterations, reason, None)?;
                return Ok(());
            }
            self.apply(StateEvent::Next, "reiterating with auditor feedback", None)?;
        } else {
            self.apply(StateEvent::Start, "worker starting", None)?;
        }

        self.ctx.increment_iteration();
        let iteration = self.ctx.iteration_count;
        let role = if iteration <= 1 {
            PromptRole::Worker
        } else {
            PromptRole::Reworker
        };

        let prompt = self.worker_prompt(role);
        let request = ExecutionRequest {
            prompt,
            model: self.ctx.metadata.worker_model.clone(),
            workdir: self.ctx.metadata.workdir.clone(),
        };

        let run_start_ts = epoch_ms_now();
        let mut stream = match self.worker.execute(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                // Executor configuration problem: the agent never ran, so
                // there is nothing to recover. Walk the session to FAILED
                // and surface the launch error.
                self.apply(StateEvent::Crash, format!("worker launch failed: {}", e), None)?;
                self.apply(
                    StateEvent::ZombieDead,
                    "worker never launched; nothing to recover",
                    None,
                )?;
                return Err(EngineError::Executor(e));
            }
        };
        let pid = stream.pid();

        let params = PipelineParams {
            role: ExecutorRole::Worker,
            oneshot_id: self.ctx.oneshot_id.to_string(),
            inactivity_timeout: self.config.inactivity_timeout,
            deadline: Some(self.deadline),
            cancel: self.cancel.clone(),
            collect_tail: 0,
        };
        let outcome = pump(&self.worker, &mut stream, &params, &mut self.log, self.ui.as_ref()).await;
        drop(stream);

        let (event, reason) = match outcome.end {
            PumpEnd::Cancelled => (StateEvent::Interrupt, "interrupted by user".to_string()),
            PumpEnd::Inactive => (
                StateEvent::Inactivity,
                format!(
                    "no worker activity for {}s",
                    self.config.inactivity_timeout.as_secs()
                ),
            ),
            PumpEnd::DeadlineExceeded => {
                // The absolute ceiling is fatal for whichever role is
                // running; unlike an inactivity kill, no forensic
                // recovery happens. The fixed event set has no direct
                // WORKER_EXECUTING → FAILED edge, so walk crash then an
                // unconditional zombie_dead.
                let reason = format!(
                    "absolute timeout of {}s exceeded during worker run",
                    self.config.max_timeout.as_secs()
                );
                self.apply(StateEvent::Crash, reason, pid)?;
                self.apply(
                    StateEvent::ZombieDead,
                    "absolute timeout is fatal; recovery skipped",
                    None,
                )?;
                return Ok(());
            }
            PumpEnd::Exited { code: Some(0), .. } => {
                match self.store_worker_result(run_start_ts) {
                    Some(score) => {
                        self.capture_git_commit().await;
                        (
                            StateEvent::Success,
                            format!("worker completed (score {})", score),
                        )
                    }
                    None => (
                        StateEvent::Crash,
                        "worker exited cleanly but produced no usable output".to_string(),
                    ),
                }
            }
            PumpEnd::Exited { code, stderr_tail } => {
                let mut reason = format!("worker exited with {:?}", code);
                let tail = stderr_tail.trim();
                if !tail.is_empty() {
                    reason.push_str(": ");
                    reason.push_str(last_line(tail));
                }
                (StateEvent::Crash, reason)
            }
        };

        self.apply(event, reason, pid)?;
        Ok(())
    }

    fn worker_prompt(&self, role: PromptRole) -> String {
        let id = self.ctx.oneshot_id.to_string();
        let header_template = match role {
            PromptRole::Reworker => self
                .config
                .reworker_prompt_header
                .clone()
                .or_else(|| self.config.worker_prompt_header.clone()),
            _ => self.config.worker_prompt_header.clone(),
        }
        .unwrap_or_else(|| format!("oneshot worker {}", id));
        let header = substitute_vars(&header_template, &self.ctx.variables);

        let advice = self
            .ctx
            .auditor_result
            .as_ref()
            .filter(|r| r.verdict == Some(Verdict::Retry))
            .and_then(|r| r.advice.clone());

        let system = self.worker.system_instructions(role);
        let input = PromptInput {
            task: &self.ctx.metadata.prompt,
            header: &header,
            system: &system,
            summary: None,
            advice: advice.as_deref(),
        };
        let prompt = format_prompt(self.worker.dialect(), role, &input);
        truncate_prompt(&prompt, self.worker.max_prompt_len())
    }

    /// Extract and persist the worker result; returns the score.
    fn store_worker_result(&mut self, since_ts: i64) -> Option<i32> {
        let envelopes = read_envelopes(self.log.path());
        let summary = extract_result(
            &envelopes,
            &self.weights,
            self.config.context_window,
            since_ts,
        )?;
        let score = summary.score;
        self.ctx.set_worker_result(RoleResult {
            text: summary.result,
            verdict: None,
            advice: None,
            score: Some(score),
            recorded_at_ms: epoch_ms_now(),
        });
        Some(score)
    }

    async fn capture_git_commit(&mut self) {
        if !self.worker.should_capture_git_commit() {
            return;
        }
        let mut cmd = tokio::process::Command::new("git");
        cmd.args(["rev-parse", "HEAD"])
            .current_dir(&self.ctx.metadata.workdir)
            .kill_on_drop(true);
        let sha = match tokio::time::timeout(Duration::from_secs(5), cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => return,
        };
        if !sha.is_empty() {
            self.ctx.metadata.git_commit = Some(sha);
        }
    }

    // ---- auditor ------------------------------------------------------

    async fn dispatch_auditor(&mut self) -> Result<(), EngineError> {
        self.apply(StateEvent::Next, "audit starting", None)?;

        let prompt = self.auditor_prompt();
        let request = ExecutionRequest {
            prompt,
            model: self.ctx.metadata.auditor_model.clone(),
            workdir: self.ctx.metadata.workdir.clone(),
        };

        let mut stream = match self.auditor.execute(&request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.apply(StateEvent::Crash, format!("auditor launch failed: {}", e), None)?;
                return Err(EngineError::Executor(e));
            }
        };
        let pid = stream.pid();

        let params = PipelineParams {
            role: ExecutorRole::Auditor,
            oneshot_id: self.ctx.oneshot_id.to_string(),
            inactivity_timeout: self.config.inactivity_timeout,
            deadline: Some(self.deadline),
            cancel: self.cancel.clone(),
            // Enough tail to cover the verdict and its surroundings.
            collect_tail: self.config.advice_tail.max(8),
        };
        let outcome = pump(&self.auditor, &mut stream, &params, &mut self.log, self.ui.as_ref()).await;
        drop(stream);

        let (event, reason) = match outcome.end {
            PumpEnd::Cancelled => (StateEvent::Interrupt, "interrupted by user".to_string()),
            // No auditor recovery: silence is fatal.
            PumpEnd::Inactive => (
                StateEvent::Inactivity,
                format!(
                    "no auditor activity for {}s",
                    self.config.inactivity_timeout.as_secs()
                ),
            ),
            // The absolute ceiling is fatal; crash goes straight to FAILED.
            PumpEnd::DeadlineExceeded => (
                StateEvent::Crash,
                format!(
                    "absolute timeout of {}s exceeded during audit",
                    self.config.max_timeout.as_secs()
                ),
            ),
            PumpEnd::Exited { code: Some(0), .. } => self.judge(&outcome.tail),
            PumpEnd::Exited { code, stderr_tail } => {
                let mut reason = format!("auditor exited with {:?}", code);
                let tail = stderr_tail.trim();
                if !tail.is_empty() {
                    reason.push_str(": ");
                    reason.push_str(last_line(tail));
                }
                (StateEvent::Crash, reason)
            }
        };

        self.apply(event, reason, pid)?;
        Ok(())
    }

    fn auditor_prompt(&self) -> String {
        let id = self.ctx.oneshot_id.to_string();
        let header_template = self
            .config
            .auditor_prompt_header
            .clone()
            .unwrap_or_else(|| format!("oneshot auditor {}", id));
        let header = substitute_vars(&header_template, &self.ctx.variables);

        let envelopes = read_envelopes(self.log.path());
        let summary = extract_result(&envelopes, &self.weights, self.config.context_window, 0);

        let system = self.auditor.system_instructions(PromptRole::Auditor);
        let input = PromptInput {
            task: &self.ctx.metadata.prompt,
            header: &header,
            system: &system,
            summary: summary.as_ref(),
            advice: None,
        };
        let prompt = format_prompt(self.auditor.dialect(), PromptRole::Auditor, &input);
        truncate_prompt(&prompt, self.auditor.max_prompt_len())
    }

    /// Parse the auditor's verdict from its trailing envelopes.
    fn judge(&mut self, tail: &[ActivityEnvelope]) -> (StateEvent, String) {
        let text: String = tail
            .iter()
            .filter(|e| !e.is_heartbeat)
            .map(|e| e.full_text())
            .collect::<Vec<_>>()
            .join("\n");

        let ParsedVerdict { verdict, advice } = parse_verdict(&text);

        // UNKNOWN retries; the iteration cap turns the retry into FAILED
        // on the next dispatch.
        let effective = if verdict == Verdict::Unknown {
            Verdict::Retry
        } else {
            verdict
        };

        let advice = match effective {
            Verdict::Retry => advice.or_else(|| {
                let fallback: Vec<String> = tail
                    .iter()
                    .rev()
                    .take(self.config.advice_tail)
                    .map(|e| e.full_text())
                    .collect();
                let joined = fallback
                    .into_iter()
                    .rev()
                    .collect::<Vec<_>>()
                    .join("\n");
                (!joined.trim().is_empty()).then_some(joined)
            }),
            _ => None,
        };

        self.ctx.set_auditor_result(RoleResult {
            text,
            verdict: Some(verdict),
            advice,
            score: None,
            recorded_at_ms: epoch_ms_now(),
        });

        match effective {
            Verdict::Done => (StateEvent::Done, "auditor accepted the result".to_string()),
            Verdict::Impossible => (
                StateEvent::Impossible,
                "auditor declared the task impossible".to_string(),
            ),
            _ => {
                let reason = if verdict == Verdict::Unknown {
                    "auditor verdict unparseable, treating as retry".to_string()
                } else {
                    "auditor requested another iteration".to_string()
                };
                (StateEvent::Retry, reason)
            }
        }
    }

    // ---- recovery -----------------------------------------------------

    async fn dispatch_recovery(&mut self) -> Result<(), EngineError> {
        let id = self.ctx.oneshot_id.to_string();
        let workdir = self.ctx.metadata.workdir.clone();
        let recovery = self.worker.recover(&id, &workdir).await;

        let existing = read_envelopes(self.log.path());
        let recovery_start_ts = epoch_ms_now();
        let (event, appended) = reconcile_recovery(&recovery, &existing, &id, &mut self.log);

        if event == StateEvent::ZombieSuccess {
            // The salvaged output is the worker result now. Recovered
            // envelopes are stamped at the recovery moment, so scope the
            // scan to them (or to everything when nothing was appended).
            let since = if appended > 0 { recovery_start_ts } else { 0 };
            self.store_worker_result(since);
        }

        let reason = format!("recovery: {}", recovery.evidence);
        self.apply(event, reason, None)?;
        Ok(())
    }

    // ---- shared -------------------------------------------------------

    /// Feed an event through the state machine, record the transition,
    /// and persist before proceeding.
    fn apply(
        &mut self,
        event: StateEvent,
        reason: impl Into<String>,
        pid: Option<u32>,
    ) -> Result<(), EngineError> {
        let next = transition(self.ctx.state, event)?;
        self.ctx.set_state(next, reason, pid);
        self.ctx.save()?;
        Ok(())
    }
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or(text)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
