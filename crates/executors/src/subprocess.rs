// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming subprocess spawning, with PTY support.
//!
//! CLI agents that detect a pipe on stdout switch to full buffering and
//! stop streaming; those executors request a pseudo-terminal. On
//! platforms without PTY support (or with `ONESHOT_NO_PTY` set) we fall
//! back to pipes and accept coarser streaming.

use crate::stream::{ExitSummary, StreamItem};
use crate::{ExecutorError, LaunchSpec};
use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

const READ_CHUNK: usize = 8 * 1024;
const STDERR_TAIL_BYTES: usize = 4 * 1024;
const CHANNEL_CAPACITY: usize = 64;

/// Handle for terminating a spawned agent.
///
/// The process itself is owned by its reader task/thread; the handle
/// carries just enough to signal it and to force a kill.
#[derive(Debug)]
pub struct ChildHandle {
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: Arc<AtomicBool>,
}

impl ChildHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Graceful signal, then force-kill once `grace` elapses.
    ///
    /// Returns as soon as the process is observed dead. Idempotent: a
    /// second call finds nothing left to signal.
    pub async fn terminate(&mut self, grace: Duration) {
        if self.exited.load(Ordering::Acquire) {
            self.kill_tx = None;
            return;
        }

        if let Some(pid) = self.pid {
            send_sigterm(pid);
        }

        let poll = Duration::from_millis(50);
        let mut waited = Duration::ZERO;
        while waited < grace {
            if self.exited.load(Ordering::Acquire) {
                self.kill_tx = None;
                return;
            }
            tokio::time::sleep(poll).await;
            waited += poll;
        }

        self.send_kill();
    }

    /// Immediate kill, used on drop. Best effort.
    pub fn force_kill(&mut self) {
        if self.exited.load(Ordering::Acquire) {
            self.kill_tx = None;
            return;
        }
        self.send_kill();
    }

    fn send_kill(&mut self) {
        // The receiver side performs the kill; a closed channel means the
        // reader already reaped the process.
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM failed (process likely gone)");
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

/// Spawn an agent per `spec`, returning a kill handle and the item
/// channel. The final item is always [`StreamItem::Exit`].
pub fn spawn_streaming(
    spec: &LaunchSpec,
    workdir: &Path,
) -> Result<(ChildHandle, mpsc::Receiver<StreamItem>), ExecutorError> {
    let use_pty = spec.use_pty && !crate::env::pty_disabled() && cfg!(unix);
    if use_pty {
        match spawn_pty(spec, workdir) {
            Ok(spawned) => return Ok(spawned),
            Err(e) => {
                // Silent fallback: streaming gets coarser but stays correct.
                tracing::debug!(error = %e, "PTY allocation failed, falling back to pipes");
            }
        }
    }
    spawn_piped(spec, workdir)
}

fn spawn_piped(
    spec: &LaunchSpec,
    workdir: &Path,
) -> Result<(ChildHandle, mpsc::Receiver<StreamItem>), ExecutorError> {
    let program = spec
        .argv
        .first()
        .ok_or_else(|| ExecutorError::SpawnFailed("empty argv".into()))?;

    let mut cmd = Command::new(program);
    cmd.args(&spec.argv[1..])
        .current_dir(workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin_payload.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExecutorError::MissingBinary(program.clone()))
        }
        Err(e) => return Err(ExecutorError::Io(e)),
    };

    let pid = child.id();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecutorError::SpawnFailed("missing stdout pipe".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ExecutorError::SpawnFailed("missing stderr pipe".into()))?;
    let stdin = child.stdin.take();
    let stdin_payload = spec.stdin_payload.clone();

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (kill_tx, kill_rx) = oneshot::channel();
    let exited = Arc::new(AtomicBool::new(false));
    let exited_task = exited.clone();

    tokio::spawn(async move {
        if let (Some(mut stdin), Some(payload)) = (stdin, stdin_payload) {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    tracing::warn!(error = %e, "failed to write agent stdin");
                }
            }
            // Dropping closes the pipe so the agent sees EOF.
        }

        let stderr_task = tokio::spawn(read_stderr_tail(stderr));
        drive_pipe_child(child, stdout, tx, kill_rx, exited_task, stderr_task).await;
    });

    Ok((
        ChildHandle {
            pid,
            kill_tx: Some(kill_tx),
            exited,
        },
        rx,
    ))
}

/// Pump stdout to the channel, then reap the child and report its exit.
async fn drive_pipe_child(
    mut child: tokio::process::Child,
    mut stdout: tokio::process::ChildStdout,
    tx: mpsc::Sender<StreamItem>,
    mut kill_rx: oneshot::Receiver<()>,
    exited: Arc<AtomicBool>,
    stderr_task: tokio::task::JoinHandle<String>,
) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(StreamItem::Bytes(buf[..n].to_vec())).await.is_err() {
                        // Consumer gone; nothing will observe this child
                        // again, so don't let it linger.
                        let _ = child.start_kill();
                        break;
                    }
                }
            },
            _ = &mut kill_rx => {
                let _ = child.start_kill();
                break;
            }
        }
    }

    // Reap. kill_on_drop backstops the wait failing.
    let code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to wait for agent process");
            None
        }
    };
    exited.store(true, Ordering::Release);

    let stderr_tail = stderr_task.await.unwrap_or_default();
    let _ = tx.send(StreamItem::Exit(ExitSummary { code, stderr_tail })).await;
}

async fn read_stderr_tail(mut stderr: tokio::process::ChildStderr) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = vec![0u8; READ_CHUNK];
    while let Ok(n) = stderr.read(&mut buf).await {
        if n == 0 {
            break;
        }
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > STDERR_TAIL_BYTES {
            let cut = tail.len() - STDERR_TAIL_BYTES;
            tail.drain(..cut);
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

fn spawn_pty(
    spec: &LaunchSpec,
    workdir: &Path,
) -> Result<(ChildHandle, mpsc::Receiver<StreamItem>), ExecutorError> {
    use portable_pty::{native_pty_system, CommandBuilder, PtySize};

    let program = spec
        .argv
        .first()
        .ok_or_else(|| ExecutorError::SpawnFailed("empty argv".into()))?;

    let pty = native_pty_system();
    let pair = pty
        .openpty(PtySize {
            rows: 40,
            cols: 120,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| ExecutorError::SpawnFailed(format!("openpty: {}", e)))?;

    let mut cmd = CommandBuilder::new(program);
    cmd.args(&spec.argv[1..]);
    cmd.cwd(workdir);
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| match e.to_string() {
            msg if msg.contains("No such file") => ExecutorError::MissingBinary(program.clone()),
            msg => ExecutorError::SpawnFailed(msg),
        })?;
    drop(pair.slave);

    let pid = child.process_id();
    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| ExecutorError::SpawnFailed(format!("pty reader: {}", e)))?;

    let child = Arc::new(Mutex::new(child));
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let exited = Arc::new(AtomicBool::new(false));

    // Kill listener: translate the handle's force-kill into a PTY kill.
    {
        let child = child.clone();
        let exited = exited.clone();
        tokio::spawn(async move {
            if kill_rx.await.is_ok() && !exited.load(Ordering::Acquire) {
                if let Err(e) = child.lock().kill() {
                    tracing::debug!(error = %e, "pty kill failed (process likely gone)");
                }
            }
        });
    }

    // Blocking reader thread: the PTY master has no async interface.
    {
        let child = child.clone();
        let exited = exited.clone();
        let tx = tx.clone();
        // Keep the master alive for the duration of the read loop.
        let master = pair.master;
        std::thread::spawn(move || {
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.blocking_send(StreamItem::Bytes(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                }
            }
            drop(master);

            let code = match child.lock().wait() {
                Ok(status) => Some(status.exit_code() as i32),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to wait for pty agent");
                    None
                }
            };
            exited.store(true, Ordering::Release);
            let _ = tx.blocking_send(StreamItem::Exit(ExitSummary {
                code,
                stderr_tail: String::new(),
            }));
        });
    }

    Ok((
        ChildHandle {
            pid,
            kill_tx: Some(kill_tx),
            exited,
        },
        rx,
    ))
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
