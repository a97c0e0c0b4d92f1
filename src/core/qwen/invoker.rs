//! Process-level runner for the Qwen Code CLI.
//!
//! Each run is one spawn-to-terminal-event cycle: the prompt travels as a
//! command-line argument, stdin stays closed, and both output streams are
//! drained as the child produces them. Exactly one of child exit, timeout,
//! and caller cancellation resolves an attempt; the losing branches become
//! no-ops, and a timed-out or canceled child is terminated (TERM, then KILL
//! after a grace window) without ever being left unreaped.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::constants::{KILL_GRACE_MS, OUTPUT_CAPTURE_LIMIT_BYTES, PROBE_TIMEOUT_MS};

use super::{CliRunner, InvocationOutcome, QwenConfig};

/// Production [`CliRunner`] backed by real child processes.
pub struct ProcessRunner {
    binary: String,
    timeout: Duration,
    api_key: Option<String>,
}

impl ProcessRunner {
    pub fn new(config: &QwenConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout,
            api_key: config.api_key.clone(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(api_key) = &self.api_key {
            cmd.env("QWEN_API_KEY", api_key);
        }
        cmd
    }
}

#[async_trait]
impl CliRunner for ProcessRunner {
    async fn probe(&self) -> bool {
        let mut cmd = self.command(&["--version"]);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                debug!(binary = %self.binary, error = %err, "availability probe failed to spawn");
                return false;
            }
        };

        match tokio::time::timeout(Duration::from_millis(PROBE_TIMEOUT_MS), child.wait()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(err)) => {
                debug!(binary = %self.binary, error = %err, "availability probe failed to run");
                false
            }
            Err(_) => {
                debug!(binary = %self.binary, "availability probe timed out");
                let _ = child.kill().await;
                false
            }
        }
    }

    async fn run(&self, full_prompt: &str, cancel: &CancellationToken) -> InvocationOutcome {
        let mut cmd = self.command(&["-p", full_prompt]);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return InvocationOutcome::Fatal(format!("failed to start {}: {err}", self.binary));
            }
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.kill().await;
                return InvocationOutcome::Fatal("unable to capture qwen output streams".to_string());
            }
        };
        let stdout_task = spawn_capped_drain(stdout);
        let stderr_task = spawn_capped_drain(stderr);

        tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) => {
                        let stdout_text = stdout_task.await.unwrap_or_default();
                        let stderr_text = stderr_task.await.unwrap_or_default();
                        classify_exit(status, &stdout_text, &stderr_text)
                    }
                    Err(err) => {
                        InvocationOutcome::Retryable(format!("failed to await qwen exit: {err}"))
                    }
                }
            }
            _ = tokio::time::sleep(self.timeout) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "qwen invocation timed out");
                terminate(child);
                InvocationOutcome::Retryable(format!("timeout after {}ms", self.timeout.as_millis()))
            }
            _ = cancel.cancelled() => {
                debug!("qwen invocation canceled by caller");
                terminate(child);
                InvocationOutcome::Fatal("canceled".to_string())
            }
        }
    }
}

fn classify_exit(status: ExitStatus, stdout_text: &str, stderr_text: &str) -> InvocationOutcome {
    if status.success() {
        let content = stdout_text.trim();
        if content.is_empty() {
            return InvocationOutcome::Retryable(
                "exited with code 0 but produced no output".to_string(),
            );
        }
        return InvocationOutcome::Success(content.to_string());
    }

    let stderr_text = stderr_text.trim();
    if stderr_text.is_empty() {
        InvocationOutcome::Retryable(format!(
            "exited with code {}",
            status.code().unwrap_or(-1)
        ))
    } else {
        InvocationOutcome::Retryable(stderr_text.to_string())
    }
}

/// Begin the TERM -> grace -> KILL sequence and reap the child in the
/// background. The caller resolves immediately; the forced kill is
/// fire-and-forget.
fn terminate(mut child: Child) {
    graceful_signal(&mut child);
    tokio::spawn(async move {
        tokio::select! {
            _ = child.wait() => {}
            _ = tokio::time::sleep(Duration::from_millis(KILL_GRACE_MS)) => {
                debug!("child survived the grace window, sending kill");
                let _ = child.kill().await;
            }
        }
    });
}

#[cfg(unix)]
fn graceful_signal(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: signaling a live child we own; it has not been reaped yet.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn graceful_signal(child: &mut Child) {
    // No TERM equivalent; start the forceful kill right away.
    let _ = child.start_kill();
}

/// Drain a stream to EOF, keeping at most the first
/// `OUTPUT_CAPTURE_LIMIT_BYTES` bytes so a chatty child never blocks on a
/// full pipe.
fn spawn_capped_drain<R>(mut stream: R) -> JoinHandle<String>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        let mut truncated = false;
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let room = OUTPUT_CAPTURE_LIMIT_BYTES.saturating_sub(captured.len());
                    if room == 0 {
                        truncated = true;
                        continue;
                    }
                    captured.extend_from_slice(&chunk[..n.min(room)]);
                    if n > room {
                        truncated = true;
                    }
                }
            }
        }
        if truncated {
            debug!(limit = OUTPUT_CAPTURE_LIMIT_BYTES, "captured output truncated");
        }
        String::from_utf8_lossy(&captured).into_owned()
    })
}
