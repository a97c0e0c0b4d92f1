//! Managed client for the Qwen Code CLI.
//!
//! The client never unwinds: every failure is folded into the returned
//! [`QwenResponse`] as an error string. One instance is expected per logical
//! session (the tool layer builds one per RPC call); the availability
//! verdict is probed once and memoized for the lifetime of the instance, so
//! a tool installed or removed mid-session is not noticed until the next
//! session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::constants::{
    DEFAULT_ANALYZE_PROMPT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_MS, INSTALL_GUIDANCE, QWEN_BINARY,
};

mod invoker;
mod retry;

pub use invoker::ProcessRunner;

/// Immutable settings for one client instance. The credential is the only
/// field with a post-construction update path ([`QwenClient::set_api_key`]).
#[derive(Debug, Clone)]
pub struct QwenConfig {
    /// Name or path of the CLI binary.
    pub binary: String,
    /// Model name carried in responses.
    pub model: String,
    /// Wall-clock budget for a single invocation.
    pub timeout: Duration,
    /// Attempt budget for one ask call, at least 1.
    pub max_attempts: u32,
    /// Fixed delay between retryable attempts.
    pub retry_delay: Duration,
    /// Forwarded to the child process as `QWEN_API_KEY` when present.
    pub api_key: Option<String>,
}

impl Default for QwenConfig {
    fn default() -> Self {
        Self {
            binary: QWEN_BINARY.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            api_key: None,
        }
    }
}

/// Final result of an ask. Exactly one of `content` and `error` is
/// meaningful; `content` is only trustworthy when `error` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QwenResponse {
    pub content: String,
    pub model: String,
    pub error: Option<String>,
}

impl QwenResponse {
    fn content(model: &str, content: String) -> Self {
        Self {
            content,
            model: model.to_string(),
            error: None,
        }
    }

    fn error(model: &str, error: String) -> Self {
        Self {
            content: String::new(),
            model: model.to_string(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a single spawn-to-terminal-event cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Clean exit with output; carries the trimmed stdout text.
    Success(String),
    /// The attempt failed in a way that may clear up on its own.
    Retryable(String),
    /// Deterministic failure; further attempts would fail identically.
    Fatal(String),
}

/// Seam between the retry/facade layers and the actual CLI processes. The
/// production implementation is [`ProcessRunner`]; tests substitute scripted
/// doubles.
#[async_trait]
pub trait CliRunner: Send + Sync {
    /// Cheap version-query invocation deciding whether the CLI is usable.
    async fn probe(&self) -> bool;

    /// One managed invocation of the CLI with the complete prompt text.
    async fn run(&self, full_prompt: &str, cancel: &CancellationToken) -> InvocationOutcome;
}

/// Facade over prober, invoker, and retry coordinator.
pub struct QwenClient {
    config: QwenConfig,
    /// `None` selects the production [`ProcessRunner`].
    runner: Option<Arc<dyn CliRunner>>,
    availability: OnceCell<bool>,
}

impl QwenClient {
    pub fn new(config: QwenConfig) -> Self {
        Self {
            config,
            runner: None,
            availability: OnceCell::new(),
        }
    }

    /// Build a client around an alternate runner. Used by tests and
    /// embedders that already manage their own processes.
    pub fn with_runner(config: QwenConfig, runner: Arc<dyn CliRunner>) -> Self {
        Self {
            config,
            runner: Some(runner),
            availability: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Update the credential forwarded to spawned CLI processes. The rest of
    /// the configuration stays immutable.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.config.api_key = Some(api_key.into());
    }

    fn runner(&self) -> Arc<dyn CliRunner> {
        match &self.runner {
            Some(runner) => runner.clone(),
            None => Arc::new(ProcessRunner::new(&self.config)),
        }
    }

    /// Memoized availability verdict. The first call spawns the probe; all
    /// later calls return the cached answer without touching the host.
    pub async fn check_available(&self) -> bool {
        let runner = self.runner();
        *self
            .availability
            .get_or_init(|| async move {
                let available = runner.probe().await;
                debug!(available, "qwen availability probed");
                available
            })
            .await
    }

    /// Send a prompt to the model, prepending `context` when present.
    pub async fn ask(&self, prompt: &str, context: Option<&str>) -> QwenResponse {
        self.ask_with_cancel(prompt, context, &CancellationToken::new())
            .await
    }

    /// Like [`ask`](Self::ask), but the caller can abort in-flight work. A
    /// canceled call terminates the child process and returns an error
    /// result without further attempts.
    pub async fn ask_with_cancel(
        &self,
        prompt: &str,
        context: Option<&str>,
        cancel: &CancellationToken,
    ) -> QwenResponse {
        let full_prompt = match context {
            Some(context) if !context.is_empty() => format!("{context}\n\n{prompt}"),
            _ => prompt.to_string(),
        };

        if !self.check_available().await {
            return QwenResponse::error(&self.config.model, INSTALL_GUIDANCE.to_string());
        }

        retry::ask_with_retry(self.runner().as_ref(), &self.config, &full_prompt, cancel).await
    }

    /// Analyze a block of content. The content rides along as context and
    /// the instruction (defaulting to a generic one) becomes the prompt.
    pub async fn analyze_content(&self, content: &str, prompt: Option<&str>) -> QwenResponse {
        self.ask(prompt.unwrap_or(DEFAULT_ANALYZE_PROMPT), Some(content))
            .await
    }
}
