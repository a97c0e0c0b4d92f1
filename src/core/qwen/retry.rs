//! Bounded retry around single CLI attempts.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CliRunner, InvocationOutcome, QwenConfig, QwenResponse};

/// Drive the runner until success, a fatal outcome, or attempt exhaustion.
/// Attempts are strictly sequential; a fixed delay separates retries.
pub(super) async fn ask_with_retry(
    runner: &dyn CliRunner,
    config: &QwenConfig,
    full_prompt: &str,
    cancel: &CancellationToken,
) -> QwenResponse {
    let max_attempts = config.max_attempts.max(1);
    let mut last_reason = String::new();

    for attempt in 1..=max_attempts {
        match runner.run(full_prompt, cancel).await {
            InvocationOutcome::Success(content) => {
                debug!(attempt, "qwen invocation succeeded");
                return QwenResponse::content(&config.model, content);
            }
            InvocationOutcome::Fatal(reason) => {
                warn!(attempt, reason = %reason, "qwen invocation failed fatally");
                return QwenResponse::error(&config.model, reason);
            }
            InvocationOutcome::Retryable(reason) => {
                warn!(attempt, max_attempts, reason = %reason, "qwen invocation failed");
                last_reason = reason;
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return QwenResponse::error(&config.model, "canceled".to_string());
                }
                _ = tokio::time::sleep(config.retry_delay) => {}
            }
        }
    }

    QwenResponse::error(
        &config.model,
        format!("Failed after {max_attempts} attempts: {last_reason}"),
    )
}
