//! Shared constants used across the application

/// Name of the Qwen Code CLI binary, resolved through PATH unless the
/// configuration points at an explicit location.
pub const QWEN_BINARY: &str = "qwen";

/// Model name reported in responses when none is configured.
pub const DEFAULT_MODEL: &str = "qwen-max";

/// Wall-clock budget for a single CLI invocation.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Attempt budget for one `ask` call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between retryable attempts.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Budget for the `--version` availability probe.
pub const PROBE_TIMEOUT_MS: u64 = 5_000;

/// How long a terminated child gets to exit after SIGTERM before SIGKILL.
pub const KILL_GRACE_MS: u64 = 1_000;

/// Per-stream capture cap. Output past this point is still drained so the
/// child never blocks on a full pipe, but it is discarded.
pub const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// `sandbox-test` echoes at most this many characters of the submitted code.
pub const SANDBOX_ECHO_LIMIT: usize = 200;

/// Instruction used when `analyze_content` is called without a prompt.
pub const DEFAULT_ANALYZE_PROMPT: &str = "Analyze this content";

/// Guidance returned when the CLI cannot be found on the host.
pub const INSTALL_GUIDANCE: &str = "Qwen CLI is not installed or not on PATH. \
Install it with `npm install -g @qwen-code/qwen-code` and run `qwen` once to authenticate.";
