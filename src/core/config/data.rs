use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::qwen::QwenConfig;

/// On-disk configuration (`config.toml` in the platform config directory).
///
/// Every field is optional; defaults cover a stock installation where the
/// `qwen` binary is on PATH.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Name or path of the Qwen Code CLI binary.
    pub binary: Option<String>,
    /// Model name reported in responses.
    pub model: Option<String>,
    /// Wall-clock budget for a single CLI invocation, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Attempt budget for one ask call.
    pub max_attempts: Option<u32>,
    /// Fixed delay between retryable attempts, in milliseconds.
    pub retry_delay_ms: Option<u64>,
}

impl Config {
    /// Resolve the on-disk settings into a concrete client configuration.
    /// Out-of-range values are clamped to the smallest legal setting rather
    /// than rejected.
    pub fn client_config(&self, api_key: Option<String>) -> QwenConfig {
        let mut resolved = QwenConfig::default();
        if let Some(binary) = &self.binary {
            resolved.binary = binary.clone();
        }
        if let Some(model) = &self.model {
            resolved.model = model.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            resolved.timeout = Duration::from_millis(timeout_ms.max(1));
        }
        if let Some(max_attempts) = self.max_attempts {
            resolved.max_attempts = max_attempts.max(1);
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms {
            resolved.retry_delay = Duration::from_millis(retry_delay_ms);
        }
        resolved.api_key = api_key;
        resolved
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = std::path::PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
