use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling parameters for the call lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsConfig {
    /// Interval between status checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Non-terminal status checks tolerated before the call is failed.
    #[serde(default = "default_max_polling_attempts")]
    pub max_polling_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_polling_attempts() -> u32 {
    24
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polling_attempts: default_max_polling_attempts(),
        }
    }
}

impl CallsConfig {
    /// Interval between status checks, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
