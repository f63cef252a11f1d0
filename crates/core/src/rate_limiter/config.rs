use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the shared admission gate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum admissions inside one window.
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Length of the trailing window in milliseconds.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Extra delay added to every computed wait so the oldest entry has
    /// definitely left the window when the caller rechecks.
    #[serde(default = "default_safety_margin_ms")]
    pub safety_margin_ms: u64,
}

fn default_capacity() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_safety_margin_ms() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window_ms: default_window_ms(),
            safety_margin_ms: default_safety_margin_ms(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }
}
