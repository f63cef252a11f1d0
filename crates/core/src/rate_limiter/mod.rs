//! Sliding-window admission control for the generative capability.
//!
//! A single [`SlidingWindowLimiter`] is shared by every caller that talks to the
//! hosted text generator, so the provider quota is respected no matter which
//! pipeline stage or advisor triggered the request.

mod config;
mod sliding_window;

pub use config::RateLimitConfig;
pub use sliding_window::{RateLimitStatus, SlidingWindowLimiter};

use std::time::Duration;
use thiserror::Error;

/// Errors from the admission gate.
///
/// Plain waiting is not an error; only a caller-imposed budget can turn a wait
/// into a denial.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("admission denied for {caller}: next slot in {}ms", retry_after.as_millis())]
    Denied {
        caller: String,
        retry_after: Duration,
    },
}
