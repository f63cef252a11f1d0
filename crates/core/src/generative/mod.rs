//! Hosted text generation.
//!
//! Provider clients sit behind the [`GenerativeClient`] trait. Callers never use
//! a client directly: they go through [`GenerativeGateway`], which pairs the
//! optional client with the process-wide admission gate.

mod client;
mod config;
mod gateway;
mod json;
mod providers;

pub use client::{CompletionRequest, CompletionResponse, GenerativeClient, TokenUsage};
pub use config::{GenerativeConfig, GenerativeProvider};
pub use gateway::GenerativeGateway;
pub use json::extract_json_block;
pub use providers::{
    create_generative_client, AnthropicClient, ChatCompletionsClient, OllamaClient,
};

use std::time::Duration;
use thiserror::Error;

use crate::rate_limiter::AdmissionError;

/// Error type for generative operations.
#[derive(Debug, Error)]
pub enum GenerativeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Generative capability not configured")]
    NotConfigured,

    #[error(transparent)]
    AdmissionDenied(#[from] AdmissionError),
}

impl GenerativeError {
    /// Short label used for metrics and fallback reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerativeError::Http(_) => "http",
            GenerativeError::Api { .. } => "api",
            GenerativeError::Json(_) => "malformed",
            GenerativeError::Timeout(_) => "timeout",
            GenerativeError::NotConfigured => "not_configured",
            GenerativeError::AdmissionDenied(_) => "admission_denied",
        }
    }
}
