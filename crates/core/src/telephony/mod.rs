//! Telephony collaborator.
//!
//! The call service places an outbound call, reports its status from an
//! open-ended vocabulary, and exposes the artifacts (recording, transcript)
//! once the call is over.

mod config;
mod http;
mod types;

pub use config::TelephonyConfig;
pub use http::HttpTelephonyClient;
pub use types::{CallArtifacts, PlacedCall, TranscriptTurn};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error type for telephony operations.
#[derive(Debug, Clone, Error)]
pub enum TelephonyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Telephony service not configured")]
    NotConfigured,
}

/// Call-placement, call-status and call-artifact service.
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    /// Place an outbound call.
    async fn place_call(
        &self,
        target: &str,
        message: &str,
        metadata: &Value,
    ) -> Result<PlacedCall, TelephonyError>;

    /// Current remote status of a call (e.g. "queued", "in-progress", "completed").
    async fn call_status(&self, call_sid: &str) -> Result<String, TelephonyError>;

    /// Recording and transcript of a finished call.
    async fn call_artifacts(&self, call_sid: &str) -> Result<CallArtifacts, TelephonyError>;
}

/// Stand-in used when no telephony service is configured. Every call fails
/// with [`TelephonyError::NotConfigured`].
#[derive(Debug, Default)]
pub struct DisabledTelephony;

#[async_trait]
impl TelephonyClient for DisabledTelephony {
    async fn place_call(
        &self,
        _target: &str,
        _message: &str,
        _metadata: &Value,
    ) -> Result<PlacedCall, TelephonyError> {
        Err(TelephonyError::NotConfigured)
    }

    async fn call_status(&self, _call_sid: &str) -> Result<String, TelephonyError> {
        Err(TelephonyError::NotConfigured)
    }

    async fn call_artifacts(&self, _call_sid: &str) -> Result<CallArtifacts, TelephonyError> {
        Err(TelephonyError::NotConfigured)
    }
}
