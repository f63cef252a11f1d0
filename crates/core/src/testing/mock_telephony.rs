//! Mock telephony service for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::telephony::{CallArtifacts, PlacedCall, TelephonyClient, TelephonyError};

/// A recorded placement for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub target: String,
    pub message: String,
    pub metadata: Value,
    pub call_sid: String,
}

#[derive(Debug, Default)]
struct State {
    placed: Vec<RecordedCall>,
    statuses: VecDeque<String>,
    status_error: Option<String>,
    placement_error: Option<String>,
    placement_delay: Option<Duration>,
    artifacts: CallArtifacts,
    artifacts_error: Option<String>,
    artifacts_delay: Option<Duration>,
    status_queries: usize,
    artifact_fetches: usize,
}

/// Mock implementation of the TelephonyClient trait.
///
/// Provides controllable behavior for testing:
/// - Script the sequence of statuses a call reports
/// - Fail placement, status checks or artifact fetches
/// - Delay placement or artifact fetches
/// - Count status queries and artifact fetches
///
/// Once the status script runs out every query answers `in-progress`.
///
/// # Example
///
/// ```rust,ignore
/// let telephony = Arc::new(MockTelephony::new());
/// telephony.script_statuses(&["ringing", "in-progress", "completed"]).await;
/// telephony.set_artifacts(artifacts).await;
///
/// manager.initiate("cr-001", "+15550100", "Hello", Value::Null).await?;
/// tokio::time::sleep(Duration::from_secs(30)).await;
///
/// assert_eq!(telephony.status_queries().await, 3);
/// assert_eq!(telephony.artifact_fetches().await, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockTelephony {
    state: Arc<RwLock<State>>,
}

impl MockTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses reported by successive queries, for any call.
    pub async fn script_statuses(&self, statuses: &[&str]) {
        let mut state = self.state.write().await;
        state.statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub async fn fail_status(&self, message: &str) {
        self.state.write().await.status_error = Some(message.to_string());
    }

    pub async fn fail_placement(&self, message: &str) {
        self.state.write().await.placement_error = Some(message.to_string());
    }

    /// Make the next placements take `delay` before answering.
    pub async fn delay_placement(&self, delay: Duration) {
        self.state.write().await.placement_delay = Some(delay);
    }

    pub async fn set_artifacts(&self, artifacts: CallArtifacts) {
        let mut state = self.state.write().await;
        state.artifacts = artifacts;
        state.artifacts_error = None;
    }

    /// Make artifact fetches take `delay` before answering.
    pub async fn delay_artifacts(&self, delay: Duration) {
        self.state.write().await.artifacts_delay = Some(delay);
    }

    pub async fn fail_artifacts(&self, message: &str) {
        self.state.write().await.artifacts_error = Some(message.to_string());
    }

    pub async fn placed_calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.placed.clone()
    }

    pub async fn status_queries(&self) -> usize {
        self.state.read().await.status_queries
    }

    pub async fn artifact_fetches(&self) -> usize {
        self.state.read().await.artifact_fetches
    }
}

#[async_trait]
impl TelephonyClient for MockTelephony {
    async fn place_call(
        &self,
        target: &str,
        message: &str,
        metadata: &Value,
    ) -> Result<PlacedCall, TelephonyError> {
        let delay = self.state.read().await.placement_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        if let Some(ref message) = state.placement_error {
            return Err(TelephonyError::Api {
                status: 503,
                message: message.clone(),
            });
        }

        let call_sid = format!("CA-mock-{}", state.placed.len() + 1);
        state.placed.push(RecordedCall {
            target: target.to_string(),
            message: message.to_string(),
            metadata: metadata.clone(),
            call_sid: call_sid.clone(),
        });
        Ok(PlacedCall { call_sid })
    }

    async fn call_status(&self, _call_sid: &str) -> Result<String, TelephonyError> {
        let mut state = self.state.write().await;
        state.status_queries += 1;
        if let Some(ref message) = state.status_error {
            return Err(TelephonyError::Http(message.clone()));
        }
        Ok(state
            .statuses
            .pop_front()
            .unwrap_or_else(|| "in-progress".to_string()))
    }

    async fn call_artifacts(&self, _call_sid: &str) -> Result<CallArtifacts, TelephonyError> {
        let delay = self.state.read().await.artifacts_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        state.artifact_fetches += 1;
        if let Some(ref message) = state.artifacts_error {
            return Err(TelephonyError::Http(message.clone()));
        }
        Ok(state.artifacts.clone())
    }
}
