use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::ConversationError;
use crate::telephony::TelephonyError;

/// Lifecycle phase of the tracked call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Idle,
    Initiating,
    Polling,
    Fetching,
    Completed,
    Failed,
}

impl CallPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::Idle => "idle",
            CallPhase::Initiating => "initiating",
            CallPhase::Polling => "polling",
            CallPhase::Fetching => "fetching",
            CallPhase::Completed => "completed",
            CallPhase::Failed => "failed",
        }
    }

    /// Whether a session occupies the slot in this phase.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CallPhase::Initiating | CallPhase::Polling | CallPhase::Fetching
        )
    }
}

/// The single tracked call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSession {
    /// Local generation tag. Results issued for an older id are discarded.
    pub session_id: u64,
    /// Conversation record the artifacts are merged into.
    pub context_id: String,
    /// Remote call id, known once placement succeeds.
    pub call_sid: Option<String>,
    /// Last status reported by the call service.
    pub status: Option<String>,
    /// Non-terminal status checks so far.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Immutable view of the manager state handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSnapshot {
    /// Increases with every published mutation.
    pub version: u64,
    pub phase: CallPhase,
    pub session: Option<CallSession>,
    pub status_message: String,
    pub error_message: Option<String>,
    /// Set only on the notification that follows a change to stored
    /// conversation data.
    pub data_changed: bool,
    /// Conversation whose stored data changed, alongside `data_changed`.
    pub changed_context_id: Option<String>,
}

impl CallSnapshot {
    pub fn idle() -> Self {
        Self {
            version: 0,
            phase: CallPhase::Idle,
            session: None,
            status_message: "No active call".to_string(),
            error_message: None,
            data_changed: false,
            changed_context_id: None,
        }
    }
}

/// How a remote status string is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    Completed,
    /// Queued, ringing, in progress, or anything not recognized.
    Pending,
    /// Terminal failure, carrying the normalized status.
    Failed(String),
}

/// Classify a status from the call service. The vocabulary is open-ended;
/// unknown values are treated as pending.
pub fn classify_status(status: &str) -> StatusClass {
    let normalized = status.trim().to_lowercase().replace(['_', ' '], "-");
    match normalized.as_str() {
        "completed" => StatusClass::Completed,
        "failed" | "no-answer" | "busy" | "canceled" | "cancelled" => {
            StatusClass::Failed(normalized)
        }
        _ => StatusClass::Pending,
    }
}

/// Result of merging call artifacts into a conversation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub context_id: String,
    pub call_sid: String,
    /// Entries from an earlier merge of the same call that were replaced.
    pub replaced_entries: usize,
    pub transcript_turns: usize,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("call placement failed: {0}")]
    Placement(TelephonyError),

    #[error("call was superseded by a newer call")]
    Superseded,

    #[error("no active call to fetch artifacts for")]
    NoActiveCall,

    #[error("cannot resolve the conversation for call {0}")]
    UnknownContext(String),

    #[error("artifact fetch failed: {0}")]
    Fetch(TelephonyError),

    #[error("conversation storage failed: {0}")]
    Storage(#[from] ConversationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status("completed"), StatusClass::Completed);
        assert_eq!(classify_status(" Completed "), StatusClass::Completed);
        assert_eq!(classify_status("in-progress"), StatusClass::Pending);
        assert_eq!(classify_status("ringing"), StatusClass::Pending);
        assert_eq!(classify_status("queued"), StatusClass::Pending);
        assert_eq!(classify_status("initiated"), StatusClass::Pending);
        assert_eq!(classify_status("transferring"), StatusClass::Pending);
        assert_eq!(
            classify_status("no_answer"),
            StatusClass::Failed("no-answer".to_string())
        );
        assert_eq!(
            classify_status("BUSY"),
            StatusClass::Failed("busy".to_string())
        );
        assert_eq!(
            classify_status("canceled"),
            StatusClass::Failed("canceled".to_string())
        );
    }

    #[test]
    fn test_phase_activity() {
        assert!(CallPhase::Polling.is_active());
        assert!(CallPhase::Fetching.is_active());
        assert!(!CallPhase::Idle.is_active());
        assert!(!CallPhase::Failed.is_active());
    }
}
