use serde::{Deserialize, Serialize};

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCall {
    pub call_sid: String,
}

/// One spoken turn of a call transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: String,
    pub text: String,
}

/// Retrievable byproducts of a finished call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_turns: Option<Vec<TranscriptTurn>>,
    /// Context the call was placed for, when the service echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl CallArtifacts {
    pub fn turns(&self) -> &[TranscriptTurn] {
        self.transcript_turns.as_deref().unwrap_or_default()
    }
}
