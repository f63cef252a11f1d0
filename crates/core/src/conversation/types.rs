use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of entry in a conversation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Message sent to a creator.
    Outreach,
    /// Reply received from a creator.
    Reply,
    /// Free-form note by an operator.
    Note,
    /// Summary of a completed call.
    CallSummary,
    /// One spoken turn from a call transcript.
    TranscriptTurn,
    /// Lifecycle events recorded by the system.
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Outreach => "outreach",
            MessageKind::Reply => "reply",
            MessageKind::Note => "note",
            MessageKind::CallSummary => "call_summary",
            MessageKind::TranscriptTurn => "transcript_turn",
            MessageKind::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outreach" => Some(MessageKind::Outreach),
            "reply" => Some(MessageKind::Reply),
            "note" => Some(MessageKind::Note),
            "call_summary" => Some(MessageKind::CallSummary),
            "transcript_turn" => Some(MessageKind::TranscriptTurn),
            "system" => Some(MessageKind::System),
            _ => None,
        }
    }
}

/// One entry in a conversation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    /// Who produced the entry ("brand", "creator", "agent", "system", ...).
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ConversationMessage {
    pub fn new(sender: impl Into<String>, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.into(),
            kind,
            timestamp: Utc::now(),
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The call this entry was produced from, if any.
    pub fn call_sid(&self) -> Option<&str> {
        self.metadata.get("call_sid").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [
            MessageKind::Outreach,
            MessageKind::Reply,
            MessageKind::Note,
            MessageKind::CallSummary,
            MessageKind::TranscriptTurn,
            MessageKind::System,
        ] {
            assert_eq!(MessageKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::parse("carrier_pigeon"), None);
    }

    #[test]
    fn test_call_sid_from_metadata() {
        let message = ConversationMessage::new("system", MessageKind::CallSummary, "Call done")
            .with_metadata("call_sid", "CA123");
        assert_eq!(message.call_sid(), Some("CA123"));

        let plain = ConversationMessage::new("brand", MessageKind::Note, "hi");
        assert_eq!(plain.call_sid(), None);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let message = ConversationMessage::new("agent", MessageKind::TranscriptTurn, "Hello");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "transcript_turn");
        assert_eq!(json["sender"], "agent");
    }
}
