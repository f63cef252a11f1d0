//! Merging call artifacts into a conversation record.

use chrono::{DateTime, Duration, Utc};

use crate::conversation::{ConversationMessage, MessageKind};
use crate::telephony::CallArtifacts;

/// Sender recorded on call summaries.
pub const CALL_SENDER: &str = "call_agent";

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The full record after the merge.
    pub messages: Vec<ConversationMessage>,
    /// Entries from an earlier merge of the same call that were dropped.
    pub replaced_entries: usize,
    pub transcript_turns: usize,
}

/// Merge `artifacts` for `call_sid` into `existing`.
///
/// Summary and transcript entries already tagged with `call_sid` are removed
/// first, so merging the same call twice leaves a single copy. Other entries
/// keep their order. The new summary is stamped `now` and each turn follows it
/// one millisecond apart.
pub fn merge_call_artifacts(
    existing: Vec<ConversationMessage>,
    call_sid: &str,
    artifacts: &CallArtifacts,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let before = existing.len();
    let mut messages: Vec<ConversationMessage> = existing
        .into_iter()
        .filter(|m| !is_call_entry(m, call_sid))
        .collect();
    let replaced_entries = before - messages.len();

    let turns = artifacts.turns();
    messages.push(summary_entry(call_sid, artifacts, now));

    for (index, turn) in turns.iter().enumerate() {
        let speaker = if turn.speaker.trim().is_empty() {
            "unknown"
        } else {
            turn.speaker.as_str()
        };
        messages.push(
            ConversationMessage::new(speaker, MessageKind::TranscriptTurn, turn.text.clone())
                .with_timestamp(now + Duration::milliseconds(index as i64 + 1))
                .with_metadata("call_sid", call_sid)
                .with_metadata("turn_index", index as u64),
        );
    }

    MergeOutcome {
        messages,
        replaced_entries,
        transcript_turns: turns.len(),
    }
}

fn is_call_entry(message: &ConversationMessage, call_sid: &str) -> bool {
    matches!(
        message.kind,
        MessageKind::CallSummary | MessageKind::TranscriptTurn
    ) && message.call_sid() == Some(call_sid)
}

fn summary_entry(
    call_sid: &str,
    artifacts: &CallArtifacts,
    now: DateTime<Utc>,
) -> ConversationMessage {
    let turn_count = artifacts.turns().len();

    let mut content = String::from("Call completed.");
    if let Some(seconds) = artifacts.duration_seconds {
        content.push_str(&format!(" Duration: {}m {:02}s.", seconds / 60, seconds % 60));
    }
    content.push_str(&format!(" Transcript: {} turns.", turn_count));
    if let Some(ref url) = artifacts.recording_url {
        content.push_str(&format!(" Recording: {}", url));
    }

    let mut entry = ConversationMessage::new(CALL_SENDER, MessageKind::CallSummary, content)
        .with_timestamp(now)
        .with_metadata("call_sid", call_sid)
        .with_metadata("turn_count", turn_count as u64);
    if let Some(ref url) = artifacts.recording_url {
        entry = entry.with_metadata("recording_url", url.as_str());
    }
    if let Some(seconds) = artifacts.duration_seconds {
        entry = entry.with_metadata("duration_seconds", seconds);
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telephony::TranscriptTurn;

    fn artifacts(turns: &[(&str, &str)]) -> CallArtifacts {
        CallArtifacts {
            recording_url: Some("https://rec.example/CA1.mp3".to_string()),
            duration_seconds: Some(125),
            transcript_turns: Some(
                turns
                    .iter()
                    .map(|(speaker, text)| TranscriptTurn {
                        speaker: speaker.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
            ),
            context_id: None,
        }
    }

    fn count_summaries(messages: &[ConversationMessage], sid: &str) -> usize {
        messages
            .iter()
            .filter(|m| m.kind == MessageKind::CallSummary && m.call_sid() == Some(sid))
            .count()
    }

    #[test]
    fn test_merge_appends_summary_and_turns() {
        let existing = vec![ConversationMessage::new("brand", MessageKind::Outreach, "Hello")];
        let now = Utc::now();

        let outcome = merge_call_artifacts(
            existing,
            "CA1",
            &artifacts(&[("agent", "Hi"), ("creator", "Hey"), ("agent", "Bye")]),
            now,
        );

        assert_eq!(outcome.messages.len(), 5);
        assert_eq!(outcome.replaced_entries, 0);
        assert_eq!(outcome.transcript_turns, 3);
        assert_eq!(outcome.messages[0].kind, MessageKind::Outreach);

        let summary = &outcome.messages[1];
        assert_eq!(summary.kind, MessageKind::CallSummary);
        assert!(summary.content.contains("Duration: 2m 05s."));
        assert!(summary.content.contains("Transcript: 3 turns."));
        assert_eq!(summary.metadata["recording_url"], "https://rec.example/CA1.mp3");

        let stamps: Vec<_> = outcome.messages[1..].iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(outcome.messages[3].sender, "creator");
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let first = merge_call_artifacts(
            Vec::new(),
            "CA1",
            &artifacts(&[("agent", "Hi")]),
            Utc::now(),
        );
        let second = merge_call_artifacts(
            first.messages,
            "CA1",
            &artifacts(&[("agent", "Hi"), ("creator", "Hello")]),
            Utc::now(),
        );

        assert_eq!(second.replaced_entries, 2);
        assert_eq!(count_summaries(&second.messages, "CA1"), 1);
        assert_eq!(second.messages.len(), 3);
    }

    #[test]
    fn test_merge_keeps_other_calls_and_system_entries() {
        let first = merge_call_artifacts(Vec::new(), "CA1", &artifacts(&[]), Utc::now());
        let mut existing = first.messages;
        existing.push(
            ConversationMessage::new("system", MessageKind::System, "superseded")
                .with_metadata("call_sid", "CA2"),
        );

        let outcome = merge_call_artifacts(existing, "CA2", &artifacts(&[]), Utc::now());
        assert_eq!(count_summaries(&outcome.messages, "CA1"), 1);
        assert_eq!(count_summaries(&outcome.messages, "CA2"), 1);
        assert!(outcome
            .messages
            .iter()
            .any(|m| m.kind == MessageKind::System));
    }

    #[test]
    fn test_merge_without_optional_fields() {
        let outcome =
            merge_call_artifacts(Vec::new(), "CA9", &CallArtifacts::default(), Utc::now());
        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].content, "Call completed. Transcript: 0 turns.");
        assert!(!outcome.messages[0].metadata.contains_key("recording_url"));
    }
}
