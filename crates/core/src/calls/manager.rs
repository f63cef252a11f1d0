//! Single-slot tracker for an externally placed call.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    classify_status, merge_call_artifacts, CallError, CallPhase, CallSession, CallSnapshot,
    CallsConfig, MergeReport, NotificationBus, Observer, StatusClass, Subscription,
};
use crate::conversation::{ConversationMessage, ConversationStore, MessageKind};
use crate::metrics;
use crate::telephony::{TelephonyClient, TelephonyError};

/// Tracks at most one call from placement to merged artifacts.
///
/// Phases: `Idle -> Initiating -> Polling -> Fetching -> Completed | Failed -> Idle`.
/// A new [`initiate`](Self::initiate) cancels and discards the current
/// session. Every in-flight request carries the session id it was issued
/// for, and its result is dropped if that session is no longer current.
///
/// Only `initiate` and `manually_fetch_artifacts` return errors. The polling
/// task reports everything through the notification bus.
#[derive(Clone)]
pub struct CallLifecycleManager {
    inner: Arc<Inner>,
}

struct Inner {
    telephony: Arc<dyn TelephonyClient>,
    store: Arc<dyn ConversationStore>,
    config: CallsConfig,
    state: Mutex<State>,
    bus: NotificationBus,
    next_session_id: AtomicU64,
}

struct State {
    version: u64,
    phase: CallPhase,
    session: Option<CallSession>,
    status_message: String,
    error_message: Option<String>,
    polling: Option<CancellationToken>,
}

impl State {
    /// `changed_context` names the conversation whose stored data changed.
    fn snapshot(&self, changed_context: Option<String>) -> CallSnapshot {
        CallSnapshot {
            version: self.version,
            phase: self.phase,
            session: self.session.clone(),
            status_message: self.status_message.clone(),
            error_message: self.error_message.clone(),
            data_changed: changed_context.is_some(),
            changed_context_id: changed_context,
        }
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.session.as_ref().map(|s| s.session_id) == Some(session_id)
    }

    fn stop_polling(&mut self) {
        if let Some(token) = self.polling.take() {
            token.cancel();
        }
    }
}

enum Tick {
    Continue,
    Fetch,
    Stop,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.lock_state().is_current(session_id)
    }

    /// Bump the version, release the lock and notify observers.
    fn publish(&self, mut state: MutexGuard<'_, State>, changed_context: Option<String>) {
        state.version += 1;
        let snapshot = state.snapshot(changed_context);
        drop(state);
        self.bus.publish(snapshot);
    }

    /// Move the slot to a terminal phase, notify, then release it to idle.
    ///
    /// With `session_id`, applies only while that session is current. Without
    /// one, applies only when no session is active. When the slot belongs to
    /// another session only a data change is published; the error stays with
    /// the caller.
    fn finish(
        &self,
        session_id: Option<u64>,
        phase: CallPhase,
        status_message: String,
        error: Option<String>,
        changed_context: Option<String>,
    ) {
        let mut state = self.lock_state();
        let owns_slot = match session_id {
            Some(id) => state.is_current(id),
            None => !state.phase.is_active(),
        };

        if !owns_slot {
            if changed_context.is_some() {
                self.publish(state, changed_context);
            }
            return;
        }

        state.stop_polling();
        state.phase = phase;
        state.status_message = status_message;
        state.error_message = error.clone();
        if let (Some(session), Some(error)) = (state.session.as_mut(), error) {
            session.last_error = Some(error);
        }
        self.publish(state, changed_context);

        let mut state = self.lock_state();
        let still_ours = match session_id {
            Some(id) => state.is_current(id),
            None => state.session.is_none(),
        };
        if state.phase == phase && still_ours {
            state.phase = CallPhase::Idle;
            state.session = None;
            self.publish(state, None);
        }
    }

    fn record_superseded(&self, previous: &CallSession) {
        metrics::CALL_OUTCOMES
            .with_label_values(&["superseded"])
            .inc();

        let content = match previous.call_sid {
            Some(ref sid) => {
                format!("Call {} was superseded by a newer call before it finished", sid)
            }
            None => "Call placement was superseded by a newer call".to_string(),
        };
        let mut entry = ConversationMessage::new("system", MessageKind::System, content)
            .with_metadata("event", "call_superseded");
        if let Some(ref sid) = previous.call_sid {
            entry = entry.with_metadata("call_sid", sid.as_str());
        }

        if let Err(e) = self.store.append_message(&previous.context_id, &entry) {
            warn!(
                context_id = %previous.context_id,
                error = %e,
                "Failed to record superseded call"
            );
            return;
        }
        self.publish(self.lock_state(), Some(previous.context_id.clone()));
    }

    fn apply_status(
        &self,
        session_id: u64,
        call_sid: &str,
        result: Result<String, TelephonyError>,
    ) -> Tick {
        let mut state = self.lock_state();
        if !state.is_current(session_id) || state.phase != CallPhase::Polling {
            metrics::POLL_TICKS.with_label_values(&["stale"]).inc();
            debug!(session_id, call_sid = %call_sid, "Discarding status for stale session");
            return Tick::Stop;
        }

        let (status, error) = match result {
            Ok(status) => (Some(status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let class = status
            .as_deref()
            .map(classify_status)
            .unwrap_or(StatusClass::Pending);

        let mut attempts = 0;
        if let Some(session) = state.session.as_mut() {
            if status.is_some() {
                session.status = status.clone();
            }
            if error.is_some() {
                session.last_error = error.clone();
            }
            if class == StatusClass::Pending {
                session.attempts += 1;
            }
            attempts = session.attempts;
        }

        match class {
            StatusClass::Completed => {
                metrics::POLL_TICKS.with_label_values(&["completed"]).inc();
                info!(call_sid = %call_sid, "Call completed, fetching artifacts");
                // The polling task exits on its own after the fetch.
                state.polling = None;
                state.phase = CallPhase::Fetching;
                state.status_message = format!("Call {} completed, fetching artifacts", call_sid);
                self.publish(state, None);
                Tick::Fetch
            }
            StatusClass::Failed(status) => {
                metrics::POLL_TICKS.with_label_values(&["failed"]).inc();
                metrics::CALL_OUTCOMES.with_label_values(&["failed"]).inc();
                warn!(call_sid = %call_sid, status = %status, "Call ended without completing");
                drop(state);
                self.finish(
                    Some(session_id),
                    CallPhase::Failed,
                    format!("Call {} ended", call_sid),
                    Some(format!("Call ended with status: {}", status)),
                    None,
                );
                Tick::Stop
            }
            StatusClass::Pending => {
                let label = if error.is_some() { "error" } else { "pending" };
                metrics::POLL_TICKS.with_label_values(&[label]).inc();

                let max = self.config.max_polling_attempts;
                if attempts >= max {
                    metrics::CALL_OUTCOMES.with_label_values(&["timeout"]).inc();
                    warn!(call_sid = %call_sid, attempts, "Call status polling timed out");
                    drop(state);
                    self.finish(
                        Some(session_id),
                        CallPhase::Failed,
                        format!("Stopped tracking call {}", call_sid),
                        Some(format!(
                            "Call status polling timed out after {} checks",
                            attempts
                        )),
                        None,
                    );
                    return Tick::Stop;
                }

                state.status_message = match (&status, &error) {
                    (Some(status), _) => {
                        format!("Call {}: {} (check {}/{})", call_sid, status, attempts, max)
                    }
                    (None, Some(error)) => format!(
                        "Status check {}/{} for call {} failed: {}",
                        attempts, max, call_sid, error
                    ),
                    (None, None) => format!("Waiting for call {}", call_sid),
                };
                self.publish(state, None);
                Tick::Continue
            }
        }
    }

    /// Fetch artifacts for `call_sid` and merge them into the conversation.
    ///
    /// `session` carries the id and recorded context of the tracked session
    /// the fetch belongs to; without it the context comes from the payload.
    async fn fetch_and_merge(
        &self,
        call_sid: &str,
        session: Option<(u64, String)>,
    ) -> Result<MergeReport, CallError> {
        let session_id = session.as_ref().map(|(id, _)| *id);
        let fetched = self.telephony.call_artifacts(call_sid).await;

        if let Some(id) = session_id {
            if !self.is_current(id) {
                debug!(call_sid = %call_sid, "Discarding artifacts for superseded session");
                return Err(CallError::Superseded);
            }
        }

        let artifacts = match fetched {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(call_sid = %call_sid, error = %e, "Artifact fetch failed");
                metrics::ARTIFACT_MERGES.with_label_values(&["failed"]).inc();
                metrics::CALL_OUTCOMES
                    .with_label_values(&["fetch_failed"])
                    .inc();
                self.finish(
                    session_id,
                    CallPhase::Failed,
                    format!("Could not fetch artifacts for call {}", call_sid),
                    Some(format!("Artifact fetch failed: {}", e)),
                    None,
                );
                return Err(CallError::Fetch(e));
            }
        };

        let context_id = match session {
            Some((_, context_id)) => context_id,
            None => match artifacts.context_id.clone().filter(|c| !c.is_empty()) {
                Some(context_id) => context_id,
                None => {
                    self.finish(
                        None,
                        CallPhase::Failed,
                        format!("Could not merge artifacts for call {}", call_sid),
                        Some(format!("No conversation is associated with call {}", call_sid)),
                        None,
                    );
                    return Err(CallError::UnknownContext(call_sid.to_string()));
                }
            },
        };

        let now = Utc::now();
        let mut counts = (0, 0);
        let merged = self.store.modify_messages(&context_id, &mut |existing| {
            let outcome = merge_call_artifacts(existing, call_sid, &artifacts, now);
            counts = (outcome.replaced_entries, outcome.transcript_turns);
            outcome.messages
        });

        let (replaced_entries, transcript_turns) = match merged {
            Ok(()) => counts,
            Err(e) => {
                warn!(context_id = %context_id, error = %e, "Failed to store call artifacts");
                metrics::ARTIFACT_MERGES.with_label_values(&["failed"]).inc();
                self.finish(
                    session_id,
                    CallPhase::Failed,
                    format!("Could not store artifacts for call {}", call_sid),
                    Some(format!("Conversation storage failed: {}", e)),
                    None,
                );
                return Err(CallError::Storage(e));
            }
        };

        if let Err(e) = self.store.update_status(&context_id, "call_completed") {
            warn!(context_id = %context_id, error = %e, "Failed to update conversation status");
        }

        let label = if replaced_entries > 0 {
            "replaced"
        } else {
            "merged"
        };
        metrics::ARTIFACT_MERGES.with_label_values(&[label]).inc();
        metrics::CALL_OUTCOMES.with_label_values(&["completed"]).inc();
        info!(
            call_sid = %call_sid,
            context_id = %context_id,
            turns = transcript_turns,
            replaced = replaced_entries,
            "Call artifacts merged"
        );

        let report = MergeReport {
            context_id,
            call_sid: call_sid.to_string(),
            replaced_entries,
            transcript_turns,
        };

        self.finish(
            session_id,
            CallPhase::Completed,
            format!(
                "Call {} completed: {} transcript turns merged",
                call_sid, report.transcript_turns
            ),
            None,
            Some(report.context_id.clone()),
        );
        Ok(report)
    }
}

async fn poll_loop(
    inner: Arc<Inner>,
    session_id: u64,
    call_sid: String,
    context_id: String,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(inner.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(session_id, call_sid = %call_sid, "Polling cancelled");
                break;
            }
            _ = ticker.tick() => {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = inner.telephony.call_status(&call_sid) => result,
                };

                match inner.apply_status(session_id, &call_sid, result) {
                    Tick::Continue => {}
                    Tick::Stop => break,
                    Tick::Fetch => {
                        if let Err(e) = inner
                            .fetch_and_merge(&call_sid, Some((session_id, context_id.clone())))
                            .await
                        {
                            debug!(
                                call_sid = %call_sid,
                                error = %e,
                                "Artifact merge did not complete"
                            );
                        }
                        break;
                    }
                }
            }
        }
    }
}

impl CallLifecycleManager {
    pub fn new(
        telephony: Arc<dyn TelephonyClient>,
        store: Arc<dyn ConversationStore>,
        config: CallsConfig,
    ) -> Self {
        let state = State {
            version: 0,
            phase: CallPhase::Idle,
            session: None,
            status_message: CallSnapshot::idle().status_message,
            error_message: None,
            polling: None,
        };
        let bus = NotificationBus::new(state.snapshot(None));

        Self {
            inner: Arc::new(Inner {
                telephony,
                store,
                config,
                state: Mutex::new(state),
                bus,
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &CallsConfig {
        &self.inner.config
    }

    /// Place a call for `context_id` and start tracking it.
    ///
    /// Any active session is cancelled first and a `call_superseded` entry is
    /// added to its conversation.
    pub async fn initiate(
        &self,
        context_id: &str,
        target: &str,
        message: &str,
        metadata: Value,
    ) -> Result<CallSession, CallError> {
        let inner = &self.inner;
        let session_id = inner.next_session_id.fetch_add(1, Ordering::Relaxed);

        let superseded = {
            let mut state = inner.lock_state();
            state.stop_polling();
            let was_active = state.phase.is_active();
            let previous = state.session.take().filter(|_| was_active);

            state.phase = CallPhase::Initiating;
            state.session = Some(CallSession {
                session_id,
                context_id: context_id.to_string(),
                call_sid: None,
                status: None,
                attempts: 0,
                last_error: None,
                started_at: Utc::now(),
            });
            state.status_message = format!("Placing call to {}", target);
            state.error_message = None;
            inner.publish(state, None);
            previous
        };

        if let Some(previous) = superseded {
            info!(
                previous_session = previous.session_id,
                session_id, "Superseding active call"
            );
            inner.record_superseded(&previous);
        }

        let metadata = match metadata {
            Value::Object(mut map) => {
                map.entry("context_id")
                    .or_insert_with(|| Value::String(context_id.to_string()));
                Value::Object(map)
            }
            _ => json!({ "context_id": context_id }),
        };

        let placed = match inner.telephony.place_call(target, message, &metadata).await {
            Ok(placed) => placed,
            Err(e) => {
                metrics::CALLS_INITIATED.with_label_values(&["failed"]).inc();
                warn!(context_id = %context_id, error = %e, "Call placement failed");
                inner.finish(
                    Some(session_id),
                    CallPhase::Failed,
                    format!("Could not place call to {}", target),
                    Some(format!("Call placement failed: {}", e)),
                    None,
                );
                return Err(CallError::Placement(e));
            }
        };

        let token = CancellationToken::new();
        let session = {
            let mut state = inner.lock_state();
            if !state.is_current(session_id) {
                drop(state);
                metrics::CALLS_INITIATED
                    .with_label_values(&["superseded"])
                    .inc();
                warn!(call_sid = %placed.call_sid, "Call placed for a superseded session");
                return Err(CallError::Superseded);
            }

            if let Some(session) = state.session.as_mut() {
                session.call_sid = Some(placed.call_sid.clone());
            }
            state.phase = CallPhase::Polling;
            state.status_message = format!("Call {} placed, waiting for status", placed.call_sid);
            state.polling = Some(token.clone());
            let session = state.session.clone();
            inner.publish(state, None);
            session
        };

        metrics::CALLS_INITIATED.with_label_values(&["placed"]).inc();
        info!(context_id = %context_id, call_sid = %placed.call_sid, "Call placed, polling status");

        tokio::spawn(poll_loop(
            Arc::clone(inner),
            session_id,
            placed.call_sid,
            context_id.to_string(),
            token,
        ));

        session.ok_or(CallError::Superseded)
    }

    /// Fetch and merge artifacts now.
    ///
    /// Targets `call_sid`, or the active session's call when `None`. When the
    /// target is the active session its polling stops first and the context
    /// recorded at initiation is used; otherwise the context comes from the
    /// artifact payload.
    pub async fn manually_fetch_artifacts(
        &self,
        call_sid: Option<&str>,
    ) -> Result<MergeReport, CallError> {
        let inner = &self.inner;
        let (target, session) = {
            let mut state = inner.lock_state();
            let active = if state.phase.is_active() {
                state.session.as_ref().and_then(|s| {
                    s.call_sid
                        .clone()
                        .map(|sid| (s.session_id, sid, s.context_id.clone()))
                })
            } else {
                None
            };

            let target = match (call_sid, &active) {
                (Some(sid), _) => sid.to_string(),
                (None, Some((_, sid, _))) => sid.clone(),
                (None, None) => return Err(CallError::NoActiveCall),
            };

            match active {
                Some((session_id, sid, context_id)) if sid == target => {
                    info!(call_sid = %sid, "Manual artifact fetch for the active call");
                    state.stop_polling();
                    state.phase = CallPhase::Fetching;
                    state.status_message =
                        format!("Fetching artifacts for call {} on request", sid);
                    inner.publish(state, None);
                    (target, Some((session_id, context_id)))
                }
                _ => (target, None),
            }
        };

        inner.fetch_and_merge(&target, session).await
    }

    /// Current state.
    pub fn snapshot(&self) -> CallSnapshot {
        self.inner.lock_state().snapshot(None)
    }

    /// Register an observer. It is called immediately with the current state.
    pub fn subscribe(&self, observer: Observer) -> Subscription {
        self.inner.bus.subscribe(observer)
    }

    pub fn unsubscribe(&self, subscription_id: u64) -> bool {
        self.inner.bus.unsubscribe(subscription_id)
    }

    /// Stop polling and release the slot.
    pub fn shutdown(&self) {
        let mut state = self.inner.lock_state();
        state.stop_polling();
        if state.phase.is_active() {
            state.phase = CallPhase::Idle;
            state.session = None;
            state.status_message = "Call tracking stopped".to_string();
            self.inner.publish(state, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryConversationStore, MockTelephony};
    use crate::telephony::{CallArtifacts, TranscriptTurn};
    use std::time::Duration;

    fn manager(
        telephony: Arc<MockTelephony>,
    ) -> (CallLifecycleManager, Arc<InMemoryConversationStore>) {
        let store = Arc::new(InMemoryConversationStore::new());
        let manager = CallLifecycleManager::new(telephony, store.clone(), CallsConfig::default());
        (manager, store)
    }

    fn artifacts(turns: usize) -> CallArtifacts {
        CallArtifacts {
            recording_url: Some("https://rec.example/1.mp3".to_string()),
            duration_seconds: Some(42),
            transcript_turns: Some(
                (0..turns)
                    .map(|i| TranscriptTurn {
                        speaker: if i % 2 == 0 { "agent" } else { "creator" }.to_string(),
                        text: format!("line {}", i),
                    })
                    .collect(),
            ),
            context_id: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_placement_failure_reports_failed() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.fail_placement("line busy").await;
        let (manager, _store) = manager(telephony.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = manager.subscribe(Arc::new(move |s: &CallSnapshot| {
            sink.lock().unwrap().push(s.phase)
        }));

        let err = manager
            .initiate("cr-001", "+15550100", "Hello", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Placement(_)));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(telephony.status_queries().await, 0);

        let phases = seen.lock().unwrap().clone();
        assert_eq!(
            phases,
            vec![
                CallPhase::Idle,
                CallPhase::Initiating,
                CallPhase::Failed,
                CallPhase::Idle
            ]
        );
        let snapshot = manager.snapshot();
        assert!(snapshot.error_message.unwrap().contains("line busy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_failure_status() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.script_statuses(&["ringing", "no-answer"]).await;
        let (manager, _store) = manager(telephony.clone());

        manager
            .initiate("cr-002", "+15550100", "Hello", Value::Null)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(telephony.status_queries().await, 2);
        assert_eq!(telephony.artifact_fetches().await, 0);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, CallPhase::Idle);
        assert_eq!(
            snapshot.error_message.as_deref(),
            Some("Call ended with status: no-answer")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_errors_count_as_attempts() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.fail_status("gateway timeout").await;
        let (manager, _store) = manager(telephony.clone());

        manager
            .initiate("cr-003", "+15550100", "Hello", Value::Null)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;

        assert_eq!(telephony.status_queries().await, 24);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, CallPhase::Idle);
        assert!(snapshot.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_fetch_stops_polling() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.set_artifacts(artifacts(2)).await;
        let (manager, store) = manager(telephony.clone());

        let session = manager
            .initiate("cr-004", "+15550100", "Hello", Value::Null)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(telephony.status_queries().await, 1);

        let report = manager.manually_fetch_artifacts(None).await.unwrap();
        assert_eq!(report.context_id, "cr-004");
        assert_eq!(Some(report.call_sid.as_str()), session.call_sid.as_deref());
        assert_eq!(report.transcript_turns, 2);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(telephony.status_queries().await, 1);
        assert_eq!(store.list_messages("cr-004").unwrap().len(), 3);
        assert_eq!(manager.snapshot().phase, CallPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_fetch_without_active_call() {
        let telephony = Arc::new(MockTelephony::new());
        let (manager, _store) = manager(telephony);

        let err = manager.manually_fetch_artifacts(None).await.unwrap_err();
        assert!(matches!(err, CallError::NoActiveCall));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_fetch_resolves_context_from_payload() {
        let telephony = Arc::new(MockTelephony::new());
        let mut payload = artifacts(1);
        payload.context_id = Some("cr-007".to_string());
        telephony.set_artifacts(payload).await;
        let (manager, store) = manager(telephony);

        let report = manager.manually_fetch_artifacts(Some("CA-old")).await.unwrap();
        assert_eq!(report.context_id, "cr-007");
        assert_eq!(store.list_messages("cr-007").unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_fetch_unknown_context() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.set_artifacts(artifacts(1)).await;
        let (manager, _store) = manager(telephony);

        let err = manager
            .manually_fetch_artifacts(Some("CA-orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::UnknownContext(ref sid) if sid == "CA-orphan"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_keeps_existing_data() {
        let telephony = Arc::new(MockTelephony::new());
        telephony.script_statuses(&["completed"]).await;
        telephony.fail_artifacts("not ready").await;
        let (manager, store) = manager(telephony.clone());
        store
            .append_message(
                "cr-005",
                &ConversationMessage::new("brand", MessageKind::Outreach, "Hi"),
            )
            .unwrap();

        manager
            .initiate("cr-005", "+15550100", "Hello", Value::Null)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(telephony.artifact_fetches().await, 1);
        assert_eq!(store.list_messages("cr-005").unwrap().len(), 1);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, CallPhase::Idle);
        assert!(snapshot.error_message.unwrap().contains("not ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let telephony = Arc::new(MockTelephony::new());
        let (manager, _store) = manager(telephony.clone());

        manager
            .initiate("cr-006", "+15550100", "Hello", Value::Null)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.shutdown();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(telephony.status_queries().await, 1);
        assert_eq!(manager.snapshot().phase, CallPhase::Idle);
    }
}
