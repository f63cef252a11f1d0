//! Synchronous observer bus for call snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::warn;

use super::CallSnapshot;

/// Callback invoked with every published snapshot.
pub type Observer = Arc<dyn Fn(&CallSnapshot) + Send + Sync>;

/// Fan-out of call snapshots to registered observers.
///
/// New observers are called once with the latest snapshot before they see any
/// later one. Snapshots are delivered in version order; a snapshot older than
/// the last delivered one is dropped. Observers run on the publishing thread
/// and must not subscribe from inside the callback.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Observer)>>,
    /// Latest delivered snapshot. Held for the whole delivery round.
    current: Mutex<CallSnapshot>,
}

/// Registration handle. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking observer may have poisoned the lock.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl BusInner {
    fn remove(&self, id: u64) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    fn observers(&self) -> Vec<Observer> {
        lock(&self.observers)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect()
    }
}

impl NotificationBus {
    pub fn new(initial: CallSnapshot) -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                observers: Mutex::new(Vec::new()),
                current: Mutex::new(initial),
            }),
        }
    }

    /// Register `observer` and replay the latest snapshot to it.
    pub fn subscribe(&self, observer: Observer) -> Subscription {
        let current = lock(&self.inner.current);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.observers).push((id, Arc::clone(&observer)));

        let mut replay = current.clone();
        replay.data_changed = false;
        replay.changed_context_id = None;
        observer(&replay);
        drop(current);

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Remove an observer by subscription id. Returns whether it was registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        self.inner.remove(id)
    }

    /// Deliver `snapshot` to every observer.
    pub fn publish(&self, snapshot: CallSnapshot) {
        let mut current = lock(&self.inner.current);

        let delivered = if snapshot.version > current.version {
            snapshot
        } else if snapshot.data_changed {
            // A newer snapshot already went out; still report the data change.
            let mut latest = current.clone();
            latest.data_changed = true;
            latest.changed_context_id = snapshot.changed_context_id;
            latest
        } else {
            return;
        };

        for observer in self.inner.observers() {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| observer(&delivered)))
                .is_err()
            {
                warn!(version = delivered.version, "Call observer panicked");
            }
        }

        *current = delivered;
        current.data_changed = false;
        current.changed_context_id = None;
    }

    /// The latest delivered snapshot.
    pub fn latest(&self) -> CallSnapshot {
        lock(&self.inner.current).clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallPhase;

    fn snapshot(version: u64, phase: CallPhase) -> CallSnapshot {
        CallSnapshot {
            version,
            phase,
            ..CallSnapshot::idle()
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<CallSnapshot>>>, Observer) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Observer =
            Arc::new(move |s: &CallSnapshot| sink.lock().unwrap().push(s.clone()));
        (seen, observer)
    }

    #[test]
    fn test_subscribe_replays_current_state() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        bus.publish(snapshot(1, CallPhase::Polling));

        let (seen, observer) = recorder();
        let _sub = bus.subscribe(observer);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].phase, CallPhase::Polling);
    }

    #[test]
    fn test_publish_reaches_all_observers_in_order() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (a, obs_a) = recorder();
        let (b, obs_b) = recorder();
        let _sa = bus.subscribe(obs_a);
        let _sb = bus.subscribe(obs_b);

        bus.publish(snapshot(1, CallPhase::Initiating));
        bus.publish(snapshot(2, CallPhase::Polling));

        for seen in [a, b] {
            let phases: Vec<_> = seen.lock().unwrap().iter().map(|s| s.phase).collect();
            assert_eq!(
                phases,
                vec![CallPhase::Idle, CallPhase::Initiating, CallPhase::Polling]
            );
        }
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (seen, observer) = recorder();
        let _sub = bus.subscribe(observer);

        bus.publish(snapshot(3, CallPhase::Polling));
        bus.publish(snapshot(2, CallPhase::Initiating));

        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(bus.latest().phase, CallPhase::Polling);
    }

    #[test]
    fn test_stale_data_change_is_still_reported() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (seen, observer) = recorder();
        let _sub = bus.subscribe(observer);

        bus.publish(snapshot(3, CallPhase::Idle));
        let mut merged = snapshot(2, CallPhase::Completed);
        merged.data_changed = true;
        merged.changed_context_id = Some("cr-001".to_string());
        bus.publish(merged);

        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert!(last.data_changed);
        assert_eq!(last.changed_context_id.as_deref(), Some("cr-001"));
        assert_eq!(last.version, 3);
        assert!(!bus.latest().data_changed);
        assert!(bus.latest().changed_context_id.is_none());
    }

    #[test]
    fn test_data_changed_not_replayed() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let mut merged = snapshot(1, CallPhase::Completed);
        merged.data_changed = true;
        bus.publish(merged);

        let (seen, observer) = recorder();
        let _sub = bus.subscribe(observer);
        assert!(!seen.lock().unwrap()[0].data_changed);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (seen, observer) = recorder();
        let sub = bus.subscribe(observer);
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);

        bus.publish(snapshot(1, CallPhase::Polling));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_by_id() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (_seen, observer) = recorder();
        let sub = bus.subscribe(observer);

        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let bus = NotificationBus::new(CallSnapshot::idle());
        let (seen, observer) = recorder();
        let panicky: Observer = Arc::new(|s: &CallSnapshot| {
            if s.version > 0 {
                panic!("observer failure");
            }
        });
        let _p = bus.subscribe(panicky);
        let _sub = bus.subscribe(observer);

        bus.publish(snapshot(1, CallPhase::Polling));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
