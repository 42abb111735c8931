use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::QueueEntry;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// A queue-state mutation, fanned out to every subscriber interested in
/// the salon's queue or the affected user's entries.
///
/// Delivery is at-least-once per connected subscriber and carries no
/// guarantee across a disconnect gap; subscribers treat events as
/// invalidation signals and re-fetch the authoritative snapshot when in
/// doubt. Within one salon, `seq` is assigned inside the salon's
/// serialized scope and is strictly increasing, so subscribers can detect
/// gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Dot-separated event name, e.g. `"queue.joined"`.
    pub event_type: String,
    pub salon_id: Uuid,
    pub user_id: Option<String>,
    /// Snapshot of the affected entry at publish time (display hint only).
    pub entry: Option<QueueEntry>,
    /// Per-salon monotonic sequence number.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
}

impl QueueEvent {
    pub fn new(event_type: impl Into<String>, salon_id: Uuid, seq: u64) -> Self {
        Self {
            event_type: event_type.into(),
            salon_id,
            user_id: None,
            entry: None,
            seq,
            timestamp: Utc::now(),
        }
    }

    pub fn with_entry(mut self, entry: &QueueEntry) -> Self {
        self.user_id = Some(entry.user_id.clone());
        self.entry = Some(entry.clone());
        self
    }
}

/// In-process fan-out bus for [`QueueEvent`]s.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers (WebSocket
/// connections, the metrics sampler, tests) independently receive every
/// published event. Slow receivers observe `RecvError::Lagged` and are
/// expected to resync from a snapshot.
pub struct EventBus {
    sender: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// A send error only means there are zero receivers; the write-ahead
    /// history has already captured the transition by the time this runs.
    pub fn publish(&self, event: QueueEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus. Callers filter by
    /// `salon_id` / `user_id` themselves.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueueEntry, SelectedService};

    fn sample_entry(salon_id: Uuid) -> QueueEntry {
        QueueEntry::new(
            salon_id,
            "user-7".to_string(),
            vec![SelectedService {
                service_id: Uuid::new_v4(),
                name: "Trim".into(),
                price_cents: 2_000,
                duration_minutes: 20,
            }],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let salon_id = Uuid::new_v4();
        let entry = sample_entry(salon_id);
        bus.publish(QueueEvent::new("queue.joined", salon_id, 1).with_entry(&entry));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "queue.joined");
        assert_eq!(received.salon_id, salon_id);
        assert_eq!(received.user_id.as_deref(), Some("user-7"));
        assert_eq!(received.seq, 1);
        assert!(received.entry.is_some());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let salon_id = Uuid::new_v4();
        bus.publish(QueueEvent::new("queue.advanced", salon_id, 3));

        assert_eq!(rx1.recv().await.unwrap().seq, 3);
        assert_eq!(rx2.recv().await.unwrap().seq, 3);
    }

    #[tokio::test]
    async fn per_salon_order_is_preserved() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let salon_id = Uuid::new_v4();

        for seq in 1..=5 {
            bus.publish(QueueEvent::new("queue.updated", salon_id, seq));
        }
        for expected in 1..=5 {
            assert_eq!(rx.recv().await.unwrap().seq, expected);
        }
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(QueueEvent::new("queue.left", Uuid::new_v4(), 9));
    }
}
