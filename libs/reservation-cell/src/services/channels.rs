use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::AvailabilityEvent;

pub type EventSender = broadcast::Sender<AvailabilityEvent>;
pub type EventReceiver = broadcast::Receiver<AvailabilityEvent>;

/// Per-professional fan-out of availability change events.
///
/// Publishing is synchronous and lock-cheap so it can run inside the
/// reservation store's per-key critical section, which is what makes event
/// order match state-change order for a slot. Subscribers get a bounded
/// buffer; a subscriber that lags past it misses events and is told to
/// resync rather than ever back-pressuring the store.
pub struct AvailabilityChannels {
    channels: DashMap<Uuid, EventSender>,
    buffer_capacity: usize,
}

impl AvailabilityChannels {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            buffer_capacity,
        }
    }

    pub fn subscribe(&self, professional_id: Uuid) -> EventReceiver {
        let sender = self
            .channels
            .entry(professional_id)
            .or_insert_with(|| broadcast::channel(self.buffer_capacity).0);
        debug!("Subscriber attached for professional {}", professional_id);
        sender.subscribe()
    }

    pub fn publish(&self, event: AvailabilityEvent) {
        let professional_id = event.professional_id();
        if let Some(sender) = self.channels.get(&professional_id) {
            // Err means no live subscribers, which is fine.
            if sender.send(event).is_err() {
                debug!("No subscribers for professional {}", professional_id);
            }
        }
    }

    /// Drop the channel once its last subscriber disconnects.
    pub fn prune(&self, professional_id: Uuid) {
        self.channels
            .remove_if(&professional_id, |_, sender| sender.receiver_count() == 0);
    }

    pub fn subscriber_count(&self, professional_id: Uuid) -> usize {
        self.channels
            .get(&professional_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
