use tokio::sync::broadcast;
use tracing::debug;

use crate::models::event::DomainEvent;

/// Fire-and-forget notification sink.
///
/// `publish` must return immediately and must never fail the operation that
/// produced the event.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// Fans events out to every live subscriber (websocket clients, tests).
/// Events published with no subscriber attached are dropped.
pub struct BroadcastSink {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastSink {
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let order_id = event.order_id();
        if self.tx.send(event).is_err() {
            debug!(event = name, order_id = %order_id, "no event subscribers");
        }
    }
}
