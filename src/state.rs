use std::sync::Arc;

use crate::engine::{Dispatcher, EngineConfig};
use crate::events::BroadcastSink;
use crate::models::order::Order;
use crate::models::partner::Partner;
use crate::observability::metrics::Metrics;
use crate::store::memory::MemoryRepository;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub events: Arc<BroadcastSink>,
    pub metrics: Metrics,
}

impl AppState {
    /// Wires the engine to in-memory repositories and a broadcast event sink.
    pub fn new(event_buffer_size: usize, config: EngineConfig) -> Self {
        let events = Arc::new(BroadcastSink::new(event_buffer_size));
        let metrics = Metrics::new();

        let dispatcher = Dispatcher::new(
            Arc::new(MemoryRepository::<Order>::new()),
            Arc::new(MemoryRepository::<Partner>::new()),
            events.clone(),
            metrics.clone(),
            config,
        );

        Self {
            dispatcher,
            events,
            metrics,
        }
    }
}
