//! Live pipeline event fan-out

use futures::stream::{Stream, StreamExt};
use streamsure_core::models::{EventEnvelope, PipelineEvent};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Which events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Owner(Uuid),
}

impl EventFilter {
    pub fn accepts(&self, envelope: &EventEnvelope) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Owner(owner_id) => envelope.owner_id == *owner_id,
        }
    }
}

/// Bounded broadcast of pipeline events. Publishing never blocks; slow
/// subscribers skip what they missed.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        tracing::info!(capacity, "Event broadcaster initialized");
        Self { tx }
    }

    /// Publish an event, ignoring the case where nobody is listening.
    pub fn publish(&self, owner_id: Uuid, event: PipelineEvent) {
        if let Ok(count) = self.tx.send(EventEnvelope { owner_id, event }) {
            tracing::trace!(subscribers = count, "Published pipeline event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe from now on. Events published before this call are not replayed.
    pub fn subscribe_stream(
        &self,
        filter: EventFilter,
    ) -> impl Stream<Item = PipelineEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(move |result| async move {
            match result {
                Ok(envelope) if filter.accepts(&envelope) => Some(envelope.event),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Event subscriber lagged: {}", e);
                    None
                }
            }
        })
    }
}
