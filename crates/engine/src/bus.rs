//! Per-restaurant event sequencing, journaling and fan-out.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use common::RestaurantId;
use domain::{DomainEvent, RestaurantEvent, SequencedEvent};
use event_store::{EventEnvelope, EventStore, Sequence};
use tokio::sync::Mutex;

/// Receives every published event, in sequence order per restaurant.
///
/// Called inside the publishing critical section, so implementations must
/// not block.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &SequencedEvent);
}

/// Sequence head of one restaurant stream. `None` until read from the journal.
#[derive(Debug, Default)]
struct StreamHead {
    last: Option<u64>,
}

/// Assigns sequence numbers, appends to the journal and hands events to sinks.
///
/// Publishing is serialized per restaurant: sequence assignment, journal
/// append and sink delivery happen under one lock, so every sink observes
/// events in sequence order.
pub struct EventBus {
    journal: Arc<dyn EventStore>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    heads: RwLock<HashMap<RestaurantId, Arc<Mutex<StreamHead>>>>,
}

impl EventBus {
    pub fn new(journal: Arc<dyn EventStore>) -> Self {
        Self {
            journal,
            sinks: RwLock::new(Vec::new()),
            heads: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a sink for every future event.
    pub fn register(&self, sink: Arc<dyn EventSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn journal(&self) -> &Arc<dyn EventStore> {
        &self.journal
    }

    /// Publishes events for one restaurant and returns them with their sequence.
    ///
    /// Journal failures are logged and counted; delivery still happens.
    #[tracing::instrument(skip(self, events), fields(restaurant_id = %restaurant_id, count = events.len()))]
    pub async fn publish(
        &self,
        restaurant_id: RestaurantId,
        events: Vec<RestaurantEvent>,
    ) -> Vec<SequencedEvent> {
        if events.is_empty() {
            return Vec::new();
        }

        let head = self.head(restaurant_id);
        let mut head = head.lock().await;
        let mut last = self.resolve_head(restaurant_id, &mut head).await;

        let occurred_at = Utc::now();
        let sequenced: Vec<SequencedEvent> = events
            .into_iter()
            .map(|event| {
                last += 1;
                SequencedEvent {
                    restaurant_id,
                    sequence: last,
                    occurred_at,
                    event,
                }
            })
            .collect();

        self.append(&sequenced).await;

        let sinks: Vec<Arc<dyn EventSink>> = self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in &sequenced {
            for sink in &sinks {
                sink.deliver(event);
            }
            metrics::counter!("events_published_total", "kind" => event.kind().as_str())
                .increment(1);
            tracing::debug!(sequence = event.sequence, kind = %event.kind(), "event published");
        }

        head.last = Some(last);
        sequenced
    }

    /// Latest sequence published for a restaurant (0 if none).
    pub async fn current_sequence(&self, restaurant_id: RestaurantId) -> u64 {
        let head = self.head(restaurant_id);
        let mut head = head.lock().await;
        self.resolve_head(restaurant_id, &mut head).await
    }

    fn head(&self, restaurant_id: RestaurantId) -> Arc<Mutex<StreamHead>> {
        if let Some(head) = self
            .heads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&restaurant_id)
        {
            return head.clone();
        }
        self.heads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(restaurant_id)
            .or_default()
            .clone()
    }

    async fn resolve_head(&self, restaurant_id: RestaurantId, head: &mut StreamHead) -> u64 {
        if let Some(last) = head.last {
            return last;
        }
        let last = match self.journal.latest_sequence(restaurant_id).await {
            Ok(sequence) => sequence.value(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read journal head, starting at 0");
                0
            }
        };
        head.last = Some(last);
        last
    }

    async fn append(&self, events: &[SequencedEvent]) {
        let mut envelopes = Vec::with_capacity(events.len());
        for event in events {
            match to_envelope(event) {
                Some(envelope) => envelopes.push(envelope),
                None => {
                    metrics::counter!("journal_append_failures_total").increment(1);
                    tracing::error!(sequence = event.sequence, "event could not be serialized");
                    return;
                }
            }
        }

        if let Err(e) = self.journal.append(envelopes).await {
            metrics::counter!("journal_append_failures_total").increment(1);
            tracing::error!(error = %e, "journal append failed");
        }
    }
}

fn to_envelope(event: &SequencedEvent) -> Option<EventEnvelope> {
    let mut builder = EventEnvelope::builder()
        .restaurant_id(event.restaurant_id)
        .sequence(Sequence::new(event.sequence))
        .event_type(event.event.event_type())
        .aggregate(event.event.aggregate_type(), event.event.aggregate_id())
        .occurred_at(event.occurred_at)
        .payload(&event.event)
        .ok()?;
    if let Some(order_id) = event.event.order_id() {
        builder = builder.metadata("order_id", serde_json::json!(order_id));
    }
    builder.try_build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Sku;
    use domain::StockEvent;
    use domain::stock::StockLowData;
    use event_store::{EventQuery, InMemoryEventStore};

    #[derive(Default)]
    struct RecordingSink {
        seen: std::sync::Mutex<Vec<u64>>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&self, event: &SequencedEvent) {
            self.seen.lock().unwrap().push(event.sequence);
        }
    }

    fn stock_low(sku: &str) -> RestaurantEvent {
        StockEvent::StockLow(StockLowData {
            sku: Sku::new(sku),
            name: sku.to_string(),
            current_stock: 1,
            reorder_level: 5,
        })
        .into()
    }

    #[tokio::test]
    async fn test_sequences_are_contiguous_per_restaurant() {
        let journal = Arc::new(InMemoryEventStore::new());
        let bus = EventBus::new(journal.clone());
        let sink = Arc::new(RecordingSink::default());
        bus.register(sink.clone());

        let a = RestaurantId::new();
        let b = RestaurantId::new();
        bus.publish(a, vec![stock_low("BUN"), stock_low("CHEESE")]).await;
        bus.publish(b, vec![stock_low("BUN")]).await;
        let published = bus.publish(a, vec![stock_low("LETTUCE")]).await;

        assert_eq!(published[0].sequence, 3);
        assert_eq!(*sink.seen.lock().unwrap(), vec![1, 2, 1, 3]);
        assert_eq!(journal.event_count(a).await, 3);
        assert_eq!(journal.event_count(b).await, 1);
        assert_eq!(bus.current_sequence(a).await, 3);
    }

    #[tokio::test]
    async fn test_journal_failure_still_delivers() {
        let journal = Arc::new(InMemoryEventStore::new());
        journal.set_fail_appends(true);
        let bus = EventBus::new(journal.clone());
        let sink = Arc::new(RecordingSink::default());
        bus.register(sink.clone());

        let restaurant = RestaurantId::new();
        bus.publish(restaurant, vec![stock_low("BUN")]).await;

        assert_eq!(*sink.seen.lock().unwrap(), vec![1]);
        assert_eq!(journal.event_count(restaurant).await, 0);
    }

    #[tokio::test]
    async fn test_head_resumes_from_journal() {
        let journal = Arc::new(InMemoryEventStore::new());
        let restaurant = RestaurantId::new();

        let first = EventBus::new(journal.clone());
        first.publish(restaurant, vec![stock_low("BUN")]).await;

        let restarted = EventBus::new(journal.clone());
        let published = restarted.publish(restaurant, vec![stock_low("BUN")]).await;
        assert_eq!(published[0].sequence, 2);

        let stored = journal
            .query(EventQuery::for_restaurant(restaurant))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].event_type, "stock_low");
        assert_eq!(stored[1].aggregate_type, "stock");
    }

    #[tokio::test]
    async fn test_concurrent_publishers_keep_order() {
        let journal = Arc::new(InMemoryEventStore::new());
        let bus = Arc::new(EventBus::new(journal.clone()));
        let sink = Arc::new(RecordingSink::default());
        bus.register(sink.clone());
        let restaurant = RestaurantId::new();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let bus = bus.clone();
            handles.push(tokio::spawn(async move {
                bus.publish(restaurant, vec![stock_low("BUN"), stock_low("BUN")])
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let seen = sink.seen.lock().unwrap().clone();
        assert_eq!(seen, (1..=20).collect::<Vec<u64>>());
        assert_eq!(journal.event_count(restaurant).await, 20);
    }
}
