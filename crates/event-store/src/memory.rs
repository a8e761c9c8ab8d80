use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, EventQuery, EventStoreError, RestaurantId, Result, Sequence,
    store::{EventStore, check_contiguous},
};

/// In-memory journal, used by tests and when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<RestaurantId, Vec<EventEnvelope>>>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent append fail with `Unavailable`.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of events recorded for a restaurant.
    pub async fn event_count(&self, restaurant_id: RestaurantId) -> usize {
        self.streams
            .read()
            .await
            .get(&restaurant_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory journal configured to fail".to_string(),
            ));
        }

        let mut streams = self.streams.write().await;
        check_contiguous(&events, |restaurant_id| {
            streams
                .get(&restaurant_id)
                .and_then(|stream| stream.last())
                .map_or(Sequence::initial(), |e| e.sequence)
        })?;

        for event in events {
            streams.entry(event.restaurant_id).or_default().push(event);
        }
        Ok(())
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        let Some(stream) = streams.get(&query.restaurant_id) else {
            return Ok(Vec::new());
        };

        let matching = stream.iter().filter(|e| {
            if let Some(after) = query.after
                && e.sequence <= after
            {
                return false;
            }
            if let Some(ref types) = query.event_types
                && !types.contains(&e.event_type)
            {
                return false;
            }
            if let Some(ref id) = query.aggregate_id
                && &e.aggregate_id != id
            {
                return false;
            }
            true
        });

        let events = match query.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(events)
    }

    async fn latest_sequence(&self, restaurant_id: RestaurantId) -> Result<Sequence> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&restaurant_id)
            .and_then(|stream| stream.last())
            .map_or(Sequence::initial(), |e| e.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;

    fn create_test_event(
        restaurant_id: RestaurantId,
        sequence: u64,
        event_type: &str,
        aggregate_id: &str,
    ) -> EventEnvelope {
        EventEnvelope::builder()
            .restaurant_id(restaurant_id)
            .sequence(Sequence::new(sequence))
            .event_type(event_type)
            .aggregate("order", aggregate_id)
            .payload_raw(serde_json::json!({"test": true}))
            .try_build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let restaurant = RestaurantId::new();

        store
            .append_event(create_test_event(restaurant, 1, "order_created", "o1"))
            .await
            .unwrap();

        assert_eq!(store.event_count(restaurant).await, 1);
        assert_eq!(
            store.latest_sequence(restaurant).await.unwrap(),
            Sequence::new(1)
        );
    }

    #[tokio::test]
    async fn append_batch_must_be_contiguous() {
        let store = InMemoryEventStore::new();
        let restaurant = RestaurantId::new();

        let result = store
            .append(vec![
                create_test_event(restaurant, 1, "order_created", "o1"),
                create_test_event(restaurant, 3, "kot_created", "o1"),
            ])
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::SequenceConflict { .. })
        ));
        assert_eq!(store.event_count(restaurant).await, 0);
    }

    #[tokio::test]
    async fn duplicate_sequence_is_rejected() {
        let store = InMemoryEventStore::new();
        let restaurant = RestaurantId::new();

        store
            .append_event(create_test_event(restaurant, 1, "order_created", "o1"))
            .await
            .unwrap();
        let result = store
            .append_event(create_test_event(restaurant, 1, "order_created", "o2"))
            .await;

        match result {
            Err(EventStoreError::SequenceConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Sequence::new(2));
                assert_eq!(actual, Sequence::new(1));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn restaurants_have_independent_streams() {
        let store = InMemoryEventStore::new();
        let a = RestaurantId::new();
        let b = RestaurantId::new();

        store
            .append(vec![
                create_test_event(a, 1, "order_created", "o1"),
                create_test_event(b, 1, "order_created", "o2"),
                create_test_event(a, 2, "kot_created", "o1"),
            ])
            .await
            .unwrap();

        assert_eq!(store.latest_sequence(a).await.unwrap(), Sequence::new(2));
        assert_eq!(store.latest_sequence(b).await.unwrap(), Sequence::new(1));
        assert_eq!(
            store.latest_sequence(RestaurantId::new()).await.unwrap(),
            Sequence::initial()
        );
    }

    #[tokio::test]
    async fn query_with_filters() {
        let store = InMemoryEventStore::new();
        let restaurant = RestaurantId::new();

        store
            .append(vec![
                create_test_event(restaurant, 1, "order_created", "o1"),
                create_test_event(restaurant, 2, "kot_created", "o1"),
                create_test_event(restaurant, 3, "order_created", "o2"),
                create_test_event(restaurant, 4, "order_status_changed", "o1"),
            ])
            .await
            .unwrap();

        let after = store
            .events_after(restaurant, Sequence::new(2))
            .await
            .unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].sequence, Sequence::new(3));

        let created = store
            .query(EventQuery::for_restaurant(restaurant).event_type("order_created"))
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        let for_o1 = store
            .query(
                EventQuery::for_restaurant(restaurant)
                    .aggregate_id("o1")
                    .limit(2),
            )
            .await
            .unwrap();
        assert_eq!(for_o1.len(), 2);
        assert_eq!(for_o1[1].event_type, "kot_created");
    }

    #[tokio::test]
    async fn failing_journal_rejects_appends() {
        let store = InMemoryEventStore::new();
        let restaurant = RestaurantId::new();
        store.set_fail_appends(true);

        let result = store
            .append_event(create_test_event(restaurant, 1, "order_created", "o1"))
            .await;
        assert!(matches!(result, Err(EventStoreError::Unavailable(_))));

        store.set_fail_appends(false);
        store
            .append_event(create_test_event(restaurant, 1, "order_created", "o1"))
            .await
            .unwrap();
    }
}
