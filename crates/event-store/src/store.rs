use async_trait::async_trait;

use crate::{EventEnvelope, EventQuery, EventStoreError, RestaurantId, Result, Sequence};

/// Core trait for journal implementations.
///
/// A journal records every published event exactly once per
/// (restaurant, sequence). All implementations must be thread-safe.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to the journal.
    ///
    /// Events are appended atomically. Each event's sequence must be exactly one
    /// past the latest stored sequence of its restaurant (or of the previous
    /// event in the batch), otherwise `SequenceConflict` is returned.
    async fn append(&self, events: Vec<EventEnvelope>) -> Result<()>;

    /// Retrieves events matching a query, ordered by sequence.
    async fn query(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Returns the latest stored sequence of a restaurant, or
    /// `Sequence::initial()` if nothing has been recorded.
    async fn latest_sequence(&self, restaurant_id: RestaurantId) -> Result<Sequence>;
}

/// Extension trait providing convenience methods for journals.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event.
    async fn append_event(&self, event: EventEnvelope) -> Result<()> {
        self.append(vec![event]).await
    }

    /// Returns every event of a restaurant after `sequence`.
    async fn events_after(
        &self,
        restaurant_id: RestaurantId,
        sequence: Sequence,
    ) -> Result<Vec<EventEnvelope>> {
        self.query(EventQuery::for_restaurant(restaurant_id).after(sequence))
            .await
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch continues the stream of each restaurant it touches.
///
/// `latest` is asked once per restaurant for the stored head.
pub(crate) fn check_contiguous<F>(events: &[EventEnvelope], mut latest: F) -> Result<()>
where
    F: FnMut(RestaurantId) -> Sequence,
{
    let mut heads: Vec<(RestaurantId, Sequence)> = Vec::new();
    for event in events {
        let idx = match heads.iter().position(|(id, _)| *id == event.restaurant_id) {
            Some(idx) => idx,
            None => {
                heads.push((event.restaurant_id, latest(event.restaurant_id)));
                heads.len() - 1
            }
        };
        let expected = heads[idx].1.next();
        if event.sequence != expected {
            return Err(EventStoreError::SequenceConflict {
                restaurant_id: event.restaurant_id,
                expected,
                actual: event.sequence,
            });
        }
        heads[idx].1 = expected;
    }
    Ok(())
}
