//! Core aggregate and domain event traits.

use serde::{Serialize, de::DeserializeOwned};

use crate::EventKind;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the restaurant.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the closed kind of the event, used for routing and journal filtering.
    fn kind(&self) -> EventKind;

    /// Returns the wire name of the event kind.
    fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns the type of aggregate the event describes.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the identifier of the aggregate the event describes.
    fn aggregate_id(&self) -> String;
}

/// Trait for aggregates whose state changes are expressed as events.
///
/// Command methods validate against the current state and return the events
/// they would cause, without mutating anything. `apply` then folds each event
/// into the state. Callers publish exactly the events they applied.
pub trait Aggregate: Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Applies an event to the aggregate, updating its state.
    ///
    /// This method must be pure and deterministic and must not fail
    /// (events represent facts that have happened).
    fn apply(&mut self, event: &Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events<'a>(&mut self, events: impl IntoIterator<Item = &'a Self::Event>)
    where
        Self::Event: 'a,
    {
        for event in events {
            self.apply(event);
        }
    }
}
