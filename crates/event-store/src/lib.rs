//! Append-only journal of published restaurant events.
//!
//! Every event the engine publishes is recorded here under its restaurant and
//! per-restaurant sequence number. The journal backs the audit trail, the
//! `/events` catch-up endpoint and sequence recovery after a restart.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::RestaurantId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Sequence};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use store::{EventStore, EventStoreExt};
