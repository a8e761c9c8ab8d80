//! Realtime distribution of restaurant events.
//!
//! The [`RealtimeGateway`] is registered as an [`engine::EventSink`]. Each
//! connected client holds a subscription scoped to its restaurant and role;
//! the static [`routing`] matrix decides which event kinds it receives and
//! [`Projection`] cuts snapshots and payloads to match.
//! Clients recover from missed events by requesting a [`engine::Snapshot`],
//! and [`ClientView`] implements the client half of that protocol.

pub mod client;
pub mod error;
pub mod gateway;
pub mod message;
pub mod projection;
pub mod routing;
pub mod stats;

pub use client::{ApplyOutcome, ClientView, ResyncReason};
pub use error::{RealtimeError, Result};
pub use gateway::{RealtimeGateway, SnapshotSource, SubscriptionHandle, SubscriptionId};
pub use message::{Delivery, Inbound, Outbound};
pub use projection::Projection;
pub use routing::routes_to;
pub use stats::LiveStats;
