//! Subscription registry and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use common::{Identity, OrderId, RestaurantId, Role};
use domain::SequencedEvent;
use engine::{Engine, EventSink, Snapshot};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{RealtimeError, Result};
use crate::message::{Delivery, Outbound};
use crate::projection::Projection;

/// Identifier of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a client holds to refer to its subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    identity: Identity,
    order_filter: Option<OrderId>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.identity.restaurant_id
    }

    pub fn order_filter(&self) -> Option<OrderId> {
        self.order_filter
    }
}

/// Provides the state a resync serves.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, restaurant_id: RestaurantId) -> Snapshot;
}

#[async_trait]
impl SnapshotSource for Engine {
    async fn snapshot(&self, restaurant_id: RestaurantId) -> Snapshot {
        Engine::snapshot(self, restaurant_id).await
    }
}

struct Subscription {
    restaurant_id: RestaurantId,
    projection: Projection,
    previous_sequence: u64,
    /// Deliveries held back until the pending snapshot has been sent.
    held: Option<Vec<Delivery>>,
    resyncing: bool,
    sender: UnboundedSender<Outbound>,
}

impl Subscription {
    fn wants(&self, event: &SequencedEvent) -> bool {
        self.restaurant_id == event.restaurant_id && self.projection.admits(event)
    }
}

/// Fans published events out to live subscriptions.
///
/// A new subscription receives nothing until its first [`resync`]: events
/// routed to it meanwhile are held and sent right after the snapshot. The
/// same holds during every later resync, so no event is overwritten by an
/// older snapshot.
///
/// [`resync`]: RealtimeGateway::resync
#[derive(Default)]
pub struct RealtimeGateway {
    next_id: AtomicU64,
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl RealtimeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a subscription for the caller's restaurant and role.
    ///
    /// Customers must name the order they follow.
    #[tracing::instrument(skip(self, identity), fields(restaurant_id = %identity.restaurant_id, role = %identity.role))]
    pub fn subscribe(
        &self,
        identity: &Identity,
        order_filter: Option<OrderId>,
    ) -> Result<(SubscriptionHandle, UnboundedReceiver<Outbound>)> {
        if identity.role == Role::Customer && order_filter.is_none() {
            return Err(RealtimeError::OrderFilterRequired);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = Subscription {
            restaurant_id: identity.restaurant_id,
            projection: Projection::new(identity.role, order_filter),
            previous_sequence: 0,
            held: Some(Vec::new()),
            resyncing: false,
            sender,
        };

        let active = {
            let mut subscriptions = self.write();
            subscriptions.insert(id, subscription);
            subscriptions.len()
        };
        metrics::gauge!("realtime_subscriptions_active").set(active as f64);
        tracing::info!(subscription = %id, "subscribed");

        let handle = SubscriptionHandle {
            id,
            identity: identity.clone(),
            order_filter,
        };
        Ok((handle, receiver))
    }

    /// Sends a fresh snapshot, then any events held while it was taken.
    ///
    /// The snapshot is cut to the subscriber's [`Projection`], so folding the
    /// stream into it ends in the same state as a later snapshot would. One
    /// resync at a time per subscription.
    #[tracing::instrument(skip(self, handle, source), fields(subscription = %handle.id))]
    pub async fn resync(
        &self,
        handle: &SubscriptionHandle,
        source: &dyn SnapshotSource,
    ) -> Result<Snapshot> {
        let projection = {
            let mut subscriptions = self.write();
            let subscription = subscriptions
                .get_mut(&handle.id)
                .ok_or(RealtimeError::SubscriptionClosed(handle.id))?;
            if subscription.resyncing {
                return Err(RealtimeError::ResyncInProgress(handle.id));
            }
            subscription.resyncing = true;
            subscription.held.get_or_insert_with(Vec::new);
            subscription.projection
        };

        let snapshot = projection.snapshot(source.snapshot(handle.restaurant_id()).await);

        let mut subscriptions = self.write();
        let subscription = subscriptions
            .get_mut(&handle.id)
            .ok_or(RealtimeError::SubscriptionClosed(handle.id))?;
        subscription.resyncing = false;
        let held = subscription.held.take().unwrap_or_default();

        let mut sent = subscription
            .sender
            .send(Outbound::Snapshot(snapshot.clone()))
            .is_ok();
        for delivery in held {
            if !sent {
                break;
            }
            sent = subscription.sender.send(Outbound::Event(delivery)).is_ok();
        }
        if !sent {
            subscriptions.remove(&handle.id);
            metrics::counter!("realtime_dropped_total").increment(1);
            tracing::warn!("client went away during resync");
            return Err(RealtimeError::SubscriptionClosed(handle.id));
        }

        metrics::counter!("realtime_resyncs_total").increment(1);
        tracing::debug!(as_of_sequence = snapshot.as_of_sequence, "snapshot sent");
        Ok(snapshot)
    }

    /// Replies to a client ping on its own channel.
    pub fn pong(&self, handle: &SubscriptionHandle) -> Result<()> {
        let subscriptions = self.read();
        let subscription = subscriptions
            .get(&handle.id)
            .ok_or(RealtimeError::SubscriptionClosed(handle.id))?;
        subscription
            .sender
            .send(Outbound::Pong)
            .map_err(|_| RealtimeError::SubscriptionClosed(handle.id))
    }

    /// Closes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let (removed, active) = {
            let mut subscriptions = self.write();
            let removed = subscriptions.remove(&handle.id).is_some();
            (removed, subscriptions.len())
        };
        metrics::gauge!("realtime_subscriptions_active").set(active as f64);
        if removed {
            tracing::info!(subscription = %handle.id, "unsubscribed");
        }
        removed
    }

    pub fn subscription_count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SubscriptionId, Subscription>> {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SubscriptionId, Subscription>> {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for RealtimeGateway {
    fn deliver(&self, event: &SequencedEvent) {
        let mut subscriptions = self.write();
        let mut closed = Vec::new();

        for (id, subscription) in subscriptions.iter_mut() {
            if !subscription.wants(event) {
                continue;
            }
            let delivery = Delivery {
                previous_sequence: subscription.previous_sequence,
                event: subscription.projection.event(event),
            };
            subscription.previous_sequence = event.sequence;

            if let Some(held) = subscription.held.as_mut() {
                held.push(delivery);
                continue;
            }
            if subscription.sender.send(Outbound::Event(delivery)).is_err() {
                closed.push(*id);
                continue;
            }
            metrics::counter!("realtime_deliveries_total", "role" => subscription.projection.role().as_str())
                .increment(1);
        }

        for id in closed {
            subscriptions.remove(&id);
            metrics::counter!("realtime_dropped_total").increment(1);
            tracing::warn!(subscription = %id, sequence = event.sequence, "subscriber gone, dropping subscription");
        }
    }
}
