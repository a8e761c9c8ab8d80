//! Point-in-time view of a restaurant for client resync.

use common::RestaurantId;
use domain::{KitchenTicket, Order, Table};
use serde::{Deserialize, Serialize};

use crate::engine::Engine;

/// Open orders, their tickets and every table of a restaurant.
///
/// Every event with `sequence <= as_of_sequence` is reflected. Later events
/// may be reflected too; they carry absolute values and are safe to re-apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub restaurant_id: RestaurantId,
    pub as_of_sequence: u64,
    pub orders: Vec<Order>,
    pub kots: Vec<KitchenTicket>,
    pub tables: Vec<Table>,
}

impl Snapshot {
    /// Keeps only the given order and its ticket; drops tables.
    pub fn restricted_to(mut self, order_id: common::OrderId) -> Self {
        self.orders.retain(|order| order.id() == order_id);
        self.kots.retain(|ticket| ticket.order_id() == order_id);
        self.tables.clear();
        self
    }
}

impl Engine {
    /// Captures the restaurant state for a resync.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id))]
    pub async fn snapshot(&self, restaurant_id: RestaurantId) -> Snapshot {
        // Read first: state gathered afterwards includes at least these events.
        let as_of_sequence = self.bus.current_sequence(restaurant_id).await;

        let mut orders = Vec::new();
        let mut kots = Vec::new();
        for slot in self.orders.slots(restaurant_id) {
            let slot = slot.lock().await;
            if slot.order.is_terminal() {
                continue;
            }
            orders.push(slot.order.clone());
            if let Some(ticket) = &slot.ticket {
                kots.push(ticket.clone());
            }
        }
        orders.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        kots.sort_by(|a, b| a.created_at().cmp(&b.created_at()));

        Snapshot {
            restaurant_id,
            as_of_sequence,
            orders,
            kots,
            tables: self.tables.list(restaurant_id).await,
        }
    }
}
