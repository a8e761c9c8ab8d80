//! Order slots, the ticket index and daily numbering.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use common::{KotId, OrderId, RestaurantId};
use domain::{KitchenTicket, Order};
use tokio::sync::Mutex;

use crate::error::{EngineError, Result};

/// An order and its kitchen ticket. Locked as one unit for every mutation.
#[derive(Debug)]
pub struct OrderSlot {
    pub order: Order,
    pub ticket: Option<KitchenTicket>,
}

pub type SharedSlot = Arc<Mutex<OrderSlot>>;

#[derive(Debug, Default, Clone, Copy)]
struct DailyCounters {
    orders: u32,
    tickets: u32,
}

/// Keyed storage for orders and their tickets.
///
/// Orders are never removed. Tickets are indexed by id so kitchen updates can
/// find the owning slot.
#[derive(Default)]
pub struct OrderRepository {
    slots: RwLock<HashMap<OrderId, (RestaurantId, SharedSlot)>>,
    tickets: RwLock<HashMap<KotId, OrderId>>,
    counters: std::sync::Mutex<HashMap<(RestaurantId, NaiveDate), DailyCounters>>,
}

impl OrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next order number for the restaurant and day: `YYYYMMDD-NNNN`.
    pub fn next_order_number(&self, restaurant_id: RestaurantId, now: DateTime<Utc>) -> String {
        let date = now.date_naive();
        let sequence = self.bump(restaurant_id, date, |c| &mut c.orders);
        format!("{}-{:04}", date.format("%Y%m%d"), sequence)
    }

    /// Allocates the next ticket number: `K-YYYYMMDD-NNNN`.
    pub fn next_kot_number(&self, restaurant_id: RestaurantId, now: DateTime<Utc>) -> String {
        let date = now.date_naive();
        let sequence = self.bump(restaurant_id, date, |c| &mut c.tickets);
        format!("K-{}-{:04}", date.format("%Y%m%d"), sequence)
    }

    pub fn insert(&self, slot: OrderSlot) -> SharedSlot {
        let id = slot.order.id();
        let restaurant_id = slot.order.restaurant_id();
        let shared = Arc::new(Mutex::new(slot));
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (restaurant_id, shared.clone()));
        shared
    }

    /// Returns the slot of an order of this restaurant.
    pub fn slot(&self, restaurant_id: RestaurantId, order_id: OrderId) -> Result<SharedSlot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&order_id)
            .filter(|(owner, _)| *owner == restaurant_id)
            .map(|(_, slot)| slot.clone())
            .ok_or_else(|| EngineError::order_not_found(order_id))
    }

    /// Returns the slot owning a ticket.
    pub fn slot_for_ticket(
        &self,
        restaurant_id: RestaurantId,
        kot_id: KotId,
    ) -> Result<SharedSlot> {
        let order_id = self
            .tickets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kot_id)
            .copied()
            .ok_or_else(|| EngineError::ticket_not_found(kot_id))?;
        self.slot(restaurant_id, order_id)
            .map_err(|_| EngineError::ticket_not_found(kot_id))
    }

    pub fn index_ticket(&self, kot_id: KotId, order_id: OrderId) {
        self.tickets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kot_id, order_id);
    }

    /// Every slot of a restaurant, in no particular order.
    pub fn slots(&self, restaurant_id: RestaurantId) -> Vec<SharedSlot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(owner, _)| *owner == restaurant_id)
            .map(|(_, slot)| slot.clone())
            .collect()
    }

    fn bump(
        &self,
        restaurant_id: RestaurantId,
        date: NaiveDate,
        field: impl FnOnce(&mut DailyCounters) -> &mut u32,
    ) -> u32 {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = field(counters.entry((restaurant_id, date)).or_default());
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_numbers_are_daily_and_per_restaurant() {
        let repo = OrderRepository::new();
        let a = RestaurantId::new();
        let b = RestaurantId::new();
        let day1 = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();

        assert_eq!(repo.next_order_number(a, day1), "20250314-0001");
        assert_eq!(repo.next_order_number(a, day1), "20250314-0002");
        assert_eq!(repo.next_order_number(b, day1), "20250314-0001");
        assert_eq!(repo.next_order_number(a, day2), "20250315-0001");
        assert_eq!(repo.next_kot_number(a, day1), "K-20250314-0001");
        assert_eq!(repo.next_kot_number(a, day1), "K-20250314-0002");
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let repo = OrderRepository::new();
        assert!(matches!(
            repo.slot(RestaurantId::new(), OrderId::new()),
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            repo.slot_for_ticket(RestaurantId::new(), KotId::new()),
            Err(EngineError::NotFound(_))
        ));
    }
}
