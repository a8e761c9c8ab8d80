//! Client-side reconciliation of the realtime stream.
//!
//! [`ClientView`] is what a display keeps locally: the last snapshot with
//! every later delivery folded in. It tells the caller when the stream can no
//! longer be trusted and a resync is needed.

use std::collections::BTreeMap;

use common::{KotId, OrderId, RestaurantId, TableId};
use domain::{
    Aggregate, KitchenEvent, KitchenTicket, Order, OrderEvent, RestaurantEvent, SequencedEvent,
    Table,
};
use engine::Snapshot;

use crate::message::{Delivery, Outbound};

/// Why a view has to be replaced by a fresh snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// An event arrived before any snapshot.
    NoSnapshot,
    /// The stream says `expected` was sent before `received`, but this view
    /// never applied it.
    Gap { expected: u64, received: u64 },
    /// A table event for a table the view does not hold.
    UnknownTable(TableId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Already reflected by the snapshot or an earlier delivery.
    AlreadyReflected,
    /// Nothing was applied; request a resync.
    ResyncRequired(ResyncReason),
}

#[derive(Debug, Clone, Default)]
pub struct ClientView {
    restaurant_id: Option<RestaurantId>,
    last_sequence: Option<u64>,
    orders: BTreeMap<OrderId, Order>,
    kots: BTreeMap<KotId, KitchenTicket>,
    tables: BTreeMap<TableId, Table>,
}

impl ClientView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut view = Self::new();
        view.apply_snapshot(snapshot);
        view
    }

    /// Handles one server message.
    pub fn receive(&mut self, message: Outbound) -> ApplyOutcome {
        match message {
            Outbound::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
                ApplyOutcome::Applied
            }
            Outbound::Event(delivery) => self.apply_delivery(&delivery),
            Outbound::Pong => ApplyOutcome::AlreadyReflected,
        }
    }

    /// Replaces the whole view.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.restaurant_id = Some(snapshot.restaurant_id);
        self.last_sequence = Some(snapshot.as_of_sequence);
        self.orders = snapshot
            .orders
            .into_iter()
            .map(|order| (order.id(), order))
            .collect();
        self.kots = snapshot
            .kots
            .into_iter()
            .map(|ticket| (ticket.id(), ticket))
            .collect();
        self.tables = snapshot
            .tables
            .into_iter()
            .map(|table| (table.id(), table))
            .collect();
    }

    pub fn apply_delivery(&mut self, delivery: &Delivery) -> ApplyOutcome {
        let Some(last) = self.last_sequence else {
            return ApplyOutcome::ResyncRequired(ResyncReason::NoSnapshot);
        };
        if delivery.sequence() <= last {
            return ApplyOutcome::AlreadyReflected;
        }
        if delivery.previous_sequence > last {
            return ApplyOutcome::ResyncRequired(ResyncReason::Gap {
                expected: delivery.previous_sequence,
                received: delivery.sequence(),
            });
        }

        match self.fold(&delivery.event) {
            Ok(()) => {
                self.last_sequence = Some(delivery.sequence());
                ApplyOutcome::Applied
            }
            Err(reason) => ApplyOutcome::ResyncRequired(reason),
        }
    }

    pub fn restaurant_id(&self) -> Option<RestaurantId> {
        self.restaurant_id
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn tickets(&self) -> impl Iterator<Item = &KitchenTicket> {
        self.kots.values()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    fn fold(&mut self, event: &SequencedEvent) -> Result<(), ResyncReason> {
        match &event.event {
            RestaurantEvent::Order(OrderEvent::OrderCreated(data)) => {
                self.orders.insert(data.order.id(), data.order.clone());
            }
            RestaurantEvent::Order(order_event) => {
                let order_id = order_event.order_id();
                if let Some(order) = self.orders.get_mut(&order_id) {
                    order.apply(order_event);
                }
                // Kitchen views never saw the order itself but hold its ticket.
                if order_event.new_status().is_some_and(|status| status.is_terminal()) {
                    self.orders.remove(&order_id);
                    self.kots.retain(|_, ticket| ticket.order_id() != order_id);
                }
            }
            RestaurantEvent::Kitchen(KitchenEvent::KotCreated(data)) => {
                self.kots.insert(data.ticket.id(), data.ticket.clone());
            }
            RestaurantEvent::Kitchen(kitchen_event) => {
                if let Some(ticket) = self.kots.get_mut(&kitchen_event.kot_id()) {
                    ticket.apply(kitchen_event);
                }
                if let KitchenEvent::KotLineStatusChanged(data) = kitchen_event
                    && let Some(order) = self.orders.get_mut(&data.order_id)
                {
                    order.mirror_line_status(data.line_index, data.to);
                }
            }
            RestaurantEvent::Table(table_event) => {
                let table_id = table_event.table_id();
                let table = self
                    .tables
                    .get_mut(&table_id)
                    .ok_or(ResyncReason::UnknownTable(table_id))?;
                table.apply(table_event);
            }
            RestaurantEvent::Stock(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::Sku;
    use domain::stock::StockAdjustedData;
    use domain::StockEvent;

    fn snapshot(as_of_sequence: u64) -> Snapshot {
        Snapshot {
            restaurant_id: RestaurantId::new(),
            as_of_sequence,
            orders: vec![],
            kots: vec![],
            tables: vec![],
        }
    }

    fn delivery(previous_sequence: u64, sequence: u64) -> Delivery {
        Delivery {
            previous_sequence,
            event: SequencedEvent {
                restaurant_id: RestaurantId::new(),
                sequence,
                occurred_at: Utc::now(),
                event: StockEvent::StockAdjusted(StockAdjustedData {
                    sku: Sku::new("BUN"),
                    added: 1,
                    current_stock: 1,
                })
                .into(),
            },
        }
    }

    #[test]
    fn test_event_before_snapshot_requires_resync() {
        let mut view = ClientView::new();
        assert_eq!(
            view.apply_delivery(&delivery(0, 1)),
            ApplyOutcome::ResyncRequired(ResyncReason::NoSnapshot)
        );
    }

    #[test]
    fn test_sequence_bookkeeping() {
        let mut view = ClientView::from_snapshot(snapshot(10));

        assert_eq!(view.apply_delivery(&delivery(7, 9)), ApplyOutcome::AlreadyReflected);
        assert_eq!(view.apply_delivery(&delivery(9, 12)), ApplyOutcome::Applied);
        assert_eq!(view.last_sequence(), Some(12));

        // 13 was routed here but never arrived
        assert_eq!(
            view.apply_delivery(&delivery(13, 15)),
            ApplyOutcome::ResyncRequired(ResyncReason::Gap {
                expected: 13,
                received: 15
            })
        );
        assert_eq!(view.last_sequence(), Some(12));

        view.apply_snapshot(snapshot(15));
        assert_eq!(view.apply_delivery(&delivery(15, 16)), ApplyOutcome::Applied);
    }

    #[test]
    fn test_unknown_table_requires_resync() {
        let mut view = ClientView::from_snapshot(snapshot(0));
        let (_, event) = Table::create(TableId::new(), RestaurantId::new(), 9, "Patio", 2, None);
        let outcome = view.apply_delivery(&Delivery {
            previous_sequence: 0,
            event: SequencedEvent {
                restaurant_id: RestaurantId::new(),
                sequence: 1,
                occurred_at: Utc::now(),
                event: event.clone().into(),
            },
        });
        assert_eq!(
            outcome,
            ApplyOutcome::ResyncRequired(ResyncReason::UnknownTable(event.table_id()))
        );
    }
}
