//! The closed set of events the engine publishes.

use chrono::{DateTime, Utc};
use common::{OrderId, RestaurantId};
use serde::{Deserialize, Serialize};

use crate::{DomainEvent, KitchenEvent, OrderEvent, StockEvent, TableEvent};

/// Kind of a published event. Routing and journal filtering key on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrderCreated,
    OrderStatusChanged,
    OrderItemsChanged,
    PaymentStatusChanged,
    KotCreated,
    KotLineStatusChanged,
    KotCompleted,
    TableStatusChanged,
    StockLow,
    StockAdjusted,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::OrderCreated,
        EventKind::OrderStatusChanged,
        EventKind::OrderItemsChanged,
        EventKind::PaymentStatusChanged,
        EventKind::KotCreated,
        EventKind::KotLineStatusChanged,
        EventKind::KotCompleted,
        EventKind::TableStatusChanged,
        EventKind::StockLow,
        EventKind::StockAdjusted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "order_created",
            EventKind::OrderStatusChanged => "order_status_changed",
            EventKind::OrderItemsChanged => "order_items_changed",
            EventKind::PaymentStatusChanged => "payment_status_changed",
            EventKind::KotCreated => "kot_created",
            EventKind::KotLineStatusChanged => "kot_line_status_changed",
            EventKind::KotCompleted => "kot_completed",
            EventKind::TableStatusChanged => "table_status_changed",
            EventKind::StockLow => "stock_low",
            EventKind::StockAdjusted => "stock_adjusted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any event published on a restaurant's stream.
///
/// Serialized as `{"kind": "...", "data": {...}}`; each inner enum carries
/// its own distinct kind names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestaurantEvent {
    Order(OrderEvent),
    Kitchen(KitchenEvent),
    Table(TableEvent),
    Stock(StockEvent),
}

impl RestaurantEvent {
    /// Returns the order the event concerns, if any.
    ///
    /// Used to apply per-order subscription filters.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            RestaurantEvent::Order(e) => Some(e.order_id()),
            RestaurantEvent::Kitchen(e) => Some(e.order_id()),
            RestaurantEvent::Table(e) => e.current_order(),
            RestaurantEvent::Stock(_) => None,
        }
    }
}

impl DomainEvent for RestaurantEvent {
    fn kind(&self) -> EventKind {
        match self {
            RestaurantEvent::Order(e) => e.kind(),
            RestaurantEvent::Kitchen(e) => e.kind(),
            RestaurantEvent::Table(e) => e.kind(),
            RestaurantEvent::Stock(e) => e.kind(),
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            RestaurantEvent::Order(e) => e.aggregate_type(),
            RestaurantEvent::Kitchen(e) => e.aggregate_type(),
            RestaurantEvent::Table(e) => e.aggregate_type(),
            RestaurantEvent::Stock(e) => e.aggregate_type(),
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            RestaurantEvent::Order(e) => e.aggregate_id(),
            RestaurantEvent::Kitchen(e) => e.aggregate_id(),
            RestaurantEvent::Table(e) => e.aggregate_id(),
            RestaurantEvent::Stock(e) => e.aggregate_id(),
        }
    }
}

impl From<OrderEvent> for RestaurantEvent {
    fn from(event: OrderEvent) -> Self {
        RestaurantEvent::Order(event)
    }
}

impl From<KitchenEvent> for RestaurantEvent {
    fn from(event: KitchenEvent) -> Self {
        RestaurantEvent::Kitchen(event)
    }
}

impl From<TableEvent> for RestaurantEvent {
    fn from(event: TableEvent) -> Self {
        RestaurantEvent::Table(event)
    }
}

impl From<StockEvent> for RestaurantEvent {
    fn from(event: StockEvent) -> Self {
        RestaurantEvent::Stock(event)
    }
}

/// An event with its position in the restaurant stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub restaurant_id: RestaurantId,
    pub sequence: u64,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RestaurantEvent,
}

impl SequencedEvent {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StockEvent, stock::StockLowData};
    use common::Sku;

    #[test]
    fn kinds_have_distinct_wire_names() {
        let mut names: Vec<_> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());
    }

    #[test]
    fn kind_serializes_as_wire_name() {
        for kind in EventKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::json!(kind.as_str()));
        }
    }

    #[test]
    fn sequenced_event_flattens_kind_and_data() {
        let event = SequencedEvent {
            restaurant_id: RestaurantId::new(),
            sequence: 3,
            occurred_at: Utc::now(),
            event: StockEvent::StockLow(StockLowData {
                sku: Sku::new("BUN"),
                name: "Burger bun".into(),
                current_stock: 4,
                reorder_level: 10,
            })
            .into(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["kind"], "stock_low");
        assert_eq!(json["data"]["sku"], "BUN");
        assert_eq!(event.kind(), EventKind::StockLow);
        assert_eq!(event.event.order_id(), None);
    }
}
