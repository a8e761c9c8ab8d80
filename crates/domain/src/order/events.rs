//! Order domain events.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::{DomainEvent, EventKind, Money};

use super::{Checkout, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Totals};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum OrderEvent {
    /// Order was placed. Carries the full order as created.
    OrderCreated(OrderCreatedData),

    /// Order moved to a new status (including cancellation).
    OrderStatusChanged(OrderStatusChangedData),

    /// Lines or discount changed; carries the resulting lines and totals.
    OrderItemsChanged(OrderItemsChangedData),

    /// Payment status or checkout changed.
    PaymentStatusChanged(PaymentStatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn kind(&self) -> EventKind {
        match self {
            OrderEvent::OrderCreated(_) => EventKind::OrderCreated,
            OrderEvent::OrderStatusChanged(_) => EventKind::OrderStatusChanged,
            OrderEvent::OrderItemsChanged(_) => EventKind::OrderItemsChanged,
            OrderEvent::PaymentStatusChanged(_) => EventKind::PaymentStatusChanged,
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "order"
    }

    fn aggregate_id(&self) -> String {
        self.order_id().to_string()
    }
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order: Order,
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub order_id: OrderId,
    pub order_number: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Cancellation reason, when `to` is `cancelled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// What changed in an OrderItemsChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemChange {
    Added { index: usize },
    Removed { index: usize },
    QuantityChanged { index: usize, from: u32, to: u32 },
    DiscountApplied { amount: Money },
}

/// Data for OrderItemsChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemsChangedData {
    pub order_id: OrderId,
    pub change: ItemChange,
    pub items: Vec<OrderItem>,
    pub totals: Totals,
    pub estimated_completion_time: DateTime<Utc>,
}

/// Data for PaymentStatusChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub order_id: OrderId,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub checkout: Option<Checkout>,
    pub amount: Money,
}

impl OrderEvent {
    /// Returns the order the event belongs to.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderCreated(data) => data.order.id(),
            OrderEvent::OrderStatusChanged(data) => data.order_id,
            OrderEvent::OrderItemsChanged(data) => data.order_id,
            OrderEvent::PaymentStatusChanged(data) => data.order_id,
        }
    }

    /// Creates an OrderStatusChanged event.
    pub fn status_changed(
        order: &Order,
        to: OrderStatus,
        reason: Option<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            from: order.status(),
            to,
            reason,
            changed_at,
        })
    }

    /// Creates a PaymentStatusChanged event.
    pub fn payment_changed(order: &Order, to: PaymentStatus, checkout: Option<Checkout>) -> Self {
        OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            order_id: order.id(),
            from: order.payment_status(),
            to,
            payment_method: order.payment_method(),
            checkout,
            amount: order.totals().total,
        })
    }

    /// Returns the new status if this is a status change.
    pub fn new_status(&self) -> Option<OrderStatus> {
        match self {
            OrderEvent::OrderStatusChanged(data) => Some(data.to),
            _ => None,
        }
    }
}
