//! Order aggregate and related types.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::{NewOrder, Order};
pub use events::{
    ItemChange, OrderCreatedData, OrderEvent, OrderItemsChangedData, OrderStatusChangedData,
    PaymentStatusChangedData,
};
pub use state::{OrderStatus, OrderType, PaymentMethod, PaymentStatus};
pub use value_objects::{Checkout, CustomerSnapshot, OrderItem, Totals};

use thiserror::Error;

use crate::Money;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Dine-in orders require a table")]
    TableRequired,

    #[error("{order_type} orders cannot be linked to a table")]
    TableNotAllowed { order_type: OrderType },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cannot move to {to} while kitchen lines are still open")]
    PrematureTransition { to: OrderStatus },

    #[error("Order is already {status}")]
    AlreadyTerminal { status: OrderStatus },

    #[error("Items can only be changed while pending (order is {status})")]
    ItemsLocked { status: OrderStatus },

    #[error("Discounts cannot be changed once the order is {status}")]
    DiscountLocked { status: OrderStatus },

    #[error("Order line {index} not found")]
    LineNotFound { index: usize },

    #[error("Cannot remove the last item; cancel the order instead")]
    LastItem,

    #[error("Invalid discount: {cents} cents")]
    InvalidDiscount { cents: i64 },

    #[error("Discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Money, subtotal: Money },

    #[error("Order amounts out of range")]
    AmountOverflow,

    #[error("Totals cannot change while payment is {status}")]
    PaymentLocked { status: PaymentStatus },

    #[error("Payment already settled")]
    PaymentAlreadySettled,

    #[error("A checkout is already in progress")]
    PaymentInProgress,

    #[error("No checkout staged (payment is {status})")]
    PaymentNotStaged { status: PaymentStatus },
}
