//! Order status machine and the small closed enums around it.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► Preparing ──► Ready ──► Served ──► Completed
///    │            │             │           │          │
///    └────────────┴─────────────┴───────────┴──────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order taken; items can still be changed.
    #[default]
    Pending,

    /// Accepted; stock deducted and kitchen ticket issued.
    Confirmed,

    /// The kitchen started at least one line.
    Preparing,

    /// Every kitchen line is ready.
    Ready,

    /// Food is at the table or handed over.
    Served,

    /// Served and paid (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns the single status this one may advance to, if any.
    ///
    /// Cancellation is not an advance; see [`OrderStatus::can_cancel`].
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::Served),
            OrderStatus::Served => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Returns true if `to` is the adjacent next status.
    pub fn can_advance_to(&self, to: OrderStatus) -> bool {
        self.next() == Some(to)
    }

    /// Returns true if items can be added, removed or re-quantified.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if a discount can be applied.
    pub fn can_discount(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the order reaches the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
}

impl OrderType {
    /// Returns true if the order must be linked to a table.
    pub fn requires_table(&self) -> bool {
        matches!(self, OrderType::DineIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "dine_in",
            OrderType::Takeaway => "takeaway",
            OrderType::Delivery => "delivery",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settlement state of the order's bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    /// A checkout has been staged with the payment gateway.
    Pending,
    Paid,
    /// Checkout creation failed after every retry; staff must follow up.
    RequiresAttention,
}

impl PaymentStatus {
    /// Returns true if a new checkout may be staged.
    pub fn can_stage(&self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::RequiresAttention)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::RequiresAttention => "requires_attention",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_only_adjacent_advances() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_advance_to(OrderStatus::Preparing));
        assert!(OrderStatus::Served.can_advance_to(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.can_advance_to(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.can_advance_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Pending.can_advance_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_advance_to(OrderStatus::Completed));
    }

    #[test]
    fn test_pending_can_modify_items() {
        assert!(OrderStatus::Pending.can_modify_items());
        for status in &OrderStatus::ALL[1..] {
            assert!(!status.can_modify_items());
        }
    }

    #[test]
    fn test_discount_before_kitchen_starts() {
        assert!(OrderStatus::Pending.can_discount());
        assert!(OrderStatus::Confirmed.can_discount());
        assert!(!OrderStatus::Preparing.can_discount());
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Completed, OrderStatus::Cancelled]);
        assert!(OrderStatus::Served.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_wire_names() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::json!(status.as_str()));
        }
        assert_eq!(
            serde_json::to_value(OrderType::DineIn).unwrap(),
            serde_json::json!("dine_in")
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::RequiresAttention).unwrap(),
            serde_json::json!("requires_attention")
        );
    }

    #[test]
    fn test_payment_staging() {
        assert!(PaymentStatus::Unpaid.can_stage());
        assert!(PaymentStatus::RequiresAttention.can_stage());
        assert!(!PaymentStatus::Pending.can_stage());
        assert!(!PaymentStatus::Paid.can_stage());
    }
}
