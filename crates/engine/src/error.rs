//! Engine error types.

use common::Sku;
use domain::{KitchenError, OrderError, StockError, TableError};
use thiserror::Error;

/// Errors returned by engine operations.
///
/// Domain errors are folded into this closed taxonomy so callers can map
/// each variant to a single remedy (fix input, resync, retry).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed or violates an order rule.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The requested table cannot take a new order.
    #[error("Table unavailable: {0}")]
    TableUnavailable(String),

    /// The requested status change is not allowed from the current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The status change must wait for the kitchen.
    #[error("Premature transition: {0}")]
    PrematureTransition(String),

    /// A ticket line cannot move to the requested status.
    #[error("Invalid line transition: {0}")]
    InvalidLineTransition(String),

    /// Not enough stock to confirm the order.
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// The order is already completed or cancelled.
    #[error("Already terminal: {0}")]
    AlreadyTerminal(String),

    /// The referenced entity does not exist in this restaurant.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An external collaborator failed; the operation may be retried.
    #[error("External dependency failed: {0}")]
    ExternalDependencyFailed(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Fatal(String),
}

impl EngineError {
    /// Stable snake_case code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ValidationFailed(_) => "validation_failed",
            EngineError::TableUnavailable(_) => "table_unavailable",
            EngineError::InvalidTransition(_) => "invalid_transition",
            EngineError::PrematureTransition(_) => "premature_transition",
            EngineError::InvalidLineTransition(_) => "invalid_line_transition",
            EngineError::InsufficientStock { .. } => "insufficient_stock",
            EngineError::AlreadyTerminal(_) => "already_terminal",
            EngineError::NotFound(_) => "not_found",
            EngineError::ExternalDependencyFailed(_) => "external_dependency_failed",
            EngineError::Fatal(_) => "fatal",
        }
    }

    pub(crate) fn order_not_found(id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("order {id}"))
    }

    pub(crate) fn ticket_not_found(id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("kitchen ticket {id}"))
    }

    pub(crate) fn table_not_found(id: impl std::fmt::Display) -> Self {
        EngineError::NotFound(format!("table {id}"))
    }
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::TableRequired
            | OrderError::TableNotAllowed { .. }
            | OrderError::LastItem
            | OrderError::InvalidDiscount { .. }
            | OrderError::DiscountExceedsSubtotal { .. }
            | OrderError::AmountOverflow => EngineError::ValidationFailed(message),
            OrderError::InvalidTransition { .. }
            | OrderError::ItemsLocked { .. }
            | OrderError::DiscountLocked { .. }
            | OrderError::PaymentAlreadySettled
            | OrderError::PaymentInProgress
            | OrderError::PaymentLocked { .. }
            | OrderError::PaymentNotStaged { .. } => EngineError::InvalidTransition(message),
            OrderError::PrematureTransition { .. } => EngineError::PrematureTransition(message),
            OrderError::AlreadyTerminal { .. } => EngineError::AlreadyTerminal(message),
            OrderError::LineNotFound { .. } => EngineError::NotFound(message),
        }
    }
}

impl From<KitchenError> for EngineError {
    fn from(err: KitchenError) -> Self {
        let message = err.to_string();
        match err {
            KitchenError::LineNotFound { .. } => EngineError::NotFound(message),
            KitchenError::InvalidLineTransition { .. } => {
                EngineError::InvalidLineTransition(message)
            }
        }
    }
}

impl From<TableError> for EngineError {
    fn from(err: TableError) -> Self {
        let message = err.to_string();
        match err {
            TableError::Unavailable { .. } => EngineError::TableUnavailable(message),
            TableError::Occupied { .. } | TableError::ManualOccupy => {
                EngineError::InvalidTransition(message)
            }
            TableError::InvalidPartySize { .. } | TableError::ReservationLapsed { .. } => {
                EngineError::ValidationFailed(message)
            }
        }
    }
}

impl From<StockError> for EngineError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                sku,
                requested,
                available,
            } => EngineError::InsufficientStock {
                sku,
                requested,
                available,
            },
            StockError::InvalidQuantity { .. } => EngineError::ValidationFailed(err.to_string()),
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderStatus, TableStatus};

    #[test]
    fn order_errors_map_to_taxonomy() {
        assert_eq!(EngineError::from(OrderError::NoItems).code(), "validation_failed");
        assert_eq!(EngineError::from(OrderError::TableRequired).code(), "validation_failed");
        assert_eq!(
            EngineError::from(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Ready,
            })
            .code(),
            "invalid_transition"
        );
        assert_eq!(
            EngineError::from(OrderError::PrematureTransition {
                to: OrderStatus::Ready
            })
            .code(),
            "premature_transition"
        );
        assert_eq!(
            EngineError::from(OrderError::AlreadyTerminal {
                status: OrderStatus::Cancelled
            })
            .code(),
            "already_terminal"
        );
    }

    #[test]
    fn stock_error_keeps_details() {
        let err = EngineError::from(StockError::Insufficient {
            sku: Sku::new("BUN"),
            requested: 4,
            available: 1,
        });
        assert!(matches!(
            err,
            EngineError::InsufficientStock { ref sku, requested: 4, available: 1 } if sku.as_str() == "BUN"
        ));
        assert!(err.to_string().contains("BUN"));
    }

    #[test]
    fn table_unavailable_maps_to_conflict() {
        let err = EngineError::from(TableError::Unavailable {
            number: 5,
            status: TableStatus::Occupied,
        });
        assert_eq!(err.code(), "table_unavailable");
        assert_eq!(err.to_string(), "Table unavailable: Table 5 is occupied");
    }
}
