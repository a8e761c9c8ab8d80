//! Kitchen order tickets (KOT).

mod events;
mod policy;
mod state;
mod ticket;

pub use events::{KitchenEvent, KotCompletedData, KotCreatedData, KotLineStatusChangedData};
pub use policy::{PartySizePolicy, PriorityPolicy};
pub use state::{LineStatus, Priority};
pub use ticket::{KitchenTicket, TicketLine};

use thiserror::Error;

/// Errors that can occur during ticket operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KitchenError {
    #[error("Ticket line {line_index} not found")]
    LineNotFound { line_index: usize },

    #[error("Invalid line transition for line {line_index}: {from} to {to}")]
    InvalidLineTransition {
        line_index: usize,
        from: LineStatus,
        to: LineStatus,
    },
}
