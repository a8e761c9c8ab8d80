//! Kitchen ticket events.

use chrono::{DateTime, Utc};
use common::{KotId, OrderId};
use serde::{Deserialize, Serialize};

use crate::{DomainEvent, EventKind};

use super::{KitchenTicket, LineStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum KitchenEvent {
    /// Ticket issued for a confirmed order. Carries the full ticket.
    KotCreated(KotCreatedData),

    /// One line moved one step forward.
    KotLineStatusChanged(KotLineStatusChangedData),

    /// The last open line became ready.
    KotCompleted(KotCompletedData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KotCreatedData {
    pub ticket: KitchenTicket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KotLineStatusChangedData {
    pub kot_id: KotId,
    pub kot_number: String,
    pub order_id: OrderId,
    /// Index of the order line this ticket line prepares.
    pub line_index: usize,
    pub from: LineStatus,
    pub to: LineStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KotCompletedData {
    pub kot_id: KotId,
    pub kot_number: String,
    pub order_id: OrderId,
    pub completed_at: DateTime<Utc>,
}

impl KitchenEvent {
    pub fn kot_id(&self) -> KotId {
        match self {
            KitchenEvent::KotCreated(data) => data.ticket.id(),
            KitchenEvent::KotLineStatusChanged(data) => data.kot_id,
            KitchenEvent::KotCompleted(data) => data.kot_id,
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            KitchenEvent::KotCreated(data) => data.ticket.order_id(),
            KitchenEvent::KotLineStatusChanged(data) => data.order_id,
            KitchenEvent::KotCompleted(data) => data.order_id,
        }
    }
}

impl DomainEvent for KitchenEvent {
    fn kind(&self) -> EventKind {
        match self {
            KitchenEvent::KotCreated(_) => EventKind::KotCreated,
            KitchenEvent::KotLineStatusChanged(_) => EventKind::KotLineStatusChanged,
            KitchenEvent::KotCompleted(_) => EventKind::KotCompleted,
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "kot"
    }

    fn aggregate_id(&self) -> String {
        self.kot_id().to_string()
    }
}
