//! Live dashboard counters, projected from a snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use domain::{Money, OrderStatus, Priority, TableStatus};
use engine::Snapshot;
use serde::Serialize;

/// Counters shown on the manager dashboard.
///
/// Computed on demand; nothing is accumulated between calls. Every status
/// appears as a key, with zero when nothing is in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStats {
    pub as_of_sequence: u64,
    pub open_orders: usize,
    pub orders_by_status: BTreeMap<&'static str, usize>,
    pub open_order_value: Money,
    /// Tickets with at least one line still to prepare.
    pub active_tickets: usize,
    pub overdue_tickets: usize,
    /// Active tickets at high priority after escalation.
    pub urgent_tickets: usize,
    pub tables_by_status: BTreeMap<&'static str, usize>,
}

impl LiveStats {
    pub fn from_snapshot(snapshot: &Snapshot, now: DateTime<Utc>, escalate_after: Duration) -> Self {
        let mut orders_by_status: BTreeMap<&'static str, usize> = OrderStatus::ALL
            .iter()
            .filter(|status| !status.is_terminal())
            .map(|status| (status.as_str(), 0))
            .collect();
        for order in &snapshot.orders {
            *orders_by_status.entry(order.status().as_str()).or_default() += 1;
        }

        let open_order_value = snapshot
            .orders
            .iter()
            .map(|order| order.totals().total)
            .sum();

        let active: Vec<_> = snapshot
            .kots
            .iter()
            .filter(|ticket| !ticket.is_complete())
            .collect();
        let overdue_tickets = active.iter().filter(|ticket| ticket.is_overdue(now)).count();
        let urgent_tickets = active
            .iter()
            .filter(|ticket| ticket.effective_priority(now, escalate_after) == Priority::High)
            .count();

        let mut tables_by_status: BTreeMap<&'static str, usize> = TableStatus::ALL
            .iter()
            .map(|status| (status.as_str(), 0))
            .collect();
        for table in &snapshot.tables {
            *tables_by_status.entry(table.status().as_str()).or_default() += 1;
        }

        Self {
            as_of_sequence: snapshot.as_of_sequence,
            open_orders: snapshot.orders.len(),
            orders_by_status,
            open_order_value,
            active_tickets: active.len(),
            overdue_tickets,
            urgent_tickets,
            tables_by_status,
        }
    }
}
