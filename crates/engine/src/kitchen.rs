//! KOT generator: ticket derivation and the line state machine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{KotId, OrderId, RestaurantId};
use domain::{
    Aggregate, KitchenEvent, KitchenTicket, LineStatus, Order, OrderEvent, OrderStatus, Priority,
    PriorityPolicy, RestaurantEvent,
};
use serde::Serialize;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::orders::record_transitions;

/// Derives kitchen tickets from confirmed orders.
pub struct KotGenerator {
    policy: Arc<dyn PriorityPolicy>,
}

impl KotGenerator {
    pub fn new(policy: Arc<dyn PriorityPolicy>) -> Self {
        Self { policy }
    }

    /// Builds the ticket for an order, with priority from the policy.
    pub fn generate(
        &self,
        order: &Order,
        kot_number: String,
        now: DateTime<Utc>,
    ) -> (KitchenTicket, KitchenEvent) {
        let priority = self.policy.priority(order);
        KitchenTicket::generate(KotId::new(), kot_number, order, priority, now)
    }
}

/// A ticket as the kitchen board shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: KitchenTicket,
    pub effective_priority: Priority,
    pub overdue: bool,
}

impl Engine {
    /// Advances one ticket line a single step.
    ///
    /// The first line to start moves the order to `preparing`; the last line
    /// to finish completes the ticket and moves the order to `ready`.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, kot_id = %kot_id, to = %to))]
    pub async fn update_line_status(
        &self,
        restaurant_id: RestaurantId,
        kot_id: KotId,
        line_index: usize,
        to: LineStatus,
    ) -> Result<KitchenTicket> {
        self.mutate_ticket(restaurant_id, kot_id, |ticket, now| {
            ticket.update_line(line_index, to, now).map_err(EngineError::from)
        })
        .await
    }

    /// Walks every open line to `ready` and completes the ticket.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, kot_id = %kot_id))]
    pub async fn complete_ticket(
        &self,
        restaurant_id: RestaurantId,
        kot_id: KotId,
    ) -> Result<KitchenTicket> {
        self.mutate_ticket(restaurant_id, kot_id, |ticket, now| Ok(ticket.complete_all(now)))
            .await
    }

    pub async fn get_ticket(
        &self,
        restaurant_id: RestaurantId,
        kot_id: KotId,
    ) -> Result<KitchenTicket> {
        let slot = self.orders.slot_for_ticket(restaurant_id, kot_id)?;
        let slot = slot.lock().await;
        slot.ticket
            .clone()
            .ok_or_else(|| EngineError::ticket_not_found(kot_id))
    }

    /// The ticket of an order, if the order has been confirmed.
    pub async fn ticket_for_order(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> Result<Option<KitchenTicket>> {
        let slot = self.orders.slot(restaurant_id, order_id)?;
        let slot = slot.lock().await;
        Ok(slot.ticket.clone())
    }

    /// Tickets of open orders, most urgent first.
    pub async fn list_active_tickets(&self, restaurant_id: RestaurantId) -> Vec<TicketView> {
        let now = Utc::now();
        let escalate_after = self.config.escalate_after();

        let mut views = Vec::new();
        for slot in self.orders.slots(restaurant_id) {
            let slot = slot.lock().await;
            if slot.order.is_terminal() {
                continue;
            }
            if let Some(ticket) = &slot.ticket {
                views.push(TicketView {
                    effective_priority: ticket.effective_priority(now, escalate_after),
                    overdue: ticket.is_overdue(now),
                    ticket: ticket.clone(),
                });
            }
        }
        views.sort_by(|a, b| {
            b.effective_priority
                .cmp(&a.effective_priority)
                .then_with(|| a.ticket.created_at().cmp(&b.ticket.created_at()))
        });
        views
    }

    async fn mutate_ticket<F>(
        &self,
        restaurant_id: RestaurantId,
        kot_id: KotId,
        command: F,
    ) -> Result<KitchenTicket>
    where
        F: FnOnce(&KitchenTicket, DateTime<Utc>) -> Result<Vec<KitchenEvent>>,
    {
        let slot = self.orders.slot_for_ticket(restaurant_id, kot_id)?;
        let mut guard = slot.lock().await;
        let slot = &mut *guard;

        if slot.order.is_terminal() {
            return Err(EngineError::AlreadyTerminal(format!(
                "order {} is {}",
                slot.order.order_number(),
                slot.order.status()
            )));
        }
        let ticket = slot
            .ticket
            .as_mut()
            .ok_or_else(|| EngineError::ticket_not_found(kot_id))?;

        let now = Utc::now();
        let kitchen_events = command(ticket, now)?;
        ticket.apply_events(&kitchen_events);
        for event in &kitchen_events {
            if let KitchenEvent::KotLineStatusChanged(data) = event {
                slot.order.mirror_line_status(data.line_index, data.to);
                metrics::counter!("kot_lines_updated_total", "to" => data.to.as_str())
                    .increment(1);
            }
        }

        let order_events = follow_kitchen(&mut slot.order, ticket, now)?;
        record_transitions(&order_events);

        let mut events: Vec<RestaurantEvent> = kitchen_events
            .into_iter()
            .map(RestaurantEvent::from)
            .collect();
        events.extend(order_events.into_iter().map(RestaurantEvent::from));
        self.publish(restaurant_id, events).await;

        Ok(ticket.clone())
    }
}

/// Moves the order to match its ticket: `preparing` once any line started,
/// `ready` once every line is done.
fn follow_kitchen(
    order: &mut Order,
    ticket: &KitchenTicket,
    now: DateTime<Utc>,
) -> Result<Vec<OrderEvent>> {
    let mut events = Vec::new();
    if ticket.has_started() && order.status() == OrderStatus::Confirmed {
        let started = order.advance(OrderStatus::Preparing, false, now)?;
        order.apply_events(&started);
        events.extend(started);
    }
    if ticket.is_complete() && order.status() == OrderStatus::Preparing {
        let ready = order.advance(OrderStatus::Ready, true, now)?;
        order.apply_events(&ready);
        events.extend(ready);
    }
    Ok(events)
}
