//! Order store: the order state machine and its side effects.

use chrono::Utc;
use common::{Identity, MenuItemId, OrderId, RestaurantId, Sku, TableId, UserId};
use domain::{
    Aggregate, CustomerSnapshot, KitchenTicket, Money, NewOrder, Order, OrderError, OrderEvent,
    OrderItem, OrderStatus, OrderType, PaymentMethod, RestaurantEvent, Table, Totals,
};
use serde::Deserialize;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::repository::OrderSlot;
use crate::services::MenuItem;
use crate::tables::TableChange;

/// One requested line: which menu item, how many, and any instructions.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineSpec {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderLineSpec {
    pub fn new(menu_item_id: impl Into<MenuItemId>, quantity: u32) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            quantity,
            special_instructions: None,
        }
    }
}

/// A request to open an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderSpec {
    pub order_type: OrderType,
    #[serde(default)]
    pub table_id: Option<TableId>,
    #[serde(default)]
    pub customer: CustomerSnapshot,
    /// Defaults to the creating user.
    #[serde(default)]
    pub waiter_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<OrderLineSpec>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub high_priority: bool,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl OrderSpec {
    pub fn dine_in(table_id: TableId, items: Vec<OrderLineSpec>) -> Self {
        Self {
            order_type: OrderType::DineIn,
            table_id: Some(table_id),
            ..Self::takeaway(items)
        }
    }

    pub fn takeaway(items: Vec<OrderLineSpec>) -> Self {
        Self {
            order_type: OrderType::Takeaway,
            table_id: None,
            customer: CustomerSnapshot::default(),
            waiter_id: None,
            items,
            notes: None,
            high_priority: false,
            payment_method: None,
        }
    }
}

/// Recomputes an order's totals from its lines, discount and tax rate.
///
/// `None` only if the amounts overflow, which a stored order never does.
pub fn recompute_totals(order: &Order) -> Option<Totals> {
    Totals::compute(order.items(), order.totals().discount, order.tax_rate_bps())
}

impl Engine {
    /// Opens an order.
    ///
    /// Menu snapshots are taken here. A dine-in order occupies its table in
    /// the same step; if the table is taken or does not exist, nothing is
    /// stored.
    #[tracing::instrument(skip(self, identity, spec), fields(restaurant_id = %identity.restaurant_id, order_type = %spec.order_type))]
    pub async fn create_order(&self, identity: &Identity, spec: OrderSpec) -> Result<Order> {
        let restaurant_id = identity.restaurant_id;

        let mut items = Vec::with_capacity(spec.items.len());
        for line in &spec.items {
            items.push(self.resolve_line(line).await?);
        }

        let table = match (spec.order_type.requires_table(), spec.table_id) {
            (true, Some(table_id)) => {
                let table = self.tables.get(restaurant_id, table_id).await.map_err(|_| {
                    EngineError::TableUnavailable(format!("table {table_id} does not exist"))
                })?;
                Some(table)
            }
            _ => None,
        };

        let now = Utc::now();
        let new = NewOrder {
            id: OrderId::new(),
            restaurant_id,
            order_number: self.orders.next_order_number(restaurant_id, now),
            order_type: spec.order_type,
            table_id: spec.table_id,
            table_number: table.as_ref().map(Table::number),
            customer: spec.customer,
            waiter_id: spec.waiter_id.unwrap_or_else(|| identity.user_id.clone()),
            items,
            notes: spec.notes,
            high_priority: spec.high_priority,
            payment_method: spec.payment_method,
            tax_rate_bps: self.config.tax_rate_bps,
        };
        let (order, created) = Order::place(new, now)?;

        let mut events: Vec<RestaurantEvent> = vec![created.into()];
        let occupied = match order.table_id() {
            Some(table_id) => self.tables.occupy(restaurant_id, table_id, order.id()).await?,
            None => TableChange::none(),
        };
        events.extend(occupied.events().iter().cloned().map(RestaurantEvent::from));

        let slot = self.orders.insert(OrderSlot {
            order: order.clone(),
            ticket: None,
        });
        let _guard = slot.lock().await;
        self.publish(restaurant_id, events).await;
        drop(occupied);

        metrics::counter!("orders_created_total", "order_type" => order.order_type().as_str())
            .increment(1);
        tracing::info!(order_id = %order.id(), order_number = order.order_number(), "order created");
        Ok(order)
    }

    /// Moves an order along its state machine.
    ///
    /// Confirming deducts stock for every recipe component (all or nothing)
    /// and generates the kitchen ticket. Requesting `cancelled` cancels.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id, to = %to))]
    pub async fn update_status(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        to: OrderStatus,
    ) -> Result<Order> {
        if to == OrderStatus::Cancelled {
            return self.cancel_order(restaurant_id, order_id, None).await;
        }

        let slot = self.orders.slot(restaurant_id, order_id)?;
        let mut guard = slot.lock().await;
        let slot = &mut *guard;
        let now = Utc::now();

        let kitchen_ready = slot.ticket.as_ref().is_some_and(KitchenTicket::is_complete);
        let status_events = slot.order.advance(to, kitchen_ready, now)?;

        let mut events: Vec<RestaurantEvent> = Vec::new();
        let mut released = TableChange::none();
        if to == OrderStatus::Confirmed {
            let requirements = self.recipe_requirements(&slot.order).await?;
            let low_stock = self
                .stock
                .deduct_for_order(restaurant_id, order_id, requirements)
                .await?;

            slot.order.apply_events(&status_events);
            record_transitions(&status_events);
            events.extend(status_events.into_iter().map(RestaurantEvent::from));

            let kot_number = self.orders.next_kot_number(restaurant_id, now);
            let (ticket, created) = self.kot.generate(&slot.order, kot_number, now);
            self.orders.index_ticket(ticket.id(), order_id);
            tracing::info!(kot_id = %ticket.id(), priority = %ticket.priority(), "kitchen ticket generated");
            slot.ticket = Some(ticket);

            events.push(created.into());
            events.extend(low_stock.into_iter().map(RestaurantEvent::from));
        } else {
            slot.order.apply_events(&status_events);
            record_transitions(&status_events);
            events.extend(status_events.into_iter().map(RestaurantEvent::from));
            if slot.order.is_terminal() {
                released = self.release_table(&slot.order).await;
                events.extend(released.events().iter().cloned().map(RestaurantEvent::from));
            }
        }

        self.publish(restaurant_id, events).await;
        drop(released);
        Ok(slot.order.clone())
    }

    /// Cancels an order from any open status.
    ///
    /// Releases the table and withdraws the ticket if the kitchen has not
    /// started it. Stock deducted at confirmation is not returned.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<Order> {
        let slot = self.orders.slot(restaurant_id, order_id)?;
        let mut guard = slot.lock().await;
        let slot = &mut *guard;

        let cancelled = slot.order.cancel(reason, Utc::now())?;
        slot.order.apply_events(&cancelled);
        record_transitions(&cancelled);

        // The ticket id stays indexed so late kitchen updates see the cancellation.
        if let Some(ticket) = slot.ticket.take_if(|ticket| !ticket.has_started()) {
            tracing::info!(kot_id = %ticket.id(), "kitchen ticket withdrawn");
        }

        let mut events: Vec<RestaurantEvent> =
            cancelled.into_iter().map(RestaurantEvent::from).collect();
        let released = self.release_table(&slot.order).await;
        events.extend(released.events().iter().cloned().map(RestaurantEvent::from));
        self.publish(restaurant_id, events).await;
        drop(released);

        tracing::info!(reason = slot.order.cancellation_reason(), "order cancelled");
        Ok(slot.order.clone())
    }

    /// Adds a menu item to a pending order.
    #[tracing::instrument(skip(self, line), fields(restaurant_id = %restaurant_id, order_id = %order_id, menu_item_id = %line.menu_item_id))]
    pub async fn add_item(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        line: OrderLineSpec,
    ) -> Result<Order> {
        let item = self.resolve_line(&line).await?;
        self.mutate_order(restaurant_id, order_id, |order| order.add_item(item))
            .await
    }

    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn remove_item(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        index: usize,
    ) -> Result<Order> {
        self.mutate_order(restaurant_id, order_id, |order| order.remove_item(index))
            .await
    }

    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn update_item_quantity(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        index: usize,
        quantity: u32,
    ) -> Result<Order> {
        self.mutate_order(restaurant_id, order_id, |order| {
            order.update_item_quantity(index, quantity)
        })
        .await
    }

    /// Sets the order discount; allowed while pending or confirmed.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn apply_discount(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        amount: Money,
    ) -> Result<Order> {
        self.mutate_order(restaurant_id, order_id, |order| order.apply_discount(amount))
            .await
    }

    pub async fn get_order(&self, restaurant_id: RestaurantId, order_id: OrderId) -> Result<Order> {
        let slot = self.orders.slot(restaurant_id, order_id)?;
        let slot = slot.lock().await;
        Ok(slot.order.clone())
    }

    /// Non-terminal orders of a restaurant, oldest first.
    pub async fn list_open_orders(&self, restaurant_id: RestaurantId) -> Vec<Order> {
        let mut orders = Vec::new();
        for slot in self.orders.slots(restaurant_id) {
            let slot = slot.lock().await;
            if !slot.order.is_terminal() {
                orders.push(slot.order.clone());
            }
        }
        orders.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.order_number().cmp(b.order_number()))
        });
        orders
    }

    /// Runs a single-order command under the slot lock and publishes its events.
    pub(crate) async fn mutate_order<F>(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        command: F,
    ) -> Result<Order>
    where
        F: FnOnce(&Order) -> std::result::Result<Vec<OrderEvent>, OrderError>,
    {
        let slot = self.orders.slot(restaurant_id, order_id)?;
        let mut slot = slot.lock().await;
        let events = command(&slot.order)?;
        slot.order.apply_events(&events);
        self.publish(restaurant_id, events).await;
        Ok(slot.order.clone())
    }

    async fn menu_item(&self, id: &MenuItemId) -> Result<MenuItem> {
        let item = self
            .menu
            .get_menu_item(id)
            .await?
            .ok_or_else(|| EngineError::ValidationFailed(format!("menu item {id} does not exist")))?;
        if !item.is_available {
            return Err(EngineError::ValidationFailed(format!(
                "menu item {id} is not available"
            )));
        }
        Ok(item)
    }

    async fn resolve_line(&self, line: &OrderLineSpec) -> Result<OrderItem> {
        let item = self.menu_item(&line.menu_item_id).await?;
        Ok(item.to_order_item(line.quantity, line.special_instructions.clone()))
    }

    /// Stock needed to prepare every line of the order.
    async fn recipe_requirements(&self, order: &Order) -> Result<Vec<(Sku, u32)>> {
        let mut requirements = Vec::new();
        for line in order.items() {
            let item = self
                .menu
                .get_menu_item(&line.menu_item_id)
                .await?
                .ok_or_else(|| {
                    EngineError::ValidationFailed(format!(
                        "menu item {} no longer exists",
                        line.menu_item_id
                    ))
                })?;
            requirements.extend(item.recipe.into_iter().map(|component| {
                (
                    component.sku,
                    component.quantity.saturating_mul(line.quantity),
                )
            }));
        }
        Ok(requirements)
    }
}

pub(crate) fn record_transitions(events: &[OrderEvent]) {
    for status in events.iter().filter_map(OrderEvent::new_status) {
        metrics::counter!("order_transitions_total", "to" => status.as_str()).increment(1);
        tracing::info!(to = %status, "order status changed");
    }
}
