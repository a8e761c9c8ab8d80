//! Order aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::{OrderId, RestaurantId, TableId, UserId};
use serde::{Deserialize, Serialize};

use crate::{Aggregate, LineStatus, Money};

use super::{
    Checkout, CustomerSnapshot, ItemChange, OrderError, OrderEvent, OrderItem, OrderStatus,
    OrderType, PaymentMethod, PaymentStatus, Totals,
    events::{OrderCreatedData, OrderItemsChangedData, PaymentStatusChangedData},
};

/// Everything needed to place an order.
///
/// Menu snapshots are resolved by the caller; `order_number` is allocated by
/// the caller as well so numbering stays monotonic per restaurant and day.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    pub order_number: String,
    pub order_type: OrderType,
    pub table_id: Option<TableId>,
    pub table_number: Option<u32>,
    pub customer: CustomerSnapshot,
    pub waiter_id: UserId,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
    pub high_priority: bool,
    pub payment_method: Option<PaymentMethod>,
    pub tax_rate_bps: u32,
}

/// Order aggregate root.
///
/// Represents an order from placement to completion or cancellation.
/// Orders are never deleted; cancellation is a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    restaurant_id: RestaurantId,
    order_number: String,
    order_type: OrderType,
    status: OrderStatus,
    table_id: Option<TableId>,
    table_number: Option<u32>,
    customer: CustomerSnapshot,
    waiter_id: UserId,
    items: Vec<OrderItem>,
    tax_rate_bps: u32,
    totals: Totals,
    payment_method: Option<PaymentMethod>,
    payment_status: PaymentStatus,
    checkout: Option<Checkout>,
    notes: Option<String>,
    high_priority: bool,
    created_at: DateTime<Utc>,
    estimated_completion_time: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    stock_deducted: bool,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "order"
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderCreated(data) => *self = data.order.clone(),
            OrderEvent::OrderStatusChanged(data) => {
                self.status = data.to;
                match data.to {
                    // Stock is deducted before the confirming event is applied.
                    OrderStatus::Confirmed => self.stock_deducted = true,
                    OrderStatus::Completed => self.completed_at = Some(data.changed_at),
                    OrderStatus::Cancelled => {
                        self.cancelled_at = Some(data.changed_at);
                        self.cancellation_reason = data.reason.clone();
                    }
                    _ => {}
                }
            }
            OrderEvent::OrderItemsChanged(data) => {
                self.items = data.items.clone();
                self.totals = data.totals;
                self.estimated_completion_time = data.estimated_completion_time;
            }
            OrderEvent::PaymentStatusChanged(data) => {
                self.payment_status = data.to;
                self.payment_method = data.payment_method;
                if data.checkout.is_some() {
                    self.checkout = data.checkout.clone();
                }
            }
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn table_number(&self) -> Option<u32> {
        self.table_number
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn waiter_id(&self) -> &UserId {
        &self.waiter_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the line at `index`, if any.
    pub fn item(&self, index: usize) -> Option<&OrderItem> {
        self.items.get(index)
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn checkout(&self) -> Option<&Checkout> {
        self.checkout.as_ref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Returns true if staff flagged the order for priority handling.
    pub fn high_priority(&self) -> bool {
        self.high_priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn estimated_completion_time(&self) -> DateTime<Utc> {
        self.estimated_completion_time
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Returns true once stock has been deducted for this order.
    pub fn stock_deducted(&self) -> bool {
        self.stock_deducted
    }

    pub fn tax_rate_bps(&self) -> u32 {
        self.tax_rate_bps
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order.
    ///
    /// Validates the line list and table linkage and returns the order together
    /// with its `OrderCreated` event.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<(Order, OrderEvent), OrderError> {
        if new.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(item) = new.items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }
        match (new.order_type.requires_table(), new.table_id.is_some()) {
            (true, false) => return Err(OrderError::TableRequired),
            (false, true) => {
                return Err(OrderError::TableNotAllowed {
                    order_type: new.order_type,
                });
            }
            _ => {}
        }

        let mut items = new.items;
        for item in &mut items {
            item.status = LineStatus::Pending;
        }
        let totals = Totals::compute(&items, Money::zero(), new.tax_rate_bps)
            .ok_or(OrderError::AmountOverflow)?;
        let estimated_completion_time = estimate_completion(now, &items);

        let order = Order {
            id: new.id,
            restaurant_id: new.restaurant_id,
            order_number: new.order_number,
            order_type: new.order_type,
            status: OrderStatus::Pending,
            table_id: new.table_id,
            table_number: new.table_number,
            customer: new.customer,
            waiter_id: new.waiter_id,
            items,
            tax_rate_bps: new.tax_rate_bps,
            totals,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Unpaid,
            checkout: None,
            notes: new.notes,
            high_priority: new.high_priority,
            created_at: now,
            estimated_completion_time,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            stock_deducted: false,
        };

        let event = OrderEvent::OrderCreated(OrderCreatedData {
            order: order.clone(),
        });
        Ok((order, event))
    }

    /// Moves the order to `to`.
    ///
    /// `kitchen_ready` tells whether every ticket line is ready; moving to
    /// `ready` without it is premature. Requesting `cancelled` cancels without
    /// a reason. Serving an already paid order completes it as well.
    pub fn advance(
        &self,
        to: OrderStatus,
        kitchen_ready: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_open()?;

        if to == OrderStatus::Cancelled {
            return self.cancel(None, now);
        }

        if !self.status.can_advance_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        if to == OrderStatus::Ready && !kitchen_ready {
            return Err(OrderError::PrematureTransition { to });
        }

        let first = OrderEvent::status_changed(self, to, None, now);
        if to == OrderStatus::Served && self.payment_status == PaymentStatus::Paid {
            let mut served = self.clone();
            served.apply(&first);
            let completed = OrderEvent::status_changed(&served, OrderStatus::Completed, None, now);
            return Ok(vec![first, completed]);
        }
        Ok(vec![first])
    }

    /// Cancels the order from any non-terminal status.
    pub fn cancel(
        &self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_open()?;
        Ok(vec![OrderEvent::status_changed(
            self,
            OrderStatus::Cancelled,
            reason,
            now,
        )])
    }

    /// Appends a line to a pending order.
    pub fn add_item(&self, mut item: OrderItem) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_items_editable()?;
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
            });
        }

        let mut items = self.items.clone();
        item.status = LineStatus::Pending;
        items.push(item);
        let index = items.len() - 1;

        Ok(vec![self.items_changed(
            ItemChange::Added { index },
            items,
            self.totals.discount,
        )?])
    }

    /// Removes the line at `index` from a pending order.
    pub fn remove_item(&self, index: usize) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_items_editable()?;
        self.ensure_line(index)?;
        if self.items.len() == 1 {
            return Err(OrderError::LastItem);
        }

        let mut items = self.items.clone();
        items.remove(index);

        Ok(vec![self.items_changed(
            ItemChange::Removed { index },
            items,
            self.totals.discount,
        )?])
    }

    /// Changes the quantity of the line at `index` on a pending order.
    ///
    /// Setting the current quantity again produces no event.
    pub fn update_item_quantity(
        &self,
        index: usize,
        quantity: u32,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_items_editable()?;
        self.ensure_line(index)?;
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }

        let from = self.items[index].quantity;
        if from == quantity {
            return Ok(vec![]);
        }

        let mut items = self.items.clone();
        items[index].quantity = quantity;

        Ok(vec![self.items_changed(
            ItemChange::QuantityChanged {
                index,
                from,
                to: quantity,
            },
            items,
            self.totals.discount,
        )?])
    }

    /// Sets the order discount. Allowed until the kitchen starts.
    pub fn apply_discount(&self, amount: Money) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_open()?;
        if !self.status.can_discount() {
            return Err(OrderError::DiscountLocked {
                status: self.status,
            });
        }
        if amount.is_negative() {
            return Err(OrderError::InvalidDiscount {
                cents: amount.cents(),
            });
        }
        if amount > self.totals.subtotal {
            return Err(OrderError::DiscountExceedsSubtotal {
                discount: amount,
                subtotal: self.totals.subtotal,
            });
        }

        Ok(vec![self.items_changed(
            ItemChange::DiscountApplied { amount },
            self.items.clone(),
            amount,
        )?])
    }

    /// Stages a checkout: payment moves to `pending` before the gateway is called.
    pub fn stage_payment(
        &self,
        method: Option<PaymentMethod>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyTerminal {
                status: self.status,
            });
        }
        match self.payment_status {
            PaymentStatus::Paid => return Err(OrderError::PaymentAlreadySettled),
            PaymentStatus::Pending => return Err(OrderError::PaymentInProgress),
            PaymentStatus::Unpaid | PaymentStatus::RequiresAttention => {}
        }

        Ok(vec![self.payment_event(
            PaymentStatus::Pending,
            method.or(self.payment_method),
            None,
        )])
    }

    /// Records the checkout returned by the gateway for a staged payment.
    pub fn record_checkout(&self, checkout: Checkout) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_payment_staged()?;
        Ok(vec![self.payment_event(
            PaymentStatus::Pending,
            self.payment_method,
            Some(checkout),
        )])
    }

    /// Marks a staged payment as needing staff attention after the gateway failed.
    pub fn flag_payment_attention(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_payment_staged()?;
        Ok(vec![self.payment_event(
            PaymentStatus::RequiresAttention,
            self.payment_method,
            None,
        )])
    }

    /// Marks the bill as paid. A served order is completed as well.
    ///
    /// Settling an already paid order produces no events.
    pub fn settle_payment(&self, now: DateTime<Utc>) -> Result<Vec<OrderEvent>, OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyTerminal {
                status: self.status,
            });
        }
        if self.payment_status == PaymentStatus::Paid {
            return Ok(vec![]);
        }

        let paid = self.payment_event(PaymentStatus::Paid, self.payment_method, None);
        if self.status == OrderStatus::Served {
            let completed = OrderEvent::status_changed(self, OrderStatus::Completed, None, now);
            return Ok(vec![paid, completed]);
        }
        Ok(vec![paid])
    }
}

// Side-channel updates that are not published as order events
impl Order {
    /// Mirrors a kitchen ticket line status onto the matching order line.
    pub fn mirror_line_status(&mut self, index: usize, status: LineStatus) {
        if let Some(item) = self.items.get_mut(index) {
            item.status = status;
        }
    }

    /// Resets every line to `pending`, hiding kitchen progress.
    pub fn forget_line_progress(&mut self) {
        for item in &mut self.items {
            item.status = LineStatus::Pending;
        }
    }

    /// Drops settlement details: status, method and any staged checkout.
    pub fn forget_payment(&mut self) {
        self.payment_status = PaymentStatus::Unpaid;
        self.payment_method = None;
        self.checkout = None;
    }
}

impl Order {
    fn ensure_open(&self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_items_editable(&self) -> Result<(), OrderError> {
        self.ensure_open()?;
        if !self.status.can_modify_items() {
            return Err(OrderError::ItemsLocked {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_line(&self, index: usize) -> Result<(), OrderError> {
        if index >= self.items.len() {
            return Err(OrderError::LineNotFound { index });
        }
        Ok(())
    }

    fn ensure_payment_staged(&self) -> Result<(), OrderError> {
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::AlreadyTerminal {
                status: self.status,
            });
        }
        if self.payment_status != PaymentStatus::Pending {
            return Err(OrderError::PaymentNotStaged {
                status: self.payment_status,
            });
        }
        Ok(())
    }

    fn items_changed(
        &self,
        change: ItemChange,
        items: Vec<OrderItem>,
        discount: Money,
    ) -> Result<OrderEvent, OrderError> {
        // A staged or settled payment was issued for the current total.
        if matches!(self.payment_status, PaymentStatus::Pending | PaymentStatus::Paid) {
            return Err(OrderError::PaymentLocked {
                status: self.payment_status,
            });
        }
        let totals = Totals::compute(&items, discount, self.tax_rate_bps)
            .ok_or(OrderError::AmountOverflow)?;
        if discount > totals.subtotal {
            return Err(OrderError::DiscountExceedsSubtotal {
                discount,
                subtotal: totals.subtotal,
            });
        }
        let estimated_completion_time = estimate_completion(self.created_at, &items);

        Ok(OrderEvent::OrderItemsChanged(OrderItemsChangedData {
            order_id: self.id,
            change,
            items,
            totals,
            estimated_completion_time,
        }))
    }

    fn payment_event(
        &self,
        to: PaymentStatus,
        payment_method: Option<PaymentMethod>,
        checkout: Option<Checkout>,
    ) -> OrderEvent {
        OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            order_id: self.id,
            from: self.payment_status,
            to,
            payment_method,
            checkout,
            amount: self.totals.total,
        })
    }
}

/// Creation time plus the longest line preparation (minutes × quantity).
fn estimate_completion(created_at: DateTime<Utc>, items: &[OrderItem]) -> DateTime<Utc> {
    let minutes = items
        .iter()
        .map(OrderItem::preparation_total_minutes)
        .max()
        .unwrap_or(0);
    created_at + Duration::minutes(i64::from(minutes))
}
