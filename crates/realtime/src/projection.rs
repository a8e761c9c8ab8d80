//! What a subscriber may hold of the restaurant state.
//!
//! A client folds its snapshot and its deliveries into one view, so both
//! must be cut the same way. [`Projection`] derives that cut from the
//! routing matrix: a collection is kept only when the events that create
//! and change it reach the role, and order fields maintained by events the
//! role never receives are reset to their initial values.

use common::{OrderId, Role};
use domain::{EventKind, LineStatus, Order, OrderEvent, RestaurantEvent, SequencedEvent};
use engine::Snapshot;

use crate::routing::routes_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    role: Role,
    order_filter: Option<OrderId>,
}

impl Projection {
    pub fn new(role: Role, order_filter: Option<OrderId>) -> Self {
        Self { role, order_filter }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn order_filter(&self) -> Option<OrderId> {
        self.order_filter
    }

    /// Whether the event belongs in this subscriber's stream.
    ///
    /// Table events are never sent under an order filter: the filtered
    /// snapshot holds no tables to apply them to.
    pub fn admits(&self, event: &SequencedEvent) -> bool {
        if !routes_to(event.kind(), self.role) {
            return false;
        }
        match self.order_filter {
            None => true,
            Some(order_id) => {
                !matches!(event.event, RestaurantEvent::Table(_))
                    && event.event.order_id() == Some(order_id)
            }
        }
    }

    /// Cuts a full snapshot down to what the stream keeps current.
    pub fn snapshot(&self, snapshot: Snapshot) -> Snapshot {
        let mut snapshot = match self.order_filter {
            Some(order_id) => snapshot.restricted_to(order_id),
            None => snapshot,
        };
        if !self.holds_orders() {
            snapshot.orders.clear();
        }
        if !self.holds_tickets() {
            snapshot.kots.clear();
        }
        if !self.holds_tables() {
            snapshot.tables.clear();
        }
        for order in &mut snapshot.orders {
            self.redact(order);
        }
        snapshot
    }

    /// The copy of an admitted event this subscriber receives.
    pub fn event(&self, event: &SequencedEvent) -> SequencedEvent {
        let mut event = event.clone();
        match &mut event.event {
            RestaurantEvent::Order(OrderEvent::OrderCreated(data)) => self.redact(&mut data.order),
            RestaurantEvent::Order(OrderEvent::OrderItemsChanged(data))
                if !self.sees(EventKind::KotLineStatusChanged) =>
            {
                for item in &mut data.items {
                    item.status = LineStatus::Pending;
                }
            }
            _ => {}
        }
        event
    }

    fn redact(&self, order: &mut Order) {
        if !self.sees(EventKind::KotLineStatusChanged) {
            order.forget_line_progress();
        }
        if !self.sees(EventKind::PaymentStatusChanged) {
            order.forget_payment();
        }
    }

    fn holds_orders(&self) -> bool {
        self.sees(EventKind::OrderCreated) && self.sees(EventKind::OrderItemsChanged)
    }

    fn holds_tickets(&self) -> bool {
        self.sees(EventKind::KotCreated)
    }

    fn holds_tables(&self) -> bool {
        self.order_filter.is_none() && self.sees(EventKind::TableStatusChanged)
    }

    fn sees(&self, kind: EventKind) -> bool {
        routes_to(kind, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{RestaurantId, TableId, UserId};
    use domain::order::OrderCreatedData;
    use domain::{
        Aggregate, CustomerSnapshot, Money, NewOrder, OrderItem, OrderType, PaymentMethod,
        PaymentStatus, Table,
    };

    fn order(restaurant_id: RestaurantId) -> Order {
        let (mut order, _) = Order::place(
            NewOrder {
                id: OrderId::new(),
                restaurant_id,
                order_number: "20250101-0001".into(),
                order_type: OrderType::Takeaway,
                table_id: None,
                table_number: None,
                customer: CustomerSnapshot::default(),
                waiter_id: UserId::new("waiter-1"),
                items: vec![OrderItem::new(
                    "burger",
                    "Burger",
                    "grill",
                    Money::from_cents(800),
                    1,
                )],
                notes: None,
                high_priority: false,
                payment_method: Some(PaymentMethod::Cash),
                tax_rate_bps: 0,
            },
            Utc::now(),
        )
        .unwrap();
        order.mirror_line_status(0, LineStatus::Preparing);
        order
    }

    fn snapshot() -> Snapshot {
        let restaurant_id = RestaurantId::new();
        let (table, _) = Table::create(TableId::new(), restaurant_id, 1, "Window", 2, None);
        Snapshot {
            restaurant_id,
            as_of_sequence: 7,
            orders: vec![order(restaurant_id)],
            kots: vec![],
            tables: vec![table],
        }
    }

    #[test]
    fn test_management_sees_everything() {
        let full = snapshot();
        for role in [Role::Manager, Role::Admin] {
            assert_eq!(Projection::new(role, None).snapshot(full.clone()), full);
        }
    }

    #[test]
    fn test_kitchen_holds_no_orders_or_tables() {
        let cut = Projection::new(Role::KitchenStaff, None).snapshot(snapshot());
        assert!(cut.orders.is_empty());
        assert!(cut.tables.is_empty());
        assert_eq!(cut.as_of_sequence, 7);
    }

    #[test]
    fn test_front_of_house_orders_are_redacted() {
        let waiter = Projection::new(Role::Waiter, None).snapshot(snapshot());
        assert_eq!(waiter.tables.len(), 1);
        let order = &waiter.orders[0];
        assert_eq!(order.items()[0].status, LineStatus::Pending);
        assert_eq!(order.payment_method(), None);

        let cashier = Projection::new(Role::Cashier, None).snapshot(snapshot());
        assert!(cashier.tables.is_empty());
        let order = &cashier.orders[0];
        assert_eq!(order.items()[0].status, LineStatus::Pending);
        assert_eq!(order.payment_method(), Some(PaymentMethod::Cash));
        assert_eq!(order.payment_status(), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_customer_keeps_only_their_order() {
        let full = snapshot();
        let mine = full.orders[0].id();

        let cut = Projection::new(Role::Customer, Some(mine)).snapshot(full.clone());
        assert_eq!(cut.orders.len(), 1);
        assert!(cut.tables.is_empty());

        let cut = Projection::new(Role::Customer, Some(OrderId::new())).snapshot(full);
        assert!(cut.orders.is_empty());
    }

    #[test]
    fn test_created_order_is_redacted_like_the_snapshot() {
        let full = snapshot();
        let placed = full.orders[0].clone();
        let event = SequencedEvent {
            restaurant_id: full.restaurant_id,
            sequence: 8,
            occurred_at: Utc::now(),
            event: OrderEvent::OrderCreated(OrderCreatedData { order: placed }).into(),
        };

        let waiter = Projection::new(Role::Waiter, None);
        let RestaurantEvent::Order(OrderEvent::OrderCreated(data)) = waiter.event(&event).event
        else {
            panic!("event kind changed");
        };
        assert_eq!(&data.order, &waiter.snapshot(full).orders[0]);
    }

    #[test]
    fn test_filtered_subscribers_get_no_table_events() {
        let restaurant_id = RestaurantId::new();
        let order_id = OrderId::new();
        let (mut table, _) = Table::create(TableId::new(), restaurant_id, 3, "Bar", 2, None);
        let seated = table.occupy(order_id, Utc::now()).unwrap();
        table.apply_events(&seated);
        let event = SequencedEvent {
            restaurant_id,
            sequence: 1,
            occurred_at: Utc::now(),
            event: seated[0].clone().into(),
        };

        assert!(Projection::new(Role::Waiter, None).admits(&event));
        assert!(!Projection::new(Role::Waiter, Some(order_id)).admits(&event));
        assert!(!Projection::new(Role::Manager, Some(order_id)).admits(&event));
    }
}
