//! Integration tests for the restaurant aggregates.
//!
//! These tests drive an order, its kitchen ticket and its table through a
//! full service, and check that published events are enough to rebuild state.

use chrono::{Duration, Utc};
use common::{KotId, OrderId, RestaurantId, TableId, UserId};
use domain::{
    Aggregate, CustomerSnapshot, DomainEvent, EventKind, KitchenEvent, KitchenTicket, LineStatus,
    Money, NewOrder, Order, OrderError, OrderEvent, OrderItem, OrderStatus, OrderType,
    PartySizePolicy, PaymentStatus, PriorityPolicy, RestaurantEvent, Table, TableStatus,
};

fn burger(quantity: u32) -> OrderItem {
    OrderItem::new("burger", "Classic Burger", "grill", Money::from_cents(800), quantity)
        .with_category("mains")
        .with_preparation_minutes(12)
}

fn new_dine_in(restaurant_id: RestaurantId, table: &Table, items: Vec<OrderItem>) -> NewOrder {
    NewOrder {
        id: OrderId::new(),
        restaurant_id,
        order_number: "20250101-0001".into(),
        order_type: OrderType::DineIn,
        table_id: Some(table.id()),
        table_number: Some(table.number()),
        customer: CustomerSnapshot::default(),
        waiter_id: UserId::new("waiter-1"),
        items,
        notes: None,
        high_priority: false,
        payment_method: None,
        tax_rate_bps: 0,
    }
}

mod service_lifecycle {
    use super::*;

    #[test]
    fn burger_order_from_table_to_payment() {
        let restaurant_id = RestaurantId::new();
        let (mut table, _) = Table::create(TableId::new(), restaurant_id, 5, "T5", 4, None);
        let mut published: Vec<RestaurantEvent> = Vec::new();

        // Place and seat
        let (mut order, created) =
            Order::place(new_dine_in(restaurant_id, &table, vec![burger(2)]), Utc::now())
                .unwrap();
        let seated = table.occupy(order.id(), Utc::now()).unwrap();
        table.apply_events(&seated);
        published.push(created.into());
        published.extend(seated.into_iter().map(RestaurantEvent::from));

        assert_eq!(order.totals().total.cents(), 1600);
        assert_eq!(table.status(), TableStatus::Occupied);

        // Confirm and issue the ticket
        let events = order
            .advance(OrderStatus::Confirmed, false, Utc::now())
            .unwrap();
        order.apply_events(&events);
        let priority = PartySizePolicy::default().priority(&order);
        let (mut ticket, kot_created) =
            KitchenTicket::generate(KotId::new(), "K-20250101-0001", &order, priority, Utc::now());
        published.extend(events.into_iter().map(RestaurantEvent::from));
        published.push(kot_created.into());

        assert_eq!(ticket.lines().len(), 1);
        assert_eq!(ticket.lines()[0].quantity, 2);

        // Kitchen starts: order follows to preparing
        let events = ticket
            .update_line(0, LineStatus::Preparing, Utc::now())
            .unwrap();
        ticket.apply_events(&events);
        order.mirror_line_status(0, LineStatus::Preparing);
        let order_events = order
            .advance(OrderStatus::Preparing, ticket.is_complete(), Utc::now())
            .unwrap();
        order.apply_events(&order_events);

        // Kitchen finishes: order follows to ready
        let events = ticket.complete_all(Utc::now());
        ticket.apply_events(&events);
        assert!(matches!(events.last(), Some(KitchenEvent::KotCompleted(_))));
        let order_events = order
            .advance(OrderStatus::Ready, ticket.is_complete(), Utc::now())
            .unwrap();
        order.apply_events(&order_events);
        assert_eq!(order.status(), OrderStatus::Ready);

        // Served, then paid: completes and frees the table
        let events = order
            .advance(OrderStatus::Served, true, Utc::now())
            .unwrap();
        order.apply_events(&events);
        let events = order.settle_payment(Utc::now()).unwrap();
        order.apply_events(&events);
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);

        let freed = table.release(order.id(), Utc::now());
        table.apply_events(&freed);
        assert_eq!(table.status(), TableStatus::Available);

        let kinds: Vec<EventKind> = published.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::OrderCreated,
                EventKind::TableStatusChanged,
                EventKind::OrderStatusChanged,
                EventKind::KotCreated,
            ]
        );
    }

    #[test]
    fn ready_is_premature_until_the_ticket_completes() {
        let restaurant_id = RestaurantId::new();
        let (table, _) = Table::create(TableId::new(), restaurant_id, 1, "T1", 2, None);
        let (mut order, _) = Order::place(
            new_dine_in(restaurant_id, &table, vec![burger(1), burger(1)]),
            Utc::now(),
        )
        .unwrap();

        for step in [OrderStatus::Confirmed, OrderStatus::Preparing] {
            let events = order.advance(step, false, Utc::now()).unwrap();
            order.apply_events(&events);
        }

        let (mut ticket, _) = KitchenTicket::generate(
            KotId::new(),
            "K-1",
            &order,
            domain::Priority::Normal,
            Utc::now(),
        );
        let events = ticket.update_line(0, LineStatus::Preparing, Utc::now()).unwrap();
        ticket.apply_events(&events);
        let events = ticket.update_line(0, LineStatus::Ready, Utc::now()).unwrap();
        ticket.apply_events(&events);

        assert!(matches!(
            order.advance(OrderStatus::Ready, ticket.is_complete(), Utc::now()),
            Err(OrderError::PrematureTransition { .. })
        ));
    }
}

mod event_replay {
    use super::*;

    #[test]
    fn order_rebuilds_from_published_json() {
        let restaurant_id = RestaurantId::new();
        let (table, _) = Table::create(TableId::new(), restaurant_id, 3, "T3", 4, None);
        let (mut order, created) =
            Order::place(new_dine_in(restaurant_id, &table, vec![burger(1)]), Utc::now())
                .unwrap();

        let mut events = vec![created];
        let steps: Vec<Box<dyn Fn(&Order) -> Vec<OrderEvent>>> = vec![
            Box::new(|o| o.add_item(burger(2)).unwrap()),
            Box::new(|o| o.update_item_quantity(0, 3).unwrap()),
            Box::new(|o| o.apply_discount(Money::from_cents(200)).unwrap()),
            Box::new(|o| o.advance(OrderStatus::Confirmed, false, Utc::now()).unwrap()),
            Box::new(|o| o.cancel(Some("kitchen closed".into()), Utc::now()).unwrap()),
        ];
        for step in steps {
            let produced = step(&order);
            order.apply_events(&produced);
            events.extend(produced);
        }

        let json: Vec<serde_json::Value> = events
            .iter()
            .map(|e| serde_json::to_value(RestaurantEvent::from(e.clone())).unwrap())
            .collect();

        let mut replayed: Option<Order> = None;
        for value in json {
            let RestaurantEvent::Order(event) = serde_json::from_value(value).unwrap() else {
                panic!("expected an order event");
            };
            match replayed.as_mut() {
                Some(order) => order.apply(&event),
                None => {
                    let OrderEvent::OrderCreated(data) = event else {
                        panic!("first event must create the order");
                    };
                    replayed = Some(data.order);
                }
            }
        }

        let replayed = replayed.unwrap();
        assert_eq!(replayed, order);
        assert_eq!(replayed.status(), OrderStatus::Cancelled);
        assert_eq!(replayed.totals().subtotal.cents(), 4000);
        assert_eq!(replayed.totals().total.cents(), 3800);
    }

    #[test]
    fn ticket_rebuilds_from_its_events() {
        let restaurant_id = RestaurantId::new();
        let (table, _) = Table::create(TableId::new(), restaurant_id, 3, "T3", 4, None);
        let (order, _) =
            Order::place(new_dine_in(restaurant_id, &table, vec![burger(2)]), Utc::now())
                .unwrap();

        let now = Utc::now();
        let (mut ticket, created) =
            KitchenTicket::generate(KotId::new(), "K-9", &order, domain::Priority::Normal, now);
        let mut events = vec![created];
        let done = ticket.complete_all(now + Duration::minutes(3));
        ticket.apply_events(&done);
        events.extend(done);

        let mut replayed = match &events[0] {
            KitchenEvent::KotCreated(data) => data.ticket.clone(),
            _ => unreachable!(),
        };
        replayed.apply_events(&events[1..]);

        assert_eq!(replayed, ticket);
        assert!(replayed.is_complete());
        assert_eq!(replayed.start_time(), Some(now + Duration::minutes(3)));
        assert_eq!(events.last().map(|e| e.kind()), Some(EventKind::KotCompleted));
    }
}
