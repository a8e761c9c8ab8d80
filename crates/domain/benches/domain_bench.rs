use chrono::Utc;
use common::{KotId, OrderId, RestaurantId, TableId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, CustomerSnapshot, KitchenTicket, LineStatus, Money, NewOrder, Order, OrderEvent,
    OrderItem, OrderStatus, OrderType, Priority, Totals,
};

fn menu_items(count: u32) -> Vec<OrderItem> {
    (0..count)
        .map(|i| {
            OrderItem::new(
                format!("item-{i:03}"),
                format!("Dish {i}"),
                if i % 2 == 0 { "grill" } else { "cold" },
                Money::from_cents(500 + i64::from(i) * 25),
                1 + i % 3,
            )
            .with_preparation_minutes(5 + i % 10)
        })
        .collect()
}

fn new_order(items: Vec<OrderItem>) -> NewOrder {
    NewOrder {
        id: OrderId::new(),
        restaurant_id: RestaurantId::new(),
        order_number: "20250101-0001".into(),
        order_type: OrderType::DineIn,
        table_id: Some(TableId::new()),
        table_number: Some(12),
        customer: CustomerSnapshot::default(),
        waiter_id: UserId::new("bench"),
        items,
        notes: None,
        high_priority: false,
        payment_method: None,
        tax_rate_bps: 825,
    }
}

fn bench_place_order(c: &mut Criterion) {
    let items = menu_items(10);

    c.bench_function("domain/place_order_10_lines", |b| {
        b.iter(|| Order::place(new_order(items.clone()), Utc::now()).unwrap());
    });
}

fn bench_recompute_totals(c: &mut Criterion) {
    let items = menu_items(50);

    c.bench_function("domain/recompute_totals_50_lines", |b| {
        b.iter(|| Totals::compute(&items, Money::from_cents(300), 825));
    });
}

fn bench_kitchen_cycle(c: &mut Criterion) {
    let (order, _) = Order::place(new_order(menu_items(10)), Utc::now()).unwrap();

    c.bench_function("domain/generate_and_complete_ticket", |b| {
        b.iter(|| {
            let (mut ticket, _) = KitchenTicket::generate(
                KotId::new(),
                "K-20250101-0001",
                &order,
                Priority::Normal,
                Utc::now(),
            );
            let first = ticket.lines()[0].line_index;
            let events = ticket
                .update_line(first, LineStatus::Preparing, Utc::now())
                .unwrap();
            ticket.apply_events(&events);
            let events = ticket.complete_all(Utc::now());
            ticket.apply_events(&events);
            assert!(ticket.is_complete());
        });
    });
}

fn bench_replay_events(c: &mut Criterion) {
    // One creation plus 50 item changes, replayed from their JSON form
    let (mut order, created) = Order::place(new_order(menu_items(1)), Utc::now()).unwrap();
    let mut events = vec![created];
    for item in menu_items(50) {
        let added = order.add_item(item).unwrap();
        order.apply_events(&added);
        events.extend(added);
    }
    let advanced = order
        .advance(OrderStatus::Confirmed, false, Utc::now())
        .unwrap();
    events.extend(advanced);

    let payloads: Vec<serde_json::Value> = events
        .iter()
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();

    c.bench_function("domain/replay_52_events", |b| {
        b.iter(|| {
            let mut replayed: Option<Order> = None;
            for payload in &payloads {
                let event: OrderEvent = serde_json::from_value(payload.clone()).unwrap();
                match (&mut replayed, &event) {
                    (None, OrderEvent::OrderCreated(data)) => replayed = Some(data.order.clone()),
                    (Some(order), event) => order.apply(event),
                    _ => {}
                }
            }
            assert_eq!(
                replayed.map(|o| o.status()),
                Some(OrderStatus::Confirmed)
            );
        });
    });
}

criterion_group!(
    benches,
    bench_place_order,
    bench_recompute_totals,
    bench_kitchen_cycle,
    bench_replay_events,
);
criterion_main!(benches);
