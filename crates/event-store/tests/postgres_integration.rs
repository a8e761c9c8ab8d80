//! PostgreSQL journal integration tests
//!
//! These tests share one PostgreSQL container and are serialized because every
//! test truncates the journal table. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{
    EventEnvelope, EventQuery, EventStore, EventStoreError, EventStoreExt, PostgresEventStore,
    RestaurantId, Sequence,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_restaurant_events.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an empty journal
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE restaurant_events")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn create_test_event(
    restaurant_id: RestaurantId,
    sequence: u64,
    event_type: &str,
    aggregate_id: &str,
) -> EventEnvelope {
    EventEnvelope::builder()
        .restaurant_id(restaurant_id)
        .sequence(Sequence::new(sequence))
        .event_type(event_type)
        .aggregate("order", aggregate_id)
        .payload_raw(serde_json::json!({"order_id": aggregate_id}))
        .metadata("user_id", serde_json::json!("waiter-1"))
        .try_build()
        .unwrap()
}

#[tokio::test]
#[serial]
async fn append_and_query_events() {
    let store = get_test_store().await;
    let restaurant = RestaurantId::new();

    store
        .append(vec![
            create_test_event(restaurant, 1, "order_created", "o1"),
            create_test_event(restaurant, 2, "order_status_changed", "o1"),
        ])
        .await
        .unwrap();

    let events = store
        .query(EventQuery::for_restaurant(restaurant))
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "order_created");
    assert_eq!(events[1].sequence, Sequence::new(2));
    assert_eq!(
        events[0].metadata.get("user_id"),
        Some(&serde_json::json!("waiter-1"))
    );
    assert_eq!(events[0].payload, serde_json::json!({"order_id": "o1"}));
}

#[tokio::test]
#[serial]
async fn latest_sequence_tracks_each_restaurant() {
    let store = get_test_store().await;
    let a = RestaurantId::new();
    let b = RestaurantId::new();

    assert_eq!(store.latest_sequence(a).await.unwrap(), Sequence::initial());

    store
        .append(vec![
            create_test_event(a, 1, "order_created", "o1"),
            create_test_event(a, 2, "kot_created", "o1"),
            create_test_event(b, 1, "order_created", "o2"),
        ])
        .await
        .unwrap();

    assert_eq!(store.latest_sequence(a).await.unwrap(), Sequence::new(2));
    assert_eq!(store.latest_sequence(b).await.unwrap(), Sequence::new(1));
}

#[tokio::test]
#[serial]
async fn gap_in_sequence_is_rejected() {
    let store = get_test_store().await;
    let restaurant = RestaurantId::new();

    store
        .append_event(create_test_event(restaurant, 1, "order_created", "o1"))
        .await
        .unwrap();

    let result = store
        .append_event(create_test_event(restaurant, 3, "kot_created", "o1"))
        .await;
    assert!(matches!(
        result,
        Err(EventStoreError::SequenceConflict { .. })
    ));
    assert_eq!(
        store.latest_sequence(restaurant).await.unwrap(),
        Sequence::new(1)
    );
}

#[tokio::test]
#[serial]
async fn failed_batch_is_not_partially_written() {
    let store = get_test_store().await;
    let restaurant = RestaurantId::new();

    let result = store
        .append(vec![
            create_test_event(restaurant, 1, "order_created", "o1"),
            create_test_event(restaurant, 1, "order_created", "o2"),
        ])
        .await;
    assert!(result.is_err());

    let events = store
        .query(EventQuery::for_restaurant(restaurant))
        .await
        .unwrap();
    assert!(events.is_empty());

    // The failed batch left the journal writable from the same head
    store
        .append(vec![create_test_event(restaurant, 1, "order_created", "o1")])
        .await
        .unwrap();
    store.append(vec![]).await.unwrap();
    assert_eq!(
        store.latest_sequence(restaurant).await.unwrap(),
        Sequence::new(1)
    );
}

#[tokio::test]
#[serial]
async fn query_with_filters_and_limit() {
    let store = get_test_store().await;
    let restaurant = RestaurantId::new();

    store
        .append(vec![
            create_test_event(restaurant, 1, "order_created", "o1"),
            create_test_event(restaurant, 2, "kot_created", "o1"),
            create_test_event(restaurant, 3, "order_created", "o2"),
            create_test_event(restaurant, 4, "payment_status_changed", "o1"),
            create_test_event(restaurant, 5, "order_status_changed", "o2"),
        ])
        .await
        .unwrap();

    let after = store
        .events_after(restaurant, Sequence::new(3))
        .await
        .unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].sequence, Sequence::new(4));

    let created = store
        .query(
            EventQuery::for_restaurant(restaurant)
                .event_types(vec!["order_created".into(), "kot_created".into()]),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 3);

    let limited = store
        .query(
            EventQuery::for_restaurant(restaurant)
                .aggregate_id("o1")
                .after(Sequence::new(1))
                .limit(1),
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].event_type, "kot_created");
}

#[tokio::test]
#[serial]
async fn other_restaurants_are_invisible() {
    let store = get_test_store().await;
    let a = RestaurantId::new();
    let b = RestaurantId::new();

    store
        .append_event(create_test_event(a, 1, "order_created", "o1"))
        .await
        .unwrap();

    let events = store.query(EventQuery::for_restaurant(b)).await.unwrap();
    assert!(events.is_empty());
}
