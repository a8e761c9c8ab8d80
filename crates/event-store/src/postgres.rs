use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, EventQuery, EventStoreError, RestaurantId, Result, Sequence,
    store::{EventStore, check_contiguous},
};

const SELECT_COLUMNS: &str = "SELECT id, restaurant_id, sequence, event_type, aggregate_type, \
     aggregate_id, occurred_at, payload, metadata FROM restaurant_events";

/// PostgreSQL-backed journal.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL journal.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;
        let sequence: i64 = row.try_get("sequence")?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            sequence: Sequence::new(sequence.max(0) as u64),
            event_type: row.try_get("event_type")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    async fn insert_batch(&self, events: &[EventEnvelope]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let mut heads = HashMap::new();
        for event in events {
            if heads.contains_key(&event.restaurant_id) {
                continue;
            }
            let head: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(sequence) FROM restaurant_events WHERE restaurant_id = $1",
            )
            .bind(event.restaurant_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
            heads.insert(
                event.restaurant_id,
                Sequence::new(head.unwrap_or(0).max(0) as u64),
            );
        }
        check_contiguous(events, |restaurant_id| {
            heads
                .get(&restaurant_id)
                .copied()
                .unwrap_or(Sequence::initial())
        })?;

        for event in events {
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO restaurant_events
                    (id, restaurant_id, sequence, event_type, aggregate_type, aggregate_id, occurred_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(event.restaurant_id.as_uuid())
            .bind(event.sequence.as_i64())
            .bind(&event.event_type)
            .bind(&event.aggregate_type)
            .bind(&event.aggregate_id)
            .bind(event.occurred_at)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A concurrent writer took this slot between the head read and the insert.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_restaurant_sequence")
                {
                    return EventStoreError::SequenceConflict {
                        restaurant_id: event.restaurant_id,
                        expected: event.sequence.next(),
                        actual: event.sequence,
                    };
                }
                EventStoreError::Database(e)
            })?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: Vec<EventEnvelope>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let result = self.insert_batch(&events).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!("journal_append_duration_seconds", "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(()) => {
                metrics::counter!("journal_events_appended_total").increment(events.len() as u64);
                tracing::debug!(
                    last_sequence = events.last().map(|e| e.sequence.value()),
                    "events appended"
                );
            }
            Err(e) => tracing::debug!(error = %e, "append rolled back"),
        }
        result
    }


    #[tracing::instrument(skip(self, query), fields(restaurant_id = %query.restaurant_id))]
    async fn query(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE restaurant_id = $1");
        let mut param_count = 1;

        if query.after.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND sequence > ${param_count}"));
        }
        if query.event_types.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND event_type = ANY(${param_count})"));
        }
        if query.aggregate_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND aggregate_id = ${param_count}"));
        }

        sql.push_str(" ORDER BY sequence ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(query.restaurant_id.as_uuid());

        if let Some(after) = query.after {
            sqlx_query = sqlx_query.bind(after.as_i64());
        }
        if let Some(event_types) = query.event_types {
            sqlx_query = sqlx_query.bind(event_types);
        }
        if let Some(aggregate_id) = query.aggregate_id {
            sqlx_query = sqlx_query.bind(aggregate_id);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let started = Instant::now();
        let rows = sqlx_query.fetch_all(&self.pool).await?;
        metrics::histogram!("journal_query_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(rows = rows.len(), "journal queried");
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn latest_sequence(&self, restaurant_id: RestaurantId) -> Result<Sequence> {
        let head: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(sequence) FROM restaurant_events WHERE restaurant_id = $1",
        )
        .bind(restaurant_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Sequence::new(head.unwrap_or(0).max(0) as u64))
    }
}
