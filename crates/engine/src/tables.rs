//! Table registry: table status and order linkage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use common::{OrderId, RestaurantId, TableId};
use domain::{Aggregate, Reservation, Table, TableEvent, TableStatus};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{EngineError, Result};

/// Input for creating a table.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTable {
    pub number: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub capacity: u32,
    #[serde(default)]
    pub location: Option<String>,
}

/// Table events together with the lock they were computed under.
///
/// The table stays locked until this is dropped. Publish the events first,
/// so the stream carries table changes in the order they happened.
pub struct TableChange {
    guard: Option<OwnedMutexGuard<Table>>,
    events: Vec<TableEvent>,
}

impl TableChange {
    pub(crate) fn none() -> Self {
        Self {
            guard: None,
            events: Vec::new(),
        }
    }

    fn locked(guard: OwnedMutexGuard<Table>, events: Vec<TableEvent>) -> Self {
        Self {
            guard: Some(guard),
            events,
        }
    }

    pub fn events(&self) -> &[TableEvent] {
        &self.events
    }

    /// The table after the change.
    pub fn table(&self) -> Option<&Table> {
        self.guard.as_deref()
    }
}

/// Every table, each behind its own lock.
#[derive(Default)]
pub struct TableRegistry {
    tables: RwLock<HashMap<TableId, Arc<Mutex<Table>>>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table. Numbers are unique within a restaurant.
    pub async fn create(
        &self,
        restaurant_id: RestaurantId,
        new: NewTable,
    ) -> Result<(Table, TableChange)> {
        if new.capacity == 0 {
            return Err(EngineError::ValidationFailed(
                "table capacity must be at least 1".into(),
            ));
        }
        if self
            .list(restaurant_id)
            .await
            .iter()
            .any(|table| table.number() == new.number)
        {
            return Err(EngineError::ValidationFailed(format!(
                "table number {} already exists",
                new.number
            )));
        }

        let name = new
            .name
            .unwrap_or_else(|| format!("Table {}", new.number));
        let (table, event) = Table::create(
            TableId::new(),
            restaurant_id,
            new.number,
            name,
            new.capacity,
            new.location,
        );
        let entry = Arc::new(Mutex::new(table.clone()));
        let guard = Arc::clone(&entry).lock_owned().await;
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.id(), entry);
        Ok((table, TableChange::locked(guard, vec![event])))
    }

    pub async fn get(&self, restaurant_id: RestaurantId, table_id: TableId) -> Result<Table> {
        let entry = self.entry(restaurant_id, table_id).await?;
        let table = entry.lock().await;
        Ok(table.clone())
    }

    /// Every table of a restaurant, sorted by number.
    pub async fn list(&self, restaurant_id: RestaurantId) -> Vec<Table> {
        let entries: Vec<Arc<Mutex<Table>>> = self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut tables = Vec::new();
        for entry in entries {
            let table = entry.lock().await;
            if table.restaurant_id() == restaurant_id {
                tables.push(table.clone());
            }
        }
        tables.sort_by_key(Table::number);
        tables
    }

    /// Links an available table to an order and marks it occupied.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, table_id = %table_id, order_id = %order_id))]
    pub async fn occupy(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
        order_id: OrderId,
    ) -> Result<TableChange> {
        let entry = self.entry(restaurant_id, table_id).await?;
        let mut table = entry.lock_owned().await;
        let events = table.occupy(order_id, Utc::now())?;
        table.apply_events(&events);
        Ok(TableChange::locked(table, events))
    }

    /// Frees the table if it is still linked to the order.
    #[tracing::instrument(skip(self), fields(table_id = %table_id, order_id = %order_id))]
    pub async fn release(&self, table_id: TableId, order_id: OrderId) -> TableChange {
        let Some(entry) = self.raw_entry(table_id) else {
            return TableChange::none();
        };
        let mut table = entry.lock_owned().await;
        let events = table.release(order_id, Utc::now());
        table.apply_events(&events);
        TableChange::locked(table, events)
    }

    /// Manual status change (cleaning, out of order, ...). Never occupies.
    pub async fn set_status(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
        status: TableStatus,
    ) -> Result<TableChange> {
        let entry = self.entry(restaurant_id, table_id).await?;
        let mut table = entry.lock_owned().await;
        let events = table.set_status(status, Utc::now())?;
        table.apply_events(&events);
        Ok(TableChange::locked(table, events))
    }

    pub async fn add_reservation(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
        reservation: Reservation,
    ) -> Result<TableChange> {
        let entry = self.entry(restaurant_id, table_id).await?;
        let mut table = entry.lock_owned().await;
        let events = table.add_reservation(reservation, Utc::now())?;
        table.apply_events(&events);
        Ok(TableChange::locked(table, events))
    }

    fn raw_entry(&self, table_id: TableId) -> Option<Arc<Mutex<Table>>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table_id)
            .cloned()
    }

    async fn entry(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
    ) -> Result<Arc<Mutex<Table>>> {
        let entry = self
            .raw_entry(table_id)
            .ok_or_else(|| EngineError::table_not_found(table_id))?;
        if entry.lock().await.restaurant_id() != restaurant_id {
            return Err(EngineError::table_not_found(table_id));
        }
        Ok(entry)
    }
}
