//! The engine facade: shared components plus table and stock management.

use std::sync::Arc;

use common::{OrderId, RestaurantId, Sku, TableId};
use domain::{
    Order, PartySizePolicy, PriorityPolicy, Reservation, RestaurantEvent, SequencedEvent,
    StockItem, Table, TableStatus,
};
use event_store::EventStore;

use crate::bus::{EventBus, EventSink};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::kitchen::KotGenerator;
use crate::repository::OrderRepository;
use crate::services::{MenuCatalog, PaymentGateway};
use crate::stock::StockLedger;
use crate::tables::{NewTable, TableChange, TableRegistry};

/// Authoritative owner of orders, tickets, tables and stock.
///
/// Lock order is always order slot, then table or stock item, then the
/// restaurant's bus stream. External payment calls never run under an order
/// lock.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) orders: OrderRepository,
    pub(crate) tables: TableRegistry,
    pub(crate) stock: StockLedger,
    pub(crate) bus: EventBus,
    pub(crate) menu: Arc<dyn MenuCatalog>,
    pub(crate) payments: Arc<dyn PaymentGateway>,
    pub(crate) kot: KotGenerator,
}

impl Engine {
    /// Creates an engine. Tickets are prioritized by party size until
    /// [`Engine::with_priority_policy`] says otherwise.
    pub fn new(
        config: EngineConfig,
        journal: Arc<dyn EventStore>,
        menu: Arc<dyn MenuCatalog>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let policy = Arc::new(PartySizePolicy::new(config.large_party_size));
        Self {
            config,
            orders: OrderRepository::new(),
            tables: TableRegistry::new(),
            stock: StockLedger::new(),
            bus: EventBus::new(journal),
            menu,
            payments,
            kot: KotGenerator::new(policy),
        }
    }

    pub fn with_priority_policy(mut self, policy: Arc<dyn PriorityPolicy>) -> Self {
        self.kot = KotGenerator::new(policy);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn journal(&self) -> &Arc<dyn EventStore> {
        self.bus.journal()
    }

    /// Registers a sink that receives every future event.
    pub fn register_sink(&self, sink: Arc<dyn EventSink>) {
        self.bus.register(sink);
    }

    /// Latest published sequence of a restaurant.
    pub async fn current_sequence(&self, restaurant_id: RestaurantId) -> u64 {
        self.bus.current_sequence(restaurant_id).await
    }

    pub(crate) async fn publish(
        &self,
        restaurant_id: RestaurantId,
        events: impl IntoIterator<Item = impl Into<RestaurantEvent>>,
    ) -> Vec<SequencedEvent> {
        let events: Vec<RestaurantEvent> = events.into_iter().map(Into::into).collect();
        self.bus.publish(restaurant_id, events).await
    }

    /// Frees the order's table, if it still holds it.
    ///
    /// The returned change keeps the table locked; publish before dropping it.
    pub(crate) async fn release_table(&self, order: &Order) -> TableChange {
        match order.table_id() {
            Some(table_id) => self.tables.release(table_id, order.id()).await,
            None => TableChange::none(),
        }
    }
}

// Table management
impl Engine {
    #[tracing::instrument(skip(self, new), fields(restaurant_id = %restaurant_id, number = new.number))]
    pub async fn create_table(&self, restaurant_id: RestaurantId, new: NewTable) -> Result<Table> {
        let (table, created) = self.tables.create(restaurant_id, new).await?;
        self.publish(restaurant_id, created.events().iter().cloned())
            .await;
        tracing::info!(table_id = %table.id(), "table created");
        Ok(table)
    }

    pub async fn get_table(&self, restaurant_id: RestaurantId, table_id: TableId) -> Result<Table> {
        self.tables.get(restaurant_id, table_id).await
    }

    pub async fn list_tables(&self, restaurant_id: RestaurantId) -> Vec<Table> {
        self.tables.list(restaurant_id).await
    }

    /// Manual status change. Occupancy only ever follows orders.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, table_id = %table_id))]
    pub async fn set_table_status(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
        status: TableStatus,
    ) -> Result<Table> {
        let change = self.tables.set_status(restaurant_id, table_id, status).await?;
        self.publish_table_change(restaurant_id, change, table_id).await
    }

    #[tracing::instrument(skip(self, reservation), fields(restaurant_id = %restaurant_id, table_id = %table_id))]
    pub async fn add_reservation(
        &self,
        restaurant_id: RestaurantId,
        table_id: TableId,
        reservation: Reservation,
    ) -> Result<Table> {
        let change = self
            .tables
            .add_reservation(restaurant_id, table_id, reservation)
            .await?;
        self.publish_table_change(restaurant_id, change, table_id).await
    }

    /// Publishes a direct table change, then unlocks the table.
    async fn publish_table_change(
        &self,
        restaurant_id: RestaurantId,
        change: TableChange,
        table_id: TableId,
    ) -> Result<Table> {
        self.publish(restaurant_id, change.events().iter().cloned())
            .await;
        change
            .table()
            .cloned()
            .ok_or_else(|| EngineError::table_not_found(table_id))
    }
}

// Stock management
impl Engine {
    /// Registers a stock item for the restaurant.
    #[tracing::instrument(skip(self, item), fields(restaurant_id = %restaurant_id, sku = %item.sku))]
    pub async fn add_stock_item(
        &self,
        restaurant_id: RestaurantId,
        mut item: StockItem,
    ) -> Result<StockItem> {
        item.restaurant_id = restaurant_id;
        let event = self.stock.add_item(item.clone())?;
        self.publish(restaurant_id, [event]).await;
        Ok(item)
    }

    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, sku = %sku))]
    pub async fn restock(
        &self,
        restaurant_id: RestaurantId,
        sku: &Sku,
        quantity: u32,
    ) -> Result<StockItem> {
        let (item, event) = self.stock.restock(restaurant_id, sku, quantity).await?;
        self.publish(restaurant_id, [event]).await;
        tracing::info!(current_stock = item.current_stock, "stock replenished");
        Ok(item)
    }

    pub async fn get_stock_item(&self, restaurant_id: RestaurantId, sku: &Sku) -> Option<StockItem> {
        self.stock.get(restaurant_id, sku).await
    }

    pub async fn list_stock(&self, restaurant_id: RestaurantId) -> Vec<StockItem> {
        self.stock.list(restaurant_id).await
    }

    /// Returns true once stock has been deducted for the order.
    pub fn stock_deducted_for(&self, order_id: OrderId) -> bool {
        self.stock.is_deducted(order_id)
    }
}
