//! Stock ledger: atomic, idempotent multi-item deduction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use common::{OrderId, RestaurantId, Sku};
use domain::{StockEvent, StockItem};
use tokio::sync::Mutex;

use crate::error::{EngineError, Result};

type StockKey = (RestaurantId, Sku);

/// Holds every stock item, each behind its own lock.
#[derive(Default)]
pub struct StockLedger {
    items: RwLock<HashMap<StockKey, Arc<Mutex<StockItem>>>>,
    deducted: std::sync::Mutex<HashSet<OrderId>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new stock item. Emits `StockAdjusted` for its opening stock.
    pub fn add_item(&self, item: StockItem) -> Result<StockEvent> {
        if item.sku.as_str().trim().is_empty() {
            return Err(EngineError::ValidationFailed("sku must not be empty".into()));
        }
        let key = (item.restaurant_id, item.sku.clone());
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(&key) {
            return Err(EngineError::ValidationFailed(format!(
                "stock item {} already exists",
                item.sku
            )));
        }

        let event = StockEvent::StockAdjusted(domain::stock::StockAdjustedData {
            sku: item.sku.clone(),
            added: item.current_stock,
            current_stock: item.current_stock,
        });
        items.insert(key, Arc::new(Mutex::new(item)));
        Ok(event)
    }

    pub async fn get(&self, restaurant_id: RestaurantId, sku: &Sku) -> Option<StockItem> {
        let entry = self.entry(restaurant_id, sku)?;
        let item = entry.lock().await;
        Some(item.clone())
    }

    /// Every item of a restaurant, sorted by sku.
    pub async fn list(&self, restaurant_id: RestaurantId) -> Vec<StockItem> {
        let mut entries: Vec<(Sku, Arc<Mutex<StockItem>>)> = self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((restaurant, _), _)| *restaurant == restaurant_id)
            .map(|((_, sku), item)| (sku.clone(), item.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut items = Vec::with_capacity(entries.len());
        for (_, entry) in entries {
            items.push(entry.lock().await.clone());
        }
        items
    }

    /// Returns true once stock has been deducted for the order.
    pub fn is_deducted(&self, order_id: OrderId) -> bool {
        self.deducted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&order_id)
    }

    /// Deducts every requirement for an order, all or nothing.
    ///
    /// Requirements for the same sku are summed. Skus are locked in sorted
    /// order and every check passes before anything is written. A second
    /// call for the same order is a no-op. Returns the `StockLow` events
    /// caused by the deduction.
    #[tracing::instrument(skip(self, requirements), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn deduct_for_order(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        requirements: impl IntoIterator<Item = (Sku, u32)>,
    ) -> Result<Vec<StockEvent>> {
        if self.is_deducted(order_id) {
            tracing::debug!("stock already deducted");
            return Ok(Vec::new());
        }

        let mut totals: BTreeMap<Sku, u32> = BTreeMap::new();
        for (sku, quantity) in requirements {
            let total = totals.entry(sku).or_default();
            *total = total.saturating_add(quantity);
        }

        let mut entries = Vec::with_capacity(totals.len());
        for (sku, quantity) in totals {
            let Some(entry) = self.entry(restaurant_id, &sku) else {
                metrics::counter!("stock_insufficient_total").increment(1);
                return Err(EngineError::InsufficientStock {
                    sku,
                    requested: quantity,
                    available: 0,
                });
            };
            entries.push((entry, quantity));
        }

        let mut guards = Vec::with_capacity(entries.len());
        for (entry, quantity) in &entries {
            guards.push((entry.lock().await, *quantity));
        }

        for (item, quantity) in &guards {
            if let Err(e) = item.check_deduct(*quantity) {
                metrics::counter!("stock_insufficient_total").increment(1);
                tracing::info!(sku = %item.sku, requested = quantity, available = item.current_stock, "insufficient stock");
                return Err(e.into());
            }
        }

        let mut events = Vec::new();
        for (item, quantity) in &mut guards {
            if let Some(event) = item.deduct(*quantity)? {
                tracing::info!(sku = %item.sku, current_stock = item.current_stock, "stock low");
                events.push(event);
            }
        }

        self.deducted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order_id);
        Ok(events)
    }

    /// Adds stock to an existing item.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, sku = %sku))]
    pub async fn restock(
        &self,
        restaurant_id: RestaurantId,
        sku: &Sku,
        quantity: u32,
    ) -> Result<(StockItem, StockEvent)> {
        let entry = self
            .entry(restaurant_id, sku)
            .ok_or_else(|| EngineError::NotFound(format!("stock item {sku}")))?;
        let mut item = entry.lock().await;
        let event = item.restock(quantity)?;
        Ok((item.clone(), event))
    }

    fn entry(&self, restaurant_id: RestaurantId, sku: &Sku) -> Option<Arc<Mutex<StockItem>>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(restaurant_id, sku.clone()))
            .cloned()
    }
}
