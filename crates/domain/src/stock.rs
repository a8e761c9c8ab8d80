//! Stock items and their ledger events.

use common::{RestaurantId, Sku};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DomainEvent, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    Insufficient {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    #[error("Invalid stock quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },
}

/// An ingredient or product tracked in the ledger.
///
/// `current_stock` never goes negative: deductions that would are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub sku: Sku,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub unit: String,
    pub current_stock: u32,
    pub minimum_stock: u32,
    pub reorder_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StockEvent {
    /// A deduction took the item below its reorder level.
    StockLow(StockLowData),

    /// Stock was added by hand or the item was registered.
    StockAdjusted(StockAdjustedData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLowData {
    pub sku: Sku,
    pub name: String,
    pub current_stock: u32,
    pub reorder_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAdjustedData {
    pub sku: Sku,
    pub added: u32,
    pub current_stock: u32,
}

impl StockEvent {
    pub fn sku(&self) -> &Sku {
        match self {
            StockEvent::StockLow(data) => &data.sku,
            StockEvent::StockAdjusted(data) => &data.sku,
        }
    }
}

impl DomainEvent for StockEvent {
    fn kind(&self) -> EventKind {
        match self {
            StockEvent::StockLow(_) => EventKind::StockLow,
            StockEvent::StockAdjusted(_) => EventKind::StockAdjusted,
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "stock"
    }

    fn aggregate_id(&self) -> String {
        self.sku().to_string()
    }
}

impl StockItem {
    /// Checks that `quantity` can be deducted without going negative.
    pub fn check_deduct(&self, quantity: u32) -> Result<(), StockError> {
        if quantity > self.current_stock {
            return Err(StockError::Insufficient {
                sku: self.sku.clone(),
                requested: quantity,
                available: self.current_stock,
            });
        }
        Ok(())
    }

    /// Deducts `quantity`, returning `StockLow` when this crosses the reorder level.
    pub fn deduct(&mut self, quantity: u32) -> Result<Option<StockEvent>, StockError> {
        self.check_deduct(quantity)?;

        let before = self.current_stock;
        self.current_stock -= quantity;

        if before >= self.reorder_level && self.current_stock < self.reorder_level {
            return Ok(Some(StockEvent::StockLow(StockLowData {
                sku: self.sku.clone(),
                name: self.name.clone(),
                current_stock: self.current_stock,
                reorder_level: self.reorder_level,
            })));
        }
        Ok(None)
    }

    /// Adds `quantity` to the stock.
    pub fn restock(&mut self, quantity: u32) -> Result<StockEvent, StockError> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity { quantity });
        }
        self.current_stock = self.current_stock.saturating_add(quantity);
        Ok(StockEvent::StockAdjusted(StockAdjustedData {
            sku: self.sku.clone(),
            added: quantity,
            current_stock: self.current_stock,
        }))
    }

    /// Returns true if the item is below its reorder level.
    pub fn is_low(&self) -> bool {
        self.current_stock < self.reorder_level
    }
}
