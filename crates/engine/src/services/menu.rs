//! Menu catalog trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{MenuItemId, Sku};
use domain::{Money, OrderItem};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One stock component consumed by a single unit of a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub sku: Sku,
    pub quantity: u32,
}

/// A menu item as served by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub category: String,
    pub station: String,
    pub price: Money,
    pub is_available: bool,
    pub preparation_minutes: u32,
    #[serde(default)]
    pub recipe: Vec<RecipeComponent>,
}

impl MenuItem {
    /// Creates an available item with no recipe.
    pub fn new(
        id: impl Into<MenuItemId>,
        name: impl Into<String>,
        category: impl Into<String>,
        station: impl Into<String>,
        price: Money,
        preparation_minutes: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            station: station.into(),
            price,
            is_available: true,
            preparation_minutes,
            recipe: Vec::new(),
        }
    }

    pub fn with_component(mut self, sku: impl Into<Sku>, quantity: u32) -> Self {
        self.recipe.push(RecipeComponent {
            sku: sku.into(),
            quantity,
        });
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    /// Snapshots the item onto a new order line.
    pub fn to_order_item(&self, quantity: u32, instructions: Option<String>) -> OrderItem {
        let mut item = OrderItem::new(
            self.id.clone(),
            self.name.clone(),
            self.station.clone(),
            self.price,
            quantity,
        )
        .with_category(self.category.clone())
        .with_preparation_minutes(self.preparation_minutes);
        item.special_instructions = instructions;
        item
    }
}

/// Read access to the external menu catalog.
#[async_trait]
pub trait MenuCatalog: Send + Sync {
    /// Looks up a menu item. `Ok(None)` means the id is unknown.
    async fn get_menu_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, EngineError>;
}

#[derive(Debug, Default)]
struct InMemoryMenuState {
    items: HashMap<MenuItemId, MenuItem>,
    fail_lookups: bool,
}

/// In-memory menu catalog for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMenuCatalog {
    state: Arc<RwLock<InMemoryMenuState>>,
}

impl InMemoryMenuCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    pub fn insert(&self, item: MenuItem) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .insert(item.id.clone(), item);
    }

    /// Marks an item available or not.
    pub fn set_available(&self, id: &MenuItemId, available: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(item) = state.items.get_mut(id) {
            item.is_available = available;
        }
    }

    /// Configures the catalog to fail every lookup.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_lookups = fail;
    }

    /// Returns every item, sorted by id.
    pub fn items(&self) -> Vec<MenuItem> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<MenuItem> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

#[async_trait]
impl MenuCatalog for InMemoryMenuCatalog {
    async fn get_menu_item(&self, id: &MenuItemId) -> Result<Option<MenuItem>, EngineError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.fail_lookups {
            return Err(EngineError::ExternalDependencyFailed(
                "Menu catalog unavailable".to_string(),
            ));
        }
        Ok(state.items.get(id).cloned())
    }
}
