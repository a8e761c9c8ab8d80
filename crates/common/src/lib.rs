//! Shared types for the restaurant order engine.

pub mod identity;
pub mod ids;

pub use identity::{Identity, Role, UnknownRole};
pub use ids::{KotId, MenuItemId, OrderId, RestaurantId, Sku, TableId, UserId};
