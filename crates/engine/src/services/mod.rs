//! External collaborators the engine calls, with in-memory implementations.

pub mod menu;
pub mod payment;

pub use menu::{InMemoryMenuCatalog, MenuCatalog, MenuItem, RecipeComponent};
pub use payment::{InMemoryPaymentGateway, PaymentGateway};
