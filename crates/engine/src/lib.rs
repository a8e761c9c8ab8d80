//! Orchestration engine for restaurant orders and kitchen tickets.
//!
//! The [`Engine`] owns every order together with its kitchen ticket, the
//! table registry and the stock ledger. Each mutation runs under the order's
//! lock, applies its side effects, then publishes the resulting events on the
//! per-restaurant [`EventBus`], which journals them and fans them out to the
//! registered [`EventSink`]s in sequence order.

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod kitchen;
pub mod orders;
pub mod payments;
pub mod repository;
pub mod services;
pub mod snapshot;
pub mod stock;
pub mod tables;

pub use bus::{EventBus, EventSink};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use kitchen::{KotGenerator, TicketView};
pub use orders::{OrderLineSpec, OrderSpec, recompute_totals};
pub use services::{
    InMemoryMenuCatalog, InMemoryPaymentGateway, MenuCatalog, MenuItem, PaymentGateway,
    RecipeComponent,
};
pub use snapshot::Snapshot;
pub use stock::StockLedger;
pub use tables::{NewTable, TableChange, TableRegistry};
