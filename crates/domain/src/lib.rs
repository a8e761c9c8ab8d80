//! Domain layer for the restaurant order engine.
//!
//! This crate holds the pure state machines and their events:
//! - `Order` with its status, item and payment rules
//! - `KitchenTicket` (KOT) with its per-line status machine and priority policy
//! - `Table` and `StockItem`
//! - `RestaurantEvent`, the closed set of events published to clients
//!
//! Nothing here performs I/O or locking; the `engine` crate owns coordination.

pub mod aggregate;
pub mod event;
pub mod kitchen;
pub mod money;
pub mod order;
pub mod stock;
pub mod table;

pub use aggregate::{Aggregate, DomainEvent};
pub use event::{EventKind, RestaurantEvent, SequencedEvent};
pub use kitchen::{
    KitchenError, KitchenEvent, KitchenTicket, LineStatus, PartySizePolicy, Priority,
    PriorityPolicy, TicketLine,
};
pub use money::Money;
pub use order::{
    Checkout, CustomerSnapshot, ItemChange, NewOrder, Order, OrderError, OrderEvent, OrderItem,
    OrderStatus, OrderType, PaymentMethod, PaymentStatus, Totals,
};
pub use stock::{StockError, StockEvent, StockItem};
pub use table::{Reservation, Table, TableError, TableEvent, TableStatus};
