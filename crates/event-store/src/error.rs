use thiserror::Error;

use crate::{RestaurantId, Sequence};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The appended sequence number is not the next one for the restaurant.
    #[error(
        "Sequence conflict for restaurant {restaurant_id}: expected {expected}, got {actual}"
    )]
    SequenceConflict {
        restaurant_id: RestaurantId,
        expected: Sequence,
        actual: Sequence,
    },

    /// The journal cannot accept writes right now.
    #[error("Journal unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
