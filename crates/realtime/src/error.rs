use thiserror::Error;

use crate::gateway::SubscriptionId;

/// Errors from subscription management.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("customer subscriptions must be filtered to one order")]
    OrderFilterRequired,

    #[error("subscription {0} is closed")]
    SubscriptionClosed(SubscriptionId),

    #[error("subscription {0} is already resyncing")]
    ResyncInProgress(SubscriptionId),
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
