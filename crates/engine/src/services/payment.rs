//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::{Checkout, Money};
use uuid::Uuid;

use crate::error::EngineError;

/// Opaque checkout creation against the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout for an order. May be slow; callers bound it with a timeout.
    async fn create_checkout(&self, order_id: OrderId, amount: Money)
    -> Result<Checkout, EngineError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    checkouts: HashMap<OrderId, (Checkout, Money)>,
    calls: u32,
    fail_on_checkout: bool,
    failures_remaining: u32,
    delay: Option<Duration>,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail every checkout call.
    pub fn set_fail_on_checkout(&self, fail: bool) {
        self.write().fail_on_checkout = fail;
    }

    /// Makes the next `count` checkout calls fail.
    pub fn fail_next(&self, count: u32) {
        self.write().failures_remaining = count;
    }

    /// Delays every checkout call, to exercise caller timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.write().delay = delay;
    }

    /// Number of checkout calls received, including failed ones.
    pub fn call_count(&self) -> u32 {
        self.read().calls
    }

    /// Returns the checkout issued for an order, if any.
    pub fn checkout_for(&self, order_id: OrderId) -> Option<(Checkout, Money)> {
        self.read().checkouts.get(&order_id).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_checkout(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<Checkout, EngineError> {
        let delay = {
            let mut state = self.write();
            state.calls += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.write();
        if state.fail_on_checkout {
            return Err(EngineError::ExternalDependencyFailed(
                "Checkout declined".to_string(),
            ));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(EngineError::ExternalDependencyFailed(
                "Payment provider unavailable".to_string(),
            ));
        }

        let session = Uuid::new_v4();
        let checkout = Checkout {
            redirect_url: format!("https://pay.local/checkout/{session}"),
            qr_payload: format!("PAY:{order_id}:{}", amount.cents()),
        };
        state.checkouts.insert(order_id, (checkout.clone(), amount));
        Ok(checkout)
    }
}
