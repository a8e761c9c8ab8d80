//! Deferred checkout with bounded retry, and payment settlement.

use chrono::Utc;
use common::{OrderId, RestaurantId};
use domain::{Aggregate, Checkout, Money, Order, PaymentMethod, RestaurantEvent};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::orders::record_transitions;
use crate::tables::TableChange;

impl Engine {
    /// Creates a checkout for an order.
    ///
    /// The payment is staged under the order lock, the gateway is called with
    /// the lock released, and the outcome is applied as a separate mutation.
    /// When every attempt fails the payment is flagged `requires_attention`.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn create_checkout(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        method: Option<PaymentMethod>,
    ) -> Result<Checkout> {
        let amount = {
            let slot = self.orders.slot(restaurant_id, order_id)?;
            let mut slot = slot.lock().await;
            let staged = slot.order.stage_payment(method)?;
            slot.order.apply_events(&staged);
            self.publish(restaurant_id, staged).await;
            slot.order.totals().total
        };

        match self.call_gateway(order_id, amount).await {
            Ok(checkout) => {
                let recorded = checkout.clone();
                self.mutate_order(restaurant_id, order_id, move |order| {
                    order.record_checkout(recorded)
                })
                .await?;
                metrics::counter!("payment_checkouts_total", "outcome" => "created").increment(1);
                Ok(checkout)
            }
            Err(reason) => {
                if let Err(e) = self
                    .mutate_order(restaurant_id, order_id, Order::flag_payment_attention)
                    .await
                {
                    tracing::warn!(error = %e, "could not flag payment for attention");
                }
                metrics::counter!("payment_checkouts_total", "outcome" => "failed").increment(1);
                tracing::error!(%reason, "checkout failed, payment requires attention");
                Err(EngineError::ExternalDependencyFailed(reason))
            }
        }
    }

    /// Marks an order paid. A served order completes and frees its table.
    #[tracing::instrument(skip(self), fields(restaurant_id = %restaurant_id, order_id = %order_id))]
    pub async fn settle_payment(
        &self,
        restaurant_id: RestaurantId,
        order_id: OrderId,
    ) -> Result<Order> {
        let slot = self.orders.slot(restaurant_id, order_id)?;
        let mut slot = slot.lock().await;

        let settled = slot.order.settle_payment(Utc::now())?;
        if settled.is_empty() {
            tracing::debug!("payment already settled");
            return Ok(slot.order.clone());
        }
        slot.order.apply_events(&settled);
        record_transitions(&settled);

        let mut events: Vec<RestaurantEvent> =
            settled.into_iter().map(RestaurantEvent::from).collect();
        let released = if slot.order.is_terminal() {
            self.release_table(&slot.order).await
        } else {
            TableChange::none()
        };
        events.extend(released.events().iter().cloned().map(RestaurantEvent::from));
        self.publish(restaurant_id, events).await;
        drop(released);

        tracing::info!("payment settled");
        Ok(slot.order.clone())
    }

    /// Calls the gateway with a timeout per attempt and linear backoff between attempts.
    async fn call_gateway(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> std::result::Result<Checkout, String> {
        let attempts = self.config.payment_max_attempts.max(1);
        let timeout = self.config.payment_timeout;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            metrics::counter!("payment_checkout_attempts_total").increment(1);
            match tokio::time::timeout(timeout, self.payments.create_checkout(order_id, amount))
                .await
            {
                Ok(Ok(checkout)) => return Ok(checkout),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("checkout timed out after {}ms", timeout.as_millis()),
            }
            tracing::warn!(attempt, error = %last_error, "checkout attempt failed");

            if attempt < attempts {
                tokio::time::sleep(self.config.payment_retry_backoff * attempt).await;
            }
        }
        Err(last_error)
    }
}
