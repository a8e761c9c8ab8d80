//! Engine tunables.

use std::time::Duration;

/// Tunables for order pricing, ticket priority and payment staging.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,
    /// Party size from which a ticket starts at high priority.
    pub large_party_size: u32,
    /// Timeout of a single checkout call.
    pub payment_timeout: Duration,
    /// Checkout attempts before the payment is flagged for attention.
    pub payment_max_attempts: u32,
    /// Base delay between checkout attempts; attempt `n` waits `n × backoff`.
    pub payment_retry_backoff: Duration,
    /// Waiting time after which an open ticket gains one priority level.
    pub kot_escalate_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: 0,
            large_party_size: 8,
            payment_timeout: Duration::from_millis(5000),
            payment_max_attempts: 3,
            payment_retry_backoff: Duration::from_millis(200),
            kot_escalate_after: Duration::from_secs(20 * 60),
        }
    }
}

impl EngineConfig {
    pub fn with_tax_rate_bps(mut self, bps: u32) -> Self {
        self.tax_rate_bps = bps;
        self
    }

    pub fn with_payment_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.payment_max_attempts = max_attempts.max(1);
        self.payment_retry_backoff = backoff;
        self
    }

    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    /// Escalation interval as a chrono duration, for ticket computations.
    pub fn escalate_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.kot_escalate_after).unwrap_or(chrono::Duration::zero())
    }
}
