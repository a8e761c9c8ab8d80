//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::RestaurantId;
use engine::EngineConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL journal; in-memory when unset
/// - `TAX_RATE_BPS`: tax in basis points (default: `0`)
/// - `LARGE_PARTY_SIZE`: party size that raises ticket priority (default: `8`)
/// - `PAYMENT_TIMEOUT_MS`: per-attempt checkout timeout (default: `5000`)
/// - `PAYMENT_MAX_ATTEMPTS`: checkout attempts (default: `3`)
/// - `PAYMENT_RETRY_BACKOFF_MS`: base backoff between attempts (default: `200`)
/// - `KOT_ESCALATE_AFTER_MIN`: ticket wait per priority step (default: `20`)
/// - `DEMO_RESTAURANT_ID`: seeds tables and stock for this restaurant
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub demo_restaurant_id: Option<RestaurantId>,
    pub engine: EngineConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());

        let engine = EngineConfig {
            tax_rate_bps: number("TAX_RATE_BPS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.engine.tax_rate_bps),
            large_party_size: number("LARGE_PARTY_SIZE")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.engine.large_party_size),
            payment_timeout: number("PAYMENT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.engine.payment_timeout),
            payment_max_attempts: number("PAYMENT_MAX_ATTEMPTS")
                .and_then(|v| u32::try_from(v).ok())
                .map(|v| v.max(1))
                .unwrap_or(defaults.engine.payment_max_attempts),
            payment_retry_backoff: number("PAYMENT_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.engine.payment_retry_backoff),
            kot_escalate_after: number("KOT_ESCALATE_AFTER_MIN")
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(defaults.engine.kot_escalate_after),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            demo_restaurant_id: lookup("DEMO_RESTAURANT_ID")
                .and_then(|id| RestaurantId::parse(&id).ok()),
            engine,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            demo_restaurant_id: None,
            engine: EngineConfig::default(),
        }
    }
}
