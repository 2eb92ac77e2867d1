//! Configuration types for Boxoffice services.

use std::net::{Ipv4Addr, SocketAddr};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-level configuration for one checkout service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub checkout: CheckoutConfig,
    pub providers: ProviderConfig,
    /// JSON file with ticket types, price tiers, and seatmap snapshots.
    pub catalog_path: Option<String>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on for the REST API.
    pub listen_addr: SocketAddr,
    /// `tracing` env-filter directive (e.g. `info,boxoffice=debug`).
    pub log_filter: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
    /// Capacity of the webhook queue feeding the settlement worker.
    pub webhook_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, constants::DEFAULT_API_PORT)),
            log_filter: "info".to_string(),
            log_json: false,
            webhook_queue_depth: constants::DEFAULT_WEBHOOK_QUEUE_DEPTH,
        }
    }
}

/// Timing of holds and settlement bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// How long a fresh hold stays active.
    pub hold_ttl_secs: i64,
    /// Tolerance added to every hold deadline.
    pub clock_skew_secs: i64,
    /// Interval between background expiry sweeps.
    pub sweep_interval_secs: u64,
    /// How many provider events the idempotency guard remembers.
    pub idempotency_cache_size: usize,
}

impl CheckoutConfig {
    /// The checkout window, clamped to `1..=MAX_HOLD_TTL_SECS`.
    #[must_use]
    pub fn hold_ttl(&self) -> Duration {
        Duration::seconds(self.hold_ttl_secs.clamp(1, constants::MAX_HOLD_TTL_SECS))
    }

    /// The skew tolerance, clamped to `0..=MAX_CLOCK_SKEW_SECS`.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::seconds(self.clock_skew_secs.clamp(0, constants::MAX_CLOCK_SKEW_SECS))
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            hold_ttl_secs: constants::DEFAULT_HOLD_TTL_SECS,
            clock_skew_secs: constants::DEFAULT_CLOCK_SKEW_SECS,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            idempotency_cache_size: constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE,
        }
    }
}

/// Credentials for the payment providers enabled on this deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub stripe: Option<StripeConfig>,
    pub paystack: Option<PaystackConfig>,
}

/// Client-secret flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    /// Endpoint signing secret (`whsec_...`).
    pub webhook_secret: String,
}

/// Hosted-page flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaystackConfig {
    /// Secret key; also the webhook HMAC key.
    pub secret_key: String,
    /// Base URL the authorization code is appended to.
    pub checkout_base: String,
}
