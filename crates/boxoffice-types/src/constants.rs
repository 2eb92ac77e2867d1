//! System-wide constants for the Boxoffice checkout engine.

/// Default checkout window: how long a hold stays active (seconds).
pub const DEFAULT_HOLD_TTL_SECS: i64 = 600;

/// Longest checkout window a deployment may configure (seconds).
pub const MAX_HOLD_TTL_SECS: i64 = 86_400;

/// Default tolerance added to every hold deadline (seconds).
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 5;

/// Largest clock-skew tolerance a deployment may configure (seconds).
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Finished holds remembered per ticket type, so late releases and
/// settlement lookups still see their final state.
pub const RETIRED_HOLDS_PER_TYPE: usize = 1024;

/// Default interval between hold expiry sweeps (seconds).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 15;

/// Upper bound on units a single order line may request.
pub const MAX_UNITS_PER_ITEM: u32 = 100;

/// Upper bound on line items per order.
pub const MAX_ITEMS_PER_ORDER: usize = 20;

/// Settlement idempotency cache size (number of provider events to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 500_000;

/// Maximum age of a signed webhook timestamp before it is refused (seconds).
pub const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Depth of the in-process webhook queue feeding the settlement worker.
pub const DEFAULT_WEBHOOK_QUEUE_DEPTH: usize = 1024;

/// Default API listen port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default hosted-checkout base URL for the redirect flow.
pub const DEFAULT_HOSTED_CHECKOUT_BASE: &str = "https://checkout.paystack.com";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Boxoffice";
