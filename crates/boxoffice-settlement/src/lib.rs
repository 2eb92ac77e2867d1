//! # boxoffice-settlement
//!
//! **Finality plane**: turns verified payment events into paid orders and
//! issued tickets, exactly once.
//!
//! ## Architecture
//!
//! The plane receives a [`CanonicalPaymentEvent`](boxoffice_types::CanonicalPaymentEvent)
//! from a provider adapter and:
//! 1. Checks idempotency on `(providerReference, outcome)`
//! 2. Locks the order row and re-checks its status (the durable guard)
//! 3. Verifies amount and currency against the order total
//! 4. Consumes holds (active → consumed, seats held → assigned)
//! 5. Issues one ticket per unit and moves the order to `paid`
//! 6. Notifies the buyer, fire-and-forget
//!
//! Anything that needs a human (mismatched amounts, holds that lapsed
//! before the money arrived, money for canceled orders) lands in the
//! [`ReconciliationQueue`] instead of failing the webhook.

pub mod idempotency;
pub mod notifier;
pub mod processor;
pub mod reconciliation;
pub mod ticket_issuer;

pub use idempotency::{IdempotencyGuard, SettlementKey};
pub use notifier::{LogNotifier, TicketNotifier};
pub use processor::{SettlementOutcome, SettlementProcessor};
pub use reconciliation::{ReconciliationCase, ReconciliationQueue, ReconciliationReason};
pub use ticket_issuer::TicketIssuer;
