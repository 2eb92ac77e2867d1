//! # boxoffice-checkout
//!
//! **Checkout plane**: turns a buyer's selection into a priced, held order
//! and hands it to a payment provider.
//!
//! ## Architecture
//!
//! ```text
//!   createOrder ──▶ HoldManager (one hold per item, all-or-nothing)
//!        │
//!        ▼
//!   OrderStore ◀── initializePayment ──▶ PaymentProvider::init
//!        ▲
//!        └── cancelOrder / expirePendingOrders (release holds)
//! ```
//!
//! Provider adapters sit behind the [`PaymentProvider`] trait and are looked
//! up by name in the [`ProviderRegistry`]; nothing outside the adapters
//! knows which gateway it is talking to.

pub mod orchestrator;
pub mod order_store;
pub mod paystack;
pub mod provider;
pub mod stripe;

pub use orchestrator::{CreateOrderRequest, Orchestrator};
pub use order_store::{OrderRow, OrderStore};
pub use paystack::PaystackProvider;
pub use provider::{PaymentProvider, ProviderRegistry};
pub use stripe::StripeProvider;
