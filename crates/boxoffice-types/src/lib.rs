//! # boxoffice-types
//!
//! Shared types, errors, and configuration for the **Boxoffice** ticket
//! inventory and checkout engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`TicketTypeId`], [`HoldId`], [`OrderId`], [`BuyerId`], [`TicketId`], [`SeatId`], ...
//! - **Catalog model**: [`TicketType`], [`TicketKind`], [`PriceTier`], [`SeatmapSnapshot`], [`Seat`]
//! - **Hold model**: [`Hold`], [`HoldState`]
//! - **Order model**: [`Order`], [`OrderStatus`], [`LineItem`], [`OrderFlag`]
//! - **Payment model**: [`PaymentAttempt`], [`ProviderHandoff`], [`CanonicalPaymentEvent`]
//! - **Ticket model**: [`Ticket`], [`TicketStatus`]
//! - **Configuration**: [`AppConfig`], [`CheckoutConfig`], [`ServerConfig`], [`ProviderConfig`]
//! - **Errors**: [`BoxofficeError`] with `BO_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod hold;
pub mod ids;
pub mod order;
pub mod payment;
pub mod seat;
pub mod sync;
pub mod ticket;
pub mod ticket_type;

// Re-export all primary types at crate root for ergonomic imports:
//   use boxoffice_types::{Hold, Order, TicketType, ...};

pub use config::*;
pub use error::*;
pub use hold::*;
pub use ids::*;
pub use order::*;
pub use payment::*;
pub use seat::*;
pub use ticket::*;
pub use ticket_type::*;

// Constants and lock helpers are accessed via `boxoffice_types::constants::FOO`
// and `boxoffice_types::sync::lock`
// (not re-exported to avoid name collisions).
