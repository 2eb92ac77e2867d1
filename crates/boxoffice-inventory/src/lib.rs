//! # boxoffice-inventory
//!
//! **Inventory Plane**: the read-only catalog, price resolution, capacity
//! accounting, seat assignment, and time-boxed holds.
//!
//! ## Architecture
//!
//! 1. **Catalog**: immutable ticket types, price tiers, and seatmap snapshots
//! 2. **PriceResolver**: base price or the active time-windowed tier
//! 3. **AvailabilityLedger**: issued + held counts per ticket type, one lock each
//! 4. **SeatAssignor**: all-or-nothing seat state per seatmap snapshot
//! 5. **HoldManager**: the sole writer of hold state
//!
//! ## Hold Flow
//!
//! ```text
//! createHold → lock(ticket type) → expire overdue → check capacity
//!            → reserve seats (all-or-nothing) → record hold → unlock
//! ```
//!
//! Check-and-reserve for one ticket type always happens under that type's
//! lock, so concurrent holds are linearizable against the capacity ceiling.

pub mod catalog;
pub mod hold_manager;
pub mod ledger;
pub mod price_resolver;
pub mod seat_assignor;

pub use catalog::{Catalog, CatalogFile};
pub use hold_manager::{HoldManager, HoldRequest};
pub use ledger::{Availability, AvailabilityLedger, LedgerEntry};
pub use price_resolver::resolve_price;
pub use seat_assignor::SeatAssignor;
