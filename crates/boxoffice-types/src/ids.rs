//! Globally unique identifiers used throughout Boxoffice.
//!
//! Entity IDs minted by this core use UUIDv7 for time-ordered sorting.
//! IDs owned by external domains (events, ticket types, buyers) are plain
//! UUIDs handed to us; seat IDs are the opaque labels of a seatmap snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier with a display prefix.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// Event or occurrence that ticket types belong to.
    EventId, "evt:"
);
uuid_id!(
    /// A purchasable category of admission.
    TicketTypeId, "tt:"
);
uuid_id!(
    /// A time-boxed reservation of inventory.
    HoldId, "hold:"
);
uuid_id!(
    /// One buyer's checkout attempt.
    OrderId, "ord:"
);
uuid_id!(
    /// Authenticated buyer identity supplied by the session domain.
    BuyerId, "buyer:"
);
uuid_id!(
    /// A materialized, scannable ticket.
    TicketId, "tkt:"
);
uuid_id!(
    /// One initialization of payment with a provider.
    PaymentAttemptId, "pay:"
);
uuid_id!(
    /// An immutable seatmap snapshot attached to an event.
    SeatmapId, "map:"
);

impl OrderId {
    /// Extract the embedded timestamp (milliseconds since UNIX epoch) from UUIDv7.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        let bytes = self.0.as_bytes();
        u64::from_be_bytes([
            0, 0, bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
        ])
    }
}

// ---------------------------------------------------------------------------
// SeatId
// ---------------------------------------------------------------------------

/// Stable seat identity within one seatmap snapshot (e.g. `"A-12"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(pub String);

impl SeatId {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeatId {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
