//! Ticket types and their time-windowed price tiers.
//!
//! Both are owned by the event/organizer domain and are read-only here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, SeatmapId, TicketTypeId};

/// Whether admission is counted or bound to specific seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    GeneralAdmission,
    /// Seat-backed; units map 1:1 onto seats of the given snapshot.
    Seated { seatmap: SeatmapId },
}

/// Organizer-controlled sale status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketTypeStatus {
    OnSale,
    Paused,
    Closed,
}

impl std::fmt::Display for TicketTypeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnSale => write!(f, "ON_SALE"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A time-windowed price override (e.g. early-bird).
///
/// The window is half-open: `[starts_at, ends_at)`. `None` on either side
/// means open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub price_cents: u64,
}

impl PriceTier {
    /// Does `[starts_at, ends_at)` contain `at`?
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at.is_none_or(|start| at >= start) && self.ends_at.is_none_or(|end| at < end)
    }
}

/// A purchasable category of admission with its own capacity and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub event_id: EventId,
    pub name: String,
    pub kind: TicketKind,
    /// Hard ceiling on issued + held units. `None` = unconstrained.
    pub capacity: Option<u32>,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    pub price_cents: u64,
    pub fee_cents: u64,
    pub per_order_limit: Option<u32>,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
    pub status: TicketTypeStatus,
    #[serde(default)]
    pub tiers: Vec<PriceTier>,
}

impl TicketType {
    /// On sale and inside the half-open `[sales_start, sales_end)` window.
    #[must_use]
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketTypeStatus::OnSale
            && self.sales_start.is_none_or(|start| now >= start)
            && self.sales_end.is_none_or(|end| now < end)
    }

    /// The seatmap backing this type, if seated.
    #[must_use]
    pub fn seatmap(&self) -> Option<SeatmapId> {
        match self.kind {
            TicketKind::Seated { seatmap } => Some(seatmap),
            TicketKind::GeneralAdmission => None,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl TicketType {
    /// General-admission type, always on sale, 5000 cents USD, no fee.
    pub fn dummy_general(capacity: Option<u32>) -> Self {
        Self {
            id: TicketTypeId::new(),
            event_id: EventId::new(),
            name: "General".to_string(),
            kind: TicketKind::GeneralAdmission,
            capacity,
            currency: "USD".to_string(),
            price_cents: 5000,
            fee_cents: 0,
            per_order_limit: None,
            sales_start: None,
            sales_end: None,
            status: TicketTypeStatus::OnSale,
            tiers: Vec::new(),
        }
    }

    /// Seated type bound to `seatmap`.
    pub fn dummy_seated(seatmap: SeatmapId, capacity: Option<u32>) -> Self {
        Self {
            kind: TicketKind::Seated { seatmap },
            name: "Reserved".to_string(),
            ..Self::dummy_general(capacity)
        }
    }
}
