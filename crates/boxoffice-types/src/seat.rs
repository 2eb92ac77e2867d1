//! Seatmap snapshots and per-seat state.
//!
//! A snapshot is taken when the seatmap is attached to an event and never
//! changes afterwards, so seat identity is stable for the lifetime of every
//! hold and ticket that references it.
//!
//! ```text
//!   ┌───────────┐  reserve   ┌──────┐  assign   ┌──────────┐
//!   │ AVAILABLE ├───────────▶│ HELD ├──────────▶│ ASSIGNED │
//!   └───────────┘            └──┬───┘           └────┬─────┘
//!         ▲      release/expire │                    │ void
//!         └─────────────────────┴────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::{EventId, SeatId, SeatmapId, TicketTypeId};

/// What a buyer asks for: a seat of a snapshot, by ID.
pub type SeatRef = SeatId;

/// Lifecycle state of one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Available,
    Held,
    Assigned,
}

impl SeatStatus {
    /// Can this seat move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Available, Self::Held)
                | (Self::Held, Self::Assigned | Self::Available)
                | (Self::Assigned, Self::Available)
        )
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Held => write!(f, "HELD"),
            Self::Assigned => write!(f, "ASSIGNED"),
        }
    }
}

/// One seat as laid out in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub section: String,
    pub row: String,
    pub number: String,
    /// The ticket type this seat is sold under.
    pub ticket_type_id: TicketTypeId,
}

/// Immutable copy of a venue layout attached to an event occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatmapSnapshot {
    pub id: SeatmapId,
    pub event_id: EventId,
    pub seats: Vec<Seat>,
}

impl SeatmapSnapshot {
    /// Seats sold under a given ticket type.
    pub fn seats_for(&self, ticket_type: TicketTypeId) -> impl Iterator<Item = &Seat> {
        self.seats
            .iter()
            .filter(move |seat| seat.ticket_type_id == ticket_type)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl SeatmapSnapshot {
    /// One row `A` of `count` seats (`A-1` .. `A-count`) for `ticket_type`.
    pub fn dummy_row(ticket_type: TicketTypeId, count: u32) -> Self {
        Self {
            id: SeatmapId::new(),
            event_id: EventId::new(),
            seats: (1..=count)
                .map(|n| Seat {
                    id: SeatId::new(format!("A-{n}")),
                    section: "Floor".to_string(),
                    row: "A".to_string(),
                    number: n.to_string(),
                    ticket_type_id: ticket_type,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_transitions() {
        assert!(SeatStatus::Available.can_transition_to(SeatStatus::Held));
        assert!(SeatStatus::Held.can_transition_to(SeatStatus::Assigned));
        assert!(SeatStatus::Held.can_transition_to(SeatStatus::Available));
        assert!(SeatStatus::Assigned.can_transition_to(SeatStatus::Available));

        assert!(!SeatStatus::Available.can_transition_to(SeatStatus::Assigned));
        assert!(!SeatStatus::Assigned.can_transition_to(SeatStatus::Held));
        assert!(!SeatStatus::Held.can_transition_to(SeatStatus::Held));
    }

    #[test]
    fn seats_for_filters_by_type() {
        let vip = TicketTypeId::new();
        let mut map = SeatmapSnapshot::dummy_row(vip, 3);
        map.seats.push(Seat {
            id: SeatId::new("B-1"),
            section: "Balcony".into(),
            row: "B".into(),
            number: "1".into(),
            ticket_type_id: TicketTypeId::new(),
        });
        assert_eq!(map.seats_for(vip).count(), 3);
    }
}
