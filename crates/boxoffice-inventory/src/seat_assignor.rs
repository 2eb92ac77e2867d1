//! Seat assignor: binds seats of a seatmap snapshot to holds and tickets.
//!
//! Reservation is all-or-nothing: if any requested seat is not `available`
//! for the requested ticket type, nothing changes. Seats are never silently
//! substituted; the buyer picked them.

use std::collections::HashMap;
use std::sync::Mutex;

use boxoffice_types::{
    sync, BoxofficeError, HoldId, Result, SeatId, SeatRef, SeatStatus, SeatmapId, TicketTypeId,
};

use crate::catalog::Catalog;

#[derive(Debug, Clone)]
struct SeatSlot {
    ticket_type: TicketTypeId,
    status: SeatStatus,
    holder: Option<HoldId>,
}

#[derive(Debug, Default)]
struct SeatTable {
    slots: HashMap<SeatId, SeatSlot>,
}

/// Seat state for every snapshot in the catalog, one lock per snapshot.
pub struct SeatAssignor {
    tables: HashMap<SeatmapId, Mutex<SeatTable>>,
}

impl SeatAssignor {
    /// All seats of every snapshot start `available`.
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        let tables = catalog
            .seatmaps()
            .map(|map| {
                let slots = map
                    .seats
                    .iter()
                    .map(|seat| {
                        (
                            seat.id.clone(),
                            SeatSlot {
                                ticket_type: seat.ticket_type_id,
                                status: SeatStatus::Available,
                                holder: None,
                            },
                        )
                    })
                    .collect();
                (map.id, Mutex::new(SeatTable { slots }))
            })
            .collect();
        Self { tables }
    }

    fn table(&self, seatmap: SeatmapId) -> Result<&Mutex<SeatTable>> {
        self.tables
            .get(&seatmap)
            .ok_or_else(|| BoxofficeError::Internal(format!("no seat table for {seatmap}")))
    }

    /// Reserve every seat in `seat_refs` for `hold_id`, or none of them.
    ///
    /// # Errors
    /// Returns `SeatUnavailable` naming the first seat that is unknown,
    /// sold under another ticket type, or not `available`. Duplicate refs
    /// in one request are rejected the same way.
    pub fn reserve_seats(
        &self,
        seatmap: SeatmapId,
        ticket_type: TicketTypeId,
        seat_refs: &[SeatRef],
        hold_id: HoldId,
    ) -> Result<()> {
        let mut table = sync::lock(self.table(seatmap)?);

        for (i, seat) in seat_refs.iter().enumerate() {
            if seat_refs[..i].contains(seat) {
                return Err(BoxofficeError::SeatUnavailable(seat.clone()));
            }
            let free = table.slots.get(seat).is_some_and(|slot| {
                slot.ticket_type == ticket_type && slot.status == SeatStatus::Available
            });
            if !free {
                return Err(BoxofficeError::SeatUnavailable(seat.clone()));
            }
        }

        for seat in seat_refs {
            if let Some(slot) = table.slots.get_mut(seat) {
                slot.status = SeatStatus::Held;
                slot.holder = Some(hold_id);
            }
        }
        Ok(())
    }

    /// Return every seat held by `hold_id` to `available`.
    ///
    /// Returns the number of seats released.
    pub fn release_seats(&self, seatmap: SeatmapId, hold_id: HoldId) -> Result<usize> {
        self.move_held(seatmap, hold_id, SeatStatus::Available)
    }

    /// Promote every seat held by `hold_id` to `assigned`.
    ///
    /// Returns the number of seats assigned.
    pub fn assign_seats(&self, seatmap: SeatmapId, hold_id: HoldId) -> Result<usize> {
        self.move_held(seatmap, hold_id, SeatStatus::Assigned)
    }

    fn move_held(&self, seatmap: SeatmapId, hold_id: HoldId, target: SeatStatus) -> Result<usize> {
        let mut table = sync::lock(self.table(seatmap)?);
        let mut moved = 0;
        for slot in table.slots.values_mut() {
            if slot.holder == Some(hold_id) && slot.status == SeatStatus::Held {
                slot.status = target;
                if target == SeatStatus::Available {
                    slot.holder = None;
                }
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Return an assigned seat to `available` (its ticket was voided).
    ///
    /// # Errors
    /// Returns `SeatUnavailable` if the seat is unknown or not assigned.
    pub fn void_seat(&self, seatmap: SeatmapId, seat: &SeatId) -> Result<()> {
        let mut table = sync::lock(self.table(seatmap)?);
        let slot = table
            .slots
            .get_mut(seat)
            .filter(|slot| slot.status == SeatStatus::Assigned)
            .ok_or_else(|| BoxofficeError::SeatUnavailable(seat.clone()))?;
        slot.status = SeatStatus::Available;
        slot.holder = None;
        Ok(())
    }

    /// Count `available` seats of `ticket_type`, restricted to `seat_refs`
    /// when it is non-empty.
    #[must_use]
    pub fn count_available(
        &self,
        seatmap: SeatmapId,
        ticket_type: TicketTypeId,
        seat_refs: &[SeatRef],
    ) -> u32 {
        let Ok(table) = self.table(seatmap) else {
            return 0;
        };
        let table = sync::lock(table);
        let is_free = |slot: &SeatSlot| {
            slot.ticket_type == ticket_type && slot.status == SeatStatus::Available
        };
        let count = if seat_refs.is_empty() {
            table.slots.values().filter(|slot| is_free(slot)).count()
        } else {
            seat_refs
                .iter()
                .filter(|seat| table.slots.get(*seat).is_some_and(is_free))
                .count()
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Current status of one seat.
    #[must_use]
    pub fn status(&self, seatmap: SeatmapId, seat: &SeatId) -> Option<SeatStatus> {
        let table = sync::lock(self.table(seatmap).ok()?);
        table.slots.get(seat).map(|slot| slot.status)
    }
}
