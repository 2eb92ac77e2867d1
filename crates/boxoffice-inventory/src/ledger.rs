//! Availability ledger: the authoritative issued/held counts.
//!
//! Per ticket type:
//! ```text
//! available = capacity − issued − Σ(active hold quantities)
//! ```
//! and `capacity = None` is always unlimited. For seated types the answer is
//! further capped by the number of `available` seats.
//!
//! Each ticket type has its own [`TypeBook`] behind its own mutex. All
//! mutation happens through [`crate::HoldManager`] while that mutex is held,
//! which is what makes check-and-reserve a single atomic step.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use boxoffice_types::constants::RETIRED_HOLDS_PER_TYPE;
use boxoffice_types::{
    sync, BoxofficeError, Hold, HoldId, HoldState, Result, SeatRef, TicketType, TicketTypeId,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::seat_assignor::SeatAssignor;

/// Answer to "how many units can be reserved right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum Availability {
    Unlimited,
    Limited(u32),
}

impl Availability {
    #[must_use]
    pub fn covers(&self, quantity: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(n) => *n >= quantity,
        }
    }

    /// The smaller of two availabilities.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unlimited, x) | (x, Self::Unlimited) => x,
            (Self::Limited(a), Self::Limited(b)) => Self::Limited(a.min(b)),
        }
    }

    /// A finite count for error messages.
    #[must_use]
    pub fn as_count(&self) -> u32 {
        match self {
            Self::Unlimited => u32::MAX,
            Self::Limited(n) => *n,
        }
    }
}

/// Capacity counters for one ticket type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub capacity: Option<u32>,
    pub issued: u32,
    pub held: u32,
}

impl LedgerEntry {
    #[must_use]
    pub fn new(capacity: Option<u32>) -> Self {
        Self {
            capacity,
            issued: 0,
            held: 0,
        }
    }

    #[must_use]
    pub fn available(&self) -> Availability {
        match self.capacity {
            None => Availability::Unlimited,
            Some(cap) => Availability::Limited(cap.saturating_sub(self.issued + self.held)),
        }
    }

    /// Move `quantity` units from free to held.
    ///
    /// Callers pass the ticket type for error context only.
    pub fn try_reserve(&mut self, ticket_type: TicketTypeId, quantity: u32) -> Result<()> {
        let available = self.available();
        if !available.covers(quantity) {
            return Err(BoxofficeError::InsufficientInventory {
                ticket_type,
                requested: quantity,
                available: available.as_count(),
            });
        }
        self.held += quantity;
        Ok(())
    }

    /// Return held units to free.
    pub fn release(&mut self, quantity: u32) -> Result<()> {
        self.held = self
            .held
            .checked_sub(quantity)
            .ok_or_else(|| BoxofficeError::Internal("ledger held count underflow".into()))?;
        Ok(())
    }

    /// Move held units to issued.
    pub fn commit(&mut self, quantity: u32) -> Result<()> {
        self.release(quantity)?;
        self.issued += quantity;
        Ok(())
    }

    /// Return issued units to free (refund / void).
    pub fn return_issued(&mut self, quantity: u32) -> Result<()> {
        self.issued = self
            .issued
            .checked_sub(quantity)
            .ok_or_else(|| BoxofficeError::Internal("ledger issued count underflow".into()))?;
        Ok(())
    }
}

/// Everything the ledger tracks for one ticket type.
///
/// Only active holds live in `holds`. A hold that reaches a terminal state
/// moves to a bounded retired list, oldest evicted first, so the book stays
/// proportional to what is currently reserved.
#[derive(Debug)]
pub struct TypeBook {
    pub ticket_type: TicketType,
    pub entry: LedgerEntry,
    holds: HashMap<HoldId, Hold>,
    /// Active holds ordered by deadline, for the expiry scan.
    deadlines: BTreeSet<(DateTime<Utc>, HoldId)>,
    retired: HashMap<HoldId, Hold>,
    retired_order: VecDeque<HoldId>,
    retired_capacity: usize,
}

impl TypeBook {
    fn new(ticket_type: TicketType, retired_capacity: usize) -> Self {
        Self {
            entry: LedgerEntry::new(ticket_type.capacity),
            ticket_type,
            holds: HashMap::new(),
            deadlines: BTreeSet::new(),
            retired: HashMap::new(),
            retired_order: VecDeque::new(),
            retired_capacity: retired_capacity.max(1),
        }
    }

    /// Sum of quantities of active holds; must always equal `entry.held`.
    #[must_use]
    pub fn active_hold_quantity(&self) -> u32 {
        self.holds.values().map(|hold| hold.quantity).sum()
    }

    #[must_use]
    pub fn active_holds(&self) -> usize {
        self.holds.len()
    }

    #[must_use]
    pub fn retired_holds(&self) -> usize {
        self.retired.len()
    }

    /// An active or recently retired hold.
    #[must_use]
    pub fn hold(&self, id: HoldId) -> Option<&Hold> {
        self.holds.get(&id).or_else(|| self.retired.get(&id))
    }

    pub(crate) fn insert_active(&mut self, hold: Hold) {
        self.deadlines.insert((hold.expires_at, hold.id));
        self.holds.insert(hold.id, hold);
    }

    pub(crate) fn active(&self, id: HoldId) -> Option<&Hold> {
        self.holds.get(&id)
    }

    /// Move the deadline of an active hold.
    pub(crate) fn reschedule(&mut self, id: HoldId, expires_at: DateTime<Utc>) -> Option<&Hold> {
        let hold = self.holds.get_mut(&id)?;
        self.deadlines.remove(&(hold.expires_at, id));
        hold.expires_at = expires_at;
        self.deadlines.insert((expires_at, id));
        Some(hold)
    }

    /// Active holds that are overdue at `now`, earliest deadline first.
    pub(crate) fn overdue(&self, now: DateTime<Utc>, clock_skew: Duration) -> Vec<HoldId> {
        self.deadlines
            .iter()
            .map(|(_, id)| *id)
            .take_while(|id| {
                self.holds
                    .get(id)
                    .is_some_and(|hold| hold.is_overdue(now, clock_skew))
            })
            .collect()
    }

    /// Move an active hold into `state` and onto the retired list.
    ///
    /// Returns the retired hold and the ID evicted to make room, if any.
    /// The hold stays active if the transition is refused.
    pub(crate) fn retire(&mut self, id: HoldId, state: HoldState) -> Result<(Hold, Option<HoldId>)> {
        let hold = self.holds.get_mut(&id).ok_or(BoxofficeError::HoldNotFound(id))?;
        hold.transition(state)?;
        self.deadlines.remove(&(hold.expires_at, id));
        let hold = self.holds.remove(&id).ok_or(BoxofficeError::HoldNotFound(id))?;

        let evicted = if self.retired_order.len() >= self.retired_capacity {
            self.retired_order.pop_front()
        } else {
            None
        };
        if let Some(old) = evicted {
            self.retired.remove(&old);
        }
        self.retired_order.push_back(id);
        self.retired.insert(id, hold.clone());
        Ok((hold, evicted))
    }
}

/// Per-ticket-type books plus seat state.
pub struct AvailabilityLedger {
    books: HashMap<TicketTypeId, Mutex<TypeBook>>,
    seats: SeatAssignor,
}

impl AvailabilityLedger {
    /// Create empty books for every ticket type of the catalog.
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        let books = catalog
            .ticket_types()
            .map(|tt| {
                (
                    tt.id,
                    Mutex::new(TypeBook::new(tt.clone(), RETIRED_HOLDS_PER_TYPE)),
                )
            })
            .collect();
        Self {
            books,
            seats: SeatAssignor::new(catalog),
        }
    }

    /// Lock the book of one ticket type.
    ///
    /// # Errors
    /// Returns `TicketTypeNotFound` for unknown IDs.
    pub(crate) fn book(&self, id: TicketTypeId) -> Result<MutexGuard<'_, TypeBook>> {
        self.books
            .get(&id)
            .map(sync::lock)
            .ok_or(BoxofficeError::TicketTypeNotFound(id))
    }

    pub(crate) fn ticket_type_ids(&self) -> impl Iterator<Item = TicketTypeId> + '_ {
        self.books.keys().copied()
    }

    #[must_use]
    pub fn seats(&self) -> &SeatAssignor {
        &self.seats
    }

    /// How many units of `ticket_type` could be reserved now.
    ///
    /// For seated types, `seat_refs` narrows the question to those seats;
    /// empty means "any seat of this type". Overdue holds that no sweep has
    /// reached yet still count as held here, so this can be slightly stale.
    ///
    /// # Errors
    /// Returns `TicketTypeNotFound` for unknown IDs.
    pub fn available(&self, ticket_type: TicketTypeId, seat_refs: &[SeatRef]) -> Result<Availability> {
        let book = self.book(ticket_type)?;
        let counted = book.entry.available();
        match book.ticket_type.seatmap() {
            None => Ok(counted),
            Some(map) => {
                let seats = self.seats.count_available(map, ticket_type, seat_refs);
                Ok(counted.min(Availability::Limited(seats)))
            }
        }
    }

    /// Snapshot of the counters for one ticket type.
    ///
    /// # Errors
    /// Returns `TicketTypeNotFound` for unknown IDs.
    pub fn entry(&self, ticket_type: TicketTypeId) -> Result<LedgerEntry> {
        Ok(self.book(ticket_type)?.entry.clone())
    }
}
