//! Hold manager: creates, extends, releases, expires, and consumes holds.
//!
//! The HoldManager is the only writer of hold state. Every operation on a
//! hold of ticket type `T` runs while `T`'s ledger book is locked, and seat
//! changes happen inside that same critical section. Together with lazy
//! expiry on every write path this keeps the sequence of committed hold
//! operations linearizable against the capacity ceiling.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use boxoffice_types::{
    sync, BoxofficeError, CheckoutConfig, Hold, HoldId, HoldState, OrderId, Result, SeatRef,
    TicketTypeId,
};
use chrono::{DateTime, Duration, Utc};

use crate::ledger::{Availability, AvailabilityLedger, TypeBook};
use crate::price_resolver::resolve_price;

/// Parameters of a single reservation.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
    pub seat_refs: Vec<SeatRef>,
    /// Order that will own the hold, if already known.
    pub order_id: Option<OrderId>,
    /// Overrides the configured checkout window.
    pub ttl: Option<Duration>,
}

impl HoldRequest {
    #[must_use]
    pub fn new(ticket_type_id: TicketTypeId, quantity: u32) -> Self {
        Self {
            ticket_type_id,
            quantity,
            seat_refs: Vec::new(),
            order_id: None,
            ttl: None,
        }
    }

    #[must_use]
    pub fn with_seats(mut self, seat_refs: Vec<SeatRef>) -> Self {
        self.seat_refs = seat_refs;
        self
    }

    #[must_use]
    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Manages the hold lifecycle against the availability ledger.
pub struct HoldManager {
    ledger: Arc<AvailabilityLedger>,
    /// Which ticket type each hold belongs to.
    index: RwLock<HashMap<HoldId, TicketTypeId>>,
    default_ttl: Duration,
    clock_skew: Duration,
}

impl HoldManager {
    #[must_use]
    pub fn new(ledger: Arc<AvailabilityLedger>, config: &CheckoutConfig) -> Self {
        Self {
            ledger,
            index: RwLock::new(HashMap::new()),
            default_ttl: config.hold_ttl(),
            clock_skew: config.clock_skew(),
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &AvailabilityLedger {
        &self.ledger
    }

    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Atomically check availability and reserve.
    ///
    /// 1. Lock the ticket type's book and expire its overdue holds
    /// 2. Validate sales window, per-order limit, seat selection, and lifetime
    /// 3. Reserve capacity, then seats (all-or-nothing)
    /// 4. Record the hold with the unit price resolved at `now`
    ///
    /// If any step fails nothing is reserved.
    ///
    /// # Errors
    /// `InsufficientInventory`, `OverPerOrderLimit`, `OutsideSalesWindow`,
    /// `SeatUnavailable`, `InvalidRequest`, or `TicketTypeNotFound`.
    pub fn create_hold(&self, request: &HoldRequest, now: DateTime<Utc>) -> Result<Hold> {
        let tt_id = request.ticket_type_id;
        let mut book = self.ledger.book(tt_id)?;
        self.expire_book(&mut book, now);

        let tt = &book.ticket_type;
        if request.quantity == 0 {
            return Err(BoxofficeError::InvalidRequest {
                reason: "quantity must be at least 1".to_string(),
            });
        }
        if !tt.is_on_sale(now) {
            tracing::info!(ticket_type = %tt_id, "hold rejected: outside sales window");
            return Err(BoxofficeError::OutsideSalesWindow(tt_id));
        }
        if let Some(limit) = tt.per_order_limit {
            if request.quantity > limit {
                return Err(BoxofficeError::OverPerOrderLimit {
                    ticket_type: tt_id,
                    requested: request.quantity,
                    limit,
                });
            }
        }
        let seatmap = tt.seatmap();
        match seatmap {
            Some(_) if u32::try_from(request.seat_refs.len()).ok() != Some(request.quantity) => {
                return Err(BoxofficeError::InvalidRequest {
                    reason: format!(
                        "seated ticket type needs exactly {} seat refs, got {}",
                        request.quantity,
                        request.seat_refs.len()
                    ),
                });
            }
            None if !request.seat_refs.is_empty() => {
                return Err(BoxofficeError::InvalidRequest {
                    reason: "seat refs given for a general-admission ticket type".to_string(),
                });
            }
            _ => {}
        }
        let unit_price_cents = resolve_price(tt, now);
        let expires_at = now
            .checked_add_signed(request.ttl.unwrap_or(self.default_ttl))
            .ok_or_else(invalid_ttl)?;

        if let Err(err) = book.entry.try_reserve(tt_id, request.quantity) {
            tracing::warn!(
                ticket_type = %tt_id,
                requested = request.quantity,
                "hold rejected: insufficient inventory"
            );
            return Err(err);
        }

        let hold_id = HoldId::new();
        if let Some(map) = seatmap {
            if let Err(err) =
                self.ledger
                    .seats()
                    .reserve_seats(map, tt_id, &request.seat_refs, hold_id)
            {
                book.entry.release(request.quantity)?;
                tracing::warn!(ticket_type = %tt_id, error = %err, "hold rejected: seat unavailable");
                return Err(err);
            }
        }

        let hold = Hold {
            id: hold_id,
            ticket_type_id: tt_id,
            quantity: request.quantity,
            seats: request.seat_refs.clone(),
            order_id: request.order_id,
            unit_price_cents,
            state: HoldState::Active,
            created_at: now,
            expires_at,
        };
        book.insert_active(hold.clone());
        sync::write(&self.index).insert(hold_id, tt_id);

        tracing::info!(
            hold = %hold_id,
            ticket_type = %tt_id,
            quantity = hold.quantity,
            expires_at = %hold.expires_at,
            "hold created"
        );
        Ok(hold)
    }

    /// Release a hold, returning its units and seats. Idempotent: releasing
    /// a hold that is already released, expired, or consumed changes nothing
    /// and returns its current state.
    ///
    /// # Errors
    /// Returns `HoldNotFound` for unknown IDs.
    pub fn release_hold(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<Hold> {
        let mut book = self.book_for(hold_id)?;
        self.expire_book(&mut book, now);
        let hold = book
            .hold(hold_id)
            .cloned()
            .ok_or(BoxofficeError::HoldNotFound(hold_id))?;
        if hold.state != HoldState::Active {
            return Ok(hold);
        }

        self.unreserve(&mut book, hold.quantity, hold_id)?;
        let released = self.retire(&mut book, hold_id, HoldState::Released)?;
        tracing::info!(hold = %hold_id, quantity = released.quantity, "hold released");
        Ok(released)
    }

    /// Push the deadline of a live hold to `now + ttl`.
    ///
    /// # Errors
    /// `HoldAlreadyTerminal` if the hold is no longer active (including one
    /// that just turned out to be overdue), `HoldNotFound` for unknown IDs.
    pub fn extend_hold(&self, hold_id: HoldId, ttl: Duration, now: DateTime<Utc>) -> Result<Hold> {
        let mut book = self.book_for(hold_id)?;
        self.expire_book(&mut book, now);
        let current = book
            .hold(hold_id)
            .ok_or(BoxofficeError::HoldNotFound(hold_id))?;
        if current.state != HoldState::Active {
            return Err(BoxofficeError::HoldAlreadyTerminal {
                hold_id,
                state: current.state,
            });
        }
        let requested = now.checked_add_signed(ttl).ok_or_else(invalid_ttl)?;
        let expires_at = current.expires_at.max(requested);
        let hold = book
            .reschedule(hold_id, expires_at)
            .cloned()
            .ok_or(BoxofficeError::HoldNotFound(hold_id))?;
        tracing::debug!(hold = %hold_id, expires_at = %hold.expires_at, "hold extended");
        Ok(hold)
    }

    /// Expire every active hold whose deadline passed. Safe to run
    /// concurrently with `create_hold`; running it twice is a no-op.
    ///
    /// Returns the holds that this call moved to `expired`.
    pub fn expire_holds(&self, now: DateTime<Utc>) -> Vec<Hold> {
        let mut expired = Vec::new();
        for tt_id in self.ledger.ticket_type_ids() {
            if let Ok(mut book) = self.ledger.book(tt_id) {
                expired.extend(self.expire_book(&mut book, now));
            }
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired overdue holds");
        }
        expired
    }

    /// Turn a live hold into issued inventory: `active → consumed`, held
    /// units become issued, held seats become assigned.
    ///
    /// Fails closed: a hold that is released, expired, or past its deadline
    /// is never consumed, because inventory cannot be fabricated after the
    /// fact.
    ///
    /// # Errors
    /// `HoldAlreadyTerminal` or `HoldNotFound`.
    pub fn consume_hold(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<Hold> {
        let mut book = self.book_for(hold_id)?;
        self.expire_book(&mut book, now);
        let hold = book
            .hold(hold_id)
            .cloned()
            .ok_or(BoxofficeError::HoldNotFound(hold_id))?;
        if hold.state != HoldState::Active {
            return Err(BoxofficeError::HoldAlreadyTerminal {
                hold_id,
                state: hold.state,
            });
        }

        book.entry.commit(hold.quantity)?;
        if let Some(map) = book.ticket_type.seatmap() {
            self.ledger.seats().assign_seats(map, hold_id)?;
        }
        let consumed = self.retire(&mut book, hold_id, HoldState::Consumed)?;
        tracing::info!(hold = %hold_id, quantity = consumed.quantity, "hold consumed");
        Ok(consumed)
    }

    /// Return issued units (and optionally their seat) to sale after a
    /// ticket is refunded or voided.
    ///
    /// # Errors
    /// `TicketTypeNotFound`, `SeatUnavailable`, or a ledger underflow.
    pub fn return_issued(
        &self,
        ticket_type: TicketTypeId,
        quantity: u32,
        seat: Option<&SeatRef>,
    ) -> Result<()> {
        let mut book = self.ledger.book(ticket_type)?;
        book.entry.return_issued(quantity)?;
        if let (Some(map), Some(seat)) = (book.ticket_type.seatmap(), seat) {
            self.ledger.seats().void_seat(map, seat)?;
        }
        Ok(())
    }

    /// Current snapshot of a hold. Overdue holds read as expired.
    ///
    /// `None` for unknown holds and for finished holds that have aged out
    /// of their book's retired list.
    #[must_use]
    pub fn hold(&self, hold_id: HoldId, now: DateTime<Utc>) -> Option<Hold> {
        let mut book = self.book_for(hold_id).ok()?;
        self.expire_book(&mut book, now);
        book.hold(hold_id).cloned()
    }

    /// Availability of a ticket type, see [`AvailabilityLedger::available`].
    ///
    /// # Errors
    /// Returns `TicketTypeNotFound` for unknown IDs.
    pub fn available(&self, ticket_type: TicketTypeId, seat_refs: &[SeatRef]) -> Result<Availability> {
        self.ledger.available(ticket_type, seat_refs)
    }

    fn book_for(&self, hold_id: HoldId) -> Result<std::sync::MutexGuard<'_, TypeBook>> {
        let tt_id = sync::read(&self.index)
            .get(&hold_id)
            .copied()
            .ok_or(BoxofficeError::HoldNotFound(hold_id))?;
        self.ledger.book(tt_id)
    }

    /// Expire overdue holds of one locked book. Shared by the sweep and by
    /// the lazy check on every write path so both use the same deadline.
    fn expire_book(&self, book: &mut TypeBook, now: DateTime<Utc>) -> Vec<Hold> {
        let mut expired = Vec::new();
        for hold_id in book.overdue(now, self.clock_skew) {
            let Some(quantity) = book.active(hold_id).map(|hold| hold.quantity) else {
                continue;
            };
            if let Err(err) = book.entry.release(quantity) {
                tracing::error!(hold = %hold_id, error = %err, "ledger out of sync while expiring hold");
                continue;
            }
            if let Some(map) = book.ticket_type.seatmap() {
                if let Err(err) = self.ledger.seats().release_seats(map, hold_id) {
                    tracing::error!(hold = %hold_id, error = %err, "failed to release seats of expired hold");
                }
            }
            match self.retire(book, hold_id, HoldState::Expired) {
                Ok(hold) => {
                    tracing::debug!(hold = %hold_id, expires_at = %hold.expires_at, "hold expired");
                    expired.push(hold);
                }
                Err(err) => {
                    tracing::error!(hold = %hold_id, error = %err, "failed to retire expired hold");
                }
            }
        }
        expired
    }

    /// Give a hold's units and seats back to the book.
    fn unreserve(&self, book: &mut TypeBook, quantity: u32, hold_id: HoldId) -> Result<()> {
        book.entry.release(quantity)?;
        if let Some(map) = book.ticket_type.seatmap() {
            self.ledger.seats().release_seats(map, hold_id)?;
        }
        Ok(())
    }

    /// Retire a hold from its locked book and forget the one it displaced.
    fn retire(&self, book: &mut TypeBook, hold_id: HoldId, state: HoldState) -> Result<Hold> {
        let (hold, evicted) = book.retire(hold_id, state)?;
        if let Some(old) = evicted {
            sync::write(&self.index).remove(&old);
        }
        Ok(hold)
    }
}

fn invalid_ttl() -> BoxofficeError {
    BoxofficeError::InvalidRequest {
        reason: "hold lifetime out of range".to_string(),
    }
}
