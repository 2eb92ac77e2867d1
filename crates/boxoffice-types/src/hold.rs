//! # Hold: the time-boxed inventory reservation
//!
//! A `Hold` reserves `quantity` units of one ticket type (and, for seated
//! types, a concrete set of seats) while the buyer completes payment.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  settlement   ┌──────────┐
//!   │ ACTIVE ├──────────────▶│ CONSUMED │
//!   └─┬────┬─┘               └──────────┘
//!     │    │ deadline passed
//!     │    ▼
//!     │  ┌─────────┐
//!     │  │ EXPIRED │
//!     │  └─────────┘
//!     │ cancel
//!     ▼
//!   ┌──────────┐
//!   │ RELEASED │
//!   └──────────┘
//! ```
//!
//! Every non-active state is terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{BoxofficeError, HoldId, OrderId, SeatRef, TicketTypeId};

/// The lifecycle state of a Hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    /// Inventory is reserved against the ledger.
    Active,
    /// Settlement turned the hold into issued tickets. **Irreversible.**
    Consumed,
    /// Explicitly cancelled; inventory returned.
    Released,
    /// The deadline passed before payment; inventory returned.
    Expired,
}

impl HoldState {
    /// Can this hold transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Consumed | Self::Released | Self::Expired)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for HoldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Consumed => write!(f, "CONSUMED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A reservation of inventory against one ticket type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
    /// Concrete seats, empty for general admission.
    pub seats: Vec<SeatRef>,
    /// Order that owns this hold, once one has been built around it.
    pub order_id: Option<OrderId>,
    /// Unit price captured from the price resolver at hold time.
    pub unit_price_cents: u64,
    pub state: HoldState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// The last instant at which the hold is still honoured, given the
    /// agreed clock-skew tolerance.
    #[must_use]
    pub fn deadline(&self, clock_skew: Duration) -> DateTime<Utc> {
        self.expires_at
            .checked_add_signed(clock_skew)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The single expiry predicate shared by the sweep, lazy expiry, and
    /// consumption.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>, clock_skew: Duration) -> bool {
        now > self.deadline(clock_skew)
    }

    /// Attempt to move into `target`.
    ///
    /// # Errors
    /// Returns [`BoxofficeError::HoldAlreadyTerminal`] if the hold is not active.
    pub fn transition(&mut self, target: HoldState) -> crate::Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(BoxofficeError::HoldAlreadyTerminal {
                hold_id: self.id,
                state: self.state,
            });
        }
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hold(now: DateTime<Utc>) -> Hold {
        Hold {
            id: HoldId::new(),
            ticket_type_id: TicketTypeId::new(),
            quantity: 2,
            seats: Vec::new(),
            order_id: None,
            unit_price_cents: 5000,
            state: HoldState::Active,
            created_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn state_transitions_valid() {
        assert!(HoldState::Active.can_transition_to(HoldState::Consumed));
        assert!(HoldState::Active.can_transition_to(HoldState::Released));
        assert!(HoldState::Active.can_transition_to(HoldState::Expired));
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [HoldState::Consumed, HoldState::Released, HoldState::Expired] {
            assert!(terminal.is_terminal());
            for target in [
                HoldState::Active,
                HoldState::Consumed,
                HoldState::Released,
                HoldState::Expired,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be rejected"
                );
            }
        }
    }

    #[test]
    fn double_consume_blocked() {
        let mut hold = make_hold(Utc::now());
        hold.transition(HoldState::Consumed).unwrap();
        let err = hold.transition(HoldState::Consumed).unwrap_err();
        assert!(matches!(
            err,
            BoxofficeError::HoldAlreadyTerminal {
                state: HoldState::Consumed,
                ..
            }
        ));
    }

    #[test]
    fn overdue_respects_clock_skew() {
        let now = Utc::now();
        let hold = make_hold(now);
        let skew = Duration::seconds(5);

        assert!(!hold.is_overdue(hold.expires_at, skew));
        assert!(!hold.is_overdue(hold.expires_at + skew, skew));
        assert!(hold.is_overdue(hold.expires_at + skew + Duration::milliseconds(1), skew));
        assert!(!hold.is_overdue(now, skew));
    }

    #[test]
    fn deadline_saturates_near_the_end_of_time() {
        let mut hold = make_hold(Utc::now());
        hold.expires_at = DateTime::<Utc>::MAX_UTC;
        assert_eq!(hold.deadline(Duration::seconds(5)), DateTime::<Utc>::MAX_UTC);
        assert!(!hold.is_overdue(Utc::now(), Duration::seconds(5)));
    }
}
