//! Order types: one buyer's checkout attempt and the unit of payment.
//!
//! ```text
//!              payment success            refund
//!   PENDING ───────────────────▶ PAID ───────────▶ REFUNDED
//!      │                           │
//!      │ cancel / hold expiry /    │ chargeback notice
//!      │ payment failure           ▼
//!      ▼                       CHARGEBACK
//!   CANCELED
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BoxofficeError, BuyerId, EventId, HoldId, OrderId, SeatRef, TicketTypeId};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Canceled,
    Refunded,
    Chargeback,
}

impl OrderStatus {
    /// Can an order move from `self` to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Paid | Self::Canceled)
                | (Self::Paid, Self::Refunded | Self::Chargeback)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Refunded | Self::Chargeback)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Chargeback => write!(f, "CHARGEBACK"),
        }
    }
}

/// Operator-facing markers set when an order needs manual attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderFlag {
    /// A payment event reported a different amount or currency.
    AmountMismatch,
    /// Paid, but some holds were no longer active at settlement.
    TicketIssuancePending,
    /// Money arrived for an order that had already been canceled.
    RefundRequired,
}

/// What the buyer asked for, per ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
    #[serde(default)]
    pub seat_refs: Vec<SeatRef>,
}

/// A priced line of an order, backed by exactly one hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub ticket_type_id: TicketTypeId,
    pub hold_id: HoldId,
    pub quantity: u32,
    pub unit_price_cents: u64,
    pub fee_cents: u64,
    pub seats: Vec<SeatRef>,
}

impl LineItem {
    /// `(unit price + fee) × quantity`, or `None` on overflow.
    #[must_use]
    pub fn subtotal_cents(&self) -> Option<u64> {
        self.unit_price_cents
            .checked_add(self.fee_cents)?
            .checked_mul(u64::from(self.quantity))
    }
}

/// One buyer's checkout attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub event_id: EventId,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub total_cents: u64,
    pub status: OrderStatus,
    pub payment_provider: Option<String>,
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub flags: Vec<OrderFlag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Move to `target`, enforcing the order state machine.
    ///
    /// # Errors
    /// Returns [`BoxofficeError::InvalidOrderTransition`] for illegal moves.
    pub fn transition(&mut self, target: OrderStatus, now: DateTime<Utc>) -> crate::Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(BoxofficeError::InvalidOrderTransition {
                order_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Add an operator flag once.
    pub fn flag(&mut self, flag: OrderFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    #[must_use]
    pub fn has_flag(&self, flag: OrderFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Every hold backing this order.
    pub fn hold_ids(&self) -> impl Iterator<Item = HoldId> + '_ {
        self.items.iter().map(|item| item.hold_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            buyer_id: BuyerId::new(),
            event_id: EventId::new(),
            items: vec![LineItem {
                ticket_type_id: TicketTypeId::new(),
                hold_id: HoldId::new(),
                quantity: 2,
                unit_price_cents: 2500,
                fee_cents: 100,
                seats: Vec::new(),
            }],
            currency: "USD".into(),
            total_cents: 5200,
            status: OrderStatus::Pending,
            payment_provider: None,
            payment_reference: None,
            flags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Refunded));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Chargeback));
    }

    #[test]
    fn paid_never_moves_backward() {
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn terminal_statuses() {
        for status in [
            OrderStatus::Canceled,
            OrderStatus::Refunded,
            OrderStatus::Chargeback,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(OrderStatus::Paid));
        }
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
    }

    #[test]
    fn transition_rejects_illegal_move() {
        let mut order = make_order();
        order.transition(OrderStatus::Canceled, Utc::now()).unwrap();
        let err = order.transition(OrderStatus::Paid, Utc::now()).unwrap_err();
        assert!(matches!(err, BoxofficeError::InvalidOrderTransition { .. }));
    }

    #[test]
    fn subtotal_includes_fee() {
        let order = make_order();
        assert_eq!(order.items[0].subtotal_cents(), Some(5200));
    }

    #[test]
    fn subtotal_overflow_is_none() {
        let mut order = make_order();
        order.items[0].unit_price_cents = u64::MAX / 2;
        assert_eq!(order.items[0].subtotal_cents(), None);
    }

    #[test]
    fn order_json_is_camel_case() {
        let mut order = make_order();
        order.flag(OrderFlag::TicketIssuancePending);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["totalCents"], 5200);
        assert_eq!(json["status"], "pending");
        assert_eq!(json["flags"][0], "ticket_issuance_pending");
        assert!(json["buyerId"].is_string());
        assert_eq!(json["items"][0]["unitPriceCents"], 2500);
        assert!(json["items"][0]["holdId"].is_string());
        assert!(json.get("total_cents").is_none());
    }

    #[test]
    fn flags_are_deduplicated() {
        let mut order = make_order();
        order.flag(OrderFlag::AmountMismatch);
        order.flag(OrderFlag::AmountMismatch);
        assert_eq!(order.flags.len(), 1);
        assert!(order.has_flag(OrderFlag::AmountMismatch));
    }
}
