//! Issued tickets.
//!
//! A ticket exists only after payment succeeded. Once issued it is
//! immutable apart from its status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{OrderId, SeatId, TicketId, TicketTypeId};

/// Prefix of every scannable ticket code.
pub const TICKET_CODE_PREFIX: &str = "TKT-";

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Issued,
    CheckedIn,
    Refunded,
    Voided,
}

impl TicketStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Issued, Self::CheckedIn | Self::Refunded | Self::Voided)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Issued => write!(f, "ISSUED"),
            Self::CheckedIn => write!(f, "CHECKED_IN"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Voided => write!(f, "VOIDED"),
        }
    }
}

/// A materialized admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub order_id: OrderId,
    pub ticket_type_id: TicketTypeId,
    /// Index of the order line item this ticket was issued from.
    pub line_item: usize,
    pub seat_id: Option<SeatId>,
    pub code: String,
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
}

/// Four hex characters of SHA-256 over the code body.
#[must_use]
pub fn ticket_code_check(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    hex::encode_upper(&digest[..2])
}

/// Build a full ticket code from random entropy.
#[must_use]
pub fn ticket_code_from_entropy(entropy: [u8; 6]) -> String {
    let body = hex::encode_upper(entropy);
    let check = ticket_code_check(&body);
    format!("{TICKET_CODE_PREFIX}{body}{check}")
}

/// Validate the shape and check suffix of a scanned code.
#[must_use]
pub fn verify_ticket_code(code: &str) -> bool {
    let Some(rest) = code.strip_prefix(TICKET_CODE_PREFIX) else {
        return false;
    };
    if rest.len() != 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    let (body, check) = rest.split_at(12);
    ticket_code_check(body) == check
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_verify() {
        let code = ticket_code_from_entropy([0xde, 0xad, 0xbe, 0xef, 0x01, 0x02]);
        assert!(code.starts_with("TKT-DEADBEEF0102"));
        assert_eq!(code.len(), 4 + 16);
        assert!(verify_ticket_code(&code));
    }

    #[test]
    fn tampered_code_rejected() {
        let code = ticket_code_from_entropy([1, 2, 3, 4, 5, 6]);
        let mut tampered = code.clone();
        tampered.replace_range(4..5, if &code[4..5] == "0" { "1" } else { "0" });
        assert!(!verify_ticket_code(&tampered));
        assert!(!verify_ticket_code("TKT-XYZ"));
        assert!(!verify_ticket_code("not-a-ticket"));
    }

    #[test]
    fn ticket_transitions() {
        assert!(TicketStatus::Issued.can_transition_to(TicketStatus::CheckedIn));
        assert!(TicketStatus::Issued.can_transition_to(TicketStatus::Voided));
        assert!(!TicketStatus::CheckedIn.can_transition_to(TicketStatus::Issued));
        assert!(!TicketStatus::Voided.can_transition_to(TicketStatus::CheckedIn));
    }
}
