//! Price resolution: base price or the tier active at a given instant.
//!
//! Tiers are half-open `[starts_at, ends_at)` windows. If data integrity is
//! broken and two tiers cover the same instant, the tier with the latest
//! `starts_at` wins and the violation is logged. Pricing never fails:
//! checkout must not be blocked by a bad tier table.

use boxoffice_types::{PriceTier, TicketType};
use chrono::{DateTime, Utc};

/// Resolve the unit price of `ticket_type` at `at`.
#[must_use]
pub fn resolve_price(ticket_type: &TicketType, at: DateTime<Utc>) -> u64 {
    let mut matching = ticket_type.tiers.iter().filter(|tier| tier.contains(at));

    let Some(first) = matching.next() else {
        return ticket_type.price_cents;
    };

    let mut winner = first;
    let mut overlap = false;
    for tier in matching {
        overlap = true;
        // `None` start means "since forever", the earliest possible start.
        if tier.starts_at > winner.starts_at {
            winner = tier;
        }
    }

    if overlap {
        tracing::warn!(
            ticket_type = %ticket_type.id,
            at = %at,
            chosen = %winner.name,
            "overlapping price tiers; picked the latest-starting tier"
        );
    }

    winner.price_cents
}

/// Name pairs of tiers whose windows intersect.
#[must_use]
pub fn overlapping_tiers(ticket_type: &TicketType) -> Vec<(String, String)> {
    let tiers = &ticket_type.tiers;
    let mut pairs = Vec::new();
    for (i, a) in tiers.iter().enumerate() {
        for b in &tiers[i + 1..] {
            if windows_intersect(a, b) {
                pairs.push((a.name.clone(), b.name.clone()));
            }
        }
    }
    pairs
}

fn windows_intersect(a: &PriceTier, b: &PriceTier) -> bool {
    // [a.start, a.end) ∩ [b.start, b.end) ≠ ∅  ⇔  a.start < b.end ∧ b.start < a.end
    let a_before_b_end = match (a.starts_at, b.ends_at) {
        (Some(start), Some(end)) => start < end,
        _ => true,
    };
    let b_before_a_end = match (b.starts_at, a.ends_at) {
        (Some(start), Some(end)) => start < end,
        _ => true,
    };
    a_before_b_end && b_before_a_end
}
