//! Settlement idempotency guard: prevents double-settlement.
//!
//! Providers deliver webhooks at least once. Each `(providerReference,
//! outcome)` pair is applied at most once; a replay is answered with
//! `AlreadyApplied` without touching the order.
//!
//! The guard maintains an LRU-style bounded cache so memory usage stays
//! predictable in long-running services. Eviction is safe because order
//! status is the second, durable guard: an evicted key whose order already
//! left `pending` is still never re-settled.

use std::collections::{HashSet, VecDeque};

use boxoffice_types::PaymentOutcome;

/// Identity of one applied payment event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettlementKey {
    pub provider_reference: String,
    pub outcome: PaymentOutcome,
}

impl SettlementKey {
    pub fn new(provider_reference: impl Into<String>, outcome: PaymentOutcome) -> Self {
        Self {
            provider_reference: provider_reference.into(),
            outcome,
        }
    }
}

/// Bounded set of applied settlement keys with LRU eviction.
pub struct IdempotencyGuard {
    applied: HashSet<SettlementKey>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<SettlementKey>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// A `max_size` of zero is treated as one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            applied: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Record `key` as applied. Returns `false` if it already was.
    pub fn mark_applied(&mut self, key: SettlementKey) -> bool {
        if self.applied.contains(&key) {
            return false;
        }

        if self.applied.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.applied.remove(&oldest);
            }
        }

        self.applied.insert(key.clone());
        self.order.push_back(key);
        true
    }

    #[must_use]
    pub fn is_applied(&self, key: &SettlementKey) -> bool {
        self.applied.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(reference: &str) -> SettlementKey {
        SettlementKey::new(reference, PaymentOutcome::Succeeded)
    }

    #[test]
    fn first_apply_ok() {
        let mut guard = IdempotencyGuard::new(100);
        assert!(guard.mark_applied(key("pi_1")));
        assert!(guard.is_applied(&key("pi_1")));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn replay_detected() {
        let mut guard = IdempotencyGuard::new(100);
        assert!(guard.mark_applied(key("pi_1")));
        assert!(!guard.mark_applied(key("pi_1")));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn outcome_is_part_of_the_key() {
        let mut guard = IdempotencyGuard::new(100);
        guard.mark_applied(key("pi_1"));
        assert!(!guard.is_applied(&SettlementKey::new("pi_1", PaymentOutcome::Failed)));
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = IdempotencyGuard::new(3);
        for reference in ["a", "b", "c", "d"] {
            guard.mark_applied(key(reference));
        }
        assert_eq!(guard.len(), 3);
        assert!(!guard.is_applied(&key("a")), "a should have been evicted");
        assert!(guard.is_applied(&key("b")));
        assert!(guard.is_applied(&key("d")));
    }

    #[test]
    fn zero_size_still_remembers_latest() {
        let mut guard = IdempotencyGuard::new(0);
        assert!(guard.is_empty());
        guard.mark_applied(key("a"));
        assert!(guard.is_applied(&key("a")));
    }
}
