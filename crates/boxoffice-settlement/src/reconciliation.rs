//! Operator-facing queue of settlements that need a human.

use std::sync::Mutex;

use boxoffice_types::{sync, OrderId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationReason {
    /// Paid amount or currency differs from the order total.
    AmountMismatch,
    /// Money arrived after a hold lapsed; tickets for it were not issued.
    HoldExpiredBeforeSettlement,
    /// Money arrived for an order that had already been canceled.
    PaymentAfterCancellation,
    /// A second attempt was paid for an order that was already paid.
    DuplicatePayment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCase {
    pub order_id: OrderId,
    pub provider_reference: String,
    /// The provider's own ID for the webhook delivery, when it sends one.
    pub provider_event_id: Option<String>,
    pub reason: ReconciliationReason,
    pub detail: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ReconciliationQueue {
    cases: Mutex<Vec<ReconciliationCase>>,
}

impl ReconciliationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, case: ReconciliationCase) {
        tracing::warn!(
            target: "boxoffice::reconciliation",
            order = %case.order_id,
            reference = %case.provider_reference,
            provider_event = case.provider_event_id.as_deref().unwrap_or("-"),
            reason = ?case.reason,
            detail = %case.detail,
            "reconciliation case raised"
        );
        sync::lock(&self.cases).push(case);
    }

    #[must_use]
    pub fn cases(&self) -> Vec<ReconciliationCase> {
        sync::lock(&self.cases).clone()
    }

    #[must_use]
    pub fn for_order(&self, order_id: OrderId) -> Vec<ReconciliationCase> {
        sync::lock(&self.cases)
            .iter()
            .filter(|case| case.order_id == order_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        sync::lock(&self.cases).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
