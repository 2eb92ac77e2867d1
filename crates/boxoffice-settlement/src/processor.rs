//! Settlement processor: applies verified payment events to orders.
//!
//! Two guards keep settlement exactly-once under at-least-once, unordered
//! delivery:
//! - the [`IdempotencyGuard`] on `(providerReference, outcome)`, checked
//!   before and again after the order row is locked;
//! - the order status itself: only a `pending` order is ever settled, and
//!   nothing moves an order backward out of `paid`.
//!
//! Every event for one order is applied while that order's row lock is
//! held, so duplicate concurrent deliveries serialize and the second one
//! observes the first one's result. The ticket notifier runs after that
//! lock is released.

use std::sync::{Arc, Mutex};

use boxoffice_checkout::Orchestrator;
use boxoffice_types::{
    sync, BoxofficeError, CanonicalPaymentEvent, Order, OrderFlag, OrderId, OrderStatus,
    PaymentAttempt, PaymentAttemptStatus, PaymentOutcome, Result, Ticket, TicketStatus,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::idempotency::{IdempotencyGuard, SettlementKey};
use crate::notifier::TicketNotifier;
use crate::reconciliation::{ReconciliationCase, ReconciliationQueue, ReconciliationReason};
use crate::ticket_issuer::TicketIssuer;

/// Result of applying one payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// The event changed the order (or raised a reconciliation case for it).
    Applied,
    /// The event was seen before, or the order already moved past it.
    AlreadyApplied,
    /// Amount or currency differs from the order; the order stays `pending`.
    Mismatch,
}

pub struct SettlementProcessor {
    orchestrator: Arc<Orchestrator>,
    guard: Mutex<IdempotencyGuard>,
    tickets: Arc<TicketIssuer>,
    reconciliation: Arc<ReconciliationQueue>,
    notifier: Arc<dyn TicketNotifier>,
}

impl SettlementProcessor {
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        idempotency_cache_size: usize,
        tickets: Arc<TicketIssuer>,
        reconciliation: Arc<ReconciliationQueue>,
        notifier: Arc<dyn TicketNotifier>,
    ) -> Self {
        Self {
            orchestrator,
            guard: Mutex::new(IdempotencyGuard::new(idempotency_cache_size)),
            tickets,
            reconciliation,
            notifier,
        }
    }

    #[must_use]
    pub fn tickets(&self) -> &TicketIssuer {
        &self.tickets
    }

    #[must_use]
    pub fn reconciliation(&self) -> &ReconciliationQueue {
        &self.reconciliation
    }

    /// Apply one verified payment event.
    ///
    /// # Errors
    /// `UnknownPaymentReference` if no attempt carries the event's
    /// reference, `OrderNotFound` if its order vanished. Business outcomes
    /// (mismatch, lapsed holds, late payments) are never errors.
    pub fn apply_payment_event(
        &self,
        event: &CanonicalPaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        let key = SettlementKey::new(event.provider_reference.clone(), event.outcome);
        if sync::lock(&self.guard).is_applied(&key) {
            tracing::debug!(
                reference = %event.provider_reference,
                provider_event = event.event_id.as_deref().unwrap_or("-"),
                outcome = %event.outcome,
                "replayed payment event"
            );
            return Ok(SettlementOutcome::AlreadyApplied);
        }

        let orders = self.orchestrator.orders();
        let attempt = orders
            .attempt(&event.provider_reference)
            .filter(|attempt| attempt.provider == event.provider)
            .ok_or_else(|| BoxofficeError::UnknownPaymentReference(event.provider_reference.clone()))?;
        let row = orders.row(attempt.order_id)?;
        let mut order = sync::lock(&row);

        if sync::lock(&self.guard).is_applied(&key) {
            return Ok(SettlementOutcome::AlreadyApplied);
        }
        let attempt =
            orders.update_attempt(&event.provider_reference, None, Some(event.raw_payload.clone()))?;

        let (outcome, issued) = match event.outcome {
            PaymentOutcome::Succeeded => self.settle_success(&mut order, &attempt, event, now)?,
            PaymentOutcome::Failed => (self.settle_failure(&mut order, &attempt, now)?, Vec::new()),
        };
        if outcome != SettlementOutcome::Mismatch {
            sync::lock(&self.guard).mark_applied(key);
        }
        let paid = (!issued.is_empty()).then(|| order.clone());
        drop(order);

        if let Some(order) = paid {
            if let Err(err) = self.notifier.tickets_issued(&order, &issued) {
                tracing::warn!(order = %order.id, error = %err, "ticket notification failed");
            }
        }
        Ok(outcome)
    }

    /// Returns the outcome and the tickets issued by this call.
    fn settle_success(
        &self,
        order: &mut Order,
        attempt: &PaymentAttempt,
        event: &CanonicalPaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<(SettlementOutcome, Vec<Ticket>)> {
        let orders = self.orchestrator.orders();
        if attempt.status == PaymentAttemptStatus::Succeeded {
            return Ok((SettlementOutcome::AlreadyApplied, Vec::new()));
        }

        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Canceled => {
                orders.update_attempt(&attempt.provider_reference, Some(PaymentAttemptStatus::Succeeded), None)?;
                order.flag(OrderFlag::RefundRequired);
                order.updated_at = now;
                self.raise(
                    order.id,
                    attempt,
                    event,
                    ReconciliationReason::PaymentAfterCancellation,
                    format!("{} {} received for a canceled order", event.amount_cents, event.currency),
                    now,
                );
                return Ok((SettlementOutcome::Applied, Vec::new()));
            }
            OrderStatus::Paid | OrderStatus::Refunded | OrderStatus::Chargeback => {
                orders.update_attempt(&attempt.provider_reference, Some(PaymentAttemptStatus::Succeeded), None)?;
                order.flag(OrderFlag::RefundRequired);
                order.updated_at = now;
                self.raise(
                    order.id,
                    attempt,
                    event,
                    ReconciliationReason::DuplicatePayment,
                    format!("order already {} via {:?}", order.status, order.payment_reference),
                    now,
                );
                return Ok((SettlementOutcome::Applied, Vec::new()));
            }
        }

        if event.amount_cents != order.total_cents || !event.currency.eq_ignore_ascii_case(&order.currency) {
            if !order.has_flag(OrderFlag::AmountMismatch) {
                let mismatch = BoxofficeError::AmountMismatch {
                    order_id: order.id,
                    expected_cents: order.total_cents,
                    expected_currency: order.currency.clone(),
                    actual_cents: event.amount_cents,
                    actual_currency: event.currency.clone(),
                };
                order.flag(OrderFlag::AmountMismatch);
                order.updated_at = now;
                self.raise(
                    order.id,
                    attempt,
                    event,
                    ReconciliationReason::AmountMismatch,
                    mismatch.to_string(),
                    now,
                );
            }
            return Ok((SettlementOutcome::Mismatch, Vec::new()));
        }

        let holds = self.orchestrator.holds();
        let mut issued: Vec<Ticket> = Vec::new();
        let mut lapsed = Vec::new();
        for (index, item) in order.items.iter().enumerate() {
            match holds.consume_hold(item.hold_id, now) {
                Ok(_) => issued.extend(self.tickets.issue_line(order.id, index, item, now)),
                Err(err) => lapsed.push((item.hold_id, err)),
            }
        }

        order.transition(OrderStatus::Paid, now)?;
        order.payment_provider = Some(attempt.provider.clone());
        order.payment_reference = Some(attempt.provider_reference.clone());
        orders.update_attempt(&attempt.provider_reference, Some(PaymentAttemptStatus::Succeeded), None)?;

        if !lapsed.is_empty() {
            order.flag(OrderFlag::TicketIssuancePending);
            for (hold_id, err) in lapsed {
                self.raise(
                    order.id,
                    attempt,
                    event,
                    ReconciliationReason::HoldExpiredBeforeSettlement,
                    format!("{hold_id}: {err}"),
                    now,
                );
            }
        }

        tracing::info!(
            order = %order.id,
            reference = %attempt.provider_reference,
            provider_event = event.event_id.as_deref().unwrap_or("-"),
            tickets = issued.len(),
            "order paid"
        );
        Ok((SettlementOutcome::Applied, issued))
    }

    fn settle_failure(
        &self,
        order: &mut Order,
        attempt: &PaymentAttempt,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome> {
        if attempt.status != PaymentAttemptStatus::Succeeded {
            self.orchestrator.orders().update_attempt(
                &attempt.provider_reference,
                Some(PaymentAttemptStatus::Failed),
                None,
            )?;
        }
        if order.status != OrderStatus::Pending {
            tracing::info!(
                order = %order.id,
                status = %order.status,
                reference = %attempt.provider_reference,
                "ignoring payment failure for settled order"
            );
            return Ok(SettlementOutcome::AlreadyApplied);
        }
        self.orchestrator.cancel_locked(order, now)?;
        tracing::info!(order = %order.id, reference = %attempt.provider_reference, "payment failed");
        Ok(SettlementOutcome::Applied)
    }

    fn raise(
        &self,
        order_id: OrderId,
        attempt: &PaymentAttempt,
        event: &CanonicalPaymentEvent,
        reason: ReconciliationReason,
        detail: String,
        now: DateTime<Utc>,
    ) {
        self.reconciliation.raise(ReconciliationCase {
            order_id,
            provider_reference: attempt.provider_reference.clone(),
            provider_event_id: event.event_id.clone(),
            reason,
            detail,
            raised_at: now,
        });
    }

    /// `paid → refunded`: refund every unused ticket and return its
    /// capacity (and seat) to sale.
    ///
    /// # Errors
    /// `OrderNotFound`, or `InvalidOrderTransition` unless the order is paid.
    pub fn refund_order(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        self.reverse(order_id, OrderStatus::Refunded, TicketStatus::Refunded, now)
    }

    /// `paid → chargeback`: void every unused ticket and return its capacity
    /// (and seat) to sale.
    ///
    /// # Errors
    /// `OrderNotFound`, or `InvalidOrderTransition` unless the order is paid.
    pub fn chargeback_order(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        self.reverse(order_id, OrderStatus::Chargeback, TicketStatus::Voided, now)
    }

    fn reverse(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        ticket_status: TicketStatus,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let row = self.orchestrator.orders().row(order_id)?;
        let mut order = sync::lock(&row);
        order.transition(target, now)?;

        let retired = self.tickets.retire_order(order_id, ticket_status);
        let holds = self.orchestrator.holds();
        for ticket in &retired {
            if let Err(err) = holds.return_issued(ticket.ticket_type_id, 1, ticket.seat_id.as_ref()) {
                tracing::error!(ticket = %ticket.id, error = %err, "failed to return ticket capacity");
            }
        }
        tracing::info!(order = %order_id, status = %target, tickets = retired.len(), "order reversed");
        Ok(order.clone())
    }

    /// Tickets issued for an order.
    ///
    /// # Errors
    /// Returns `OrderNotFound` for unknown IDs.
    pub fn list_tickets(&self, order_id: OrderId) -> Result<Vec<Ticket>> {
        self.orchestrator.orders().row(order_id)?;
        Ok(self.tickets.for_order(order_id))
    }

    /// Admit a ticket at the door.
    ///
    /// # Errors
    /// `TicketNotFound` or `InvalidTicketTransition`.
    pub fn check_in(&self, code: &str) -> Result<Ticket> {
        self.tickets.check_in(code)
    }
}
