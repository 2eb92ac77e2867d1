//! In-memory order and payment-attempt rows.
//!
//! Each order is its own row behind its own mutex. Whoever changes an order
//! (orchestrator or settlement) locks that row for the whole change, so
//! writes to one order serialize while different orders proceed in
//! parallel. Lock order is always: order row, then ledger book, then seats.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use boxoffice_types::{
    sync, BoxofficeError, Order, OrderId, OrderStatus, PaymentAttempt, PaymentAttemptStatus,
    Result,
};

/// Shared handle to one order row.
pub type OrderRow = Arc<Mutex<Order>>;

#[derive(Default)]
pub struct OrderStore {
    orders: RwLock<HashMap<OrderId, OrderRow>>,
    /// Payment attempts keyed by provider reference.
    attempts: RwLock<HashMap<String, PaymentAttempt>>,
}

impl OrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created order.
    pub fn insert(&self, order: Order) -> OrderRow {
        let id = order.id;
        let row = Arc::new(Mutex::new(order));
        sync::write(&self.orders).insert(id, Arc::clone(&row));
        row
    }

    /// The row of one order, to be locked by the caller.
    ///
    /// # Errors
    /// Returns `OrderNotFound` for unknown IDs.
    pub fn row(&self, id: OrderId) -> Result<OrderRow> {
        sync::read(&self.orders)
            .get(&id)
            .cloned()
            .ok_or(BoxofficeError::OrderNotFound(id))
    }

    /// A copy of the current order state.
    ///
    /// # Errors
    /// Returns `OrderNotFound` for unknown IDs.
    pub fn snapshot(&self, id: OrderId) -> Result<Order> {
        let row = self.row(id)?;
        let order = sync::lock(&row).clone();
        Ok(order)
    }

    /// IDs of every order currently `pending`.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<OrderId> {
        let rows: Vec<(OrderId, OrderRow)> = sync::read(&self.orders)
            .iter()
            .map(|(id, row)| (*id, Arc::clone(row)))
            .collect();
        rows.into_iter()
            .filter(|(_, row)| sync::lock(row).status == OrderStatus::Pending)
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        sync::read(&self.orders).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a new payment attempt under its provider reference.
    ///
    /// # Errors
    /// Returns `Internal` if the reference is already taken, since
    /// references are the settlement key and must never collide.
    pub fn record_attempt(&self, attempt: PaymentAttempt) -> Result<()> {
        let mut attempts = sync::write(&self.attempts);
        if attempts.contains_key(&attempt.provider_reference) {
            return Err(BoxofficeError::Internal(format!(
                "duplicate provider reference {}",
                attempt.provider_reference
            )));
        }
        attempts.insert(attempt.provider_reference.clone(), attempt);
        Ok(())
    }

    #[must_use]
    pub fn attempt(&self, provider_reference: &str) -> Option<PaymentAttempt> {
        sync::read(&self.attempts).get(provider_reference).cloned()
    }

    /// Store a raw payload against an attempt and optionally move its status.
    ///
    /// # Errors
    /// Returns `UnknownPaymentReference` for unknown references.
    pub fn update_attempt(
        &self,
        provider_reference: &str,
        status: Option<PaymentAttemptStatus>,
        raw_event: Option<String>,
    ) -> Result<PaymentAttempt> {
        let mut attempts = sync::write(&self.attempts);
        let attempt = attempts
            .get_mut(provider_reference)
            .ok_or_else(|| BoxofficeError::UnknownPaymentReference(provider_reference.to_string()))?;
        if let Some(status) = status {
            attempt.status = status;
        }
        if let Some(raw) = raw_event {
            attempt.raw_events.push(raw);
        }
        Ok(attempt.clone())
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_types::*;
    use chrono::Utc;

    use super::*;

    fn order(holds: usize) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            buyer_id: BuyerId::new(),
            event_id: EventId::new(),
            items: (0..holds)
                .map(|_| LineItem {
                    ticket_type_id: TicketTypeId::new(),
                    hold_id: HoldId::new(),
                    quantity: 1,
                    unit_price_cents: 1000,
                    fee_cents: 0,
                    seats: Vec::new(),
                })
                .collect(),
            currency: "USD".into(),
            total_cents: 1000,
            status: OrderStatus::Pending,
            payment_provider: None,
            payment_reference: None,
            flags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn attempt(order_id: OrderId, reference: &str) -> PaymentAttempt {
        PaymentAttempt {
            id: PaymentAttemptId::new(),
            order_id,
            provider: "stripe".into(),
            provider_reference: reference.into(),
            amount_cents: 1000,
            currency: "USD".into(),
            status: PaymentAttemptStatus::Initialized,
            return_url: None,
            raw_events: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_then_snapshot() {
        let store = OrderStore::new();
        let o = order(2);
        let id = o.id;
        store.insert(o);

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot(id).unwrap().items.len(), 2);
        assert!(matches!(
            store.row(OrderId::new()),
            Err(BoxofficeError::OrderNotFound(_))
        ));
    }

    #[test]
    fn pending_ids_tracks_status() {
        let store = OrderStore::new();
        let a = store.insert(order(1));
        let b = store.insert(order(1));
        let b_id = sync::lock(&b).id;
        sync::lock(&a)
            .transition(OrderStatus::Canceled, Utc::now())
            .unwrap();

        assert_eq!(store.pending_ids(), vec![b_id]);
    }

    #[test]
    fn attempts_by_reference() {
        let store = OrderStore::new();
        let id = OrderId::new();
        store.record_attempt(attempt(id, "pi_1")).unwrap();
        assert!(store.record_attempt(attempt(id, "pi_1")).is_err());
        store.record_attempt(attempt(id, "pi_2")).unwrap();

        let updated = store
            .update_attempt("pi_1", Some(PaymentAttemptStatus::Succeeded), Some("{}".into()))
            .unwrap();
        assert_eq!(updated.status, PaymentAttemptStatus::Succeeded);
        assert_eq!(updated.raw_events.len(), 1);
        assert_eq!(store.attempt("pi_2").unwrap().status, PaymentAttemptStatus::Initialized);
        assert!(store.update_attempt("nope", None, None).is_err());
    }
}
