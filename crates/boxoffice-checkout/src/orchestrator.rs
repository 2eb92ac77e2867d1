//! Order/payment orchestrator.
//!
//! Pipeline for `create_order`:
//! 1. Validate the request against the catalog (event, currency, limits)
//! 2. Create one hold per item through the [`HoldManager`]
//! 3. If any hold is rejected, release every hold created so far
//! 4. Price the order from the captured hold prices and store it
//!
//! No partial orders exist: either every item is held or nothing is.

use std::collections::BTreeMap;
use std::sync::Arc;

use boxoffice_inventory::{Catalog, HoldManager, HoldRequest};
use boxoffice_types::constants::{MAX_ITEMS_PER_ORDER, MAX_UNITS_PER_ITEM};
use boxoffice_types::{
    sync, BoxofficeError, BuyerId, EventId, HoldId, HoldState, LineItem, Order, OrderId,
    OrderItemRequest, OrderStatus, PaymentAttempt, PaymentAttemptId, PaymentAttemptStatus,
    ProviderHandoff, Result, TicketType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order_store::OrderStore;
use crate::provider::ProviderRegistry;

/// Body of a checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub event_id: EventId,
    pub items: Vec<OrderItemRequest>,
}

pub struct Orchestrator {
    catalog: Arc<Catalog>,
    holds: Arc<HoldManager>,
    orders: Arc<OrderStore>,
    providers: ProviderRegistry,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        holds: Arc<HoldManager>,
        orders: Arc<OrderStore>,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            catalog,
            holds,
            orders,
            providers,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn holds(&self) -> &HoldManager {
        &self.holds
    }

    #[must_use]
    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Hold every requested item and record a `pending` order.
    ///
    /// # Errors
    /// The first rejection among `InvalidRequest`, `MixedCurrency`,
    /// `OverPerOrderLimit`, `TicketTypeNotFound`, or any hold rejection
    /// (`InsufficientInventory`, `OutsideSalesWindow`, `SeatUnavailable`).
    pub fn create_order(
        &self,
        buyer_id: BuyerId,
        request: &CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let (ticket_types, currency) = self.validate(request)?;
        let order_id = OrderId::new();

        let mut items: Vec<LineItem> = Vec::with_capacity(request.items.len());
        for (item, tt) in request.items.iter().zip(&ticket_types) {
            let hold_request = HoldRequest::new(item.ticket_type_id, item.quantity)
                .with_seats(item.seat_refs.clone())
                .for_order(order_id);
            match self.holds.create_hold(&hold_request, now) {
                Ok(hold) => items.push(LineItem {
                    ticket_type_id: tt.id,
                    hold_id: hold.id,
                    quantity: hold.quantity,
                    unit_price_cents: hold.unit_price_cents,
                    fee_cents: tt.fee_cents,
                    seats: hold.seats,
                }),
                Err(err) => {
                    self.release_all(items.iter().map(|i| i.hold_id), now);
                    tracing::info!(
                        buyer = %buyer_id,
                        ticket_type = %item.ticket_type_id,
                        reason = err.reason_code(),
                        "order rejected"
                    );
                    return Err(err);
                }
            }
        }

        let Some(total_cents) = items
            .iter()
            .try_fold(0u64, |acc, item| acc.checked_add(item.subtotal_cents()?))
        else {
            self.release_all(items.iter().map(|i| i.hold_id), now);
            return Err(BoxofficeError::InvalidRequest {
                reason: "order total overflows".to_string(),
            });
        };

        let order = Order {
            id: order_id,
            buyer_id,
            event_id: request.event_id,
            items,
            currency,
            total_cents,
            status: OrderStatus::Pending,
            payment_provider: None,
            payment_reference: None,
            flags: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.clone());
        tracing::info!(
            order = %order.id,
            buyer = %buyer_id,
            items = order.items.len(),
            total_cents,
            currency = %order.currency,
            "order created"
        );
        Ok(order)
    }

    /// Catalog checks that need no inventory. Returns the ticket type of
    /// each item, in order, and the shared currency.
    fn validate(&self, request: &CreateOrderRequest) -> Result<(Vec<&TicketType>, String)> {
        if request.items.is_empty() {
            return Err(invalid("order has no items"));
        }
        if request.items.len() > MAX_ITEMS_PER_ORDER {
            return Err(invalid(&format!(
                "order has {} items, at most {MAX_ITEMS_PER_ORDER} allowed",
                request.items.len()
            )));
        }

        let mut ticket_types = Vec::with_capacity(request.items.len());
        let mut per_type: BTreeMap<_, u32> = BTreeMap::new();
        for item in &request.items {
            if item.quantity == 0 || item.quantity > MAX_UNITS_PER_ITEM {
                return Err(invalid(&format!(
                    "quantity must be between 1 and {MAX_UNITS_PER_ITEM}"
                )));
            }
            let tt = self.catalog.ticket_type(item.ticket_type_id)?;
            if tt.event_id != request.event_id {
                return Err(invalid(&format!(
                    "ticket type {} does not belong to event {}",
                    tt.id, request.event_id
                )));
            }
            *per_type.entry(tt.id).or_default() += item.quantity;
            ticket_types.push(tt);
        }

        let currency = ticket_types[0].currency.to_ascii_uppercase();
        if let Some(other) = ticket_types
            .iter()
            .find(|tt| !tt.currency.eq_ignore_ascii_case(&currency))
        {
            return Err(BoxofficeError::MixedCurrency {
                first: currency,
                second: other.currency.to_ascii_uppercase(),
            });
        }

        for (tt_id, requested) in per_type {
            let tt = self.catalog.ticket_type(tt_id)?;
            if let Some(limit) = tt.per_order_limit {
                if requested > limit {
                    return Err(BoxofficeError::OverPerOrderLimit {
                        ticket_type: tt_id,
                        requested,
                        limit,
                    });
                }
            }
        }

        Ok((ticket_types, currency))
    }

    /// Start payment with `provider_name` for a pending order.
    ///
    /// Each call creates a new attempt; the latest one becomes the order's
    /// payment reference. If one of the order's holds has lapsed, the order
    /// is canceled instead and `HoldAlreadyTerminal` is returned.
    ///
    /// # Errors
    /// `UnknownProvider`, `OrderNotFound`, `OrderNotPending`,
    /// `HoldAlreadyTerminal`, or a provider failure.
    pub fn initialize_payment(
        &self,
        order_id: OrderId,
        provider_name: &str,
        return_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProviderHandoff> {
        let provider = self.providers.get(provider_name)?;
        let row = self.orders.row(order_id)?;
        let mut order = sync::lock(&row);

        if order.status != OrderStatus::Pending {
            return Err(BoxofficeError::OrderNotPending {
                order_id,
                status: order.status,
            });
        }
        if let Some((hold_id, state)) = self.first_lapsed_hold(&order, now) {
            self.cancel_locked(&mut order, now)?;
            return Err(BoxofficeError::HoldAlreadyTerminal { hold_id, state });
        }

        let handoff = provider.init(&order, now)?;
        let reference = handoff.provider_reference().to_string();
        self.orders.record_attempt(PaymentAttempt {
            id: PaymentAttemptId::new(),
            order_id,
            provider: provider.name().to_string(),
            provider_reference: reference.clone(),
            amount_cents: order.total_cents,
            currency: order.currency.clone(),
            status: PaymentAttemptStatus::Initialized,
            return_url,
            raw_events: Vec::new(),
            created_at: now,
        })?;
        order.payment_provider = Some(provider.name().to_string());
        order.payment_reference = Some(reference.clone());
        order.updated_at = now;

        tracing::info!(
            order = %order_id,
            provider = provider.name(),
            reference = %reference,
            "payment initialized"
        );
        Ok(handoff)
    }

    /// Cancel a pending order and release its holds.
    ///
    /// # Errors
    /// `OrderNotFound`, or `InvalidOrderTransition` unless the order is
    /// `pending`.
    pub fn cancel_order(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        let row = self.orders.row(order_id)?;
        let mut order = sync::lock(&row);
        self.cancel_locked(&mut order, now)?;
        Ok(order.clone())
    }

    /// Cancel an order whose row lock the caller already holds.
    ///
    /// # Errors
    /// `InvalidOrderTransition` unless the order is `pending`.
    pub fn cancel_locked(&self, order: &mut Order, now: DateTime<Utc>) -> Result<()> {
        order.transition(OrderStatus::Canceled, now)?;
        self.release_all(order.hold_ids(), now);
        tracing::info!(order = %order.id, "order canceled");
        Ok(())
    }

    /// # Errors
    /// Returns `OrderNotFound` for unknown IDs.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders.snapshot(order_id)
    }

    /// Expire overdue holds, then cancel every pending order that lost a
    /// hold (whether to this sweep or to lazy expiry elsewhere).
    ///
    /// Returns the canceled order IDs.
    pub fn expire_pending_orders(&self, now: DateTime<Utc>) -> Vec<OrderId> {
        let expired = self.holds.expire_holds(now);
        let mut canceled = Vec::new();

        for order_id in self.orders.pending_ids() {
            let Ok(row) = self.orders.row(order_id) else {
                continue;
            };
            let mut order = sync::lock(&row);
            if order.status != OrderStatus::Pending {
                continue;
            }
            if self.first_lapsed_hold(&order, now).is_none() {
                continue;
            }
            match self.cancel_locked(&mut order, now) {
                Ok(()) => canceled.push(order_id),
                Err(err) => {
                    tracing::warn!(order = %order_id, error = %err, "failed to cancel lapsed order");
                }
            }
        }

        tracing::debug!(
            expired_holds = expired.len(),
            canceled_orders = canceled.len(),
            "expiry sweep finished"
        );
        canceled
    }

    /// The first hold of `order` that is no longer active at `now`. A hold
    /// the manager no longer remembers finished long ago and reads as
    /// expired.
    fn first_lapsed_hold(&self, order: &Order, now: DateTime<Utc>) -> Option<(HoldId, HoldState)> {
        order.hold_ids().find_map(|hold_id| {
            let state = self
                .holds
                .hold(hold_id, now)
                .map_or(HoldState::Expired, |hold| hold.state);
            (state != HoldState::Active).then_some((hold_id, state))
        })
    }

    fn release_all(&self, holds: impl Iterator<Item = HoldId>, now: DateTime<Utc>) {
        for hold_id in holds {
            if let Err(err) = self.holds.release_hold(hold_id, now) {
                tracing::warn!(hold = %hold_id, error = %err, "failed to release hold");
            }
        }
    }
}

fn invalid(reason: &str) -> BoxofficeError {
    BoxofficeError::InvalidRequest {
        reason: reason.to_string(),
    }
}
