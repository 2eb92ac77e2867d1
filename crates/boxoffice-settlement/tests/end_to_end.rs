//! End-to-end checkout tests: catalog → holds → order → payment → webhook →
//! settlement → tickets.

use std::sync::{Arc, Barrier, Mutex, OnceLock};
use std::thread;

use boxoffice_checkout::{
    CreateOrderRequest, Orchestrator, OrderStore, PaymentProvider, ProviderRegistry,
    StripeProvider,
};
use boxoffice_inventory::{Availability, AvailabilityLedger, Catalog, CatalogFile, HoldManager};
use boxoffice_settlement::{
    LogNotifier, ReconciliationQueue, ReconciliationReason, SettlementOutcome,
    SettlementProcessor, TicketIssuer, TicketNotifier,
};
use boxoffice_types::*;
use chrono::{DateTime, Duration, Utc};

const SECRET: &str = "whsec_end_to_end";

struct Engine {
    orch: Arc<Orchestrator>,
    settlement: Arc<SettlementProcessor>,
    stripe: StripeProvider,
    event: EventId,
}

fn engine_with(
    mut ticket_types: Vec<TicketType>,
    seatmaps: Vec<SeatmapSnapshot>,
    notifier: Arc<dyn TicketNotifier>,
) -> Engine {
    let event = EventId::new();
    for tt in &mut ticket_types {
        tt.event_id = event;
    }
    let catalog = Arc::new(Catalog::new(CatalogFile { ticket_types, seatmaps }).unwrap());
    let config = CheckoutConfig::default();
    let ledger = Arc::new(AvailabilityLedger::new(&catalog));
    let holds = Arc::new(HoldManager::new(ledger, &config));
    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(StripeProvider::new(SECRET)));
    let orch = Arc::new(Orchestrator::new(
        catalog,
        holds,
        Arc::new(OrderStore::new()),
        providers,
    ));
    let settlement = Arc::new(SettlementProcessor::new(
        Arc::clone(&orch),
        config.idempotency_cache_size,
        Arc::new(TicketIssuer::new()),
        Arc::new(ReconciliationQueue::new()),
        notifier,
    ));
    Engine {
        orch,
        settlement,
        stripe: StripeProvider::new(SECRET),
        event,
    }
}

fn engine(ticket_types: Vec<TicketType>) -> Engine {
    engine_with(ticket_types, Vec::new(), Arc::new(LogNotifier))
}

impl Engine {
    fn checkout(&self, items: Vec<OrderItemRequest>, now: DateTime<Utc>) -> (Order, String) {
        let order = self
            .orch
            .create_order(
                BuyerId::new(),
                &CreateOrderRequest {
                    event_id: self.event,
                    items,
                },
                now,
            )
            .unwrap();
        let handoff = self
            .orch
            .initialize_payment(order.id, "stripe", None, now)
            .unwrap();
        (order, handoff.provider_reference().to_string())
    }

    /// Build the event exactly as the webhook route would: sign, then verify.
    fn webhook(&self, kind: &str, reference: &str, amount: u64, currency: &str, now: DateTime<Utc>) -> CanonicalPaymentEvent {
        let body = serde_json::json!({
            "id": format!("evt_{kind}_{reference}"),
            "type": kind,
            "data": { "object": { "id": reference, "amount": amount, "currency": currency } }
        })
        .to_string()
        .into_bytes();
        let signature = self.stripe.sign(&body, now.timestamp()).unwrap();
        self.stripe
            .parse_webhook(&body, &signature, now)
            .unwrap()
            .unwrap()
    }

    fn order(&self, id: OrderId) -> Order {
        self.orch.get_order(id).unwrap()
    }
}

fn ga(tt: &TicketType, quantity: u32) -> OrderItemRequest {
    OrderItemRequest {
        ticket_type_id: tt.id,
        quantity,
        seat_refs: Vec::new(),
    }
}

#[test]
fn happy_path_issues_one_ticket_per_unit() {
    let tt = TicketType::dummy_general(Some(10));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 3)], now);

    let event = e.webhook("payment_intent.succeeded", &reference, 15_000, "usd", now);
    let outcome = e.settlement.apply_payment_event(&event, now).unwrap();

    assert_eq!(outcome, SettlementOutcome::Applied);
    let paid = e.order(order.id);
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.flags.is_empty());
    let tickets = e.settlement.list_tickets(order.id).unwrap();
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().all(|t| t.status == TicketStatus::Issued));

    let entry = e.orch.holds().ledger().entry(tt.id).unwrap();
    assert_eq!((entry.issued, entry.held), (3, 0));
    let attempt = e.orch.orders().attempt(&reference).unwrap();
    assert_eq!(attempt.status, PaymentAttemptStatus::Succeeded);
    assert_eq!(attempt.raw_events.len(), 1);
}

#[test]
fn replayed_success_is_idempotent() {
    let tt = TicketType::dummy_general(Some(10));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 2)], now);
    let event = e.webhook("payment_intent.succeeded", &reference, 10_000, "usd", now);

    assert_eq!(e.settlement.apply_payment_event(&event, now).unwrap(), SettlementOutcome::Applied);
    assert_eq!(
        e.settlement.apply_payment_event(&event, now).unwrap(),
        SettlementOutcome::AlreadyApplied
    );
    assert_eq!(e.settlement.list_tickets(order.id).unwrap().len(), 2);
    assert_eq!(e.orch.holds().ledger().entry(tt.id).unwrap().issued, 2);
}

#[test]
fn concurrent_duplicate_deliveries_settle_once() {
    let tt = TicketType::dummy_general(Some(10));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 2)], now);
    let event = e.webhook("payment_intent.succeeded", &reference, 10_000, "usd", now);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let settlement = Arc::clone(&e.settlement);
            let barrier = Arc::clone(&barrier);
            let event = event.clone();
            thread::spawn(move || {
                barrier.wait();
                settlement.apply_payment_event(&event, now).unwrap()
            })
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let applied = outcomes.iter().filter(|o| **o == SettlementOutcome::Applied).count();
    assert_eq!(applied, 1);
    assert_eq!(e.settlement.list_tickets(order.id).unwrap().len(), 2);
}

#[test]
fn short_payment_is_a_mismatch() {
    let tt = TicketType::dummy_general(Some(10));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], now);
    assert_eq!(order.total_cents, 5000);

    let event = e.webhook("payment_intent.succeeded", &reference, 4000, "usd", now);
    let outcome = e.settlement.apply_payment_event(&event, now).unwrap();

    assert_eq!(outcome, SettlementOutcome::Mismatch);
    let stored = e.order(order.id);
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(stored.has_flag(OrderFlag::AmountMismatch));
    assert!(e.settlement.list_tickets(order.id).unwrap().is_empty());
    let cases = e.settlement.reconciliation().for_order(order.id);
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].reason, ReconciliationReason::AmountMismatch);
    assert!(event.event_id.is_some());
    assert_eq!(cases[0].provider_event_id, event.event_id);

    // A replay raises no second case and still does not accept the money.
    assert_eq!(
        e.settlement.apply_payment_event(&event, now).unwrap(),
        SettlementOutcome::Mismatch
    );
    assert_eq!(e.settlement.reconciliation().for_order(order.id).len(), 1);
}

#[test]
fn wrong_currency_is_a_mismatch() {
    let tt = TicketType::dummy_general(Some(10));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], now);

    let event = e.webhook("payment_intent.succeeded", &reference, 5000, "eur", now);
    assert_eq!(
        e.settlement.apply_payment_event(&event, now).unwrap(),
        SettlementOutcome::Mismatch
    );
    assert_eq!(e.order(order.id).status, OrderStatus::Pending);
}

#[test]
fn payment_after_hold_expiry_is_flagged_not_fabricated() {
    let tt = TicketType::dummy_general(Some(1));
    let e = engine(vec![tt.clone()]);
    let t0 = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], t0);

    // Buyer pays at minute 12; the 10-minute hold has lapsed.
    let t12 = t0 + Duration::minutes(12);
    let event = e.webhook("payment_intent.succeeded", &reference, 5000, "usd", t12);
    let outcome = e.settlement.apply_payment_event(&event, t12).unwrap();

    assert_eq!(outcome, SettlementOutcome::Applied);
    let stored = e.order(order.id);
    assert_eq!(stored.status, OrderStatus::Paid);
    assert!(stored.has_flag(OrderFlag::TicketIssuancePending));
    assert!(e.settlement.list_tickets(order.id).unwrap().is_empty());
    assert_eq!(e.orch.holds().ledger().entry(tt.id).unwrap().issued, 0);

    let cases = e.settlement.reconciliation().for_order(order.id);
    assert_eq!(cases[0].reason, ReconciliationReason::HoldExpiredBeforeSettlement);

    // The freed unit can be sold to someone else.
    assert_eq!(
        e.orch.holds().available(tt.id, &[]).unwrap(),
        Availability::Limited(1)
    );
}

#[test]
fn payment_within_clock_skew_still_settles() {
    let tt = TicketType::dummy_general(Some(1));
    let e = engine(vec![tt.clone()]);
    let t0 = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], t0);

    let at = t0 + Duration::minutes(10) + Duration::seconds(3);
    let event = e.webhook("payment_intent.succeeded", &reference, 5000, "usd", at);
    e.settlement.apply_payment_event(&event, at).unwrap();
    assert!(e.order(order.id).flags.is_empty());
    assert_eq!(e.settlement.list_tickets(order.id).unwrap().len(), 1);
}

#[test]
fn stale_failure_never_unpays_an_order() {
    let tt = TicketType::dummy_general(Some(5));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], now);

    let success = e.webhook("payment_intent.succeeded", &reference, 5000, "usd", now);
    let failure = e.webhook("payment_intent.payment_failed", &reference, 5000, "usd", now);
    e.settlement.apply_payment_event(&success, now).unwrap();
    let outcome = e.settlement.apply_payment_event(&failure, now).unwrap();

    assert_eq!(outcome, SettlementOutcome::AlreadyApplied);
    assert_eq!(e.order(order.id).status, OrderStatus::Paid);
    assert_eq!(e.settlement.list_tickets(order.id).unwrap().len(), 1);
    assert_eq!(
        e.orch.orders().attempt(&reference).unwrap().status,
        PaymentAttemptStatus::Succeeded
    );
}

#[test]
fn failure_cancels_pending_order_and_frees_inventory() {
    let tt = TicketType::dummy_general(Some(2));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 2)], now);

    let failure = e.webhook("payment_intent.payment_failed", &reference, 10_000, "usd", now);
    assert_eq!(
        e.settlement.apply_payment_event(&failure, now).unwrap(),
        SettlementOutcome::Applied
    );
    assert_eq!(e.order(order.id).status, OrderStatus::Canceled);
    assert_eq!(e.orch.holds().ledger().entry(tt.id).unwrap().held, 0);
}

#[test]
fn success_for_canceled_order_needs_refund() {
    let tt = TicketType::dummy_general(Some(2));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], now);
    e.orch.cancel_order(order.id, now).unwrap();

    let success = e.webhook("payment_intent.succeeded", &reference, 5000, "usd", now);
    assert_eq!(
        e.settlement.apply_payment_event(&success, now).unwrap(),
        SettlementOutcome::Applied
    );
    let stored = e.order(order.id);
    assert_eq!(stored.status, OrderStatus::Canceled);
    assert!(stored.has_flag(OrderFlag::RefundRequired));
    assert_eq!(
        e.settlement.reconciliation().for_order(order.id)[0].reason,
        ReconciliationReason::PaymentAfterCancellation
    );
    assert!(e.settlement.list_tickets(order.id).unwrap().is_empty());
}

#[test]
fn unknown_reference_is_an_error() {
    let tt = TicketType::dummy_general(None);
    let e = engine(vec![tt]);
    let now = Utc::now();
    let event = e.webhook("payment_intent.succeeded", "pi_nobody", 5000, "usd", now);
    assert!(matches!(
        e.settlement.apply_payment_event(&event, now).unwrap_err(),
        BoxofficeError::UnknownPaymentReference(_)
    ));
}

#[test]
fn seated_purchase_assigns_seats_and_refund_frees_them() {
    let tt_id = TicketTypeId::new();
    let map = SeatmapSnapshot::dummy_row(tt_id, 4);
    let map_id = map.id;
    let mut tt = TicketType::dummy_seated(map_id, None);
    tt.id = tt_id;
    let e = engine_with(vec![tt], vec![map], Arc::new(LogNotifier));
    let now = Utc::now();

    let (order, reference) = e.checkout(
        vec![OrderItemRequest {
            ticket_type_id: tt_id,
            quantity: 2,
            seat_refs: vec![SeatId::new("A-1"), SeatId::new("A-2")],
        }],
        now,
    );
    let event = e.webhook("payment_intent.succeeded", &reference, 10_000, "usd", now);
    e.settlement.apply_payment_event(&event, now).unwrap();

    let seats = e.orch.holds().ledger().seats();
    assert_eq!(seats.status(map_id, &SeatId::new("A-1")), Some(SeatStatus::Assigned));
    let tickets = e.settlement.list_tickets(order.id).unwrap();
    assert_eq!(tickets[0].seat_id, Some(SeatId::new("A-1")));

    let refunded = e.settlement.refund_order(order.id, now).unwrap();
    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(seats.status(map_id, &SeatId::new("A-1")), Some(SeatStatus::Available));
    assert!(e
        .settlement
        .list_tickets(order.id)
        .unwrap()
        .iter()
        .all(|t| t.status == TicketStatus::Refunded));
    assert_eq!(e.orch.holds().ledger().entry(tt_id).unwrap().issued, 0);
}

#[test]
fn contested_seats_reserve_neither() {
    let tt_id = TicketTypeId::new();
    let map = SeatmapSnapshot::dummy_row(tt_id, 2);
    let map_id = map.id;
    let mut tt = TicketType::dummy_seated(map_id, None);
    tt.id = tt_id;
    let e = engine_with(vec![tt], vec![map], Arc::new(LogNotifier));
    let now = Utc::now();

    e.checkout(
        vec![OrderItemRequest {
            ticket_type_id: tt_id,
            quantity: 1,
            seat_refs: vec![SeatId::new("A-2")],
        }],
        now,
    );
    let err = e
        .orch
        .create_order(
            BuyerId::new(),
            &CreateOrderRequest {
                event_id: e.event,
                items: vec![OrderItemRequest {
                    ticket_type_id: tt_id,
                    quantity: 2,
                    seat_refs: vec![SeatId::new("A-1"), SeatId::new("A-2")],
                }],
            },
            now,
        )
        .unwrap_err();
    assert!(matches!(err, BoxofficeError::SeatUnavailable(_)));
    let seats = e.orch.holds().ledger().seats();
    assert_eq!(seats.status(map_id, &SeatId::new("A-1")), Some(SeatStatus::Available));
}

#[test]
fn chargeback_voids_tickets_and_check_in_is_rejected() {
    let tt = TicketType::dummy_general(Some(3));
    let e = engine(vec![tt.clone()]);
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 2)], now);
    let event = e.webhook("payment_intent.succeeded", &reference, 10_000, "usd", now);
    e.settlement.apply_payment_event(&event, now).unwrap();
    let tickets = e.settlement.list_tickets(order.id).unwrap();

    e.settlement.check_in(&tickets[0].code).unwrap();
    let reversed = e.settlement.chargeback_order(order.id, now).unwrap();
    assert_eq!(reversed.status, OrderStatus::Chargeback);

    // The admitted ticket keeps its status; only the unused one is voided.
    let after = e.settlement.list_tickets(order.id).unwrap();
    assert_eq!(after[0].status, TicketStatus::CheckedIn);
    assert_eq!(after[1].status, TicketStatus::Voided);
    assert!(e.settlement.check_in(&tickets[1].code).is_err());
    assert_eq!(e.orch.holds().ledger().entry(tt.id).unwrap().issued, 1);

    assert!(matches!(
        e.settlement.refund_order(order.id, now).unwrap_err(),
        BoxofficeError::InvalidOrderTransition { .. }
    ));
}

struct FailingNotifier(Mutex<u32>);

impl TicketNotifier for FailingNotifier {
    fn tickets_issued(&self, _order: &Order, _tickets: &[Ticket]) -> Result<()> {
        *self.0.lock().unwrap() += 1;
        Err(BoxofficeError::Io("mail relay down".into()))
    }
}

#[test]
fn notifier_failure_does_not_roll_back_settlement() {
    let tt = TicketType::dummy_general(Some(3));
    let notifier = Arc::new(FailingNotifier(Mutex::new(0)));
    let e = engine_with(vec![tt.clone()], Vec::new(), notifier.clone());
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 1)], now);

    let event = e.webhook("payment_intent.succeeded", &reference, 5000, "usd", now);
    assert_eq!(
        e.settlement.apply_payment_event(&event, now).unwrap(),
        SettlementOutcome::Applied
    );
    assert_eq!(*notifier.0.lock().unwrap(), 1);
    assert_eq!(e.order(order.id).status, OrderStatus::Paid);
}

/// Records whether the order row was free while tickets were being delivered.
#[derive(Default)]
struct RowLockWitness {
    orch: OnceLock<Arc<Orchestrator>>,
    row_was_free: Mutex<Vec<bool>>,
}

impl TicketNotifier for RowLockWitness {
    fn tickets_issued(&self, order: &Order, _tickets: &[Ticket]) -> Result<()> {
        let orch = self.orch.get().expect("orchestrator wired");
        let row = orch.orders().row(order.id)?;
        let free = row.try_lock().is_ok();
        self.row_was_free.lock().unwrap().push(free);
        assert_eq!(order.status, OrderStatus::Paid);
        Ok(())
    }
}

#[test]
fn tickets_are_delivered_after_the_order_row_is_released() {
    let tt = TicketType::dummy_general(Some(3));
    let notifier = Arc::new(RowLockWitness::default());
    let e = engine_with(vec![tt.clone()], Vec::new(), notifier.clone());
    assert!(notifier.orch.set(Arc::clone(&e.orch)).is_ok());
    let now = Utc::now();
    let (order, reference) = e.checkout(vec![ga(&tt, 2)], now);

    let event = e.webhook("payment_intent.succeeded", &reference, 10_000, "usd", now);
    e.settlement.apply_payment_event(&event, now).unwrap();

    assert_eq!(*notifier.row_was_free.lock().unwrap(), vec![true]);
    assert_eq!(e.order(order.id).status, OrderStatus::Paid);
}
