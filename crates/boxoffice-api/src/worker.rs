//! Background tasks: the settlement worker and the hold expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use boxoffice_checkout::Orchestrator;
use boxoffice_settlement::SettlementProcessor;
use boxoffice_types::{BoxofficeError, CanonicalPaymentEvent};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Drain the webhook queue until every sender is dropped.
///
/// Errors are logged and never stop the worker; the provider already got
/// its 200 and reconciliation is an operator concern.
pub async fn run_settlement_worker(
    settlement: Arc<SettlementProcessor>,
    mut events: mpsc::Receiver<CanonicalPaymentEvent>,
) {
    tracing::info!("settlement worker started");
    while let Some(event) = events.recv().await {
        match settlement.apply_payment_event(&event, Utc::now()) {
            Ok(outcome) => tracing::info!(
                provider = %event.provider,
                reference = %event.provider_reference,
                outcome = ?outcome,
                "payment event settled"
            ),
            Err(err @ BoxofficeError::UnknownPaymentReference(_)) => tracing::warn!(
                provider = %event.provider,
                error = %err,
                "payment event for unknown reference"
            ),
            Err(err) => tracing::error!(
                provider = %event.provider,
                reference = %event.provider_reference,
                error = %err,
                "payment event failed to settle"
            ),
        }
    }
    tracing::info!("settlement worker stopped");
}

/// Periodically expire overdue holds and cancel the orders that owned them.
/// Runs until the task is aborted.
pub async fn run_expiry_sweeper(orchestrator: Arc<Orchestrator>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let canceled = orchestrator.expire_pending_orders(Utc::now());
        if canceled.is_empty() {
            tracing::debug!("expiry sweep: nothing overdue");
        } else {
            tracing::info!(orders = canceled.len(), "expiry sweep canceled orders");
        }
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_inventory::Catalog;
    use boxoffice_types::{AppConfig, PaymentOutcome};

    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn worker_survives_bad_events_and_stops_when_senders_drop() {
        let (state, events) = AppState::new(&AppConfig::default(), Catalog::default());
        let worker = tokio::spawn(run_settlement_worker(Arc::clone(&state.settlement), events));

        for reference in ["pi_unknown_1", "pi_unknown_2"] {
            state
                .webhooks
                .send(CanonicalPaymentEvent {
                    provider: "stripe".into(),
                    event_id: None,
                    provider_reference: reference.into(),
                    outcome: PaymentOutcome::Succeeded,
                    amount_cents: 100,
                    currency: "USD".into(),
                    raw_payload: "{}".into(),
                })
                .await
                .unwrap();
        }
        drop(state);

        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker should stop once the queue closes")
            .unwrap();
    }
}
