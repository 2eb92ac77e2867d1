//! Shared application state and engine wiring.

use std::sync::Arc;

use boxoffice_checkout::{Orchestrator, OrderStore, ProviderRegistry};
use boxoffice_inventory::{AvailabilityLedger, Catalog, HoldManager};
use boxoffice_settlement::{
    LogNotifier, ReconciliationQueue, SettlementProcessor, TicketIssuer, TicketNotifier,
};
use boxoffice_types::{AppConfig, CanonicalPaymentEvent};
use tokio::sync::mpsc;

/// Handles every request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub settlement: Arc<SettlementProcessor>,
    /// Verified webhook events waiting for the settlement worker.
    pub webhooks: mpsc::Sender<CanonicalPaymentEvent>,
}

impl AppState {
    /// Wire catalog, ledger, holds, orders, providers, and settlement
    /// together. The returned receiver feeds [`crate::worker`].
    pub fn new(
        config: &AppConfig,
        catalog: Catalog,
    ) -> (Self, mpsc::Receiver<CanonicalPaymentEvent>) {
        Self::with_notifier(config, catalog, Arc::new(LogNotifier))
    }

    pub fn with_notifier(
        config: &AppConfig,
        catalog: Catalog,
        notifier: Arc<dyn TicketNotifier>,
    ) -> (Self, mpsc::Receiver<CanonicalPaymentEvent>) {
        let catalog = Arc::new(catalog);
        let ledger = Arc::new(AvailabilityLedger::new(&catalog));
        let holds = Arc::new(HoldManager::new(ledger, &config.checkout));
        let orchestrator = Arc::new(Orchestrator::new(
            catalog,
            holds,
            Arc::new(OrderStore::new()),
            ProviderRegistry::from_config(&config.providers),
        ));
        let settlement = Arc::new(SettlementProcessor::new(
            Arc::clone(&orchestrator),
            config.checkout.idempotency_cache_size,
            Arc::new(TicketIssuer::new()),
            Arc::new(ReconciliationQueue::new()),
            notifier,
        ));
        let (tx, rx) = mpsc::channel(config.server.webhook_queue_depth.max(1));
        (
            Self {
                orchestrator,
                settlement,
                webhooks: tx,
            },
            rx,
        )
    }
}
