//! Router configuration.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{availability, health, orders, tickets, webhooks};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/orders", post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/:id/payment", post(orders::initialize_payment))
        .route("/orders/:id/refund", post(orders::refund_order))
        .route("/orders/:id/tickets", get(tickets::list_tickets))
        .route("/tickets/:code/check-in", post(tickets::check_in))
        .route(
            "/ticket-types/:id/availability",
            get(availability::get_availability),
        )
        .route("/webhooks/:provider", post(webhooks::receive_webhook))
        .route("/reconciliation", get(tickets::reconciliation_cases))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
