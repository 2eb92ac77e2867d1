//! Ticket read and door-scan endpoints.

use axum::extract::{Path, State};
use axum::Json;
use boxoffice_settlement::ReconciliationCase;
use boxoffice_types::{OrderId, Ticket};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// `GET /orders/:id/tickets`
pub async fn list_tickets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(state.settlement.list_tickets(OrderId(id))?))
}

/// `POST /tickets/:code/check-in`
pub async fn check_in(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(state.settlement.check_in(&code)?))
}

/// `GET /reconciliation` - open operator cases.
pub async fn reconciliation_cases(State(state): State<AppState>) -> Json<Vec<ReconciliationCase>> {
    Json(state.settlement.reconciliation().cases())
}
