//! Possibly-stale availability reads for storefront display.
//!
//! The authoritative check happens again when a hold is created.

use axum::extract::{Path, State};
use axum::Json;
use boxoffice_inventory::Availability;
use boxoffice_types::TicketTypeId;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub ticket_type_id: TicketTypeId,
    pub availability: Availability,
    pub on_sale: bool,
}

/// `GET /ticket-types/:id/availability`
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let ticket_type_id = TicketTypeId(id);
    let orchestrator = &state.orchestrator;
    let ticket_type = orchestrator.catalog().ticket_type(ticket_type_id)?;
    let on_sale = ticket_type.is_on_sale(chrono::Utc::now());
    let availability = orchestrator.holds().available(ticket_type_id, &[])?;
    Ok(Json(AvailabilityResponse {
        ticket_type_id,
        availability,
        on_sale,
    }))
}
