//! Checkout endpoints.
//!
//! - `POST /orders` - hold inventory and open a pending order
//! - `GET /orders/:id` - order summary
//! - `POST /orders/:id/cancel` - cancel a pending order, releasing its holds
//! - `POST /orders/:id/payment` - start a payment attempt with a provider
//! - `POST /orders/:id/refund` - refund a paid order (operator)

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use boxoffice_checkout::CreateOrderRequest;
use boxoffice_types::{BuyerId, Order, OrderId, ProviderHandoff};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated buyer, set by the session gateway.
pub const BUYER_HEADER: &str = "x-buyer-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub provider: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

fn buyer_from(headers: &HeaderMap) -> Result<BuyerId, AppError> {
    let raw = headers
        .get(BUYER_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request(format!("missing {BUYER_HEADER} header")))?;
    Uuid::parse_str(raw.trim())
        .map(BuyerId)
        .map_err(|_| AppError::bad_request(format!("malformed {BUYER_HEADER} header")))
}

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let buyer = buyer_from(&headers)?;
    let order = state.orchestrator.create_order(buyer, &request, Utc::now())?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orchestrator.get_order(OrderId(id))?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orchestrator.cancel_order(OrderId(id), Utc::now())?))
}

/// Returns the provider handoff: `{flow, paymentIntentId, clientSecret}` or
/// `{flow, authorizationUrl, reference}`.
pub async fn initialize_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<ProviderHandoff>, AppError> {
    let handoff = state.orchestrator.initialize_payment(
        OrderId(id),
        &request.provider,
        request.return_url,
        Utc::now(),
    )?;
    Ok(Json(handoff))
}

pub async fn refund_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.settlement.refund_order(OrderId(id), Utc::now())?))
}
