//! HTTP error type.
//!
//! Domain errors become a JSON body `{ "code": ..., "message": ... }` where
//! `code` is the stable reason code API clients branch on. Operator-only
//! failures (mismatches, internal errors) are logged and surfaced as a
//! generic 500 so no engine detail reaches the buyer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use boxoffice_types::BoxofficeError;
use serde::Serialize;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{resource} {id} not found"))
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "An internal error occurred",
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<BoxofficeError> for AppError {
    fn from(err: BoxofficeError) -> Self {
        let code = err.reason_code();
        let status = match &err {
            e if e.is_user_correctable() => StatusCode::CONFLICT,
            BoxofficeError::OrderNotFound(_)
            | BoxofficeError::TicketTypeNotFound(_)
            | BoxofficeError::HoldNotFound(_)
            | BoxofficeError::TicketNotFound(_)
            | BoxofficeError::UnknownPaymentReference(_) => StatusCode::NOT_FOUND,
            BoxofficeError::InvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BoxofficeError::UnknownProvider(_)
            | BoxofficeError::InvalidSignature { .. }
            | BoxofficeError::MalformedWebhook { .. } => StatusCode::BAD_REQUEST,
            BoxofficeError::OrderNotPending { .. }
            | BoxofficeError::InvalidOrderTransition { .. }
            | BoxofficeError::InvalidTicketTransition { .. }
            | BoxofficeError::HoldAlreadyTerminal { .. } => StatusCode::CONFLICT,
            _ => {
                tracing::error!(error = %err, "request failed");
                return Self::internal();
            }
        };
        Self::new(status, code, err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use boxoffice_types::{OrderId, TicketTypeId};

    use super::*;

    #[test]
    fn inventory_errors_are_conflicts_with_reason_codes() {
        let err = AppError::from(BoxofficeError::InsufficientInventory {
            ticket_type: TicketTypeId::new(),
            requested: 2,
            available: 1,
        });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "insufficient_inventory");

        let err = AppError::from(BoxofficeError::OutsideSalesWindow(TicketTypeId::new()));
        assert_eq!(err.code, "outside_sales_window");
    }

    #[test]
    fn missing_order_is_not_found() {
        let err = AppError::from(BoxofficeError::OrderNotFound(OrderId::new()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.code, "order_not_found");
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AppError::from(BoxofficeError::AmountMismatch {
            order_id: OrderId::new(),
            expected_cents: 5000,
            expected_currency: "USD".into(),
            actual_cents: 4000,
            actual_currency: "USD".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("5000"));

        let err = AppError::from(BoxofficeError::Internal("lock table corrupt".into()));
        assert_eq!(err.code, "internal_error");
        assert!(!err.message.contains("lock table"));
    }

    #[test]
    fn display_has_code_prefix() {
        assert_eq!(
            AppError::bad_request("missing x-buyer-id").to_string(),
            "[bad_request] missing x-buyer-id"
        );
    }
}
