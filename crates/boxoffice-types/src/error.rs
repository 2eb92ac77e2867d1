//! Error types for the Boxoffice checkout engine.
//!
//! All errors use the `BO_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Inventory / hold errors
//! - 2xx: Seat errors
//! - 3xx: Order errors
//! - 4xx: Payment provider errors
//! - 5xx: Settlement errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{HoldId, HoldState, OrderId, OrderStatus, SeatId, TicketId, TicketStatus, TicketTypeId};

/// Central error enum for all Boxoffice operations.
#[derive(Debug, Error)]
pub enum BoxofficeError {
    // =================================================================
    // Inventory / Hold Errors (1xx)
    // =================================================================
    /// Not enough unreserved capacity left for the requested quantity.
    #[error("BO_ERR_100: Insufficient inventory for {ticket_type}: requested {requested}, available {available}")]
    InsufficientInventory {
        ticket_type: TicketTypeId,
        requested: u32,
        available: u32,
    },

    /// The order asks for more units of one ticket type than allowed per order.
    #[error("BO_ERR_101: Per-order limit exceeded for {ticket_type}: requested {requested}, limit {limit}")]
    OverPerOrderLimit {
        ticket_type: TicketTypeId,
        requested: u32,
        limit: u32,
    },

    /// The ticket type is not on sale at this instant.
    #[error("BO_ERR_102: Ticket type {0} is outside its sales window")]
    OutsideSalesWindow(TicketTypeId),

    /// The hold has already reached a terminal state.
    #[error("BO_ERR_103: Hold {hold_id} is already {state}")]
    HoldAlreadyTerminal { hold_id: HoldId, state: HoldState },

    /// No hold with this ID exists.
    #[error("BO_ERR_104: Hold not found: {0}")]
    HoldNotFound(HoldId),

    /// The ticket type is not part of the catalog.
    #[error("BO_ERR_105: Ticket type not found: {0}")]
    TicketTypeNotFound(TicketTypeId),

    // =================================================================
    // Seat Errors (2xx)
    // =================================================================
    /// A requested seat is not available (held, assigned, or unknown).
    #[error("BO_ERR_200: Seat {0} is not available")]
    SeatUnavailable(SeatId),

    // =================================================================
    // Order Errors (3xx)
    // =================================================================
    /// No order with this ID exists.
    #[error("BO_ERR_300: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The checkout request failed validation.
    #[error("BO_ERR_301: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Order items are priced in more than one currency.
    #[error("BO_ERR_302: Order mixes currencies {first} and {second}")]
    MixedCurrency { first: String, second: String },

    /// The order state machine does not allow this move.
    #[error("BO_ERR_303: Order {order_id} cannot move from {from} to {to}")]
    InvalidOrderTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The operation needs a pending order.
    #[error("BO_ERR_304: Order {order_id} is {status}, expected PENDING")]
    OrderNotPending {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The ticket state machine does not allow this move.
    #[error("BO_ERR_305: Ticket {ticket_id} cannot move from {from} to {to}")]
    InvalidTicketTransition {
        ticket_id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },

    /// No ticket carries this code.
    #[error("BO_ERR_306: Ticket not found: {0}")]
    TicketNotFound(String),

    // =================================================================
    // Payment Provider Errors (4xx)
    // =================================================================
    /// The webhook signature did not verify.
    #[error("BO_ERR_400: Invalid webhook signature from {provider}")]
    InvalidSignature { provider: String },

    /// No adapter is registered under this name.
    #[error("BO_ERR_401: Unknown payment provider: {0}")]
    UnknownProvider(String),

    /// The webhook payload could not be parsed.
    #[error("BO_ERR_402: Malformed webhook payload: {reason}")]
    MalformedWebhook { reason: String },

    /// The provider reference does not belong to any payment attempt.
    #[error("BO_ERR_403: Unknown payment reference: {0}")]
    UnknownPaymentReference(String),

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// The paid amount or currency differs from the order total.
    #[error("BO_ERR_500: Amount mismatch for {order_id}: expected {expected_cents} {expected_currency}, got {actual_cents} {actual_currency}")]
    AmountMismatch {
        order_id: OrderId,
        expected_cents: u64,
        expected_currency: String,
        actual_cents: u64,
        actual_currency: String,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BO_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BO_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid env value, unreadable catalog, etc.).
    #[error("BO_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("BO_ERR_903: I/O error: {0}")]
    Io(String),
}

impl BoxofficeError {
    /// Stable machine-readable reason code for API clients.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InsufficientInventory { .. } | Self::SeatUnavailable(_) => {
                "insufficient_inventory"
            }
            Self::OverPerOrderLimit { .. } => "per_order_limit_exceeded",
            Self::OutsideSalesWindow(_) => "outside_sales_window",
            Self::HoldAlreadyTerminal { .. } => "hold_already_terminal",
            Self::HoldNotFound(_) => "hold_not_found",
            Self::TicketTypeNotFound(_) => "ticket_type_not_found",
            Self::OrderNotFound(_) => "order_not_found",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MixedCurrency { .. } => "mixed_currency",
            Self::InvalidOrderTransition { .. } => "invalid_order_transition",
            Self::OrderNotPending { .. } => "order_not_pending",
            Self::InvalidTicketTransition { .. } => "invalid_ticket_transition",
            Self::TicketNotFound(_) => "ticket_not_found",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::UnknownProvider(_) => "unknown_provider",
            Self::MalformedWebhook { .. } => "malformed_webhook",
            Self::UnknownPaymentReference(_) => "unknown_payment_reference",
            Self::AmountMismatch { .. } => "amount_mismatch",
            Self::Internal(_) | Self::Serialization(_) | Self::Configuration(_) | Self::Io(_) => {
                "internal_error"
            }
        }
    }

    /// Whether a buyer can fix this by changing their selection.
    ///
    /// Everything else is either a caller bug or an operator concern and
    /// must never be shown to the buyer verbatim.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientInventory { .. }
                | Self::OverPerOrderLimit { .. }
                | Self::OutsideSalesWindow(_)
                | Self::SeatUnavailable(_)
                | Self::MixedCurrency { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BoxofficeError>;

impl From<std::io::Error> for BoxofficeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BoxofficeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
