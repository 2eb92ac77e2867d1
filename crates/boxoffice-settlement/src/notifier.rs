//! Ticket delivery hook.
//!
//! Called after an order reaches `paid`. Delivery is the notification
//! domain's job; a failure here is logged and never rolls back settlement.

use boxoffice_types::{Order, Result, Ticket};

pub trait TicketNotifier: Send + Sync {
    fn tickets_issued(&self, order: &Order, tickets: &[Ticket]) -> Result<()>;
}

/// Writes one log line per delivery.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl TicketNotifier for LogNotifier {
    fn tickets_issued(&self, order: &Order, tickets: &[Ticket]) -> Result<()> {
        tracing::info!(
            order = %order.id,
            buyer = %order.buyer_id,
            tickets = tickets.len(),
            "tickets ready for delivery"
        );
        Ok(())
    }
}
