//! Ticket issuance and the ticket read/scan paths.
//!
//! Tickets exist only after payment. Each carries a unique scannable code
//! (`TKT-` + 12 hex of entropy + 4 hex check) and afterwards only its status
//! changes.

use std::collections::HashMap;
use std::sync::RwLock;

use boxoffice_types::{
    sync, ticket_code_from_entropy, verify_ticket_code, BoxofficeError, LineItem, OrderId, Result,
    Ticket, TicketId, TicketStatus,
};
use chrono::{DateTime, Utc};
use rand::RngCore;

#[derive(Default)]
struct TicketBook {
    tickets: HashMap<TicketId, Ticket>,
    by_code: HashMap<String, TicketId>,
    by_order: HashMap<OrderId, Vec<TicketId>>,
}

impl TicketBook {
    fn fresh_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let mut entropy = [0u8; 6];
            rng.fill_bytes(&mut entropy);
            let code = ticket_code_from_entropy(entropy);
            if !self.by_code.contains_key(&code) {
                return code;
            }
        }
    }
}

#[derive(Default)]
pub struct TicketIssuer {
    book: RwLock<TicketBook>,
}

impl TicketIssuer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue one ticket per unit of `item`. Seated lines get one seat per
    /// ticket, in the order the seats were held.
    pub fn issue_line(
        &self,
        order_id: OrderId,
        line_index: usize,
        item: &LineItem,
        now: DateTime<Utc>,
    ) -> Vec<Ticket> {
        let mut book = sync::write(&self.book);
        let mut issued = Vec::new();
        for unit in 0..item.quantity as usize {
            let ticket = Ticket {
                id: TicketId::new(),
                order_id,
                ticket_type_id: item.ticket_type_id,
                line_item: line_index,
                seat_id: item.seats.get(unit).cloned(),
                code: book.fresh_code(),
                status: TicketStatus::Issued,
                issued_at: now,
            };
            book.by_code.insert(ticket.code.clone(), ticket.id);
            book.by_order.entry(order_id).or_default().push(ticket.id);
            book.tickets.insert(ticket.id, ticket.clone());
            issued.push(ticket);
        }
        issued
    }

    /// Tickets of one order, in issue order.
    #[must_use]
    pub fn for_order(&self, order_id: OrderId) -> Vec<Ticket> {
        let book = sync::read(&self.book);
        book.by_order
            .get(&order_id)
            .into_iter()
            .flatten()
            .filter_map(|id| book.tickets.get(id).cloned())
            .collect()
    }

    /// Admit the holder of `code`: `issued → checked_in`.
    ///
    /// # Errors
    /// `TicketNotFound` for malformed or unknown codes,
    /// `InvalidTicketTransition` if the ticket is not `issued`.
    pub fn check_in(&self, code: &str) -> Result<Ticket> {
        if !verify_ticket_code(code) {
            return Err(BoxofficeError::TicketNotFound(code.to_string()));
        }
        let mut book = sync::write(&self.book);
        let id = *book
            .by_code
            .get(code)
            .ok_or_else(|| BoxofficeError::TicketNotFound(code.to_string()))?;
        let ticket = book
            .tickets
            .get_mut(&id)
            .ok_or_else(|| BoxofficeError::TicketNotFound(code.to_string()))?;
        transition(ticket, TicketStatus::CheckedIn)?;
        tracing::info!(ticket = %ticket.id, order = %ticket.order_id, "ticket checked in");
        Ok(ticket.clone())
    }

    /// Move every `issued` ticket of an order to `target`. Tickets already
    /// checked in, refunded, or voided are left alone.
    ///
    /// Returns the tickets that changed.
    pub fn retire_order(&self, order_id: OrderId, target: TicketStatus) -> Vec<Ticket> {
        let mut book = sync::write(&self.book);
        let ids = book.by_order.get(&order_id).cloned().unwrap_or_default();
        let mut changed = Vec::new();
        for id in ids {
            if let Some(ticket) = book.tickets.get_mut(&id) {
                if transition(ticket, target).is_ok() {
                    changed.push(ticket.clone());
                }
            }
        }
        changed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        sync::read(&self.book).tickets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn transition(ticket: &mut Ticket, target: TicketStatus) -> Result<()> {
    if !ticket.status.can_transition_to(target) {
        return Err(BoxofficeError::InvalidTicketTransition {
            ticket_id: ticket.id,
            from: ticket.status,
            to: target,
        });
    }
    ticket.status = target;
    Ok(())
}
