//! Request handlers, one module per resource.

pub mod availability;
pub mod health;
pub mod orders;
pub mod tickets;
pub mod webhooks;
