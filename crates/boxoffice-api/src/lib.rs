//! # boxoffice-api
//!
//! HTTP surface of the checkout engine, built on axum.
//!
//! ```text
//! POST /orders ──► Orchestrator ──► HoldManager
//! POST /webhooks/:provider ──► verify ──► mpsc ──► settlement worker
//! interval ──► expiry sweeper ──► Orchestrator::expire_pending_orders
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod worker;

pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
