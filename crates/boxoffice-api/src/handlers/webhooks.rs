//! `POST /webhooks/:provider`
//!
//! The signature is checked synchronously; everything after that is
//! deferred to the settlement worker. Providers retry anything that is not
//! a 2xx, so the only non-2xx answers are a bad signature (400), an
//! unknown provider path (404), and a closed queue (503).

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use boxoffice_types::BoxofficeError;
use chrono::Utc;

use crate::error::AppError;
use crate::state::AppState;

pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let adapter = state
        .orchestrator
        .providers()
        .get(&provider)
        .map_err(|_| AppError::not_found("payment provider", &provider))?;
    let signature = headers
        .get(adapter.signature_header())
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let event = match adapter.parse_webhook(&body, signature, Utc::now()) {
        Ok(Some(event)) => event,
        Ok(None) => return Ok(StatusCode::OK),
        Err(err @ BoxofficeError::InvalidSignature { .. }) => return Err(err.into()),
        // Signed but unreadable: a retry would carry the same bytes.
        Err(err) => {
            tracing::warn!(provider = %provider, error = %err, "acknowledging unreadable webhook");
            return Ok(StatusCode::OK);
        }
    };

    tracing::debug!(
        provider = %provider,
        reference = %event.provider_reference,
        provider_event = event.event_id.as_deref().unwrap_or("-"),
        outcome = %event.outcome,
        "webhook queued"
    );
    state
        .webhooks
        .send(event)
        .await
        .map_err(|_| AppError::unavailable("settlement queue closed"))?;
    Ok(StatusCode::OK)
}
