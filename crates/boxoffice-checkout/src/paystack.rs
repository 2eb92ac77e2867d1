//! Hosted-page flow adapter.
//!
//! The buyer is redirected to the gateway's checkout page and comes back
//! with a transaction reference; the outcome arrives by webhook, signed as
//! the hex `HMAC-SHA512(secret_key, raw payload)` in `x-paystack-signature`.

use boxoffice_types::{
    BoxofficeError, CanonicalPaymentEvent, Order, PaymentOutcome, ProviderHandoff, Result,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Deserialize;
use sha2::Sha512;

use crate::provider::{reject_signature, PaymentProvider};

type HmacSha512 = Hmac<Sha512>;

const NAME: &str = "paystack";

pub struct PaystackProvider {
    secret_key: String,
    checkout_base: String,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    event: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct Charge {
    id: Option<u64>,
    reference: String,
    amount: u64,
    currency: String,
}

impl PaystackProvider {
    pub fn new(secret_key: impl Into<String>, checkout_base: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            checkout_base: checkout_base.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha512> {
        HmacSha512::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| BoxofficeError::Configuration(format!("paystack secret key: {e}")))
    }

    /// Hex signature the gateway would send for `payload`.
    ///
    /// # Errors
    /// Returns `Configuration` if the secret can't key an HMAC.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn verify(&self, payload: &[u8], signature: &str) -> Result<()> {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return Err(reject_signature(NAME, "signature is not hex"));
        };
        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| reject_signature(NAME, "signature mismatch"))
    }
}

impl PaymentProvider for PaystackProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn init(&self, order: &Order, _now: DateTime<Utc>) -> Result<ProviderHandoff> {
        let mut rng = rand::thread_rng();
        let mut nonce = [0u8; 6];
        let mut access_code = [0u8; 8];
        rng.fill_bytes(&mut nonce);
        rng.fill_bytes(&mut access_code);

        let reference = format!("bo_{}_{}", order.id.0.simple(), hex::encode(nonce));
        let authorization_url = format!(
            "{}/{}",
            self.checkout_base.trim_end_matches('/'),
            hex::encode(access_code)
        );
        tracing::debug!(order = %order.id, reference = %reference, "hosted checkout initialized");
        Ok(ProviderHandoff::HostedRedirect {
            authorization_url,
            reference,
        })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        _received_at: DateTime<Utc>,
    ) -> Result<Option<CanonicalPaymentEvent>> {
        self.verify(payload, signature)?;

        let envelope: WebhookEnvelope =
            serde_json::from_slice(payload).map_err(|e| BoxofficeError::MalformedWebhook {
                reason: e.to_string(),
            })?;
        let outcome = match envelope.event.as_str() {
            "charge.success" => PaymentOutcome::Succeeded,
            "charge.failed" => PaymentOutcome::Failed,
            other => {
                tracing::debug!(event_type = other, "ignoring paystack event");
                return Ok(None);
            }
        };
        let charge: Charge =
            serde_json::from_value(envelope.data).map_err(|e| BoxofficeError::MalformedWebhook {
                reason: format!("charge: {e}"),
            })?;
        Ok(Some(CanonicalPaymentEvent {
            provider: NAME.to_string(),
            event_id: charge.id.map(|id| id.to_string()),
            provider_reference: charge.reference,
            outcome,
            amount_cents: charge.amount,
            currency: charge.currency.to_ascii_uppercase(),
            raw_payload: String::from_utf8_lossy(payload).into_owned(),
        }))
    }

    fn signature_header(&self) -> &'static str {
        "x-paystack-signature"
    }
}
