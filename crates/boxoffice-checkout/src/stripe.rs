//! Client-secret flow adapter.
//!
//! The buyer's browser confirms a payment intent with a client secret; the
//! gateway then reports the outcome through signed webhooks.
//!
//! Signature header: `t=<unix seconds>,v1=<hex>` where
//! `v1 = HMAC-SHA256(webhook_secret, "<t>.<raw payload>")`. Several `v1`
//! entries may be present during secret rotation; any match is accepted.

use boxoffice_types::constants::WEBHOOK_TIMESTAMP_TOLERANCE_SECS;
use boxoffice_types::{
    BoxofficeError, CanonicalPaymentEvent, Order, PaymentOutcome, ProviderHandoff, Result,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Deserialize;
use sha2::Sha256;

use crate::provider::{reject_signature, PaymentProvider};

type HmacSha256 = Hmac<Sha256>;

const NAME: &str = "stripe";

pub struct StripeProvider {
    webhook_secret: String,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct PaymentIntent {
    id: String,
    amount: u64,
    currency: String,
}

impl StripeProvider {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|e| BoxofficeError::Configuration(format!("stripe webhook secret: {e}")))
    }

    /// Produce a valid signature header for `payload` at `timestamp`.
    ///
    /// # Errors
    /// Returns `Configuration` if the secret can't key an HMAC.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
    }

    fn verify(&self, payload: &[u8], header: &str, received_at: DateTime<Utc>) -> Result<()> {
        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }
        let Some(timestamp) = timestamp else {
            return Err(reject_signature(NAME, "missing timestamp"));
        };
        let age = received_at.timestamp().checked_sub(timestamp).map(i64::unsigned_abs);
        if age.is_none_or(|age| age > WEBHOOK_TIMESTAMP_TOLERANCE_SECS.unsigned_abs()) {
            return Err(reject_signature(NAME, "timestamp outside tolerance"));
        }

        for candidate in candidates {
            let Ok(expected) = hex::decode(candidate) else {
                continue;
            };
            let mut mac = self.mac()?;
            mac.update(timestamp.to_string().as_bytes());
            mac.update(b".");
            mac.update(payload);
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }
        Err(reject_signature(NAME, "no matching v1 signature"))
    }
}

impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn init(&self, order: &Order, _now: DateTime<Utc>) -> Result<ProviderHandoff> {
        let mut rng = rand::thread_rng();
        let mut intent = [0u8; 12];
        let mut secret = [0u8; 12];
        rng.fill_bytes(&mut intent);
        rng.fill_bytes(&mut secret);

        let payment_intent_id = format!("pi_{}", hex::encode(intent));
        let client_secret = format!("{payment_intent_id}_secret_{}", hex::encode(secret));
        tracing::debug!(
            order = %order.id,
            payment_intent = %payment_intent_id,
            amount_cents = order.total_cents,
            "payment intent created"
        );
        Ok(ProviderHandoff::ClientSecret {
            payment_intent_id,
            client_secret,
        })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        received_at: DateTime<Utc>,
    ) -> Result<Option<CanonicalPaymentEvent>> {
        self.verify(payload, signature, received_at)?;

        let envelope: WebhookEnvelope =
            serde_json::from_slice(payload).map_err(|e| BoxofficeError::MalformedWebhook {
                reason: e.to_string(),
            })?;
        let outcome = match envelope.kind.as_str() {
            "payment_intent.succeeded" => PaymentOutcome::Succeeded,
            "payment_intent.payment_failed" => PaymentOutcome::Failed,
            other => {
                tracing::debug!(event_type = other, "ignoring stripe event");
                return Ok(None);
            }
        };
        let intent: PaymentIntent = serde_json::from_value(envelope.data.object).map_err(|e| {
            BoxofficeError::MalformedWebhook {
                reason: format!("payment intent: {e}"),
            }
        })?;
        Ok(Some(CanonicalPaymentEvent {
            provider: NAME.to_string(),
            event_id: envelope.id,
            provider_reference: intent.id,
            outcome,
            amount_cents: intent.amount,
            currency: intent.currency.to_ascii_uppercase(),
            raw_payload: String::from_utf8_lossy(payload).into_owned(),
        }))
    }

    fn signature_header(&self) -> &'static str {
        "stripe-signature"
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn payload(kind: &str, amount: u64) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": kind,
            "data": { "object": { "id": "pi_abc", "amount": amount, "currency": "usd" } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn signed_success_event_parses() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("payment_intent.succeeded", 5000);
        let sig = provider.sign(&body, now.timestamp()).unwrap();

        let event = provider.parse_webhook(&body, &sig, now).unwrap().unwrap();
        assert_eq!(event.provider_reference, "pi_abc");
        assert_eq!(event.outcome, PaymentOutcome::Succeeded);
        assert_eq!(event.amount_cents, 5000);
        assert_eq!(event.currency, "USD");
        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
    }

    #[test]
    fn failed_event_maps_to_failed() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("payment_intent.payment_failed", 5000);
        let sig = provider.sign(&body, now.timestamp()).unwrap();
        let event = provider.parse_webhook(&body, &sig, now).unwrap().unwrap();
        assert_eq!(event.outcome, PaymentOutcome::Failed);
    }

    #[test]
    fn tampered_payload_rejected() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("payment_intent.succeeded", 5000);
        let sig = provider.sign(&body, now.timestamp()).unwrap();
        let forged = payload("payment_intent.succeeded", 1);

        let err = provider.parse_webhook(&forged, &sig, now).unwrap_err();
        assert!(matches!(err, BoxofficeError::InvalidSignature { .. }));
    }

    #[test]
    fn wrong_secret_rejected() {
        let now = Utc::now();
        let body = payload("payment_intent.succeeded", 5000);
        let sig = StripeProvider::new("whsec_other")
            .sign(&body, now.timestamp())
            .unwrap();
        let err = StripeProvider::new("whsec_test")
            .parse_webhook(&body, &sig, now)
            .unwrap_err();
        assert!(matches!(err, BoxofficeError::InvalidSignature { .. }));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("payment_intent.succeeded", 5000);
        let sig = provider
            .sign(&body, (now - Duration::minutes(10)).timestamp())
            .unwrap();
        assert!(provider.parse_webhook(&body, &sig, now).is_err());
    }

    #[test]
    fn extreme_timestamps_rejected_without_overflow() {
        let provider = StripeProvider::new("whsec_test");
        for t in [i64::MIN, i64::MAX] {
            let err = provider
                .parse_webhook(b"{}", &format!("t={t},v1=00"), Utc::now())
                .unwrap_err();
            assert!(matches!(err, BoxofficeError::InvalidSignature { .. }));
        }
    }

    #[test]
    fn rotated_secret_second_v1_accepted() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("payment_intent.succeeded", 5000);
        let good = provider.sign(&body, now.timestamp()).unwrap();
        let v1 = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1={},v1={v1}", now.timestamp(), "00".repeat(32));
        assert!(provider.parse_webhook(&body, &header, now).unwrap().is_some());
    }

    #[test]
    fn unknown_event_type_ignored() {
        let provider = StripeProvider::new("whsec_test");
        let now = Utc::now();
        let body = payload("charge.refund.updated", 5000);
        let sig = provider.sign(&body, now.timestamp()).unwrap();
        assert!(provider.parse_webhook(&body, &sig, now).unwrap().is_none());
    }

    #[test]
    fn handoff_carries_client_secret() {
        let provider = StripeProvider::new("whsec_test");
        let order = crate::orchestrator::tests::blank_order(5000);
        let handoff = provider.init(&order, Utc::now()).unwrap();
        let ProviderHandoff::ClientSecret {
            payment_intent_id,
            client_secret,
        } = handoff
        else {
            panic!("expected client-secret flow");
        };
        assert!(payment_intent_id.starts_with("pi_"));
        assert!(client_secret.starts_with(&format!("{payment_intent_id}_secret_")));
    }
}
