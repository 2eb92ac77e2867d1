//! Payment attempts and provider-agnostic payment events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, PaymentAttemptId};

/// Status of one payment initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentAttemptStatus {
    Initialized,
    Succeeded,
    Failed,
}

impl std::fmt::Display for PaymentAttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One initialization of payment for an order with a given provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    pub id: PaymentAttemptId,
    pub order_id: OrderId,
    pub provider: String,
    pub provider_reference: String,
    pub amount_cents: u64,
    pub currency: String,
    pub status: PaymentAttemptStatus,
    /// Where the buyer lands after an off-site flow.
    pub return_url: Option<String>,
    /// Raw payloads received for this attempt, kept for idempotency matching
    /// and audit.
    #[serde(default)]
    pub raw_events: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// What the buyer must do next to complete payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum ProviderHandoff {
    /// Direct integration: the client confirms the intent with the secret.
    ClientSecret {
        #[serde(rename = "paymentIntentId")]
        payment_intent_id: String,
        #[serde(rename = "clientSecret")]
        client_secret: String,
    },
    /// Off-site flow: the buyer is redirected to a hosted page.
    HostedRedirect {
        #[serde(rename = "authorizationUrl")]
        authorization_url: String,
        reference: String,
    },
}

impl ProviderHandoff {
    /// The reference the provider will echo back in webhooks.
    #[must_use]
    pub fn provider_reference(&self) -> &str {
        match self {
            Self::ClientSecret {
                payment_intent_id, ..
            } => payment_intent_id,
            Self::HostedRedirect { reference, .. } => reference,
        }
    }
}

/// Outcome reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Provider-agnostic representation of a payment outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPaymentEvent {
    pub provider: String,
    /// Provider-side event ID, when the provider supplies one.
    pub event_id: Option<String>,
    pub provider_reference: String,
    pub outcome: PaymentOutcome,
    pub amount_cents: u64,
    /// ISO 4217, normalized to uppercase.
    pub currency: String,
    /// The verified raw payload this event was parsed from.
    pub raw_payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_serializes_with_camel_case_fields() {
        let handoff = ProviderHandoff::ClientSecret {
            payment_intent_id: "pi_1".into(),
            client_secret: "pi_1_secret_x".into(),
        };
        let json = serde_json::to_value(&handoff).unwrap();
        assert_eq!(json["flow"], "client_secret");
        assert_eq!(json["paymentIntentId"], "pi_1");
        assert_eq!(json["clientSecret"], "pi_1_secret_x");

        let handoff = ProviderHandoff::HostedRedirect {
            authorization_url: "https://checkout.example/abc".into(),
            reference: "ref_1".into(),
        };
        let json = serde_json::to_value(&handoff).unwrap();
        assert_eq!(json["authorizationUrl"], "https://checkout.example/abc");
        assert_eq!(json["reference"], "ref_1");
    }

    #[test]
    fn handoff_reference() {
        let handoff = ProviderHandoff::HostedRedirect {
            authorization_url: String::new(),
            reference: "ref_9".into(),
        };
        assert_eq!(handoff.provider_reference(), "ref_9");
    }
}
