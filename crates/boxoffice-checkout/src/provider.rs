//! Payment provider seam.
//!
//! Every gateway is one [`PaymentProvider`] implementation. The rest of the
//! engine only sees [`ProviderHandoff`] going out and
//! [`CanonicalPaymentEvent`] coming back.

use std::collections::BTreeMap;
use std::sync::Arc;

use boxoffice_types::{
    BoxofficeError, CanonicalPaymentEvent, Order, ProviderConfig, ProviderHandoff, Result,
};
use chrono::{DateTime, Utc};

use crate::paystack::PaystackProvider;
use crate::stripe::StripeProvider;

/// Uniform interface over heterogeneous payment gateways.
pub trait PaymentProvider: Send + Sync {
    /// Registry key, also the `{provider}` path segment of the webhook route.
    fn name(&self) -> &'static str;

    /// Start payment for `order` and return what the buyer needs next.
    /// The returned reference is what later webhooks will carry.
    fn init(&self, order: &Order, now: DateTime<Utc>) -> Result<ProviderHandoff>;

    /// Verify and translate one webhook delivery.
    ///
    /// Returns `Ok(None)` for validly signed events this engine does not
    /// act on.
    ///
    /// # Errors
    /// `InvalidSignature` when verification fails (nothing else is looked
    /// at), `MalformedWebhook` when a verified payload can't be parsed.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: &str,
        received_at: DateTime<Utc>,
    ) -> Result<Option<CanonicalPaymentEvent>>;

    /// Request header carrying the webhook signature.
    fn signature_header(&self) -> &'static str;
}

/// Log a rejected signature on the security target and build the error.
pub(crate) fn reject_signature(provider: &str, reason: &str) -> BoxofficeError {
    tracing::warn!(
        target: "boxoffice::security",
        provider,
        reason,
        "webhook signature rejected"
    );
    BoxofficeError::InvalidSignature {
        provider: provider.to_string(),
    }
}

/// Providers enabled on this deployment, by name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<&'static str, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configured credentials. Providers without
    /// credentials are left out.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut registry = Self::new();
        if let Some(stripe) = &config.stripe {
            registry.register(Arc::new(StripeProvider::new(stripe.webhook_secret.clone())));
        }
        if let Some(paystack) = &config.paystack {
            registry.register(Arc::new(PaystackProvider::new(
                paystack.secret_key.clone(),
                paystack.checkout_base.clone(),
            )));
        }
        registry
    }

    /// Add or replace a provider.
    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        tracing::info!(provider = provider.name(), "payment provider registered");
        self.providers.insert(provider.name(), provider);
    }

    /// # Errors
    /// Returns `UnknownProvider` if no adapter has this name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn PaymentProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| BoxofficeError::UnknownProvider(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.keys().copied()
    }
}
