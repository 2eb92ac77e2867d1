//! Environment-driven configuration.
//!
//! Every variable is optional and falls back to the defaults in
//! [`boxoffice_types::constants`]. A variable that is set but unparsable is
//! an error rather than a silent fallback.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `BOXOFFICE_HOST` / `BOXOFFICE_PORT` | listen address |
//! | `BOXOFFICE_LOG` | `tracing` env-filter directive |
//! | `BOXOFFICE_LOG_JSON` | `true` for JSON log lines |
//! | `BOXOFFICE_HOLD_TTL_SECS` | lifetime of a fresh hold, at most one day |
//! | `BOXOFFICE_CLOCK_SKEW_SECS` | tolerance added to hold deadlines, at most five minutes |
//! | `BOXOFFICE_SWEEP_INTERVAL_SECS` | expiry sweep period |
//! | `BOXOFFICE_WEBHOOK_QUEUE_DEPTH` | settlement queue capacity |
//! | `BOXOFFICE_CATALOG_PATH` | catalog JSON file |
//! | `STRIPE_WEBHOOK_SECRET` | enables the `stripe` provider |
//! | `PAYSTACK_SECRET_KEY` / `PAYSTACK_CHECKOUT_BASE` | enables the `paystack` provider |

use std::net::IpAddr;
use std::str::FromStr;

use boxoffice_types::constants::{
    DEFAULT_HOSTED_CHECKOUT_BASE, MAX_CLOCK_SKEW_SECS, MAX_HOLD_TTL_SECS,
};
use boxoffice_types::{
    AppConfig, BoxofficeError, PaystackConfig, ProviderConfig, Result, StripeConfig,
};

/// Load configuration from the process environment.
///
/// # Errors
/// Returns `Configuration` naming the first variable that fails to parse.
pub fn from_env() -> Result<AppConfig> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// # Errors
/// Returns `Configuration` naming the first variable that fails to parse.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let mut config = AppConfig::default();
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let server = &mut config.server;
    if let Some(host) = lookup("BOXOFFICE_HOST") {
        server.listen_addr.set_ip(parse::<IpAddr>("BOXOFFICE_HOST", &host)?);
    }
    if let Some(port) = lookup("BOXOFFICE_PORT") {
        server.listen_addr.set_port(parse("BOXOFFICE_PORT", &port)?);
    }
    if let Some(filter) = lookup("BOXOFFICE_LOG") {
        server.log_filter = filter;
    }
    if let Some(json) = lookup("BOXOFFICE_LOG_JSON") {
        server.log_json = parse_bool("BOXOFFICE_LOG_JSON", &json)?;
    }
    if let Some(depth) = lookup("BOXOFFICE_WEBHOOK_QUEUE_DEPTH") {
        server.webhook_queue_depth = positive("BOXOFFICE_WEBHOOK_QUEUE_DEPTH", &depth)?;
    }

    let checkout = &mut config.checkout;
    if let Some(ttl) = lookup("BOXOFFICE_HOLD_TTL_SECS") {
        checkout.hold_ttl_secs = bounded("BOXOFFICE_HOLD_TTL_SECS", &ttl, 1, MAX_HOLD_TTL_SECS)?;
    }
    if let Some(skew) = lookup("BOXOFFICE_CLOCK_SKEW_SECS") {
        checkout.clock_skew_secs = bounded("BOXOFFICE_CLOCK_SKEW_SECS", &skew, 0, MAX_CLOCK_SKEW_SECS)?;
    }
    if let Some(interval) = lookup("BOXOFFICE_SWEEP_INTERVAL_SECS") {
        checkout.sweep_interval_secs = positive("BOXOFFICE_SWEEP_INTERVAL_SECS", &interval)?;
    }

    config.catalog_path = lookup("BOXOFFICE_CATALOG_PATH");
    config.providers = ProviderConfig {
        stripe: lookup("STRIPE_WEBHOOK_SECRET").map(|webhook_secret| StripeConfig { webhook_secret }),
        paystack: lookup("PAYSTACK_SECRET_KEY").map(|secret_key| PaystackConfig {
            secret_key,
            checkout_base: lookup("PAYSTACK_CHECKOUT_BASE")
                .unwrap_or_else(|| DEFAULT_HOSTED_CHECKOUT_BASE.to_string()),
        }),
    };

    Ok(config)
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn positive<T: FromStr + PartialOrd + Default>(key: &str, value: &str) -> Result<T> {
    let parsed: T = parse(key, value)?;
    if parsed <= T::default() {
        return Err(invalid(key, value));
    }
    Ok(parsed)
}

fn bounded(key: &str, value: &str, min: i64, max: i64) -> Result<i64> {
    let parsed: i64 = parse(key, value)?;
    if !(min..=max).contains(&parsed) {
        return Err(BoxofficeError::Configuration(format!(
            "{key}: {parsed} is outside {min}..={max}"
        )));
    }
    Ok(parsed)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> BoxofficeError {
    BoxofficeError::Configuration(format!("{key}: invalid value {value:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use boxoffice_types::constants;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.listen_addr.port(), constants::DEFAULT_API_PORT);
        assert_eq!(config.checkout.hold_ttl_secs, constants::DEFAULT_HOLD_TTL_SECS);
        assert!(config.providers.stripe.is_none());
        assert!(config.providers.paystack.is_none());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn overrides_apply() {
        let config = load(&[
            ("BOXOFFICE_HOST", "127.0.0.1"),
            ("BOXOFFICE_PORT", "9000"),
            ("BOXOFFICE_LOG_JSON", "true"),
            ("BOXOFFICE_HOLD_TTL_SECS", "300"),
            ("BOXOFFICE_CLOCK_SKEW_SECS", "0"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_x"),
            ("PAYSTACK_SECRET_KEY", "sk_test"),
        ])
        .unwrap();
        assert_eq!(config.server.listen_addr.to_string(), "127.0.0.1:9000");
        assert!(config.server.log_json);
        assert_eq!(config.checkout.hold_ttl_secs, 300);
        assert_eq!(config.checkout.clock_skew_secs, 0);
        assert_eq!(config.providers.stripe.unwrap().webhook_secret, "whsec_x");
        assert_eq!(
            config.providers.paystack.unwrap().checkout_base,
            DEFAULT_HOSTED_CHECKOUT_BASE
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let config = load(&[
            ("BOXOFFICE_HOLD_TTL_SECS", "86400"),
            ("BOXOFFICE_CLOCK_SKEW_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(config.checkout.hold_ttl_secs, constants::MAX_HOLD_TTL_SECS);
        assert_eq!(config.checkout.clock_skew_secs, constants::MAX_CLOCK_SKEW_SECS);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = load(&[("STRIPE_WEBHOOK_SECRET", "  ")]).unwrap();
        assert!(config.providers.stripe.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (key, value) in [
            ("BOXOFFICE_PORT", "eighty"),
            ("BOXOFFICE_HOST", "not-an-ip"),
            ("BOXOFFICE_HOLD_TTL_SECS", "0"),
            ("BOXOFFICE_CLOCK_SKEW_SECS", "-1"),
            ("BOXOFFICE_HOLD_TTL_SECS", "9223372036854775807"),
            ("BOXOFFICE_HOLD_TTL_SECS", "86401"),
            ("BOXOFFICE_CLOCK_SKEW_SECS", "301"),
            ("BOXOFFICE_LOG_JSON", "maybe"),
            ("BOXOFFICE_WEBHOOK_QUEUE_DEPTH", "0"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(
                matches!(&err, BoxofficeError::Configuration(msg) if msg.contains(key)),
                "{key}: {err}"
            );
        }
    }
}
