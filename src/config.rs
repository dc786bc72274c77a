//! Environment configuration.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use crate::checkout::CheckoutSettings;
use crate::domain::pricing::{ShippingPolicy, FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD};
use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// Without a database, orders are kept in memory.
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub nats_subject: String,
    pub shipping: ShippingPolicy,
    pub checkout: CheckoutSettings,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parsed = |name: &'static str, default: i64| parse_or(&lookup, name, default);
        Ok(Self {
            port: parse_or(&lookup, "PORT", 8083)?,
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            nats_url: lookup("NATS_URL").filter(|s| !s.is_empty()),
            nats_subject: lookup("NATS_SUBJECT").unwrap_or_else(|| "orders.placed".to_string()),
            shipping: ShippingPolicy {
                free_threshold: Money::rupees(parsed("FREE_SHIPPING_THRESHOLD", FREE_SHIPPING_THRESHOLD)?),
                flat_fee: Money::rupees(parsed("SHIPPING_FEE", FLAT_SHIPPING_FEE)?),
            },
            checkout: CheckoutSettings {
                store_name: lookup("STORE_NAME").unwrap_or_else(|| CheckoutSettings::default().store_name),
                payment_timeout: Duration::from_secs(parse_or(&lookup, "PAYMENT_TIMEOUT_SECS", 600)?),
            },
        })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8083);
        assert!(c.database_url.is_none());
        assert_eq!(c.shipping, ShippingPolicy::default());
        assert_eq!(c.checkout.payment_timeout, Duration::from_secs(600));
        assert_eq!(c.nats_subject, "orders.placed");
    }

    #[test]
    fn test_overrides() {
        let c = config(&[("PORT", "9000"), ("FREE_SHIPPING_THRESHOLD", "500"), ("STORE_NAME", "Puthiyam Products"), ("DATABASE_URL", "")]).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.shipping.free_threshold, Money::rupees(500));
        assert_eq!(c.checkout.store_name, "Puthiyam Products");
        assert!(c.database_url.is_none());
    }

    #[test]
    fn test_invalid_value() {
        assert!(matches!(config(&[("PAYMENT_TIMEOUT_SECS", "ten")]), Err(ConfigError::Invalid { name: "PAYMENT_TIMEOUT_SECS", .. })));
    }
}
