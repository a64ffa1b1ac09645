//! Engine configuration.
//!
//! Defaults suit a single-currency USD marketplace. Override via
//! environment variables or explicit construction for tests.

use std::time::Duration as StdDuration;

use chrono::Duration;

use engage_core::{Currency, FeePolicy};
use engage_state::NegotiationPolicy;

/// Tunables shared by every service.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Platform fee applied to every engagement payment.
    pub fee: FeePolicy,
    /// Counters allowed per offer before the next one expires it.
    pub max_negotiation_rounds: u32,
    /// Offer lifetime. `None` disables expiry.
    pub offer_ttl: Option<Duration>,
    /// How long captured funds are expected to stay in escrow.
    pub escrow_hold_period: Duration,
    /// Bound on every payment processor call.
    pub processor_timeout: StdDuration,
    /// Currency for new requests and offers.
    pub currency: Currency,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee: FeePolicy::default(),
            max_negotiation_rounds: 3,
            offer_ttl: Some(Duration::days(7)),
            escrow_hold_period: Duration::days(14),
            processor_timeout: StdDuration::from_secs(10),
            currency: Currency::usd(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ENGAGE_FEE_BASIS_POINTS` (default: 1500)
    /// - `ENGAGE_MAX_NEGOTIATION_ROUNDS` (default: 3)
    /// - `ENGAGE_OFFER_TTL_HOURS` (default: 168, `0` disables expiry)
    /// - `ENGAGE_ESCROW_HOLD_DAYS` (default: 14)
    /// - `ENGAGE_PROCESSOR_TIMEOUT_MS` (default: 10000)
    /// - `ENGAGE_CURRENCY` (default: USD)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let fee = match parse::<u32>(&lookup, "ENGAGE_FEE_BASIS_POINTS")? {
            Some(bps) => FeePolicy::from_basis_points(bps)
                .map_err(|e| ConfigError::Invalid("ENGAGE_FEE_BASIS_POINTS".into(), e.to_string()))?,
            None => defaults.fee,
        };
        let offer_ttl = match parse::<i64>(&lookup, "ENGAGE_OFFER_TTL_HOURS")? {
            Some(0) => None,
            Some(h) if h > 0 => Some(Duration::hours(h)),
            Some(h) => {
                return Err(ConfigError::Invalid(
                    "ENGAGE_OFFER_TTL_HOURS".into(),
                    format!("must not be negative, got {h}"),
                ))
            }
            None => defaults.offer_ttl,
        };
        let escrow_hold_period = match parse::<u32>(&lookup, "ENGAGE_ESCROW_HOLD_DAYS")? {
            Some(d) => Duration::days(i64::from(d)),
            None => defaults.escrow_hold_period,
        };
        let currency = match lookup("ENGAGE_CURRENCY") {
            Some(code) => Currency::new(&code)
                .map_err(|e| ConfigError::Invalid("ENGAGE_CURRENCY".into(), e.to_string()))?,
            None => defaults.currency,
        };

        Ok(Self {
            fee,
            max_negotiation_rounds: parse(&lookup, "ENGAGE_MAX_NEGOTIATION_ROUNDS")?
                .unwrap_or(defaults.max_negotiation_rounds),
            offer_ttl,
            escrow_hold_period,
            processor_timeout: parse::<u64>(&lookup, "ENGAGE_PROCESSOR_TIMEOUT_MS")?
                .map(StdDuration::from_millis)
                .unwrap_or(defaults.processor_timeout),
            currency,
        })
    }

    /// The negotiation limits handed to every offer.
    pub fn negotiation_policy(&self) -> NegotiationPolicy {
        NegotiationPolicy {
            fee: self.fee,
            max_rounds: self.max_negotiation_rounds,
            ttl: self.offer_ttl,
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::Invalid(var.to_string(), e.to_string()))
        })
        .transpose()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.fee.basis_points(), 1_500);
        assert_eq!(cfg.negotiation_policy().max_rounds, 3);
    }

    #[test]
    fn overrides_apply() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("ENGAGE_FEE_BASIS_POINTS", "1000"),
            ("ENGAGE_MAX_NEGOTIATION_ROUNDS", "5"),
            ("ENGAGE_OFFER_TTL_HOURS", "0"),
            ("ENGAGE_ESCROW_HOLD_DAYS", "30"),
            ("ENGAGE_PROCESSOR_TIMEOUT_MS", "250"),
            ("ENGAGE_CURRENCY", "eur"),
        ]))
        .unwrap();
        assert_eq!(cfg.fee.basis_points(), 1_000);
        assert_eq!(cfg.max_negotiation_rounds, 5);
        assert_eq!(cfg.offer_ttl, None);
        assert_eq!(cfg.escrow_hold_period, Duration::days(30));
        assert_eq!(cfg.processor_timeout, StdDuration::from_millis(250));
        assert_eq!(cfg.currency.as_str(), "EUR");
    }

    #[test]
    fn malformed_values_are_errors() {
        for (k, v) in [
            ("ENGAGE_FEE_BASIS_POINTS", "fifteen"),
            ("ENGAGE_FEE_BASIS_POINTS", "20000"),
            ("ENGAGE_OFFER_TTL_HOURS", "-1"),
            ("ENGAGE_CURRENCY", "dollars"),
        ] {
            let err = EngineConfig::from_lookup(lookup(&[(k, v)])).unwrap_err();
            assert!(err.to_string().contains(k), "{err}");
        }
    }
}
