//! # Money and Platform Fees
//!
//! Amounts are `i64` values in the smallest currency unit (cents, paise).
//! Floating point never touches money.
//!
//! ## Fee Invariant
//!
//! [`FeePolicy::split`] computes `platform_fee = round(amount × rate)` with
//! half-up basis-point arithmetic and then derives
//! `provider_amount = amount − platform_fee`. The provider share is never
//! computed independently, so `platform_fee + provider_amount == amount`
//! holds for every input, odd cents included.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis points in one whole (100%).
const BASIS_POINTS_PER_WHOLE: i128 = 10_000;

/// Errors from money construction and fee arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Currency code is not three ASCII letters.
    #[error("invalid currency code: \"{0}\"")]
    InvalidCurrency(String),

    /// Amount must be strictly positive for this operation.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    /// Arithmetic overflowed the `i64` minor-unit range.
    #[error("amount overflow computing {0}")]
    Overflow(&'static str),

    /// Fee rate above 100%.
    #[error("fee rate of {0} basis points exceeds 10000")]
    InvalidFeeRate(u32),
}

/// ISO 4217 currency code, upper-cased at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validate and normalize a currency code.
    pub fn new(code: impl AsRef<str>) -> Result<Self, MoneyError> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// US dollars.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount in minor units with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
}

impl Money {
    /// Create a monetary amount.
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Whether the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }
}

/// The canonical platform fee policy.
///
/// One rate applies to every engagement payment. The default is 15%
/// (1500 basis points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    basis_points: u32,
}

impl FeePolicy {
    /// The platform's standard rate: 15%.
    pub const STANDARD_BASIS_POINTS: u32 = 1_500;

    /// Build a policy from a basis-point rate (0..=10000).
    pub fn from_basis_points(basis_points: u32) -> Result<Self, MoneyError> {
        if i128::from(basis_points) > BASIS_POINTS_PER_WHOLE {
            return Err(MoneyError::InvalidFeeRate(basis_points));
        }
        Ok(Self { basis_points })
    }

    /// The configured rate in basis points.
    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    /// Split a positive amount into platform fee and provider share.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::NonPositiveAmount`] for amounts ≤ 0.
    pub fn split(&self, amount: i64) -> Result<FeeSplit, MoneyError> {
        if amount <= 0 {
            return Err(MoneyError::NonPositiveAmount(amount));
        }
        let scaled = i128::from(amount) * i128::from(self.basis_points);
        // Half-up rounding on a non-negative numerator.
        let fee = (scaled + BASIS_POINTS_PER_WHOLE / 2) / BASIS_POINTS_PER_WHOLE;
        let platform_fee = i64::try_from(fee).map_err(|_| MoneyError::Overflow("platform fee"))?;
        Ok(FeeSplit {
            amount,
            platform_fee,
            provider_amount: amount - platform_fee,
        })
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            basis_points: Self::STANDARD_BASIS_POINTS,
        }
    }
}

/// The result of splitting an amount under a [`FeePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Gross amount.
    pub amount: i64,
    /// Amount retained by the platform.
    pub platform_fee: i64,
    /// Amount paid out to the provider.
    pub provider_amount: i64,
}

impl FeeSplit {
    /// Whether the split reconciles to the gross amount exactly.
    pub fn reconciles(&self) -> bool {
        self.platform_fee + self.provider_amount == self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_fee_on_ten_thousand_dollars() {
        let split = FeePolicy::default().split(1_000_000).unwrap();
        assert_eq!(split.platform_fee, 150_000);
        assert_eq!(split.provider_amount, 850_000);
        assert!(split.reconciles());
    }

    #[test]
    fn odd_cents_round_half_up() {
        // 15% of 333 = 49.95 -> 50
        let split = FeePolicy::default().split(333).unwrap();
        assert_eq!(split.platform_fee, 50);
        assert_eq!(split.provider_amount, 283);
        // 15% of 1 = 0.15 -> 0
        let split = FeePolicy::default().split(1).unwrap();
        assert_eq!(split.platform_fee, 0);
        assert_eq!(split.provider_amount, 1);
    }

    #[test]
    fn zero_and_negative_amounts_rejected() {
        assert_eq!(
            FeePolicy::default().split(0),
            Err(MoneyError::NonPositiveAmount(0))
        );
        assert!(FeePolicy::default().split(-5).is_err());
    }

    #[test]
    fn fee_rate_above_whole_rejected() {
        assert!(FeePolicy::from_basis_points(10_001).is_err());
        assert!(FeePolicy::from_basis_points(10_000).is_ok());
    }

    #[test]
    fn full_rate_leaves_provider_nothing() {
        let split = FeePolicy::from_basis_points(10_000)
            .unwrap()
            .split(i64::MAX)
            .unwrap();
        assert_eq!(split.platform_fee, i64::MAX);
        assert_eq!(split.provider_amount, 0);
    }

    #[test]
    fn currency_normalizes_and_validates() {
        assert_eq!(Currency::new("usd").unwrap().as_str(), "USD");
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("U$D").is_err());
        let parsed: Result<Currency, _> = serde_json::from_str("\"eur\"");
        assert_eq!(parsed.unwrap().as_str(), "EUR");
        assert!(serde_json::from_str::<Currency>("\"euro\"").is_err());
    }

    #[test]
    fn money_display_uses_two_decimals() {
        assert_eq!(Money::new(1_000_050, Currency::usd()).to_string(), "10000.50 USD");
        assert_eq!(Money::new(-7, Currency::usd()).to_string(), "-0.07 USD");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Fee plus provider share always equals the gross amount.
            #[test]
            fn split_always_reconciles(amount in 1i64..=i64::MAX, bps in 0u32..=10_000) {
                let split = FeePolicy::from_basis_points(bps).unwrap().split(amount).unwrap();
                prop_assert_eq!(split.platform_fee + split.provider_amount, amount);
                prop_assert!(split.platform_fee >= 0);
                prop_assert!(split.provider_amount >= 0);
            }

            /// Splitting is deterministic.
            #[test]
            fn split_is_deterministic(amount in 1i64..1_000_000_000_000, bps in 0u32..=10_000) {
                let policy = FeePolicy::from_basis_points(bps).unwrap();
                prop_assert_eq!(policy.split(amount).unwrap(), policy.split(amount).unwrap());
            }
        }
    }
}
