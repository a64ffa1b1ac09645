//! Provider payout destinations.

use std::collections::HashMap;

use parking_lot::RwLock;

use engage_core::{ActorId, MarketError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayoutError {
    #[error("no payout destination registered for {0}")]
    Unregistered(String),
}

impl From<PayoutError> for MarketError {
    fn from(err: PayoutError) -> Self {
        MarketError::payment_failed(format!("Payment failed: {err}"))
    }
}

/// Resolves where a provider's money should be sent.
pub trait PayoutDirectory: Send + Sync {
    fn destination_for(&self, provider_id: ActorId) -> Result<String, PayoutError>;
}

/// In-memory directory.
///
/// Unregistered providers get a derived `acct_<uuid>` destination unless
/// the directory is strict.
#[derive(Debug, Default)]
pub struct InMemoryPayoutDirectory {
    destinations: RwLock<HashMap<ActorId, String>>,
    strict: bool,
}

impl InMemoryPayoutDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only registered providers resolve.
    pub fn strict() -> Self {
        Self {
            destinations: RwLock::new(HashMap::new()),
            strict: true,
        }
    }

    pub fn register(&self, provider_id: ActorId, destination: impl Into<String>) {
        self.destinations.write().insert(provider_id, destination.into());
    }
}

impl PayoutDirectory for InMemoryPayoutDirectory {
    fn destination_for(&self, provider_id: ActorId) -> Result<String, PayoutError> {
        if let Some(dest) = self.destinations.read().get(&provider_id) {
            return Ok(dest.clone());
        }
        if self.strict {
            return Err(PayoutError::Unregistered(provider_id.to_string()));
        }
        Ok(format!("acct_{}", provider_id.as_uuid().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_then_derived() {
        let dir = InMemoryPayoutDirectory::new();
        let a = ActorId::new();
        dir.register(a, "iban:DE89");
        assert_eq!(dir.destination_for(a).unwrap(), "iban:DE89");
        assert!(dir.destination_for(ActorId::new()).unwrap().starts_with("acct_"));
    }

    #[test]
    fn strict_directory_refuses_unknown() {
        let dir = InMemoryPayoutDirectory::strict();
        let err = dir.destination_for(ActorId::new()).unwrap_err();
        let market: MarketError = err.into();
        assert_eq!(market.kind(), engage_core::ErrorKind::PaymentFailed);
    }
}
