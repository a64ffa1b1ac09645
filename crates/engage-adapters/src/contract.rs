//! Contract signature lookup.

use std::collections::HashMap;

use parking_lot::RwLock;

use engage_core::OfferId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("contract service unavailable: {0}")]
    Unavailable(String),
    #[error("no contract on file for {0}")]
    NotFound(String),
}

/// Answers whether both parties have signed the contract for an offer.
pub trait ContractService: Send + Sync {
    fn is_fully_signed(&self, offer_id: OfferId) -> Result<bool, ContractError>;
}

/// Returns scripted answers per offer, with a fallback for unknown offers.
///
/// A scripted `None` answers with [`ContractError::Unavailable`].
#[derive(Debug)]
pub struct ScriptedContractService {
    answers: RwLock<HashMap<OfferId, Option<bool>>>,
    fallback: Option<bool>,
}

impl ScriptedContractService {
    pub fn new(fallback: Option<bool>) -> Self {
        Self {
            answers: RwLock::new(HashMap::new()),
            fallback,
        }
    }

    /// Every contract is signed unless scripted otherwise.
    pub fn all_signed() -> Self {
        Self::new(Some(true))
    }

    pub fn set(&self, offer_id: OfferId, answer: Option<bool>) {
        self.answers.write().insert(offer_id, answer);
    }
}

impl ContractService for ScriptedContractService {
    fn is_fully_signed(&self, offer_id: OfferId) -> Result<bool, ContractError> {
        let answer = self
            .answers
            .read()
            .get(&offer_id)
            .copied()
            .unwrap_or(self.fallback);
        answer.ok_or_else(|| ContractError::Unavailable(format!("scripted outage for {offer_id}")))
    }
}
