use engage_core::MarketError;
use thiserror::Error;

/// Errors raised before any candidate is scored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    /// The request carries no skills section at all.
    #[error("talent request {0} has no skills_required section")]
    MissingRequiredSkills(String),

    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),
}

impl From<ScoringError> for MarketError {
    fn from(err: ScoringError) -> Self {
        MarketError::validation(err.to_string())
    }
}
