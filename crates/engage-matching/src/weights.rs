use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// Relative weights of the four scoring components.
///
/// Weights must be non-negative and sum to 1.0 so that the weighted total
/// stays on the 0..=1 scale before it is scaled to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub skill: f64,
    pub experience: f64,
    pub budget: f64,
    pub location: f64,
}

pub const DEFAULT_WEIGHTS: Weights = Weights {
    skill: 0.40,
    experience: 0.25,
    budget: 0.20,
    location: 0.15,
};

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.skill + self.experience + self.budget + self.location
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let parts = [self.skill, self.experience, self.budget, self.location];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoringError::InvalidWeights(format!(
                "weights must be finite and non-negative: {self:?}"
            )));
        }
        if (self.sum() - 1.0).abs() > 1e-6 {
            return Err(ScoringError::InvalidWeights(format!(
                "weights must sum to 1.0, got {:.4}",
                self.sum()
            )));
        }
        Ok(())
    }
}
