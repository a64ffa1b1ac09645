//! # Candidate Scoring
//!
//! [`ScoringEngine::score`] turns a request and a candidate pool into a
//! ranked list of [`MatchResult`]s. Scoring is pure: the same inputs always
//! produce the same ranking, and nothing here takes a lock or performs I/O.

use serde::{Deserialize, Serialize};

use engage_core::{ProfileId, RequestId};

use crate::error::ScoringError;
use crate::fit::{budget_fit, experience_fit, location_fit};
use crate::model::{TalentProfile, TalentRequest};
use crate::skills::match_skills;
use crate::weights::Weights;

pub const REASON_STRONG_SKILL: &str = "Strong skill match";
pub const REASON_PARTIAL_SKILL: &str = "Partial skill match";
pub const REASON_EXPERIENCE: &str = "Experience level matches";
pub const REASON_BUDGET: &str = "Rate within budget";
pub const REASON_LOCATION: &str = "Location compatible";

/// Tunables for the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: Weights,
    /// Skill overlap at or above this earns "Strong skill match".
    pub strong_skill_threshold: f64,
    /// Skill overlap at or above this (and below strong) earns "Partial skill match".
    pub partial_skill_threshold: f64,
    /// Relative budget distance at which the budget score reaches zero.
    pub budget_decay_span: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            strong_skill_threshold: 0.8,
            partial_skill_threshold: 0.5,
            budget_decay_span: 0.5,
        }
    }
}

/// Per-component scores, each in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub skill: f64,
    pub experience: f64,
    pub budget: f64,
    pub location: f64,
}

/// One scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub talent_id: ProfileId,
    pub request_id: RequestId,
    /// Weighted total on a 0..=100 scale, rounded to two decimals.
    pub total_score: f64,
    pub components: ComponentScores,
    /// Human-readable reasons in component order.
    pub reasons: Vec<String>,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// Weighted multi-factor scoring.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Build an engine, validating the weights.
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.weights.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score and rank every available candidate.
    ///
    /// Results are sorted by total score descending, ties broken by
    /// profile id ascending. Candidates that are not `available` are
    /// dropped before scoring.
    ///
    /// # Errors
    ///
    /// [`ScoringError::MissingRequiredSkills`] when the request has no
    /// skills section.
    pub fn score(
        &self,
        request: &TalentRequest,
        candidates: &[TalentProfile],
    ) -> Result<Vec<MatchResult>, ScoringError> {
        let required = request
            .skills_required
            .as_deref()
            .ok_or_else(|| ScoringError::MissingRequiredSkills(request.id.to_string()))?;

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .filter(|c| c.is_available())
            .map(|c| self.score_one(request, required, c))
            .collect();

        results.sort_by(|a, b| {
            b.total_score
                .total_cmp(&a.total_score)
                .then_with(|| a.talent_id.cmp(&b.talent_id))
        });
        Ok(results)
    }

    /// The best `n` results of [`score`](Self::score).
    pub fn top_n(
        &self,
        request: &TalentRequest,
        candidates: &[TalentProfile],
        n: usize,
    ) -> Result<Vec<MatchResult>, ScoringError> {
        let mut results = self.score(request, candidates)?;
        results.truncate(n);
        Ok(results)
    }

    fn score_one(
        &self,
        request: &TalentRequest,
        required: &[crate::model::RequiredSkill],
        candidate: &TalentProfile,
    ) -> MatchResult {
        let cfg = &self.config;
        let skills = match_skills(required, &candidate.skills);
        let components = ComponentScores {
            skill: skills.match_percentage,
            experience: experience_fit(request.experience_level, candidate.experience_level),
            budget: budget_fit(
                &request.budget,
                candidate.hourly_rate.as_ref(),
                cfg.budget_decay_span,
            ),
            location: location_fit(request, candidate),
        };

        let w = &cfg.weights;
        let weighted = w.skill * components.skill
            + w.experience * components.experience
            + w.budget * components.budget
            + w.location * components.location;

        MatchResult {
            talent_id: candidate.id,
            request_id: request.id,
            total_score: round2(weighted * 100.0),
            components,
            reasons: self.reasons(&components),
            matched_skills: skills.matched_skills,
            missing_skills: skills.missing_skills,
        }
    }

    fn reasons(&self, c: &ComponentScores) -> Vec<String> {
        let cfg = &self.config;
        let mut reasons = Vec::new();
        if c.skill >= cfg.strong_skill_threshold {
            reasons.push(REASON_STRONG_SKILL.to_string());
        } else if c.skill >= cfg.partial_skill_threshold {
            reasons.push(REASON_PARTIAL_SKILL.to_string());
        }
        if c.experience >= 1.0 {
            reasons.push(REASON_EXPERIENCE.to_string());
        }
        if c.budget >= 1.0 {
            reasons.push(REASON_BUDGET.to_string());
        }
        if c.location >= 1.0 {
            reasons.push(REASON_LOCATION.to_string());
        }
        reasons
    }
}

/// Score with the default configuration.
pub fn score(
    request: &TalentRequest,
    candidates: &[TalentProfile],
) -> Result<Vec<MatchResult>, ScoringError> {
    ScoringEngine::default().score(request, candidates)
}

/// Best `n` candidates with the default configuration.
pub fn top_n(
    request: &TalentRequest,
    candidates: &[TalentProfile],
    n: usize,
) -> Result<Vec<MatchResult>, ScoringError> {
    ScoringEngine::default().top_n(request, candidates, n)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
