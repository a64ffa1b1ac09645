//! # engage-matching — Talent Scoring
//!
//! Ranks talent profiles against a talent request with a weighted blend of
//! four components:
//!
//! | Component  | Default weight | Source                     |
//! |------------|----------------|----------------------------|
//! | Skill      | 0.40           | [`skills::match_skills`]   |
//! | Experience | 0.25           | [`fit::experience_fit`]    |
//! | Budget     | 0.20           | [`fit::budget_fit`]        |
//! | Location   | 0.15           | [`fit::location_fit`]      |
//!
//! The crate also owns the request and profile model, including the
//! talent request lifecycle (`active → assigned → closed`).

pub mod error;
pub mod fit;
pub mod model;
pub mod scoring;
pub mod skills;
pub mod weights;

pub use error::ScoringError;
pub use model::{
    Availability, ExperienceLevel, ProfileSkill, RateRange, RequestStatus, RequiredSkill,
    SkillLevel, TalentProfile, TalentRequest, Urgency,
};
pub use scoring::{score, top_n, ComponentScores, MatchResult, ScoringConfig, ScoringEngine};
pub use weights::{Weights, DEFAULT_WEIGHTS};
