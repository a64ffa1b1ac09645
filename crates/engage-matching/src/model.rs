//! # Request and Profile Model
//!
//! The two inputs of the scoring engine. A [`TalentRequest`] is owned by a
//! seeker company and is the only type in this crate with a lifecycle:
//!
//! ```text
//! Active ──assign()──▶ Assigned ──close()──▶ Closed
//!   │                                          ▲
//!   └──────────────────close()─────────────────┘
//! ```
//!
//! A [`TalentProfile`] is read-only here.

use serde::{Deserialize, Serialize};

use engage_core::{
    messages, Actor, ActorId, Currency, EntityKind, Lifecycle, MarketError, ProfileId, RequestId,
    Timestamp, TransitionRecord,
};

// ── Shared vocabularies ────────────────────────────────────────────────

/// Seniority ladder shared by requests and profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
    Lead,
}

impl ExperienceLevel {
    /// Position on the ladder, starting at zero.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Junior => 0,
            Self::Mid => 1,
            Self::Senior => 2,
            Self::Lead => 3,
        }
    }

    /// Number of rungs between two levels.
    pub fn distance(&self, other: ExperienceLevel) -> u8 {
        self.rank().abs_diff(other.rank())
    }
}

/// Proficiency attached to a single skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// How quickly the seeker needs the work staffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Critical,
}

/// Whether a provider can take on new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    PartiallyAvailable,
    Unavailable,
}

/// An inclusive hourly-rate range in minor units.
///
/// Always satisfies `0 <= min <= max`, including when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRateRange")]
pub struct RateRange {
    min: i64,
    max: i64,
}

#[derive(Deserialize)]
struct RawRateRange {
    min: i64,
    max: i64,
}

impl TryFrom<RawRateRange> for RateRange {
    type Error = MarketError;

    fn try_from(raw: RawRateRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl RateRange {
    /// Build a range, rejecting negative bounds and inverted ranges.
    pub fn new(min: i64, max: i64) -> Result<Self, MarketError> {
        if min < 0 || max < min {
            return Err(MarketError::validation(format!(
                "rate range must satisfy 0 <= min <= max, got {min}..{max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Whether two ranges share at least one value.
    pub fn intersects(&self, other: &RateRange) -> bool {
        self.min <= other.max && self.max >= other.min
    }
}

// ── Talent request ─────────────────────────────────────────────────────

/// A skill the seeker requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredSkill {
    pub name: String,
    pub level: SkillLevel,
}

impl RequiredSkill {
    pub fn new(name: impl Into<String>, level: SkillLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

/// Status of a talent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Open for offers.
    Active,
    /// An offer was accepted.
    Assigned,
    /// Withdrawn or finished. Terminal state.
    Closed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Assigned => "assigned",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for RequestStatus {
    const ENTITY: EntityKind = EntityKind::TalentRequest;

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Assigned, Self::Closed],
            Self::Assigned => &[Self::Closed],
            Self::Closed => &[],
        }
    }
}

/// A seeker company's request for talent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalentRequest {
    pub id: RequestId,
    /// The seeker company that owns the request.
    pub seeker_id: ActorId,
    pub title: String,
    /// `None` means the request was submitted without a skills section and
    /// cannot be scored.
    pub skills_required: Option<Vec<RequiredSkill>>,
    /// Hourly budget in minor units.
    pub budget: RateRange,
    pub currency: Currency,
    pub duration_hours: u32,
    pub urgency: Urgency,
    pub experience_level: ExperienceLevel,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub status: RequestStatus,
    pub created_at: Timestamp,
    pub transitions: Vec<TransitionRecord<RequestStatus>>,
}

impl TalentRequest {
    /// A new active request with no location constraint.
    pub fn new(
        seeker_id: ActorId,
        title: impl Into<String>,
        skills_required: Vec<RequiredSkill>,
        budget: RateRange,
        experience_level: ExperienceLevel,
    ) -> Self {
        Self {
            id: RequestId::new(),
            seeker_id,
            title: title.into(),
            skills_required: Some(skills_required),
            budget,
            currency: Currency::usd(),
            duration_hours: 0,
            urgency: Urgency::Normal,
            experience_level,
            location: None,
            timezone: None,
            status: RequestStatus::Active,
            created_at: Timestamp::now(),
            transitions: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_duration_hours(mut self, hours: u32) -> Self {
        self.duration_hours = hours;
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    /// Whether offers may still be made against this request.
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Active
    }

    /// Mark the request as staffed (ACTIVE → ASSIGNED).
    pub fn assign(&mut self, actor: Actor) -> Result<(), MarketError> {
        self.transition(RequestStatus::Assigned, actor, None)
    }

    /// Close the request (ACTIVE | ASSIGNED → CLOSED).
    ///
    /// Only the owning seeker or an admin may close it.
    pub fn close(&mut self, actor: Actor, reason: Option<String>) -> Result<(), MarketError> {
        if !actor.is_admin() && actor.id != self.seeker_id {
            return Err(MarketError::permission(
                "Only the owning seeker may close a talent request",
            ));
        }
        self.transition(RequestStatus::Closed, actor, reason)
    }

    fn transition(
        &mut self,
        to: RequestStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<(), MarketError> {
        if !self.status.can_transition_to(to) {
            return Err(MarketError::invalid_state(messages::REQUEST_NOT_ACTIVE));
        }
        self.transitions
            .push(TransitionRecord::now(self.status, to, actor, reason));
        self.status = to;
        Ok(())
    }
}

// ── Talent profile ─────────────────────────────────────────────────────

/// A skill a provider offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSkill {
    pub name: String,
    pub level: SkillLevel,
    pub years: u8,
}

impl ProfileSkill {
    pub fn new(name: impl Into<String>, level: SkillLevel, years: u8) -> Self {
        Self {
            name: name.into(),
            level,
            years,
        }
    }
}

/// A provider's talent profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalentProfile {
    pub id: ProfileId,
    /// The provider (company or individual) that owns the profile.
    pub provider_id: ActorId,
    pub display_name: String,
    pub skills: Vec<ProfileSkill>,
    pub experience_level: ExperienceLevel,
    /// Hourly rate in minor units; `None` when the provider has not set one.
    pub hourly_rate: Option<RateRange>,
    pub availability: Availability,
    pub location: Option<String>,
    pub timezone: Option<String>,
}

impl TalentProfile {
    /// A new available profile with no rate, location or timezone.
    pub fn new(
        provider_id: ActorId,
        display_name: impl Into<String>,
        skills: Vec<ProfileSkill>,
        experience_level: ExperienceLevel,
    ) -> Self {
        Self {
            id: ProfileId::new(),
            provider_id,
            display_name: display_name.into(),
            skills,
            experience_level,
            hourly_rate: None,
            availability: Availability::Available,
            location: None,
            timezone: None,
        }
    }

    pub fn with_rate(mut self, rate: RateRange) -> Self {
        self.hourly_rate = Some(rate);
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Whether the profile may be considered for new work.
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}
