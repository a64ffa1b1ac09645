//! Experience, budget and location fit functions.
//!
//! Each returns a score in 0.0..=1.0. Missing data scores the neutral 0.5
//! rather than penalizing the candidate.

use crate::model::{ExperienceLevel, RateRange, TalentProfile, TalentRequest};

/// Score used when a candidate has not supplied the data a component needs.
pub const NEUTRAL_SCORE: f64 = 0.5;

const REMOTE: &str = "remote";

/// Experience fit: exact 1.0, one level off 0.6, further 0.2.
pub fn experience_fit(required: ExperienceLevel, actual: ExperienceLevel) -> f64 {
    match required.distance(actual) {
        0 => 1.0,
        1 => 0.6,
        _ => 0.2,
    }
}

/// Budget fit of a candidate's rate against the request budget.
///
/// Overlapping ranges score 1.0. Outside the budget the score decays
/// linearly with the distance to the nearest budget bound, relative to that
/// bound, and reaches 0.0 at `decay_span` (0.5 = fifty percent off).
pub fn budget_fit(budget: &RateRange, rate: Option<&RateRange>, decay_span: f64) -> f64 {
    let Some(rate) = rate else {
        return NEUTRAL_SCORE;
    };
    if rate.intersects(budget) {
        return 1.0;
    }

    let (gap, bound) = if rate.min() > budget.max() {
        (rate.min().abs_diff(budget.max()), budget.max())
    } else {
        (budget.min().abs_diff(rate.max()), budget.min())
    };
    if bound <= 0 || decay_span <= 0.0 {
        return 0.0;
    }
    let relative = gap as f64 / bound as f64;
    (1.0 - relative / decay_span).clamp(0.0, 1.0)
}

/// Location fit.
///
/// 1.0 when the request has no location, when either side is remote, when
/// locations match case-insensitively, or when both timezones are set and
/// equal. 0.5 otherwise.
pub fn location_fit(request: &TalentRequest, profile: &TalentProfile) -> f64 {
    let Some(wanted) = request.location.as_deref().map(str::trim) else {
        return 1.0;
    };
    let is_remote = |s: &str| s.trim().eq_ignore_ascii_case(REMOTE);

    if is_remote(wanted) {
        return 1.0;
    }
    if let Some(loc) = profile.location.as_deref() {
        if is_remote(loc) || loc.trim().eq_ignore_ascii_case(wanted) {
            return 1.0;
        }
    }
    match (request.timezone.as_deref(), profile.timezone.as_deref()) {
        (Some(a), Some(b)) if a.trim().eq_ignore_ascii_case(b.trim()) => 1.0,
        _ => NEUTRAL_SCORE,
    }
}
