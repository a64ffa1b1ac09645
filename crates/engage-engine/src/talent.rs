//! Talent requests, profiles, and candidate matching.

use std::sync::Arc;

use engage_core::{messages, Actor, MarketError, ProfileId, RequestId};
use engage_matching::{Availability, MatchResult, TalentProfile, TalentRequest};

use crate::context::{rejected, Context};

/// Registers requests and profiles and ranks candidates.
#[derive(Debug, Clone)]
pub struct TalentService {
    ctx: Arc<Context>,
}

impl TalentService {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Store a new talent request.
    ///
    /// The request must be active and titled, and each required skill must
    /// be named.
    pub fn submit_request(&self, request: TalentRequest) -> Result<TalentRequest, MarketError> {
        validate_request(&request).map_err(|e| rejected("talent.submit_request", e))?;
        self.ctx.repos.requests.insert(request.id, request.clone());
        tracing::info!(
            request_id = %request.id,
            seeker_id = %request.seeker_id,
            "talent request submitted"
        );
        Ok(request)
    }

    /// Store or replace a provider's talent profile.
    pub fn register_profile(&self, profile: TalentProfile) -> Result<TalentProfile, MarketError> {
        if profile.display_name.trim().is_empty() {
            return Err(rejected(
                "talent.register_profile",
                MarketError::validation("Profile display name must not be empty"),
            ));
        }
        self.ctx.repos.profiles.insert(profile.id, profile.clone());
        tracing::info!(profile_id = %profile.id, "talent profile registered");
        Ok(profile)
    }

    /// Change a profile's availability. Only its provider or an admin may.
    pub fn set_availability(
        &self,
        profile_id: ProfileId,
        availability: Availability,
        actor: Actor,
    ) -> Result<TalentProfile, MarketError> {
        self.ctx
            .repos
            .profiles
            .try_update(&profile_id, |p| {
                if !actor.is_admin() && actor.id != p.provider_id {
                    return Err(MarketError::permission(
                        "Only the owning provider may change availability",
                    ));
                }
                p.availability = availability;
                Ok(p.clone())
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::PROFILE_NOT_FOUND)))
            .map_err(|e| rejected("talent.set_availability", e))
    }

    pub fn request(&self, request_id: RequestId) -> Result<TalentRequest, MarketError> {
        self.ctx
            .repos
            .requests
            .get(&request_id)
            .ok_or_else(|| MarketError::not_found(messages::REQUEST_NOT_FOUND))
    }

    pub fn profile(&self, profile_id: ProfileId) -> Result<TalentProfile, MarketError> {
        self.ctx
            .repos
            .profiles
            .get(&profile_id)
            .ok_or_else(|| MarketError::not_found(messages::PROFILE_NOT_FOUND))
    }

    /// Rank every registered profile against a request.
    ///
    /// `limit` keeps only the best results.
    pub fn match_candidates(
        &self,
        request_id: RequestId,
        limit: Option<usize>,
    ) -> Result<Vec<MatchResult>, MarketError> {
        let request = self.request(request_id)?;
        let candidates = self.ctx.repos.profiles.list();
        let results = match limit {
            Some(n) => self.ctx.scoring.top_n(&request, &candidates, n),
            None => self.ctx.scoring.score(&request, &candidates),
        }
        .map_err(|e| rejected("talent.match_candidates", e.into()))?;
        tracing::debug!(
            request_id = %request_id,
            candidates = candidates.len(),
            ranked = results.len(),
            "candidates scored"
        );
        Ok(results)
    }
}

fn validate_request(request: &TalentRequest) -> Result<(), MarketError> {
    if request.title.trim().is_empty() {
        return Err(MarketError::validation("Request title must not be empty"));
    }
    if !request.is_open() {
        return Err(MarketError::validation("A new talent request must be active"));
    }
    let unnamed = request
        .skills_required
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|s| s.name.trim().is_empty());
    if unnamed {
        return Err(MarketError::validation("Required skill names must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testkit::Harness;
    use engage_core::{Actor, ActorId, ErrorKind};
    use engage_matching::{Availability, TalentRequest};

    #[test]
    fn match_candidates_ranks_and_limits() {
        let h = Harness::new();
        let (request, _) = h.request_and_profile();
        let other = h.profile_for(&request, engage_matching::ExperienceLevel::Junior);

        let all = h.market.talent().match_candidates(request.id, None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].total_score >= all[1].total_score);
        assert_ne!(all[0].talent_id, other.id);

        let top = h.market.talent().match_candidates(request.id, Some(1)).unwrap();
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn unavailable_profiles_drop_out_of_matching() {
        let h = Harness::new();
        let (request, profile) = h.request_and_profile();
        h.market
            .talent()
            .set_availability(profile.id, Availability::Unavailable, Actor::provider(profile.provider_id))
            .unwrap();
        assert!(h
            .market
            .talent()
            .match_candidates(request.id, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn availability_is_owner_only() {
        let h = Harness::new();
        let (_, profile) = h.request_and_profile();
        let err = h
            .market
            .talent()
            .set_availability(profile.id, Availability::Unavailable, Actor::provider(ActorId::new()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn request_without_skills_cannot_be_matched() {
        let h = Harness::new();
        let (mut request, _) = h.request_and_profile();
        request.id = engage_core::RequestId::new();
        request.skills_required = None;
        let request = h.market.talent().submit_request(request).unwrap();
        let err = h
            .market
            .talent()
            .match_candidates(request.id, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn blank_title_is_rejected() {
        let h = Harness::new();
        let request = TalentRequest::new(
            ActorId::new(),
            "  ",
            vec![],
            engage_matching::RateRange::new(1, 2).unwrap(),
            engage_matching::ExperienceLevel::Mid,
        );
        let err = h.market.talent().submit_request(request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
