//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use engage_adapters::{
    InMemoryPayoutDirectory, MockPaymentProcessor, RecordingNotifier, ScriptedContractService,
};
use engage_arbitration::EscrowPayment;
use engage_core::{Actor, ActorId, Currency};
use engage_engine::{Collaborators, EngineConfig, Marketplace, Repositories};
use engage_matching::{
    ExperienceLevel, ProfileSkill, RateRange, RequiredSkill, SkillLevel, TalentProfile,
    TalentRequest,
};
use engage_state::{Engagement, EngagementStatus, Offer, OfferAction, OfferTerms};

pub struct World {
    pub market: Marketplace,
    pub processor: Arc<MockPaymentProcessor>,
    pub notifier: Arc<RecordingNotifier>,
}

impl World {
    pub fn new() -> Self {
        Self::with_processor(MockPaymentProcessor::new())
    }

    /// A processor that sleeps inside every call, to widen race windows.
    pub fn slow() -> Self {
        Self::with_processor(MockPaymentProcessor::new().with_latency(Duration::from_millis(25)))
    }

    fn with_processor(processor: MockPaymentProcessor) -> Self {
        let processor = Arc::new(processor);
        let notifier = Arc::new(RecordingNotifier::new());
        let collab = Collaborators {
            processor: processor.clone(),
            notifier: notifier.clone(),
            contracts: Arc::new(ScriptedContractService::all_signed()),
            payouts: Arc::new(InMemoryPayoutDirectory::new()),
        };
        Self {
            market: Marketplace::new(EngineConfig::default(), Repositories::new(), collab),
            processor,
            notifier,
        }
    }

    pub fn submit_request(
        &self,
        skills: &[(&str, SkillLevel)],
        level: ExperienceLevel,
    ) -> TalentRequest {
        let request = TalentRequest::new(
            ActorId::new(),
            "Engineer",
            skills
                .iter()
                .map(|(name, lvl)| RequiredSkill::new(*name, *lvl))
                .collect(),
            RateRange::new(8_000, 15_000).unwrap(),
            level,
        );
        self.market.talent().submit_request(request).unwrap()
    }

    pub fn register_profile(
        &self,
        skills: &[(&str, SkillLevel)],
        level: ExperienceLevel,
    ) -> TalentProfile {
        let profile = TalentProfile::new(
            ActorId::new(),
            "Candidate",
            skills
                .iter()
                .map(|(name, lvl)| ProfileSkill::new(*name, *lvl, 5))
                .collect(),
            level,
        )
        .with_rate(RateRange::new(9_000, 12_000).unwrap());
        self.market.talent().register_profile(profile).unwrap()
    }

    pub fn offer(&self, request: &TalentRequest, profile: &TalentProfile, amount: i64) -> Offer {
        let terms = OfferTerms {
            hourly_rate: amount,
            duration_hours: 1,
            currency: Currency::usd(),
            message: None,
        };
        self.market
            .offers()
            .create_offer(request.id, profile.id, terms, Actor::seeker(request.seeker_id))
            .unwrap()
    }

    /// Offer accepted, engagement staged and moved to accepted.
    pub fn accepted_engagement(&self, amount: i64) -> Engagement {
        let request = self.submit_request(&[("Rust", SkillLevel::Advanced)], ExperienceLevel::Senior);
        let profile = self.register_profile(&[("Rust", SkillLevel::Expert)], ExperienceLevel::Senior);
        let offer = self.offer(&request, &profile, amount);
        self.market
            .offers()
            .respond(offer.id, OfferAction::Accept, Actor::provider(profile.provider_id))
            .unwrap();
        let engagements = self.market.engagements();
        let seeker = Actor::seeker(request.seeker_id);
        let engagement = engagements.create_engagement(offer.id, seeker).unwrap();
        engagements
            .transition(engagement.id, EngagementStatus::Interviewing, seeker, None)
            .unwrap();
        engagements
            .transition(engagement.id, EngagementStatus::Accepted, seeker, None)
            .unwrap()
    }

    pub fn active_engagement(&self, amount: i64) -> (Engagement, EscrowPayment) {
        let engagement = self.accepted_engagement(amount);
        let engagement = self
            .market
            .engagements()
            .activate(engagement.id, Actor::seeker(engagement.seeker_id), "pm_card")
            .unwrap();
        let escrow = self
            .market
            .ledger()
            .get(engagement.escrow_id.unwrap())
            .unwrap();
        (engagement, escrow)
    }

    pub fn completed_engagement(&self, amount: i64) -> (Engagement, EscrowPayment) {
        let (engagement, escrow) = self.active_engagement(amount);
        let engagements = self.market.engagements();
        let seeker = Actor::seeker(engagement.seeker_id);
        engagements.confirm_completion(engagement.id, seeker).unwrap();
        engagements
            .confirm_completion(engagement.id, Actor::provider(engagement.provider_id))
            .unwrap();
        let engagement = engagements
            .transition(engagement.id, EngagementStatus::Completed, seeker, None)
            .unwrap();
        (engagement, escrow)
    }
}
