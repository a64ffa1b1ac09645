//! Fixtures shared by the engine's unit tests.

use std::sync::Arc;

use engage_adapters::{
    InMemoryPayoutDirectory, MockPaymentProcessor, RecordingNotifier, ScriptedContractService,
};
use engage_arbitration::{Dispute, EscrowPayment};
use engage_core::{Actor, ActorId, Currency};
use engage_matching::{
    ExperienceLevel, ProfileSkill, RateRange, RequiredSkill, SkillLevel, TalentProfile,
    TalentRequest,
};
use engage_state::{Engagement, EngagementStatus, Offer, OfferAction, OfferTerms};

use crate::{Collaborators, EngineConfig, Marketplace, Repositories};

pub(crate) struct Harness {
    pub market: Marketplace,
    pub notifier: Arc<RecordingNotifier>,
    pub processor: Arc<MockPaymentProcessor>,
    pub contracts: Arc<ScriptedContractService>,
}

impl Harness {
    pub fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let processor = Arc::new(MockPaymentProcessor::new());
        let contracts = Arc::new(ScriptedContractService::all_signed());
        let collab = Collaborators {
            processor: processor.clone(),
            notifier: notifier.clone(),
            contracts: contracts.clone(),
            payouts: Arc::new(InMemoryPayoutDirectory::new()),
        };
        Self {
            market: Marketplace::new(EngineConfig::default(), Repositories::new(), collab),
            notifier,
            processor,
            contracts,
        }
    }

    /// A submitted React request and a registered profile that fits it.
    pub fn request_and_profile(&self) -> (TalentRequest, TalentProfile) {
        let request = TalentRequest::new(
            ActorId::new(),
            "Frontend lead",
            vec![RequiredSkill::new("React", SkillLevel::Advanced)],
            RateRange::new(8_000, 15_000).unwrap(),
            ExperienceLevel::Senior,
        );
        let request = self.market.talent().submit_request(request).unwrap();
        let profile = self.profile_for(&request, ExperienceLevel::Senior);
        (request, profile)
    }

    pub fn profile_for(&self, request: &TalentRequest, level: ExperienceLevel) -> TalentProfile {
        let skills = request
            .skills_required
            .iter()
            .flatten()
            .map(|s| ProfileSkill::new(s.name.clone(), s.level, 6))
            .collect();
        let profile = TalentProfile::new(ActorId::new(), "Dana", skills, level)
            .with_rate(RateRange::new(9_000, 12_000).unwrap());
        self.market.talent().register_profile(profile).unwrap()
    }

    pub fn seeker(&self, request: &TalentRequest) -> Actor {
        Actor::seeker(request.seeker_id)
    }

    pub fn terms(&self, hourly_rate: i64, duration_hours: u32) -> OfferTerms {
        OfferTerms {
            hourly_rate,
            duration_hours,
            currency: Currency::usd(),
            message: None,
        }
    }

    /// A pending offer made by the request's seeker.
    pub fn offer(
        &self,
        request: &TalentRequest,
        profile: &TalentProfile,
        hourly_rate: i64,
        duration_hours: u32,
    ) -> Offer {
        self.market
            .offers()
            .create_offer(
                request.id,
                profile.id,
                self.terms(hourly_rate, duration_hours),
                self.seeker(request),
            )
            .unwrap()
    }

    /// An offer for `amount` accepted by the provider.
    pub fn accepted_offer(&self, amount: i64) -> Offer {
        let (request, profile) = self.request_and_profile();
        let offer = self.offer(&request, &profile, amount, 1);
        self.market
            .offers()
            .respond(offer.id, OfferAction::Accept, Actor::provider(profile.provider_id))
            .unwrap()
            .offer
    }

    pub fn staged_engagement(&self, amount: i64) -> Engagement {
        let offer = self.accepted_offer(amount);
        self.market
            .engagements()
            .create_engagement(offer.id, Actor::seeker(offer.seeker_id))
            .unwrap()
    }

    pub fn accepted_engagement(&self, amount: i64) -> Engagement {
        let engagement = self.staged_engagement(amount);
        let seeker = Actor::seeker(engagement.seeker_id);
        let engagements = self.market.engagements();
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
        let escrow_id = engagement.escrow_id.unwrap();
        let escrow = self.market.ledger().get(escrow_id).unwrap();
        (engagement, escrow)
    }

    /// Completed with both confirmations; the escrow is still held.
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

    /// A dispute on an active engagement, moved to under review.
    pub fn reviewed_dispute(&self, amount: i64) -> (Dispute, Engagement) {
        let (engagement, escrow) = self.active_engagement(amount);
        let seeker = Actor::seeker(engagement.seeker_id);
        let resolver = self.market.disputes();
        let dispute = resolver
            .create_dispute(escrow.id, "deliverables missing", vec![], seeker)
            .unwrap();
        let dispute = resolver.begin_review(dispute.id, seeker).unwrap();
        (dispute, engagement)
    }
}
