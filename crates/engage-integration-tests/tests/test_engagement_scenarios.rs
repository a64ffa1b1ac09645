//! End-to-end scenarios through the marketplace facade: matching, fee
//! split on capture, release preconditions, and a partial refund by
//! dispute resolution.

mod common;

use common::World;
use engage_adapters::{NotificationEvent, PaymentOp};
use engage_arbitration::{AdminDecision, DisputeStatus, EscrowStatus, Resolution};
use engage_core::{messages, Actor, ActorId, EntityKind, ErrorKind};
use engage_matching::{ExperienceLevel, SkillLevel};
use engage_state::EngagementStatus;

#[test]
fn senior_full_stack_outranks_junior_single_skill() {
    let world = World::new();
    let request = world.submit_request(
        &[("React", SkillLevel::Advanced), ("TypeScript", SkillLevel::Intermediate)],
        ExperienceLevel::Senior,
    );
    let strong = world.register_profile(
        &[("react", SkillLevel::Expert), ("typescript", SkillLevel::Advanced)],
        ExperienceLevel::Senior,
    );
    let weak = world.register_profile(&[("React", SkillLevel::Beginner)], ExperienceLevel::Junior);

    let ranked = world
        .market
        .talent()
        .match_candidates(request.id, None)
        .unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].talent_id, strong.id);
    assert_eq!(ranked[1].talent_id, weak.id);
    assert!(ranked[0].total_score > ranked[1].total_score);
    assert!(ranked[1].missing_skills.iter().any(|s| s == "typescript"));
}

#[test]
fn capture_splits_ten_thousand_dollars_at_fifteen_percent() {
    let world = World::new();
    let (engagement, escrow) = world.active_engagement(1_000_000);
    assert_eq!(engagement.status, EngagementStatus::Active);
    assert_eq!(escrow.amount, 1_000_000);
    assert_eq!(escrow.platform_fee, 150_000);
    assert_eq!(escrow.provider_amount, 850_000);
    assert_eq!(escrow.status, EscrowStatus::Held);
    assert!(escrow.reconciles());
    assert_eq!(world.processor.executed(PaymentOp::Capture), 1);
    assert_eq!(
        world.notifier.sent_of(NotificationEvent::EscrowCaptured).len(),
        2
    );
}

#[test]
fn release_before_completion_is_rejected_and_funds_stay_held() {
    let world = World::new();
    let (_, escrow) = world.active_engagement(1_000_000);
    let err = world
        .market
        .ledger()
        .release(escrow.id, Actor::system())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.message(), messages::ENGAGEMENT_NOT_COMPLETED);
    assert_eq!(
        world.market.ledger().get(escrow.id).unwrap().status,
        EscrowStatus::Held
    );
    assert_eq!(world.processor.executed(PaymentOp::Transfer), 0);
}

#[test]
fn completed_engagement_releases_provider_share() {
    let world = World::new();
    let (engagement, escrow) = world.completed_engagement(1_000_000);
    let released = world
        .market
        .ledger()
        .release(escrow.id, Actor::provider(engagement.provider_id))
        .unwrap();
    assert_eq!(released.status, EscrowStatus::Released);
    assert!(released.transfer_external_id.is_some());
    let transfers: Vec<_> = world
        .processor
        .calls()
        .into_iter()
        .filter(|c| c.op == PaymentOp::Transfer)
        .collect();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, 850_000);
}

#[test]
fn partial_refund_resolves_once() {
    let world = World::new();
    let (engagement, escrow) = world.active_engagement(1_000_000);
    let disputes = world.market.disputes();
    let seeker = Actor::seeker(engagement.seeker_id);
    let dispute = disputes
        .create_dispute(escrow.id, "scope not delivered", vec![], seeker)
        .unwrap();
    disputes.begin_review(dispute.id, seeker).unwrap();

    let admin = Actor::admin(ActorId::new());
    let decision = AdminDecision {
        resolution: Resolution::RefundPartial,
        amount: Some(400_000),
        notes: Some("partial delivery".into()),
    };
    let outcome = disputes.resolve(dispute.id, decision.clone(), admin).unwrap();
    assert_eq!(outcome.dispute.status, DisputeStatus::Resolved);
    assert_eq!(outcome.dispute.resolved_amount, Some(400_000));
    assert_eq!(outcome.escrow.status, EscrowStatus::Refunded);
    assert_eq!(outcome.escrow.refunded_amount, 400_000);
    let payout = outcome.escrow.payout.unwrap();
    assert_eq!(payout.amount, 600_000);
    assert_eq!(payout.platform_fee, 90_000);
    assert_eq!(payout.provider_amount, 510_000);
    assert_eq!(outcome.engagement.status, EngagementStatus::Terminated);

    let err = disputes.resolve(dispute.id, decision, admin).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.message(), messages::DISPUTE_ALREADY_RESOLVED);
    assert_eq!(world.processor.executed(PaymentOp::Refund), 1);
    assert_eq!(world.processor.executed(PaymentOp::Transfer), 1);
}

#[test]
fn journal_records_every_lifecycle() {
    let world = World::new();
    let (engagement, escrow) = world.completed_engagement(50_000);
    world
        .market
        .ledger()
        .release(escrow.id, Actor::system())
        .unwrap();

    let journal = world.market.journal();
    let engagement_steps: Vec<String> = journal
        .for_entity(*engagement.id.as_uuid())
        .into_iter()
        .map(|e| e.to)
        .collect();
    assert_eq!(
        engagement_steps,
        ["interviewing", "accepted", "active", "completed"]
    );
    assert_eq!(journal.for_entity(*escrow.id.as_uuid()).len(), 1);
    assert!(!journal.of_kind(EntityKind::Offer).is_empty());
}
