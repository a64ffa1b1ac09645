//! # engage-engine — Engagement Core Orchestration
//!
//! Wires the domain crates to repositories, per-entity locks and external
//! collaborators. [`Marketplace`] is the entry point; it hands out cheap
//! service handles that share one context.
//!
//! | Service              | Operations                                                        |
//! |----------------------|-------------------------------------------------------------------|
//! | [`TalentService`]    | submit requests, register profiles, match candidates              |
//! | [`OfferService`]     | create, accept, reject, counter, expire, close request            |
//! | [`EngagementService`]| create from offer, transition, activate with escrow, confirm      |
//! | [`EscrowLedger`]     | capture, release, held escrows past their hold period             |
//! | [`DisputeResolver`]  | open, review, escalate, add evidence, resolve                     |
//!
//! ## Concurrency
//!
//! Every mutation of one talent request's offers runs under that request's
//! lock; engagement transitions under the engagement's lock; escrow
//! movement and disputes under the escrow's lock. When an operation needs
//! several, they are taken escrow first, then engagement, then request.
//! Processor calls happen under the escrow lock and carry idempotency keys,
//! so a retried or concurrent release moves money at most once.
//!
//! ## Notifications
//!
//! Notifications are queued while an operation runs and sent after its
//! state is committed and every lock released. A failed send is logged and
//! never undoes the operation.

pub mod audit;
pub mod config;
mod context;
pub mod disputes;
pub mod engagements;
pub mod ledger;
pub mod locks;
pub mod offers;
mod outbox;
pub mod store;
pub mod talent;

#[cfg(test)]
mod testkit;

use engage_matching::ScoringEngine;

pub use audit::AuditJournal;
pub use config::{ConfigError, EngineConfig};
pub use context::Collaborators;
pub use disputes::{DisputeOutcome, DisputeResolver};
pub use engagements::EngagementService;
pub use ledger::EscrowLedger;
pub use offers::{OfferResponse, OfferService};
pub use store::{Repositories, Store};
pub use talent::TalentService;

use std::sync::Arc;

use context::Context;

/// The engagement core.
///
/// Cloning is cheap; clones share repositories, locks and the journal.
#[derive(Debug, Clone)]
pub struct Marketplace {
    ctx: Arc<Context>,
}

impl Marketplace {
    /// Build over existing repositories with the default scoring weights.
    pub fn new(config: EngineConfig, repos: Repositories, collab: Collaborators) -> Self {
        Self::with_scoring(config, ScoringEngine::default(), repos, collab)
    }

    pub fn with_scoring(
        config: EngineConfig,
        scoring: ScoringEngine,
        repos: Repositories,
        collab: Collaborators,
    ) -> Self {
        tracing::info!(
            fee_basis_points = config.fee.basis_points(),
            max_negotiation_rounds = config.max_negotiation_rounds,
            currency = %config.currency,
            "marketplace initialized"
        );
        Self {
            ctx: Context::new(config, scoring, repos, collab),
        }
    }

    /// Empty repositories and in-memory collaborators.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, Repositories::new(), Collaborators::in_memory())
    }

    pub fn talent(&self) -> TalentService {
        TalentService::new(self.ctx.clone())
    }

    pub fn offers(&self) -> OfferService {
        OfferService::new(self.ctx.clone())
    }

    pub fn engagements(&self) -> EngagementService {
        EngagementService::new(self.ctx.clone(), self.ledger())
    }

    pub fn ledger(&self) -> EscrowLedger {
        EscrowLedger::new(self.ctx.clone())
    }

    pub fn disputes(&self) -> DisputeResolver {
        DisputeResolver::new(self.ctx.clone(), self.ledger())
    }

    /// Every recorded state transition.
    pub fn journal(&self) -> &AuditJournal {
        &self.ctx.journal
    }

    pub fn repositories(&self) -> &Repositories {
        &self.ctx.repos
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }
}
