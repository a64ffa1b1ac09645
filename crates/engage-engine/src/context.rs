//! Shared state behind every service handle.

use std::sync::Arc;

use engage_adapters::{
    ContractService, InMemoryPayoutDirectory, LogNotifier, MockPaymentProcessor,
    NotificationDispatcher, PaymentProcessor, PayoutDirectory, ScriptedContractService,
};
use engage_core::MarketError;
use engage_matching::ScoringEngine;

use crate::audit::AuditJournal;
use crate::config::EngineConfig;
use crate::locks::KeyedLocks;
use crate::store::Repositories;

/// The external systems the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub processor: Arc<dyn PaymentProcessor>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub contracts: Arc<dyn ContractService>,
    pub payouts: Arc<dyn PayoutDirectory>,
}

impl Collaborators {
    /// Mock processor, log notifier, every contract signed, derived
    /// payout destinations.
    pub fn in_memory() -> Self {
        Self {
            processor: Arc::new(MockPaymentProcessor::new()),
            notifier: Arc::new(LogNotifier),
            contracts: Arc::new(ScriptedContractService::all_signed()),
            payouts: Arc::new(InMemoryPayoutDirectory::new()),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("processor", &self.processor.processor_name())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) config: EngineConfig,
    pub(crate) scoring: ScoringEngine,
    pub(crate) repos: Repositories,
    pub(crate) journal: AuditJournal,
    pub(crate) collab: Collaborators,
    /// Offers, request status and engagement creation for one request.
    pub(crate) request_locks: KeyedLocks,
    /// Transitions of one engagement.
    pub(crate) engagement_locks: KeyedLocks,
    /// Capture linkage, release, refund and disputes of one escrow.
    pub(crate) escrow_locks: KeyedLocks,
}

impl Context {
    pub(crate) fn new(
        config: EngineConfig,
        scoring: ScoringEngine,
        repos: Repositories,
        collab: Collaborators,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            scoring,
            repos,
            journal: AuditJournal::new(),
            collab,
            request_locks: KeyedLocks::new(),
            engagement_locks: KeyedLocks::new(),
            escrow_locks: KeyedLocks::new(),
        })
    }
}

/// Log a rejected operation at warn and pass the error through.
pub(crate) fn rejected(operation: &'static str, err: MarketError) -> MarketError {
    tracing::warn!(
        operation,
        kind = %err.kind(),
        error = %err,
        "operation rejected"
    );
    err
}
