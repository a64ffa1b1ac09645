//! # Escrow Payments
//!
//! An [`EscrowPayment`] is written only after the processor has captured
//! the funds, so every record starts `Held`.
//!
//! ```text
//! Held ──▶ Released
//!   │         ▲
//!   ▼         │ (resolution: release)
//! Disputed ───┤
//!             ▼
//!          Refunded   (resolution: refund_full | refund_partial)
//! ```
//!
//! ## Invariants
//!
//! - `platform_fee + provider_amount == amount` for the capture, and for the
//!   provider payout on a partial refund.
//! - `Held → Released` needs a completed engagement with both confirmations
//!   and no open dispute.
//! - `Disputed` blocks every release path except the dispute resolution.
//! - Records are never deleted.
//!
//! The `check_*` methods are read-only and run before the processor is
//! called; the `mark_*` methods apply the processor's result.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use engage_core::{
    Actor, Currency, EngagementId, EntityKind, EscrowId, FeePolicy, FeeSplit, Lifecycle, Money,
    Timestamp, TransitionRecord,
};
use engage_state::{Engagement, EngagementStatus};

use crate::error::ArbitrationError;

/// Escrow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// Funds captured and held by the platform.
    Held,
    /// Provider share transferred. Terminal state.
    Released,
    /// Refunded to the seeker in full or part. Terminal state.
    Refunded,
    /// Frozen by an open dispute.
    Disputed,
}

impl EscrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Released => "released",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lifecycle for EscrowStatus {
    const ENTITY: EntityKind = EntityKind::EscrowPayment;

    fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Held => &[Self::Released, Self::Disputed],
            Self::Disputed => &[Self::Released, Self::Refunded],
            Self::Released | Self::Refunded => &[],
        }
    }
}

/// Kinds of money movement recorded against an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Funds taken from the seeker.
    Capture,
    /// Provider share paid out on release.
    Transfer,
    /// Funds returned to the seeker.
    Refund,
    /// Remainder paid to the provider after a partial refund.
    Payout,
}

/// One processor call that moved money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTransaction {
    pub kind: TransactionKind,
    pub amount: i64,
    pub external_id: String,
    pub idempotency_key: String,
    pub at: Timestamp,
}

/// Processor confirmation of a money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub external_id: String,
    pub idempotency_key: String,
}

/// Result of [`EscrowPayment::check_release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseCheck {
    /// Preconditions hold; transfer `amount` to the provider.
    Ready { amount: i64 },
    /// Already released; return the stored result without a transfer.
    AlreadyReleased,
}

/// Money movements needed to refund a disputed escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPlan {
    /// Returned to the seeker.
    pub refund_amount: i64,
    /// Fee split of the remainder paid to the provider; `None` on a full refund.
    pub payout: Option<FeeSplit>,
}

/// Captured funds for one engagement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowPayment {
    pub id: EscrowId,
    pub engagement_id: EngagementId,
    pub amount: i64,
    pub currency: Currency,
    pub platform_fee: i64,
    pub provider_amount: i64,
    pub status: EscrowStatus,
    /// Earliest instant funds are expected to move.
    pub hold_until: Timestamp,
    pub capture_external_id: String,
    pub transfer_external_id: Option<String>,
    pub refunded_amount: i64,
    /// Provider payout on a partial refund.
    pub payout: Option<FeeSplit>,
    pub transactions: Vec<EscrowTransaction>,
    pub transitions: Vec<TransitionRecord<EscrowStatus>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EscrowPayment {
    /// Idempotency key of the release transfer.
    pub fn release_key(id: EscrowId) -> String {
        format!("release:{}", id.as_uuid())
    }

    /// Idempotency key of the seeker refund.
    pub fn refund_key(id: EscrowId) -> String {
        format!("refund:{}", id.as_uuid())
    }

    /// Idempotency key of the provider payout after a partial refund.
    pub fn payout_key(id: EscrowId) -> String {
        format!("payout:{}", id.as_uuid())
    }

    /// Build the `Held` record for a settled capture.
    pub fn held(
        id: EscrowId,
        engagement_id: EngagementId,
        total: Money,
        fee: &FeePolicy,
        capture: Receipt,
        hold_period: Duration,
        now: Timestamp,
    ) -> Result<Self, ArbitrationError> {
        let split = fee.split(total.amount)?;
        Ok(Self {
            id,
            engagement_id,
            amount: split.amount,
            currency: total.currency,
            platform_fee: split.platform_fee,
            provider_amount: split.provider_amount,
            status: EscrowStatus::Held,
            hold_until: now.plus(hold_period),
            capture_external_id: capture.external_id.clone(),
            transfer_external_id: None,
            refunded_amount: 0,
            payout: None,
            transactions: vec![EscrowTransaction {
                kind: TransactionKind::Capture,
                amount: split.amount,
                external_id: capture.external_id,
                idempotency_key: capture.idempotency_key,
                at: now,
            }],
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency.clone())
    }

    /// Whether the fee split sums to the captured amount.
    pub fn reconciles(&self) -> bool {
        self.platform_fee + self.provider_amount == self.amount
    }

    /// Still held after `hold_until`.
    pub fn held_past(&self, now: Timestamp) -> bool {
        self.status == EscrowStatus::Held && self.hold_until <= now
    }

    fn invalid(&self, operation: &str) -> ArbitrationError {
        ArbitrationError::InvalidEscrowOperation {
            escrow_id: self.id.to_string(),
            operation: operation.to_string(),
            status: self.status.to_string(),
        }
    }

    /// Check the normal release path.
    ///
    /// `open_dispute` is whether any unresolved dispute references this
    /// escrow.
    pub fn check_release(
        &self,
        engagement: &Engagement,
        open_dispute: bool,
    ) -> Result<ReleaseCheck, ArbitrationError> {
        match self.status {
            EscrowStatus::Released => return Ok(ReleaseCheck::AlreadyReleased),
            EscrowStatus::Disputed => {
                return Err(ArbitrationError::OpenDispute {
                    escrow_id: self.id.to_string(),
                })
            }
            EscrowStatus::Refunded => return Err(self.invalid("release")),
            EscrowStatus::Held => {}
        }
        if open_dispute {
            return Err(ArbitrationError::OpenDispute {
                escrow_id: self.id.to_string(),
            });
        }
        if engagement.status != EngagementStatus::Completed {
            return Err(ArbitrationError::EngagementNotCompleted {
                engagement_id: engagement.id.to_string(),
                status: engagement.status.to_string(),
            });
        }
        if !engagement.both_confirmed() {
            return Err(ArbitrationError::CompletionNotConfirmed {
                engagement_id: engagement.id.to_string(),
            });
        }
        Ok(ReleaseCheck::Ready {
            amount: self.provider_amount,
        })
    }

    /// Check the release ordered by a dispute resolution.
    pub fn check_release_after_dispute(&self) -> Result<ReleaseCheck, ArbitrationError> {
        match self.status {
            EscrowStatus::Released => Ok(ReleaseCheck::AlreadyReleased),
            EscrowStatus::Disputed => Ok(ReleaseCheck::Ready {
                amount: self.provider_amount,
            }),
            _ => Err(self.invalid("release")),
        }
    }

    /// Apply a settled release transfer.
    pub fn mark_released(
        &mut self,
        transfer: Receipt,
        actor: Actor,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        self.require_transition(EscrowStatus::Released, "release")?;
        self.transactions.push(EscrowTransaction {
            kind: TransactionKind::Transfer,
            amount: self.provider_amount,
            external_id: transfer.external_id.clone(),
            idempotency_key: transfer.idempotency_key,
            at: now,
        });
        self.transfer_external_id = Some(transfer.external_id);
        self.record(EscrowStatus::Released, actor, None, now);
        Ok(())
    }

    /// Freeze the escrow for a new dispute (HELD → DISPUTED).
    pub fn open_dispute(&mut self, actor: Actor, now: Timestamp) -> Result<(), ArbitrationError> {
        if self.status != EscrowStatus::Held {
            return Err(self.invalid("dispute"));
        }
        self.record(EscrowStatus::Disputed, actor, None, now);
        Ok(())
    }

    /// Plan a refund of `refund_amount` to the seeker.
    ///
    /// `refund_amount` must be in `(0, amount]`. Any remainder goes to the
    /// provider, with the platform fee split on the remainder.
    pub fn plan_refund(
        &self,
        refund_amount: i64,
        fee: &FeePolicy,
    ) -> Result<RefundPlan, ArbitrationError> {
        if self.status != EscrowStatus::Disputed {
            return Err(self.invalid("refund"));
        }
        if refund_amount <= 0 || refund_amount > self.amount {
            return Err(ArbitrationError::InvalidRefundAmount {
                escrow_id: self.id.to_string(),
                requested: refund_amount,
                held: self.amount,
            });
        }
        let remainder = self.amount - refund_amount;
        let payout = if remainder > 0 {
            Some(fee.split(remainder)?)
        } else {
            None
        };
        Ok(RefundPlan {
            refund_amount,
            payout,
        })
    }

    /// Apply a settled refund and, for partial refunds, the provider payout.
    pub fn mark_refunded(
        &mut self,
        plan: RefundPlan,
        refund: Receipt,
        payout: Option<Receipt>,
        actor: Actor,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), ArbitrationError> {
        self.require_transition(EscrowStatus::Refunded, "refund")?;
        self.transactions.push(EscrowTransaction {
            kind: TransactionKind::Refund,
            amount: plan.refund_amount,
            external_id: refund.external_id,
            idempotency_key: refund.idempotency_key,
            at: now,
        });
        if let (Some(split), Some(receipt)) = (plan.payout, payout) {
            self.transactions.push(EscrowTransaction {
                kind: TransactionKind::Payout,
                amount: split.provider_amount,
                external_id: receipt.external_id.clone(),
                idempotency_key: receipt.idempotency_key,
                at: now,
            });
            self.transfer_external_id = Some(receipt.external_id);
        }
        self.refunded_amount = plan.refund_amount;
        self.payout = plan.payout;
        self.record(EscrowStatus::Refunded, actor, reason, now);
        Ok(())
    }

    fn require_transition(&self, to: EscrowStatus, operation: &str) -> Result<(), ArbitrationError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn record(&mut self, to: EscrowStatus, actor: Actor, reason: Option<String>, now: Timestamp) {
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            actor,
            at: now,
            reason,
        });
        self.status = to;
        self.updated_at = now;
    }
}
