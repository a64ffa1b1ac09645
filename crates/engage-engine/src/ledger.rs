//! # Escrow Ledger
//!
//! Moves money through the payment processor and records the result on
//! the escrow. Release and refund run under the escrow's lock with the
//! status re-checked inside the store write, so two concurrent releases
//! produce one transfer.
//!
//! ## Processor calls
//!
//! Each call is bounded by `processor_timeout`. On a timeout the ledger
//! asks the processor once, by the same idempotency key, whether the call
//! settled. Nothing else is retried.

use std::sync::Arc;

use serde_json::json;

use engage_adapters::{
    CaptureRequest, NotificationEvent, PaymentOp, ProcessorError, ProcessorResult, RefundRequest,
    TransferRequest,
};
use engage_arbitration::{EscrowPayment, EscrowStatus, Receipt, ReleaseCheck};
use engage_core::{
    messages, Actor, EngagementId, EscrowId, MarketError, Money, Side, Timestamp,
};

use crate::context::{rejected, Context};
use crate::outbox::Outbox;

/// Captures, releases and refunds escrowed funds.
#[derive(Debug, Clone)]
pub struct EscrowLedger {
    ctx: Arc<Context>,
}

impl EscrowLedger {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn get(&self, escrow_id: EscrowId) -> Result<EscrowPayment, MarketError> {
        self.ctx
            .repos
            .escrows
            .get(&escrow_id)
            .ok_or_else(|| MarketError::not_found(messages::ESCROW_NOT_FOUND))
    }

    /// Escrows still held after their hold period.
    pub fn held_past(&self, now: Timestamp) -> Vec<EscrowPayment> {
        let mut held = self.ctx.repos.escrows.filter(|e| e.held_past(now));
        held.sort_by_key(|e| e.hold_until);
        held
    }

    /// Capture `amount` from the seeker's payment method into a new held
    /// escrow for the engagement.
    ///
    /// No record is written unless the processor reports the capture as
    /// settled. The escrow is not linked to the engagement here; activation
    /// does that.
    pub fn capture(
        &self,
        engagement_id: EngagementId,
        amount: Money,
        payment_method_ref: &str,
    ) -> Result<EscrowPayment, MarketError> {
        self.capture_inner(engagement_id, amount, payment_method_ref)
            .map_err(|e| rejected("escrow.capture", e))
    }

    fn capture_inner(
        &self,
        engagement_id: EngagementId,
        amount: Money,
        payment_method_ref: &str,
    ) -> Result<EscrowPayment, MarketError> {
        if !self.ctx.repos.engagements.contains(&engagement_id) {
            return Err(MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND));
        }
        if payment_method_ref.trim().is_empty() {
            return Err(MarketError::validation("Payment method reference is required"));
        }
        let config = &self.ctx.config;
        config.fee.split(amount.amount)?;

        let escrow_id = EscrowId::new();
        let key = format!("capture:{}", escrow_id.as_uuid());
        let request = CaptureRequest {
            amount: amount.clone(),
            method_ref: payment_method_ref.to_string(),
            idempotency_key: key.clone(),
        };
        let receipt = self.settle(PaymentOp::Capture, &key, || {
            self.ctx
                .collab
                .processor
                .capture(&request, config.processor_timeout)
        })?;

        let escrow = EscrowPayment::held(
            escrow_id,
            engagement_id,
            amount,
            &config.fee,
            receipt,
            config.escrow_hold_period,
            Timestamp::now(),
        )?;
        self.ctx.repos.escrows.insert(escrow.id, escrow.clone());
        tracing::info!(
            escrow_id = %escrow.id,
            engagement_id = %engagement_id,
            amount = escrow.amount,
            platform_fee = escrow.platform_fee,
            provider_amount = escrow.provider_amount,
            "escrow captured"
        );
        Ok(escrow)
    }

    /// Pay the provider once the engagement is completed and both parties
    /// confirmed.
    ///
    /// Idempotent: releasing an already released escrow returns it
    /// unchanged with no transfer.
    pub fn release(&self, escrow_id: EscrowId, actor: Actor) -> Result<EscrowPayment, MarketError> {
        let mut outbox = Outbox::new();
        let result = self.release_inner(escrow_id, actor, &mut outbox);
        outbox.flush(self.ctx.collab.notifier.as_ref());
        result.map_err(|e| rejected("escrow.release", e))
    }

    fn release_inner(
        &self,
        escrow_id: EscrowId,
        actor: Actor,
        outbox: &mut Outbox,
    ) -> Result<EscrowPayment, MarketError> {
        if !self.ctx.repos.escrows.contains(&escrow_id) {
            return Err(MarketError::not_found(messages::ESCROW_NOT_FOUND));
        }
        let _guard = self.ctx.escrow_locks.lock(*escrow_id.as_uuid());

        let escrow = self.get(escrow_id)?;
        let engagement = self
            .ctx
            .repos
            .engagements
            .get(&escrow.engagement_id)
            .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND))?;
        let party = actor
            .side()
            .is_some_and(|s| actor.is_party(s, engagement.party(s)));
        if !(party || actor.is_admin() || actor.role == engage_core::Role::System) {
            return Err(MarketError::permission(messages::ENGAGEMENT_NOT_A_PARTY));
        }

        let open_dispute = self
            .ctx
            .repos
            .disputes
            .any(|d| d.escrow_id == escrow_id && d.is_open());
        let check = escrow.check_release(&engagement, open_dispute)?;
        let released = self.apply_release(&escrow, check, actor)?;
        if released.status == EscrowStatus::Released && escrow.status != EscrowStatus::Released {
            outbox.push_all(
                NotificationEvent::EscrowReleased,
                &[engagement.seeker_id, engagement.provider_id],
                escrow_payload(&released),
            );
        }
        Ok(released)
    }

    /// Transfer the provider amount and mark the escrow released.
    ///
    /// The caller holds the escrow lock and has already run a release
    /// check.
    pub(crate) fn apply_release(
        &self,
        escrow: &EscrowPayment,
        check: ReleaseCheck,
        actor: Actor,
    ) -> Result<EscrowPayment, MarketError> {
        let amount = match check {
            ReleaseCheck::AlreadyReleased => {
                tracing::info!(escrow_id = %escrow.id, "escrow already released");
                return Ok(escrow.clone());
            }
            ReleaseCheck::Ready { amount } => amount,
        };
        let expected = escrow.status;
        let provider_id = self.provider_of(escrow)?;
        let destination = self.ctx.collab.payouts.destination_for(provider_id)?;
        let key = EscrowPayment::release_key(escrow.id);
        let request = TransferRequest {
            amount: Money::new(amount, escrow.currency.clone()),
            destination_ref: destination,
            idempotency_key: key.clone(),
        };
        let receipt = self.settle(PaymentOp::Transfer, &key, || {
            self.ctx
                .collab
                .processor
                .transfer(&request, self.ctx.config.processor_timeout)
        })?;

        let (released, before) = self
            .ctx
            .repos
            .escrows
            .try_update(&escrow.id, |e| {
                if e.status != expected {
                    return Err(MarketError::invalid_state(messages::ESCROW_NOT_HELD));
                }
                let before = e.transitions.len();
                e.mark_released(receipt, actor, Timestamp::now())?;
                Ok::<_, MarketError>((e.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ESCROW_NOT_FOUND)))?;
        self.ctx
            .journal
            .record_since(*released.id.as_uuid(), &released.transitions, before);
        tracing::info!(
            escrow_id = %released.id,
            amount,
            transfer_id = released.transfer_external_id.as_deref().unwrap_or_default(),
            "escrow released"
        );
        Ok(released)
    }

    /// Refund `refund_amount` to the seeker and pay any remainder to the
    /// provider. Only reachable through dispute resolution.
    ///
    /// The caller holds the escrow lock. Keys are derived from the escrow
    /// id, so a resolution retried after a partial failure moves no money
    /// twice.
    pub(crate) fn apply_refund(
        &self,
        escrow: &EscrowPayment,
        refund_amount: i64,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<EscrowPayment, MarketError> {
        let config = &self.ctx.config;
        let plan = escrow.plan_refund(refund_amount, &config.fee)?;

        let refund_key = EscrowPayment::refund_key(escrow.id);
        let refund_request = RefundRequest {
            capture_external_id: escrow.capture_external_id.clone(),
            amount: Money::new(plan.refund_amount, escrow.currency.clone()),
            idempotency_key: refund_key.clone(),
        };
        let refund_receipt = self.settle(PaymentOp::Refund, &refund_key, || {
            self.ctx
                .collab
                .processor
                .refund(&refund_request, config.processor_timeout)
        })?;

        let payout_receipt = match &plan.payout {
            Some(split) => {
                let provider_id = self.provider_of(escrow)?;
                let destination = self.ctx.collab.payouts.destination_for(provider_id)?;
                let payout_key = EscrowPayment::payout_key(escrow.id);
                let request = TransferRequest {
                    amount: Money::new(split.provider_amount, escrow.currency.clone()),
                    destination_ref: destination,
                    idempotency_key: payout_key.clone(),
                };
                Some(self.settle(PaymentOp::Transfer, &payout_key, || {
                    self.ctx
                        .collab
                        .processor
                        .transfer(&request, config.processor_timeout)
                })?)
            }
            None => None,
        };

        let (refunded, before) = self
            .ctx
            .repos
            .escrows
            .try_update(&escrow.id, |e| {
                if e.status != EscrowStatus::Disputed {
                    return Err(MarketError::invalid_state(messages::ESCROW_NOT_HELD));
                }
                let before = e.transitions.len();
                e.mark_refunded(
                    plan,
                    refund_receipt,
                    payout_receipt,
                    actor,
                    reason,
                    Timestamp::now(),
                )?;
                Ok::<_, MarketError>((e.clone(), before))
            })
            .unwrap_or_else(|| Err(MarketError::not_found(messages::ESCROW_NOT_FOUND)))?;
        self.ctx
            .journal
            .record_since(*refunded.id.as_uuid(), &refunded.transitions, before);
        tracing::info!(
            escrow_id = %refunded.id,
            refunded = refunded.refunded_amount,
            provider_payout = refunded.payout.as_ref().map_or(0, |p| p.provider_amount),
            "escrow refunded"
        );
        Ok(refunded)
    }

    fn provider_of(&self, escrow: &EscrowPayment) -> Result<engage_core::ActorId, MarketError> {
        self.ctx
            .repos
            .engagements
            .get(&escrow.engagement_id)
            .map(|e| e.party(Side::Provider))
            .ok_or_else(|| MarketError::not_found(messages::ENGAGEMENT_NOT_FOUND))
    }

    /// Run one processor call and turn it into a receipt.
    fn settle(
        &self,
        op: PaymentOp,
        key: &str,
        call: impl FnOnce() -> Result<ProcessorResult, ProcessorError>,
    ) -> Result<Receipt, MarketError> {
        let processor = &self.ctx.collab.processor;
        let result = match call() {
            Ok(result) => result,
            Err(ProcessorError::Timeout { elapsed_ms }) => {
                tracing::warn!(
                    op = ?op,
                    idempotency_key = key,
                    elapsed_ms,
                    processor = processor.processor_name(),
                    "processor call timed out; querying status"
                );
                match processor.lookup(key) {
                    Ok(Some(result)) => result,
                    Ok(None) => {
                        return Err(MarketError::payment_failed(format!(
                            "Payment failed: {op:?} did not settle after a timeout"
                        )))
                    }
                    Err(e) => {
                        tracing::error!(op = ?op, idempotency_key = key, error = %e, "status query failed");
                        return Err(e.into());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(op = ?op, idempotency_key = key, error = %e, "processor call failed");
                return Err(e.into());
            }
        };
        if !result.is_settled() {
            return Err(MarketError::payment_failed(format!(
                "Payment failed: {op:?} is {:?}",
                result.status
            )));
        }
        Ok(Receipt {
            external_id: result.external_id,
            idempotency_key: key.to_string(),
        })
    }
}

pub(crate) fn escrow_payload(escrow: &EscrowPayment) -> serde_json::Value {
    json!({
        "escrow_id": escrow.id.to_string(),
        "engagement_id": escrow.engagement_id.to_string(),
        "status": escrow.status.as_str(),
        "amount": escrow.amount,
        "platform_fee": escrow.platform_fee,
        "provider_amount": escrow.provider_amount,
        "refunded_amount": escrow.refunded_amount,
        "currency": escrow.currency.as_str(),
    })
}
