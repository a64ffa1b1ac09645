//! # Payment Processor Interface
//!
//! The [`PaymentProcessor`] trait abstracts the card/bank processor that
//! moves money in and out of escrow. Every call carries an idempotency key:
//! repeating a key returns the first call's result and moves no money.
//!
//! ## Timeouts
//!
//! Each call is bounded by the caller's timeout. A [`ProcessorError::Timeout`]
//! says nothing about whether the operation settled; callers resolve that
//! with one [`lookup`](PaymentProcessor::lookup) by the same key.
//!
//! ## Mock conventions
//!
//! [`MockPaymentProcessor`] keys its behaviour off the payment reference:
//! - `pm_declined` is rejected.
//! - `pm_timeout` settles, then reports a timeout.
//! - `pm_lost` reports a timeout and never settles.
//! - anything else settles immediately.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use engage_core::{MarketError, Money};

pub const DECLINED_METHOD: &str = "pm_declined";
pub const TIMEOUT_METHOD: &str = "pm_timeout";
pub const LOST_METHOD: &str = "pm_lost";

/// Errors from the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessorError {
    /// The processor refused the operation. Nothing moved.
    #[error("payment rejected: {reason}")]
    Rejected { reason: String },

    /// No answer within the caller's timeout. Outcome unknown.
    #[error("payment processor timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The processor could not be reached.
    #[error("payment processor unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<ProcessorError> for MarketError {
    fn from(err: ProcessorError) -> Self {
        MarketError::payment_failed(format!("Payment failed: {err}"))
    }
}

/// Settlement state reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Settled,
    Failed,
}

/// Which operation a processor result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOp {
    Capture,
    Transfer,
    Refund,
}

/// Processor response for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorResult {
    pub op: PaymentOp,
    pub external_id: String,
    pub status: SettlementStatus,
    pub amount: Money,
    pub idempotency_key: String,
}

impl ProcessorResult {
    pub fn is_settled(&self) -> bool {
        self.status == SettlementStatus::Settled
    }
}

/// Take funds from the seeker's payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub amount: Money,
    pub method_ref: String,
    pub idempotency_key: String,
}

/// Pay funds out to a provider destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub amount: Money,
    pub destination_ref: String,
    pub idempotency_key: String,
}

/// Return captured funds to the seeker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub capture_external_id: String,
    pub amount: Money,
    pub idempotency_key: String,
}

/// Payment processor abstraction.
///
/// Implementations must be `Send + Sync`; the engine holds one behind an
/// `Arc` and calls it from request threads.
pub trait PaymentProcessor: Send + Sync {
    fn capture(
        &self,
        request: &CaptureRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError>;

    fn transfer(
        &self,
        request: &TransferRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError>;

    fn refund(
        &self,
        request: &RefundRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError>;

    /// Status of an earlier call by idempotency key. `None` if the
    /// processor never saw the key or the call did not settle.
    fn lookup(&self, idempotency_key: &str) -> Result<Option<ProcessorResult>, ProcessorError>;

    /// Human-readable implementation name.
    fn processor_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Mock processor
// ---------------------------------------------------------------------------

/// One call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorCall {
    pub op: PaymentOp,
    pub idempotency_key: String,
    pub amount: i64,
    /// True when the key had been seen and no money moved.
    pub deduplicated: bool,
}

#[derive(Debug, Default)]
struct MockState {
    settled: HashMap<String, ProcessorResult>,
    calls: Vec<ProcessorCall>,
    failures: VecDeque<ProcessorError>,
    lookups: usize,
    sequence: u64,
}

/// In-memory processor that records calls and dedupes by idempotency key.
#[derive(Debug, Default)]
pub struct MockPaymentProcessor {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every non-deduplicated call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next transfer or refund that would move money.
    pub fn fail_next(&self, err: ProcessorError) {
        self.state.lock().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<ProcessorCall> {
        self.state.lock().calls.clone()
    }

    /// Calls of `op` that actually moved money.
    pub fn executed(&self, op: PaymentOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.op == op && !c.deduplicated)
            .count()
    }

    pub fn lookup_count(&self) -> usize {
        self.state.lock().lookups
    }

    fn execute(
        &self,
        op: PaymentOp,
        reference: &str,
        amount: &Money,
        key: &str,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError> {
        if key.is_empty() {
            return Err(ProcessorError::Rejected {
                reason: "idempotency key must not be empty".to_string(),
            });
        }
        if amount.amount <= 0 {
            return Err(ProcessorError::Rejected {
                reason: "amount must be positive".to_string(),
            });
        }

        {
            let mut state = self.state.lock();
            if let Some(existing) = state.settled.get(key).cloned() {
                state.calls.push(ProcessorCall {
                    op,
                    idempotency_key: key.to_string(),
                    amount: amount.amount,
                    deduplicated: true,
                });
                return Ok(existing);
            }
        }

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        let mut state = self.state.lock();
        state.calls.push(ProcessorCall {
            op,
            idempotency_key: key.to_string(),
            amount: amount.amount,
            deduplicated: false,
        });

        if op != PaymentOp::Capture {
            if let Some(err) = state.failures.pop_front() {
                return Err(err);
            }
        }
        let elapsed_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        match reference {
            DECLINED_METHOD => {
                return Err(ProcessorError::Rejected {
                    reason: "card declined".to_string(),
                })
            }
            LOST_METHOD => return Err(ProcessorError::Timeout { elapsed_ms }),
            _ => {}
        }

        state.sequence += 1;
        let prefix = match op {
            PaymentOp::Capture => "ch",
            PaymentOp::Transfer => "tr",
            PaymentOp::Refund => "re",
        };
        let result = ProcessorResult {
            op,
            external_id: format!("{prefix}_mock_{:06}", state.sequence),
            status: SettlementStatus::Settled,
            amount: amount.clone(),
            idempotency_key: key.to_string(),
        };
        state.settled.insert(key.to_string(), result.clone());

        if reference == TIMEOUT_METHOD {
            return Err(ProcessorError::Timeout { elapsed_ms });
        }
        Ok(result)
    }
}

impl PaymentProcessor for MockPaymentProcessor {
    fn capture(
        &self,
        request: &CaptureRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError> {
        self.execute(
            PaymentOp::Capture,
            &request.method_ref,
            &request.amount,
            &request.idempotency_key,
            timeout,
        )
    }

    fn transfer(
        &self,
        request: &TransferRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError> {
        self.execute(
            PaymentOp::Transfer,
            &request.destination_ref,
            &request.amount,
            &request.idempotency_key,
            timeout,
        )
    }

    fn refund(
        &self,
        request: &RefundRequest,
        timeout: Duration,
    ) -> Result<ProcessorResult, ProcessorError> {
        self.execute(
            PaymentOp::Refund,
            &request.capture_external_id,
            &request.amount,
            &request.idempotency_key,
            timeout,
        )
    }

    fn lookup(&self, idempotency_key: &str) -> Result<Option<ProcessorResult>, ProcessorError> {
        let mut state = self.state.lock();
        state.lookups += 1;
        Ok(state.settled.get(idempotency_key).cloned())
    }

    fn processor_name(&self) -> &str {
        "MockPaymentProcessor"
    }
}
