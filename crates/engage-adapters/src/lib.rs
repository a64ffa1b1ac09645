//! # engage-adapters — External Collaborators
//!
//! Traits for the systems the engagement core talks to, each with an
//! in-memory implementation used by tests and the development server:
//!
//! | Trait                    | In-memory implementation      |
//! |--------------------------|-------------------------------|
//! | [`PaymentProcessor`]     | [`MockPaymentProcessor`]      |
//! | [`NotificationDispatcher`] | [`RecordingNotifier`], [`LogNotifier`] |
//! | [`ContractService`]      | [`ScriptedContractService`]   |
//! | [`PayoutDirectory`]      | [`InMemoryPayoutDirectory`]   |
//!
//! The traits are synchronous and object-safe; the engine holds them as
//! `Arc<dyn Trait>`.

pub mod contract;
pub mod notify;
pub mod payment;
pub mod payout;

pub use contract::{ContractError, ContractService, ScriptedContractService};
pub use notify::{
    DispatchError, LogNotifier, Notification, NotificationDispatcher, NotificationEvent,
    RecordingNotifier,
};
pub use payment::{
    CaptureRequest, MockPaymentProcessor, PaymentOp, PaymentProcessor, ProcessorCall,
    ProcessorError, ProcessorResult, RefundRequest, SettlementStatus, TransferRequest,
};
pub use payout::{InMemoryPayoutDirectory, PayoutDirectory, PayoutError};
