//! Notification dispatch.
//!
//! Notifications go out after state is committed. A failed send is logged
//! by the caller and never undoes the state change.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use engage_core::ActorId;

/// Events the core announces to parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    OfferReceived,
    OfferAccepted,
    OfferRejected,
    OfferCountered,
    OfferExpired,
    EngagementCreated,
    EngagementStatusChanged,
    EscrowCaptured,
    EscrowReleased,
    EscrowRefunded,
    DisputeOpened,
    DisputeResolved,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OfferReceived => "offer_received",
            Self::OfferAccepted => "offer_accepted",
            Self::OfferRejected => "offer_rejected",
            Self::OfferCountered => "offer_countered",
            Self::OfferExpired => "offer_expired",
            Self::EngagementCreated => "engagement_created",
            Self::EngagementStatusChanged => "engagement_status_changed",
            Self::EscrowCaptured => "escrow_captured",
            Self::EscrowReleased => "escrow_released",
            Self::EscrowRefunded => "escrow_refunded",
            Self::DisputeOpened => "dispute_opened",
            Self::DisputeResolved => "dispute_resolved",
        }
    }
}

impl std::fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
}

/// A delivered (or attempted) notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event: NotificationEvent,
    pub recipient_id: ActorId,
    pub payload: Value,
}

pub trait NotificationDispatcher: Send + Sync {
    fn send(
        &self,
        event: NotificationEvent,
        recipient_id: ActorId,
        payload: &Value,
    ) -> Result<(), DispatchError>;
}

/// Writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationDispatcher for LogNotifier {
    fn send(
        &self,
        event: NotificationEvent,
        recipient_id: ActorId,
        payload: &Value,
    ) -> Result<(), DispatchError> {
        tracing::info!(event = %event, recipient = %recipient_id, %payload, "notification");
        Ok(())
    }
}

/// Keeps sent notifications in memory. Can be switched to fail every send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Notifications of one event type, in send order.
    pub fn sent_of(&self, event: NotificationEvent) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.event == event)
            .cloned()
            .collect()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn send(
        &self,
        event: NotificationEvent,
        recipient_id: ActorId,
        payload: &Value,
    ) -> Result<(), DispatchError> {
        if *self.failing.lock() {
            return Err(DispatchError::Unavailable("recording notifier set to fail".into()));
        }
        self.sent.lock().push(Notification {
            event,
            recipient_id,
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_notifier_records_and_fails_on_demand() {
        let n = RecordingNotifier::new();
        let to = ActorId::new();
        n.send(NotificationEvent::OfferReceived, to, &json!({"offer": 1}))
            .unwrap();
        n.set_failing(true);
        assert!(n
            .send(NotificationEvent::OfferAccepted, to, &json!(null))
            .is_err());
        assert_eq!(n.sent().len(), 1);
        assert_eq!(n.sent_of(NotificationEvent::OfferReceived)[0].recipient_id, to);
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(NotificationEvent::DisputeOpened.as_str(), "dispute_opened");
        assert_eq!(
            serde_json::to_string(&NotificationEvent::EscrowReleased).unwrap(),
            "\"escrow_released\""
        );
    }
}
