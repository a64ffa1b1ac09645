//! Notifications queued during an operation and sent after it commits.

use serde_json::Value;

use engage_adapters::{NotificationDispatcher, NotificationEvent};
use engage_core::ActorId;

/// Notifications collected while an operation runs.
///
/// Flushed only after state is committed and every lock is released. A
/// failed send is logged at warn and does not affect the operation's
/// result.
#[derive(Debug, Default)]
#[must_use = "queued notifications are only sent by flush()"]
pub(crate) struct Outbox {
    queued: Vec<(NotificationEvent, ActorId, Value)>,
}

impl Outbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: NotificationEvent, recipient: ActorId, payload: Value) {
        self.queued.push((event, recipient, payload));
    }

    /// Queue the same event for several recipients.
    pub(crate) fn push_all(
        &mut self,
        event: NotificationEvent,
        recipients: &[ActorId],
        payload: Value,
    ) {
        for recipient in recipients {
            self.push(event, *recipient, payload.clone());
        }
    }

    pub(crate) fn flush(self, dispatcher: &dyn NotificationDispatcher) {
        for (event, recipient, payload) in self.queued {
            if let Err(e) = dispatcher.send(event, recipient, &payload) {
                tracing::warn!(
                    event = %event,
                    recipient = %recipient,
                    error = %e,
                    "notification dispatch failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_adapters::RecordingNotifier;
    use serde_json::json;

    #[test]
    fn flush_sends_in_queue_order() {
        let notifier = RecordingNotifier::new();
        let a = ActorId::new();
        let b = ActorId::new();
        let mut outbox = Outbox::new();
        outbox.push(NotificationEvent::OfferReceived, a, json!({"n": 1}));
        outbox.push_all(NotificationEvent::EscrowReleased, &[a, b], json!({"n": 2}));
        outbox.flush(&notifier);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].event, NotificationEvent::OfferReceived);
        assert_eq!(sent[2].recipient_id, b);
    }

    #[test]
    fn failed_sends_are_swallowed() {
        let notifier = RecordingNotifier::new();
        notifier.set_failing(true);
        let mut outbox = Outbox::new();
        outbox.push(NotificationEvent::DisputeOpened, ActorId::new(), Value::Null);
        outbox.flush(&notifier);
        assert!(notifier.sent().is_empty());
    }
}
