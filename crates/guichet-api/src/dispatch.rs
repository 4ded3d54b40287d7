//! [`QueueDispatcher`] — the in-process notification dispatcher.
//!
//! The engine's contract is fire-and-forget: `dispatch` must return
//! immediately and a delivery problem must never reach the caller. Events go
//! onto an unbounded channel and a background task works them off one at a
//! time, so slow delivery never blocks a transition.

use tokio::sync::mpsc;

use guichet_core::notify::{NotificationDispatcher, NotificationEvent, Recipient};

/// Hands events to a background delivery task over a channel.
///
/// Delivery here writes to the structured log; a deployment wires the
/// ministry's messaging gateway in at [`deliver`]. Consumers deduplicate on
/// the audit entry id, so re-delivery after a crash is safe.
pub struct QueueDispatcher {
  tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl QueueDispatcher {
  /// Start the delivery task on the current runtime.
  pub fn spawn() -> Self {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationEvent>();
    tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        deliver(&event);
      }
    });
    Self { tx }
  }
}

impl NotificationDispatcher for QueueDispatcher {
  async fn dispatch(&self, event: NotificationEvent) {
    // A closed channel means the process is shutting down; the transition
    // this event belongs to has already committed either way.
    if self.tx.send(event).is_err() {
      tracing::warn!("notification queue is closed; event dropped");
    }
  }
}

fn deliver(event: &NotificationEvent) {
  match &event.recipient {
    Recipient::Role { role } => tracing::info!(
      demande = %event.reference,
      status = %event.new_status,
      %role,
      "notifying authority"
    ),
    Recipient::Applicant { owner } => tracing::info!(
      demande = %event.reference,
      status = %event.new_status,
      applicant = %owner,
      "notifying applicant"
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use guichet_core::status::Status;
  use uuid::Uuid;

  #[tokio::test]
  async fn dispatch_returns_immediately() {
    let dispatcher = QueueDispatcher::spawn();
    for _ in 0..100 {
      dispatcher
        .dispatch(NotificationEvent {
          demande_id:     Uuid::new_v4(),
          reference:      "USN-2025-00001".into(),
          new_status:     Status::ValideeChef,
          audit_entry_id: Some(Uuid::new_v4()),
          recipient:      Recipient::Role {
            role: guichet_core::action::Role::Ddpi,
          },
        })
        .await;
    }
  }
}
