//! Notification collaborator interface.
//!
//! A single event schema replaces the per-feature notification lists of the
//! legacy system. Dispatch is fire-and-forget from the engine's perspective:
//! delivery failures are the dispatcher's problem (queueing, retry,
//! at-least-once with deduplication by audit entry id at the consumer) and
//! never roll back a committed transition.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{action::Role, status::Status};

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
  /// The authority now responsible for the demande.
  Role { role: Role },
  /// The applicant who owns the demande.
  Applicant { owner: String },
}

/// One workflow event to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
  pub demande_id: Uuid,
  pub reference:  String,
  pub new_status: Status,
  /// Id of the audit entry that produced this event; consumers deduplicate
  /// on it. `None` only for the filing event, which has no entry.
  pub audit_entry_id: Option<Uuid>,
  pub recipient: Recipient,
}

/// Collaborator the engine hands events to after a commit.
pub trait NotificationDispatcher: Send + Sync {
  /// Accept an event for delivery. Must not fail the caller; implementations
  /// queue and retry internally.
  fn dispatch(
    &self,
    event: NotificationEvent,
  ) -> impl Future<Output = ()> + Send + '_;
}
