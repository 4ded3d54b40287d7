//! Audit ledger types.
//!
//! One entry is appended per accepted action and never mutated or deleted.
//! Replaying `new_status` values in `seq` order reconstructs the exact status
//! history of the demande; no status change exists without its entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  action::{Action, Opinion, Role},
  status::Status,
};

/// An append-only record of one action taken on a demande.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
  pub entry_id:   Uuid,
  pub demande_id: Uuid,
  /// Per-demande sequence number; breaks timestamp ties deterministically.
  pub seq: i64,
  pub action:     Action,
  pub actor_role: Role,
  pub actor_id:   String,
  /// Equal to `new_status` for non-transitioning actions (COMMENT, REASSIGN).
  pub previous_status: Status,
  pub new_status:      Status,
  pub message:     Option<String>,
  pub target_role: Option<Role>,
  /// The full commission opinion, persisted for later display.
  pub opinion: Option<Opinion>,
  pub idempotency_key: Option<String>,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::DemandeStore::commit_transition`].
/// `entry_id`, `seq` and `recorded_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
  pub action:          Action,
  pub actor_role:      Role,
  pub actor_id:        String,
  pub previous_status: Status,
  pub new_status:      Status,
  pub message:         Option<String>,
  pub target_role:     Option<Role>,
  pub opinion:         Option<Opinion>,
  pub idempotency_key: Option<String>,
}

impl NewAuditEntry {
  /// Convenience constructor with all optional fields unset.
  pub fn new(
    action: Action,
    actor_role: Role,
    actor_id: impl Into<String>,
    previous_status: Status,
    new_status: Status,
  ) -> Self {
    Self {
      action,
      actor_role,
      actor_id: actor_id.into(),
      previous_status,
      new_status,
      message: None,
      target_role: None,
      opinion: None,
      idempotency_key: None,
    }
  }
}
