//! Action and actor vocabulary, and the input to one workflow step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::Status;

// ─── Roles ───────────────────────────────────────────────────────────────────

/// The entities that act on a demande. The workflow core holds no session
/// state; every call names its `(role, actor_id)` explicitly.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  /// The applicant who filed the demande.
  Demandeur,
  /// Service chief, first reviewing authority.
  ChefService,
  /// Regional directorate (DDPI).
  Ddpi,
  /// General directorate (DGI).
  Dgi,
  /// Technical commission or committee.
  Commission,
  /// Secretariat-general, re-entry point after a commission reserve.
  SecretaireGeneral,
  Ministre,
  /// Single reviewing authority of the simplified PMNE track.
  DirectionPmne,
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// The action verbs recorded in the audit ledger.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
  Validate,
  Return,
  Reject,
  RequestComplement,
  Transmit,
  Comment,
  Reassign,
  IssueOpinion,
  Sign,
}

impl Action {
  /// Actions that may move a demande to a new status. COMMENT and REASSIGN
  /// are annotations; they never transition.
  pub fn is_mutating(self) -> bool {
    !matches!(self, Self::Comment | Self::Reassign)
  }
}

// ─── Commission opinion ──────────────────────────────────────────────────────

/// Aggregate outcome of a commission review; the only part of an opinion the
/// transition table interprets.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AvisType {
  Favorable,
  Defavorable,
  Reserve,
}

/// A commission opinion as persisted on its audit entry.
///
/// The per-criterion checklist is pure record-keeping for later display;
/// only [`Opinion::avis`] drives the transition, so the checklist can grow
/// without touching the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opinion {
  pub avis:         AvisType,
  pub observations: Option<String>,
  /// Conformity verdict per technical criterion id.
  #[serde(default)]
  pub technical_criteria: BTreeMap<String, bool>,
}

// ─── Action input ────────────────────────────────────────────────────────────

/// One workflow step as submitted by a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionInput {
  pub role:     Role,
  pub actor_id: String,
  pub action:   Action,
  /// Required for RETURN, REJECT, REQUEST_COMPLEMENT, COMMENT, and for
  /// opinions with avis RESERVE or DEFAVORABLE.
  pub message: Option<String>,
  /// Required for REASSIGN.
  pub target_role: Option<Role>,
  /// Required for ISSUE_OPINION.
  pub opinion: Option<Opinion>,
  /// The status the caller last read. A mismatch at load time means the
  /// demande advanced under a stale client and the call fails with Conflict.
  pub expected_status: Option<Status>,
  /// Retried identical `(demande, action, key)` calls replay the original
  /// audit entry instead of acting twice.
  pub idempotency_key: Option<String>,
}

impl ActionInput {
  /// Convenience constructor with all optional fields unset.
  pub fn new(role: Role, actor_id: impl Into<String>, action: Action) -> Self {
    Self {
      role,
      actor_id: actor_id.into(),
      action,
      message: None,
      target_role: None,
      opinion: None,
      expected_status: None,
      idempotency_key: None,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}
