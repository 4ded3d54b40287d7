//! The demande record and its creation input.
//!
//! A demande is created once in the initial status of its track and only ever
//! advanced through the transition graph by the engine; it is never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{Status, Track, assigned_actor};
use crate::action::Role;

// ─── Type ────────────────────────────────────────────────────────────────────

/// The kind of authorization requested; fixed at creation and, together with
/// the technical-review routing flag, selects the track.
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
pub enum DemandeType {
  Usine,
  Boulangerie,
  EauxMinerale,
  Pmne,
  Extension,
}

impl DemandeType {
  /// Short code used in the human-readable reference.
  pub fn code(self) -> &'static str {
    match self {
      Self::Usine => "USN",
      Self::Boulangerie => "BLG",
      Self::EauxMinerale => "EMN",
      Self::Pmne => "PME",
      Self::Extension => "EXT",
    }
  }

  /// The track a demande of this type follows. Mineral-water plants always
  /// go through the commission; PMNE requests do only when routed for
  /// technical review, and otherwise take the simplified track.
  pub fn track(self, technical_review: bool) -> Track {
    match self {
      Self::EauxMinerale => Track::Commission,
      Self::Pmne if technical_review => Track::Commission,
      Self::Pmne => Track::Simplified,
      _ => Track::Hierarchical,
    }
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Reference to an uploaded document. Only existence matters to the
/// workflow; storage and content live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
  pub name:        String,
  pub storage_key: String,
}

// ─── Demande ─────────────────────────────────────────────────────────────────

/// One authorization request moving through the approval workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demande {
  pub demande_id: Uuid,
  /// Human-readable code, assigned at creation, immutable, unique.
  pub reference: String,
  pub demande_type: DemandeType,
  pub track:        Track,
  /// Mutated only by the engine, via the store's conditional commit.
  pub status: Status,
  /// The applicant who filed the demande; immutable.
  pub owner: String,
  /// Structured form data; opaque to the workflow.
  pub payload: serde_json::Value,
  pub documents: Vec<DocumentRef>,
  /// Where a resubmission re-enters the graph; recorded at the moment of a
  /// RETURN or REQUEST_COMPLEMENT, cleared on resubmission.
  pub return_target: Option<Status>,
  pub return_reason:      Option<String>,
  pub rejection_reason:   Option<String>,
  pub complement_message: Option<String>,
  /// Reference to the finalized authorization artifact. Non-null exactly
  /// when [`Status::is_signed`] holds.
  pub signed_artifact: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Demande {
  /// The role currently responsible for acting, derived from the status.
  pub fn assigned_actor(&self) -> Option<Role> {
    assigned_actor(self.track, self.status)
  }

  pub fn is_terminal(&self) -> bool { self.status.is_terminal(self.track) }
}

// ─── NewDemande ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::DemandeStore::create`].
/// Identity, reference and timestamps are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDemande {
  pub demande_type: DemandeType,
  pub owner:        String,
  #[serde(default)]
  pub payload: serde_json::Value,
  #[serde(default)]
  pub documents: Vec<DocumentRef>,
  /// Route a PMNE demande through the technical commission. Ignored for
  /// every other type.
  #[serde(default)]
  pub technical_review: bool,
}

impl NewDemande {
  pub fn new(demande_type: DemandeType, owner: impl Into<String>) -> Self {
    Self {
      demande_type,
      owner: owner.into(),
      payload: serde_json::Value::Null,
      documents: Vec::new(),
      technical_review: false,
    }
  }

  pub fn track(&self) -> Track {
    self.demande_type.track(self.technical_review)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pmne_routing_depends_on_technical_review() {
    assert_eq!(DemandeType::Pmne.track(false), Track::Simplified);
    assert_eq!(DemandeType::Pmne.track(true), Track::Commission);
    assert_eq!(DemandeType::EauxMinerale.track(false), Track::Commission);
    assert_eq!(DemandeType::Usine.track(true), Track::Hierarchical);
  }
}
