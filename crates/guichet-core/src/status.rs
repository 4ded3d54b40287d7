//! Status vocabulary and track routing.
//!
//! Every demande holds exactly one [`Status`] from the closed set below, and
//! every demande is pinned at creation to a [`Track`] that selects which part
//! of the transition graph applies. Legality of a transition is decided by
//! [`crate::policy`]; nothing in the system compares status strings.

use serde::{Deserialize, Serialize};

use crate::action::Role;

// ─── Track ───────────────────────────────────────────────────────────────────

/// Which branch of the transition graph a demande follows.
///
/// Fixed at creation from the demande type (and, for PMNE, the
/// technical-review routing flag); never changes afterwards.
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
pub enum Track {
  /// Full hierarchical validation: service chief, DDPI, DGI, minister.
  Hierarchical,
  /// Hierarchical validation up to the DGI, then a technical commission
  /// opinion that converges back toward the minister.
  Commission,
  /// Single reviewing authority, short-circuit to signature.
  Simplified,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// The closed set of states a demande can hold, across all tracks.
///
/// Wire and storage form is the SCREAMING_SNAKE_CASE French vocabulary
/// (`VALIDEE_CHEF`, `TRANSMISE_A_DDPI`, ...), provided by both serde and
/// strum so the HTTP layer and the store share one spelling.
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
pub enum Status {
  // ── Filing and reception ────────────────────────────────────────────────
  Deposee,
  Receptionnee,

  // ── Hierarchical validation chain ───────────────────────────────────────
  ValideeChef,
  TransmiseADdpi,
  ValideeDdpi,
  TransmiseADgi,
  ValideeDgi,
  TransmiseAuMinistre,

  // ── Commission branch ───────────────────────────────────────────────────
  EnAttenteAvisCommission,
  AvisFavorableCommission,
  AvisDefavorableCommission,
  ReserveCommission,
  TransmiseAuSg,

  // ── Simplified (PMNE) processing ────────────────────────────────────────
  EnCoursTraitement,

  // ── Applicant-side waiting states ───────────────────────────────────────
  Retournee,
  PiecesManquantes,

  // ── Signature and terminal states ───────────────────────────────────────
  EnAttenteSignature,
  AutorisationSignee,
  Rejetee,
  Cloturee,
}

impl Status {
  /// True once the demande carries a signed authorization. The signed
  /// artifact reference is non-null exactly on these states.
  pub fn is_signed(self) -> bool {
    matches!(self, Self::AutorisationSignee | Self::Cloturee)
  }

  /// Waypoint states the engine records and immediately leaves: a commission
  /// opinion lands here and cascades onward within the same commit.
  pub fn is_transient(self) -> bool {
    matches!(
      self,
      Self::AvisFavorableCommission
        | Self::AvisDefavorableCommission
        | Self::ReserveCommission
    )
  }

  /// Terminal for the given track; no further action is ever legal.
  pub fn is_terminal(self, track: Track) -> bool {
    match self {
      Self::Rejetee | Self::Cloturee => true,
      // The simplified track has no closure step after signature.
      Self::AutorisationSignee => track == Track::Simplified,
      _ => false,
    }
  }

  /// States on which the applicant must be notified in addition to the new
  /// assigned actor.
  pub fn notifies_applicant(self) -> bool {
    matches!(
      self,
      Self::Retournee
        | Self::PiecesManquantes
        | Self::Rejetee
        | Self::AutorisationSignee
    )
  }
}

// ─── Track vocabulary and assignment ─────────────────────────────────────────

impl Track {
  /// The finite status set a demande on this track may ever hold.
  pub fn statuses(self) -> &'static [Status] {
    match self {
      Track::Hierarchical => &[
        Status::Deposee,
        Status::Receptionnee,
        Status::ValideeChef,
        Status::TransmiseADdpi,
        Status::ValideeDdpi,
        Status::TransmiseADgi,
        Status::ValideeDgi,
        Status::TransmiseAuMinistre,
        Status::EnAttenteSignature,
        Status::AutorisationSignee,
        Status::Cloturee,
        Status::Retournee,
        Status::PiecesManquantes,
        Status::Rejetee,
      ],
      Track::Commission => &[
        Status::Deposee,
        Status::Receptionnee,
        Status::ValideeChef,
        Status::TransmiseADdpi,
        Status::ValideeDdpi,
        Status::TransmiseADgi,
        Status::ValideeDgi,
        Status::EnAttenteAvisCommission,
        Status::AvisFavorableCommission,
        Status::AvisDefavorableCommission,
        Status::ReserveCommission,
        Status::TransmiseAuSg,
        Status::TransmiseAuMinistre,
        Status::EnAttenteSignature,
        Status::AutorisationSignee,
        Status::Cloturee,
        Status::Retournee,
        Status::PiecesManquantes,
        Status::Rejetee,
      ],
      Track::Simplified => &[
        Status::Deposee,
        Status::EnCoursTraitement,
        Status::PiecesManquantes,
        Status::EnAttenteSignature,
        Status::AutorisationSignee,
        Status::Rejetee,
      ],
    }
  }

  /// The roles that ever appear on this track's chain of custody. COMMENT and
  /// REASSIGN are open to these roles regardless of the current status.
  pub fn chain(self) -> &'static [Role] {
    match self {
      Track::Hierarchical => &[
        Role::Demandeur,
        Role::ChefService,
        Role::Ddpi,
        Role::Dgi,
        Role::Ministre,
      ],
      Track::Commission => &[
        Role::Demandeur,
        Role::ChefService,
        Role::Ddpi,
        Role::Dgi,
        Role::Commission,
        Role::SecretaireGeneral,
        Role::Ministre,
      ],
      Track::Simplified => &[Role::Demandeur, Role::DirectionPmne, Role::Ministre],
    }
  }
}

/// The single entity responsible for acting on a demande in `status`.
///
/// Pure function of `(track, status)`. `None` for terminal states and for
/// the transient avis waypoints the engine never rests on.
pub fn assigned_actor(track: Track, status: Status) -> Option<Role> {
  use Status::*;
  match status {
    Deposee => Some(match track {
      Track::Simplified => Role::DirectionPmne,
      _ => Role::ChefService,
    }),
    Receptionnee => Some(Role::ChefService),
    ValideeChef | TransmiseADdpi => Some(Role::Ddpi),
    ValideeDdpi | TransmiseADgi => Some(Role::Dgi),
    ValideeDgi => match track {
      Track::Commission => Some(Role::Commission),
      Track::Hierarchical => Some(Role::Ministre),
      Track::Simplified => None,
    },
    EnAttenteAvisCommission => Some(Role::Commission),
    AvisFavorableCommission | AvisDefavorableCommission | ReserveCommission => {
      None
    }
    TransmiseAuSg => Some(Role::SecretaireGeneral),
    TransmiseAuMinistre | EnAttenteSignature => Some(Role::Ministre),
    EnCoursTraitement => Some(Role::DirectionPmne),
    Retournee | PiecesManquantes => Some(Role::Demandeur),
    AutorisationSignee => match track {
      Track::Simplified => None,
      _ => Some(Role::ChefService),
    },
    Rejetee | Cloturee => None,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
