//! ActorPolicy: the single authoritative transition table.
//!
//! [`evaluate`] is a deterministic, total function over the finite
//! `(track, role, status, action)` space; any combination not listed below is
//! denied. Both the engine (enforcement) and the HTTP layer (affordance, via
//! the assigned-actor read) consume this table; nothing else in the system
//! decides legality.
//!
//! Reception and transmission statuses (`RECEPTIONNEE`, `TRANSMISE_A_*`) are
//! explicit acknowledgment steps taken with TRANSMIT by the assigned
//! authority; VALIDATE from the preceding status validates directly. Either
//! way the same single role is authorized.

use crate::{
  action::{Action, AvisType, Role},
  status::{Status, Track},
};

// ─── Decision ────────────────────────────────────────────────────────────────

/// How the next status is obtained once a transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStatus {
  /// Move to this status.
  Fixed(Status),
  /// COMMENT / REASSIGN: the status does not change.
  Unchanged,
  /// Resubmission: move to the resume target recorded on the demande at the
  /// moment it was returned.
  ResumeTarget,
  /// ISSUE_OPINION: the avis type selects the landing status.
  FromOpinion,
}

/// The outcome of a policy check for an allowed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
  pub next: NextStatus,
  /// The engine refuses the action if this is set and no message was given.
  pub requires_message: bool,
  /// For returning transitions: where a later resubmission re-enters the
  /// graph. Recorded on the demande when the return happens, never inferred.
  pub resume_target: Option<Status>,
}

fn to(next: Status) -> Decision {
  Decision {
    next: NextStatus::Fixed(next),
    requires_message: false,
    resume_target: None,
  }
}

fn rejecting() -> Decision {
  Decision {
    next: NextStatus::Fixed(Status::Rejetee),
    requires_message: true,
    resume_target: None,
  }
}

/// A transition to `next` that requires a message and records `resume` as the
/// re-entry point for the applicant's resubmission.
fn returning(next: Status, resume: Status) -> Decision {
  Decision {
    next: NextStatus::Fixed(next),
    requires_message: true,
    resume_target: Some(resume),
  }
}

const ANNOTATION: Decision = Decision {
  next: NextStatus::Unchanged,
  requires_message: false,
  resume_target: None,
};

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Decide whether `role` may apply `action` to a demande of `track` currently
/// in `status`, and what follows. `None` means Forbidden.
pub fn evaluate(
  track: Track,
  role: Role,
  status: Status,
  action: Action,
) -> Option<Decision> {
  match action {
    // Annotations are open to every role on the track's chain, including
    // prior actors; they never change the status.
    Action::Comment => track.chain().contains(&role).then_some(Decision {
      requires_message: true,
      ..ANNOTATION
    }),
    Action::Reassign => track.chain().contains(&role).then_some(ANNOTATION),
    _ => mutating(track, role, status, action),
  }
}

/// Mutating transitions. Exactly one role is authorized per resting status;
/// any other `(role, action)` pair is denied even if the action exists
/// elsewhere in the graph.
fn mutating(
  track: Track,
  role: Role,
  status: Status,
  action: Action,
) -> Option<Decision> {
  use Action::*;
  use Status::*;

  // The applicant resubmits after a return or a complement request; the
  // landing status is whatever was recorded when the demande was returned.
  if let (Retournee | PiecesManquantes, Role::Demandeur, Transmit) =
    (status, role, action)
  {
    return Some(Decision {
      next: NextStatus::ResumeTarget,
      requires_message: false,
      resume_target: None,
    });
  }

  if track == Track::Simplified {
    return simplified(role, status, action);
  }

  // Shared hierarchical chain up to the DGI.
  let shared = match (status, role, action) {
    (Deposee, Role::ChefService, Transmit) => Some(to(Receptionnee)),
    (Deposee | Receptionnee, Role::ChefService, Validate) => {
      Some(to(ValideeChef))
    }
    (Deposee | Receptionnee, Role::ChefService, Return) => {
      Some(returning(Retournee, Deposee))
    }
    (Deposee | Receptionnee, Role::ChefService, RequestComplement) => {
      Some(returning(PiecesManquantes, Deposee))
    }
    (Deposee | Receptionnee, Role::ChefService, Reject) => Some(rejecting()),

    (ValideeChef, Role::Ddpi, Transmit) => Some(to(TransmiseADdpi)),
    (ValideeChef | TransmiseADdpi, Role::Ddpi, Validate) => {
      Some(to(ValideeDdpi))
    }
    (ValideeChef, Role::Ddpi, Return) => {
      Some(returning(Retournee, Receptionnee))
    }
    (TransmiseADdpi, Role::Ddpi, Return) => {
      Some(returning(Retournee, ValideeChef))
    }

    (ValideeDdpi, Role::Dgi, Transmit) => Some(to(TransmiseADgi)),
    (ValideeDdpi | TransmiseADgi, Role::Dgi, Validate) => Some(to(ValideeDgi)),
    (ValideeDdpi, Role::Dgi, Return) => {
      Some(returning(Retournee, TransmiseADdpi))
    }
    (TransmiseADgi, Role::Dgi, Return) => {
      Some(returning(Retournee, ValideeDdpi))
    }

    (TransmiseAuMinistre, Role::Ministre, Validate) => {
      Some(to(EnAttenteSignature))
    }
    (EnAttenteSignature, Role::Ministre, Sign) => Some(to(AutorisationSignee)),
    (AutorisationSignee, Role::ChefService, Transmit) => Some(to(Cloturee)),

    _ => None,
  };
  if shared.is_some() {
    return shared;
  }

  // Post-DGI branch, where the two tracks diverge.
  match track {
    Track::Hierarchical => match (status, role, action) {
      (ValideeDgi, Role::Ministre, Transmit) => Some(to(TransmiseAuMinistre)),
      (ValideeDgi, Role::Ministre, Validate) => Some(to(EnAttenteSignature)),
      _ => None,
    },
    Track::Commission => match (status, role, action) {
      (ValideeDgi, Role::Commission, Transmit) => {
        Some(to(EnAttenteAvisCommission))
      }
      (ValideeDgi | EnAttenteAvisCommission, Role::Commission, IssueOpinion) => {
        Some(Decision {
          next: NextStatus::FromOpinion,
          requires_message: false,
          resume_target: None,
        })
      }
      (TransmiseAuSg, Role::SecretaireGeneral, Validate) => {
        Some(to(TransmiseAuMinistre))
      }
      (TransmiseAuSg, Role::SecretaireGeneral, Return) => {
        Some(returning(Retournee, EnAttenteAvisCommission))
      }
      (TransmiseAuSg, Role::SecretaireGeneral, Reject) => Some(rejecting()),
      _ => None,
    },
    Track::Simplified => None,
  }
}

fn simplified(role: Role, status: Status, action: Action) -> Option<Decision> {
  use Action::*;
  use Status::*;
  match (status, role, action) {
    (Deposee, Role::DirectionPmne, Validate) => Some(to(EnCoursTraitement)),
    (EnCoursTraitement, Role::DirectionPmne, Validate) => {
      Some(to(EnAttenteSignature))
    }
    (EnCoursTraitement, Role::DirectionPmne, RequestComplement) => {
      Some(returning(PiecesManquantes, EnCoursTraitement))
    }
    (EnCoursTraitement, Role::DirectionPmne, Reject) => Some(rejecting()),
    (EnAttenteSignature, Role::Ministre, Sign) => Some(to(AutorisationSignee)),
    _ => None,
  }
}

// ─── Opinion routing ─────────────────────────────────────────────────────────

/// The waypoint status an opinion lands on.
pub fn avis_status(avis: AvisType) -> Status {
  match avis {
    AvisType::Favorable => Status::AvisFavorableCommission,
    AvisType::Defavorable => Status::AvisDefavorableCommission,
    AvisType::Reserve => Status::ReserveCommission,
  }
}

/// Follow-on transition the engine applies, within the same commit, after a
/// transient waypoint is recorded.
pub fn auto_follow(status: Status) -> Option<(Action, Status)> {
  match status {
    Status::AvisFavorableCommission => {
      Some((Action::Transmit, Status::TransmiseAuMinistre))
    }
    Status::AvisDefavorableCommission => {
      Some((Action::Reject, Status::Rejetee))
    }
    Status::ReserveCommission => Some((Action::Transmit, Status::TransmiseAuSg)),
    _ => None,
  }
}

// ─── Derived checks ──────────────────────────────────────────────────────────

const MUTATING_ACTIONS: [Action; 7] = [
  Action::Validate,
  Action::Return,
  Action::Reject,
  Action::RequestComplement,
  Action::Transmit,
  Action::IssueOpinion,
  Action::Sign,
];

/// Whether `role` has at least one mutating action at `status`. Used to
/// validate REASSIGN targets: reassigning to a role that could never act on
/// the current status is refused.
pub fn role_can_act(track: Track, status: Status, role: Role) -> bool {
  MUTATING_ACTIONS
    .iter()
    .any(|&action| mutating(track, role, status, action).is_some())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::status::assigned_actor;

  const ALL_TRACKS: [Track; 3] =
    [Track::Hierarchical, Track::Commission, Track::Simplified];

  const ALL_ROLES: [Role; 8] = [
    Role::Demandeur,
    Role::ChefService,
    Role::Ddpi,
    Role::Dgi,
    Role::Commission,
    Role::SecretaireGeneral,
    Role::Ministre,
    Role::DirectionPmne,
  ];

  #[test]
  fn at_most_one_role_may_mutate_any_status() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        let acting: Vec<Role> = ALL_ROLES
          .into_iter()
          .filter(|&r| role_can_act(track, status, r))
          .collect();
        assert!(
          acting.len() <= 1,
          "{track} {status}: several roles may act: {acting:?}"
        );
      }
    }
  }

  #[test]
  fn the_acting_role_is_the_assigned_actor() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        for role in ALL_ROLES {
          if role_can_act(track, status, role) {
            assert_eq!(
              assigned_actor(track, status),
              Some(role),
              "{track} {status}"
            );
          }
        }
      }
    }
  }

  #[test]
  fn terminal_statuses_admit_no_mutation() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        if status.is_terminal(track) {
          for role in ALL_ROLES {
            assert!(!role_can_act(track, status, role), "{track} {status}");
          }
        }
      }
    }
  }

  #[test]
  fn unknown_combinations_are_denied() {
    // A DGI officer replaying an old UI state against a demande still with
    // the service chief.
    assert!(
      evaluate(Track::Hierarchical, Role::Dgi, Status::Deposee, Action::Validate)
        .is_none()
    );
    // Sign is only ever legal for the minister while awaiting signature.
    assert!(
      evaluate(Track::Commission, Role::Commission, Status::ValideeDgi, Action::Sign)
        .is_none()
    );
    // The simplified track has no DDPI step at all.
    assert!(
      evaluate(Track::Simplified, Role::Ddpi, Status::Deposee, Action::Validate)
        .is_none()
    );
  }

  #[test]
  fn validate_at_deposee_lands_on_validee_chef() {
    let d = evaluate(
      Track::Hierarchical,
      Role::ChefService,
      Status::Deposee,
      Action::Validate,
    )
    .unwrap();
    assert_eq!(d.next, NextStatus::Fixed(Status::ValideeChef));
    assert!(!d.requires_message);
  }

  #[test]
  fn return_at_validee_chef_records_receptionnee_as_resume_target() {
    let d = evaluate(
      Track::Hierarchical,
      Role::Ddpi,
      Status::ValideeChef,
      Action::Return,
    )
    .unwrap();
    assert_eq!(d.next, NextStatus::Fixed(Status::Retournee));
    assert!(d.requires_message);
    assert_eq!(d.resume_target, Some(Status::Receptionnee));
  }

  #[test]
  fn returning_transitions_always_require_a_message() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        for role in ALL_ROLES {
          for action in [Action::Return, Action::Reject, Action::RequestComplement]
          {
            if let Some(d) = evaluate(track, role, status, action) {
              assert!(d.requires_message, "{track} {status} {action}");
            }
          }
        }
      }
    }
  }

  #[test]
  fn returning_transitions_record_a_resume_target() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        for role in ALL_ROLES {
          for action in [Action::Return, Action::RequestComplement] {
            if let Some(d) = evaluate(track, role, status, action) {
              let resume = d.resume_target.expect("resume target");
              assert!(
                track.statuses().contains(&resume),
                "{track} {status}: resume {resume} outside track"
              );
            }
          }
        }
      }
    }
  }

  #[test]
  fn fixed_transitions_stay_inside_the_track_vocabulary() {
    for track in ALL_TRACKS {
      for &status in track.statuses() {
        for role in ALL_ROLES {
          for action in MUTATING_ACTIONS {
            if let Some(Decision { next: NextStatus::Fixed(n), .. }) =
              evaluate(track, role, status, action)
            {
              assert!(
                track.statuses().contains(&n),
                "{track} {status} -{action}-> {n} leaves the track"
              );
            }
          }
        }
      }
    }
  }

  #[test]
  fn opinion_waypoints_cascade() {
    assert_eq!(
      auto_follow(avis_status(AvisType::Favorable)),
      Some((Action::Transmit, Status::TransmiseAuMinistre))
    );
    assert_eq!(
      auto_follow(avis_status(AvisType::Defavorable)),
      Some((Action::Reject, Status::Rejetee))
    );
    assert_eq!(
      auto_follow(avis_status(AvisType::Reserve)),
      Some((Action::Transmit, Status::TransmiseAuSg))
    );
    assert_eq!(auto_follow(Status::ValideeChef), None);
  }

  #[test]
  fn comment_is_open_to_the_chain_and_requires_a_message() {
    let d = evaluate(
      Track::Hierarchical,
      Role::ChefService,
      Status::ValideeDgi,
      Action::Comment,
    )
    .unwrap();
    assert_eq!(d.next, NextStatus::Unchanged);
    assert!(d.requires_message);

    // The commission sits on no hierarchical chain.
    assert!(
      evaluate(
        Track::Hierarchical,
        Role::Commission,
        Status::ValideeDgi,
        Action::Comment
      )
      .is_none()
    );
  }

  #[test]
  fn resubmission_uses_the_recorded_target() {
    for track in ALL_TRACKS {
      for status in [Status::Retournee, Status::PiecesManquantes] {
        if !track.statuses().contains(&status) {
          continue;
        }
        let d = evaluate(track, Role::Demandeur, status, Action::Transmit)
          .expect("resubmission allowed");
        assert_eq!(d.next, NextStatus::ResumeTarget);
      }
    }
  }
}
