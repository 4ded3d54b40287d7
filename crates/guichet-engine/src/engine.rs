//! [`WorkflowEngine`] — orchestration of one workflow action.

use std::sync::Arc;

use uuid::Uuid;

use guichet_core::{
  Error, Result,
  action::{Action, ActionInput, AvisType, Opinion, Role},
  audit::{AuditEntry, NewAuditEntry},
  demande::{Demande, NewDemande},
  notify::{NotificationDispatcher, NotificationEvent, Recipient},
  policy::{self, NextStatus},
  sign::{SignatureCompletion, SignatureRequest},
  status::{Status, assigned_actor},
  store::{DemandeQuery, DemandeStore, StoreError, TransitionCommit},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The result of an accepted action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
  /// The entry recording the actor's own action. When an opinion cascades
  /// through a waypoint the follow-on hops have entries of their own,
  /// visible in the history.
  pub entry: AuditEntry,
  /// The status the demande rests on after any cascade.
  pub new_status: Status,
  /// The role now responsible, if any.
  pub assigned: Option<Role>,
  /// True when an idempotency key matched a prior identical action and the
  /// original entry was returned without any new write.
  pub replayed: bool,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Orchestrates transitions over a store, a notification dispatcher and a
/// signature collaborator. Cloning is cheap; all collaborators are shared.
pub struct WorkflowEngine<S, N, G> {
  store:      Arc<S>,
  dispatcher: Arc<N>,
  signer:     Arc<G>,
}

impl<S, N, G> Clone for WorkflowEngine<S, N, G> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      dispatcher: Arc::clone(&self.dispatcher),
      signer:     Arc::clone(&self.signer),
    }
  }
}

impl<S, N, G> WorkflowEngine<S, N, G>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  pub fn new(store: Arc<S>, dispatcher: Arc<N>, signer: Arc<G>) -> Self {
    Self { store, dispatcher, signer }
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get(&self, id: Uuid) -> Result<Demande> {
    self
      .store
      .get(id)
      .await
      .map_err(map_store)?
      .ok_or(Error::NotFound(id))
  }

  pub async fn list(&self, query: &DemandeQuery) -> Result<Vec<Demande>> {
    self.store.list(query).await.map_err(map_store)
  }

  /// The role currently responsible for acting on the demande. A pure
  /// derived read; the UI decides which actions to offer from this plus the
  /// policy table, never from hardcoded status checks.
  pub async fn assigned_actor(&self, id: Uuid) -> Result<Option<Role>> {
    Ok(self.get(id).await?.assigned_actor())
  }

  pub async fn history(&self, id: Uuid) -> Result<Vec<AuditEntry>> {
    // Distinguish "no actions yet" from "no such demande".
    self.get(id).await?;
    self.store.history(id).await.map_err(map_store)
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// File a new demande and notify the first assigned authority.
  pub async fn create(&self, input: NewDemande) -> Result<Demande> {
    let demande = self.store.create(input).await.map_err(map_store)?;
    tracing::info!(
      demande_id = %demande.demande_id,
      reference = %demande.reference,
      track = %demande.track,
      "demande filed"
    );

    if let Some(role) = demande.assigned_actor() {
      self
        .dispatcher
        .dispatch(NotificationEvent {
          demande_id:     demande.demande_id,
          reference:      demande.reference.clone(),
          new_status:     demande.status,
          audit_entry_id: None,
          recipient:      Recipient::Role { role },
        })
        .await;
    }
    Ok(demande)
  }

  // ── The workflow operation ────────────────────────────────────────────

  /// Apply one action to a demande.
  ///
  /// Validation order: existence, idempotent replay, stale-client
  /// precondition, policy, argument checks. SIGN finalizes the artifact
  /// before the commit so a signature failure leaves the demande signable.
  /// The commit itself is conditioned on the status read here; a concurrent
  /// winner surfaces as [`Error::Conflict`].
  pub async fn apply_action(
    &self,
    demande_id: Uuid,
    input: ActionInput,
  ) -> Result<ActionOutcome> {
    let demande = self.get(demande_id).await?;

    if let Some(key) = &input.idempotency_key {
      if let Some(prior) = self
        .store
        .find_entry_by_key(demande_id, key)
        .await
        .map_err(map_store)?
      {
        if prior.action != input.action {
          return Err(Error::InvalidArgument(format!(
            "idempotency key {key:?} was already used for {}",
            prior.action
          )));
        }
        tracing::debug!(%demande_id, %key, "replaying idempotent action");
        return Ok(ActionOutcome {
          new_status: demande.status,
          assigned:   demande.assigned_actor(),
          entry:      prior,
          replayed:   true,
        });
      }
    }

    // A stale client read a status the demande has since left.
    if let Some(expected) = input.expected_status
      && expected != demande.status
    {
      return Err(Error::Conflict(demande_id));
    }

    let decision =
      policy::evaluate(demande.track, input.role, demande.status, input.action)
        .ok_or(Error::Forbidden {
          role:   input.role,
          status: demande.status,
          action: input.action,
        })?;

    let message = normalize(input.message.clone());
    if decision.requires_message && message.is_none() {
      return Err(Error::InvalidArgument(format!(
        "{} requires a non-empty message",
        input.action
      )));
    }

    let opinion = self.validate_opinion(&input)?;
    let target_role = self.validate_reassign(&demande, &input)?;

    let previous = demande.status;
    let first_next = match decision.next {
      NextStatus::Fixed(next) => next,
      NextStatus::Unchanged => previous,
      NextStatus::ResumeTarget => {
        demande.return_target.ok_or_else(|| {
          Error::InvalidArgument(
            "demande has no recorded resubmission target".into(),
          )
        })?
      }
      NextStatus::FromOpinion => match &opinion {
        Some(o) => policy::avis_status(o.avis),
        // FromOpinion only ever comes back for ISSUE_OPINION, whose payload
        // was checked above.
        None => {
          return Err(Error::InvalidArgument(
            "ISSUE_OPINION requires an opinion payload".into(),
          ));
        }
      },
    };

    // Finalize the signature before committing anything: an unreachable
    // signer must leave the demande in its pre-sign status.
    let signed_artifact = if input.action == Action::Sign {
      let artifact = self
        .signer
        .finalize(SignatureRequest {
          demande_id,
          reference: demande.reference.clone(),
          signatory: input.actor_id.clone(),
        })
        .await
        .map_err(|e| Error::DependencyFailure(e.to_string()))?;
      Some(artifact)
    } else {
      None
    };

    // First the actor's own entry, then one entry per cascaded waypoint.
    let mut entries = vec![NewAuditEntry {
      action:          input.action,
      actor_role:      input.role,
      actor_id:        input.actor_id.clone(),
      previous_status: previous,
      new_status:      first_next,
      message:         message.clone(),
      target_role,
      opinion:         opinion.clone(),
      idempotency_key: input.idempotency_key.clone(),
    }];

    let mut final_status = first_next;
    while let Some((follow_action, follow_next)) =
      policy::auto_follow(final_status)
    {
      entries.push(NewAuditEntry::new(
        follow_action,
        input.role,
        input.actor_id.clone(),
        final_status,
        follow_next,
      ));
      final_status = follow_next;
    }

    let updated = apply_record_effects(
      demande,
      &input,
      &decision,
      &message,
      opinion.as_ref(),
      signed_artifact,
      final_status,
    );

    let persisted = self
      .store
      .commit_transition(TransitionCommit {
        demande: updated.clone(),
        expected_status: previous,
        entries,
      })
      .await
      .map_err(map_store)?;

    let entry = persisted.first().cloned().ok_or_else(|| {
      Error::DependencyFailure("store committed no audit entries".into())
    })?;

    tracing::info!(
      %demande_id,
      action = %input.action,
      role = %input.role,
      from = %previous,
      to = %final_status,
      "action applied"
    );

    if input.action.is_mutating() {
      self
        .notify(&updated, persisted.last().map(|e| e.entry_id))
        .await;
    }

    Ok(ActionOutcome {
      entry,
      new_status: final_status,
      assigned: updated.assigned_actor(),
      replayed: false,
    })
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  fn validate_opinion(&self, input: &ActionInput) -> Result<Option<Opinion>> {
    if input.action != Action::IssueOpinion {
      return Ok(None);
    }
    let opinion = input.opinion.clone().ok_or_else(|| {
      Error::InvalidArgument("ISSUE_OPINION requires an opinion payload".into())
    })?;
    if matches!(opinion.avis, AvisType::Reserve | AvisType::Defavorable)
      && normalize(opinion.observations.clone()).is_none()
    {
      return Err(Error::InvalidArgument(format!(
        "an opinion with avis {} requires observations",
        opinion.avis
      )));
    }
    Ok(Some(opinion))
  }

  fn validate_reassign(
    &self,
    demande: &Demande,
    input: &ActionInput,
  ) -> Result<Option<Role>> {
    if input.action != Action::Reassign {
      return Ok(None);
    }
    let target = input.target_role.ok_or_else(|| {
      Error::InvalidArgument("REASSIGN requires a target role".into())
    })?;
    if !policy::role_can_act(demande.track, demande.status, target) {
      return Err(Error::InvalidArgument(format!(
        "{target} can never act on a demande in status {}",
        demande.status
      )));
    }
    Ok(Some(target))
  }

  /// Fire-and-forget dispatch to the new assignee and, for returns,
  /// rejections, complement requests and signed authorizations, the
  /// applicant. Runs strictly after the commit; delivery is the
  /// dispatcher's responsibility.
  async fn notify(&self, demande: &Demande, audit_entry_id: Option<Uuid>) {
    let mut recipients = Vec::with_capacity(2);
    match assigned_actor(demande.track, demande.status) {
      Some(Role::Demandeur) => recipients.push(Recipient::Applicant {
        owner: demande.owner.clone(),
      }),
      Some(role) => recipients.push(Recipient::Role { role }),
      None => {}
    }
    if demande.status.notifies_applicant()
      && !recipients
        .iter()
        .any(|r| matches!(r, Recipient::Applicant { .. }))
    {
      recipients.push(Recipient::Applicant { owner: demande.owner.clone() });
    }

    for recipient in recipients {
      self
        .dispatcher
        .dispatch(NotificationEvent {
          demande_id: demande.demande_id,
          reference: demande.reference.clone(),
          new_status: demande.status,
          audit_entry_id,
          recipient,
        })
        .await;
    }
  }
}

// ─── Record effects ──────────────────────────────────────────────────────────

/// Field updates that accompany a transition on the record itself.
fn apply_record_effects(
  mut demande: Demande,
  input: &ActionInput,
  decision: &policy::Decision,
  message: &Option<String>,
  opinion: Option<&Opinion>,
  signed_artifact: Option<String>,
  final_status: Status,
) -> Demande {
  let resubmission = matches!(
    demande.status,
    Status::Retournee | Status::PiecesManquantes
  ) && input.role == Role::Demandeur;

  demande.status = final_status;

  match input.action {
    Action::Return => {
      demande.return_reason = message.clone();
      demande.return_target = decision.resume_target;
    }
    Action::RequestComplement => {
      demande.complement_message = message.clone();
      demande.return_target = decision.resume_target;
    }
    Action::Reject => {
      demande.rejection_reason = message.clone();
    }
    Action::IssueOpinion if final_status == Status::Rejetee => {
      demande.rejection_reason =
        opinion.and_then(|o| o.observations.clone());
    }
    Action::Transmit if resubmission => {
      demande.return_target = None;
    }
    Action::Sign => {
      demande.signed_artifact = signed_artifact;
    }
    _ => {}
  }
  demande
}

fn normalize(message: Option<String>) -> Option<String> {
  message
    .map(|m| m.trim().to_owned())
    .filter(|m| !m.is_empty())
}

fn map_store(err: StoreError) -> Error {
  match err {
    StoreError::NotFound(id) => Error::NotFound(id),
    StoreError::Conflict { demande_id, .. } => Error::Conflict(demande_id),
    StoreError::Backend(e) => Error::DependencyFailure(e.to_string()),
  }
}
