//! Handler for `POST /demandes/:id/actions` — the workflow operation.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use guichet_core::{
  action::{ActionInput, Role},
  notify::NotificationDispatcher,
  sign::SignatureCompletion,
  status::Status,
  store::DemandeStore,
};
use guichet_engine::WorkflowEngine;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct ActionResponse {
  pub audit_entry_id: Uuid,
  pub new_status:     Status,
  /// The role now responsible, for the caller's next affordances.
  pub assigned: Option<Role>,
  /// True when an idempotency key matched a previous identical call.
  pub replayed: bool,
}

/// `POST /demandes/:id/actions` — body is an [`ActionInput`].
///
/// Returns the id of the audit entry recording the action and the status the
/// demande now rests on. All five workflow error kinds surface as their HTTP
/// statuses; a 409 means the caller should reload and retry.
pub async fn apply<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActionInput>,
) -> Result<Json<ActionResponse>, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  let outcome = engine.apply_action(id, body).await?;
  Ok(Json(ActionResponse {
    audit_entry_id: outcome.entry.entry_id,
    new_status:     outcome.new_status,
    assigned:       outcome.assigned,
    replayed:       outcome.replayed,
  }))
}
