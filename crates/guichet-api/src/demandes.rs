//! Handlers for `/demandes` read and creation endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/demandes` | Body: [`guichet_core::demande::NewDemande`] |
//! | `GET`  | `/demandes` | Optional `status`, `demande_type`, `owner`, `limit`, `offset` |
//! | `GET`  | `/demandes/:id` | 404 if not found |
//! | `GET`  | `/demandes/:id/assigned-actor` | Pure derived read |
//! | `GET`  | `/demandes/:id/history` | Ordered audit entries |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guichet_core::{
  action::Role,
  audit::AuditEntry,
  demande::{Demande, DemandeType, NewDemande},
  notify::NotificationDispatcher,
  sign::SignatureCompletion,
  status::Status,
  store::{DemandeQuery, DemandeStore},
};
use guichet_engine::WorkflowEngine;

use crate::error::ApiError;

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /demandes` — file a new demande, 201 + the stored record.
pub async fn create<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Json(body): Json<NewDemande>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  let demande = engine.create(body).await?;
  Ok((StatusCode::CREATED, Json(demande)))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status:       Option<Status>,
  pub demande_type: Option<DemandeType>,
  pub owner:        Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// `GET /demandes[?status=...][&demande_type=...][&owner=...]`
pub async fn list<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Demande>>, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  let query = DemandeQuery {
    status:       params.status,
    demande_type: params.demande_type,
    owner:        params.owner,
    limit:        params.limit,
    offset:       params.offset,
  };
  Ok(Json(engine.list(&query).await?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /demandes/:id`
pub async fn get_one<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Demande>, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  Ok(Json(engine.get(id).await?))
}

// ─── Assigned actor ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AssignedActorResponse {
  /// `null` once the demande is terminal.
  pub role: Option<Role>,
}

/// `GET /demandes/:id/assigned-actor` — the role whose actions are currently
/// legal. The UI derives its affordances from this, never from status
/// matching of its own.
pub async fn assigned_actor<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AssignedActorResponse>, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  let role = engine.assigned_actor(id).await?;
  Ok(Json(AssignedActorResponse { role }))
}

// ─── History ─────────────────────────────────────────────────────────────────

/// `GET /demandes/:id/history`
pub async fn history<S, N, G>(
  State(engine): State<Arc<WorkflowEngine<S, N, G>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, ApiError>
where
  S: DemandeStore,
  N: NotificationDispatcher,
  G: SignatureCompletion,
{
  Ok(Json(engine.history(id).await?))
}
