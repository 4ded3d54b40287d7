//! The `DemandeStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `guichet-store-sqlite`).
//! The engine and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  audit::{AuditEntry, NewAuditEntry},
  demande::{Demande, DemandeType, NewDemande},
  status::Status,
};

// ─── Store error ─────────────────────────────────────────────────────────────

/// Error surface of a store backend. Defined here so the engine can map
/// conflicts and missing records without knowing the backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("demande not found: {0}")]
  NotFound(Uuid),

  /// The conditional commit found a status other than the one read; the
  /// caller lost the race and must retry from a fresh read.
  #[error("demande {demande_id} no longer in status {expected}")]
  Conflict { demande_id: Uuid, expected: Status },

  #[error("storage backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`DemandeStore::list`].
#[derive(Debug, Clone, Default)]
pub struct DemandeQuery {
  pub status:       Option<Status>,
  pub demande_type: Option<DemandeType>,
  pub owner:        Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

// ─── Transition commit ───────────────────────────────────────────────────────

/// The single atomic write of the workflow: persist the updated record and
/// append its audit entries, conditioned on the status read beforehand.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
  /// The fully-updated record to persist.
  pub demande: Demande,
  /// Compare-and-set precondition: the commit succeeds only if the stored
  /// status still equals this value.
  pub expected_status: Status,
  /// One entry per status hop (plus annotations); appended in order.
  pub entries: Vec<NewAuditEntry>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a demande store backend.
///
/// Writes after creation go exclusively through [`commit_transition`], whose
/// conditional update linearizes transitions per demande. The audit table is
/// append-only; entries are never updated or deleted.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
///
/// [`commit_transition`]: DemandeStore::commit_transition
pub trait DemandeStore: Send + Sync {
  /// Create and persist a new demande in the initial status of its track,
  /// assigning id, unique reference and timestamps.
  fn create(
    &self,
    input: NewDemande,
  ) -> impl Future<Output = StoreResult<Demande>> + Send + '_;

  /// Retrieve a demande by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = StoreResult<Option<Demande>>> + Send + '_;

  /// List demandes matching `query`, newest first.
  fn list<'a>(
    &'a self,
    query: &'a DemandeQuery,
  ) -> impl Future<Output = StoreResult<Vec<Demande>>> + Send + 'a;

  /// Apply one transition atomically: update the record (conditioned on
  /// `expected_status`) and append the audit entries, assigning per-demande
  /// sequence numbers. Either all of it commits or none of it does.
  fn commit_transition(
    &self,
    commit: TransitionCommit,
  ) -> impl Future<Output = StoreResult<Vec<AuditEntry>>> + Send + '_;

  /// Ordered audit history of a demande (by sequence number).
  fn history(
    &self,
    id: Uuid,
  ) -> impl Future<Output = StoreResult<Vec<AuditEntry>>> + Send + '_;

  /// Find the entry previously recorded for an idempotency key, if any.
  fn find_entry_by_key<'a>(
    &'a self,
    id: Uuid,
    key: &'a str,
  ) -> impl Future<Output = StoreResult<Option<AuditEntry>>> + Send + 'a;
}
