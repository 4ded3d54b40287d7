//! The workflow error taxonomy.
//!
//! All five kinds are recovered at the engine boundary and returned as
//! structured results; none of them follows a partial mutation.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  action::{Action, Role},
  status::Status,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("demande not found: {0}")]
  NotFound(Uuid),

  /// The `(role, status, action)` combination is not in the authorized set.
  #[error("{role} may not {action} a demande in status {status}")]
  Forbidden {
    role:   Role,
    status: Status,
    action: Action,
  },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// Lost the optimistic-concurrency race, or the caller's expected status
  /// is stale. Reload and retry.
  #[error("demande {0} was modified concurrently")]
  Conflict(Uuid),

  /// The signature collaborator or the backing store is unavailable. The
  /// demande keeps its pre-action status so a retry is always possible.
  #[error("dependency failure: {0}")]
  DependencyFailure(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
