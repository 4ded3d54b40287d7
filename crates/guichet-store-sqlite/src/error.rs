//! Error type for `guichet-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

use guichet_core::{status::Status, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("cannot decode stored value: {0}")]
  Decode(String),

  #[error("demande not found: {0}")]
  NotFound(Uuid),

  /// The conditional update matched no row: a concurrent transition won.
  #[error("demande {demande_id} no longer in status {expected}")]
  Conflict { demande_id: Uuid, expected: Status },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for StoreError {
  fn from(err: Error) -> Self {
    match err {
      Error::NotFound(id) => StoreError::NotFound(id),
      Error::Conflict { demande_id, expected } => {
        StoreError::Conflict { demande_id, expected }
      }
      other => StoreError::Backend(Box::new(other)),
    }
  }
}
