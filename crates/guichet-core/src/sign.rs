//! Signature-completion collaborator interface.
//!
//! Invoked only during the SIGN action, before the commit: a failure here
//! aborts the transition entirely (no status change, no audit entry) so the
//! demande remains signable.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

/// What the signer receives when the minister signs.
#[derive(Debug, Clone)]
pub struct SignatureRequest {
  pub demande_id: Uuid,
  pub reference:  String,
  /// Identifier of the signing actor.
  pub signatory: String,
}

#[derive(Debug, Error)]
pub enum SignatureError {
  #[error("signature service unavailable: {0}")]
  Unavailable(String),
}

/// Collaborator that finalizes the authorization document.
pub trait SignatureCompletion: Send + Sync {
  /// Produce the reference of the finalized, signed artifact.
  fn finalize(
    &self,
    request: SignatureRequest,
  ) -> impl Future<Output = Result<String, SignatureError>> + Send + '_;
}
