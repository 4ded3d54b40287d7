//! [`DigestSigner`] — local signature completion.
//!
//! Artifact references are SHA-256 digests over the demande identity and the
//! signing actor. Deterministic: retrying a signature for the same demande
//! and signatory yields the same reference.

use sha2::{Digest, Sha256};

use guichet_core::sign::{SignatureCompletion, SignatureError, SignatureRequest};

pub struct DigestSigner;

impl SignatureCompletion for DigestSigner {
  async fn finalize(
    &self,
    request: SignatureRequest,
  ) -> Result<String, SignatureError> {
    let mut hasher = Sha256::new();
    hasher.update(request.demande_id.as_bytes());
    hasher.update(request.reference.as_bytes());
    hasher.update(request.signatory.as_bytes());
    let hash = hasher.finalize();
    Ok(format!("AUT-{}", hex::encode(&hash[..16])))
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn request(id: Uuid) -> SignatureRequest {
    SignatureRequest {
      demande_id: id,
      reference:  "USN-2025-00001".into(),
      signatory:  "ministre-1".into(),
    }
  }

  #[tokio::test]
  async fn same_request_yields_same_artifact() {
    let id = Uuid::new_v4();
    let a = DigestSigner.finalize(request(id)).await.unwrap();
    let b = DigestSigner.finalize(request(id)).await.unwrap();
    assert_eq!(a, b);
    assert!(a.starts_with("AUT-"), "{a}");
  }

  #[tokio::test]
  async fn different_demandes_yield_different_artifacts() {
    let a = DigestSigner.finalize(request(Uuid::new_v4())).await.unwrap();
    let b = DigestSigner.finalize(request(Uuid::new_v4())).await.unwrap();
    assert_ne!(a, b);
  }
}
