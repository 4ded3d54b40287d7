//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use uuid::Uuid;

use guichet_core::{
  action::{Action, AvisType, Opinion, Role},
  audit::NewAuditEntry,
  demande::{Demande, DemandeType, DocumentRef, NewDemande},
  status::Status,
  store::{DemandeQuery, DemandeStore, StoreError, TransitionCommit},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn usine(owner: &str) -> NewDemande {
  let mut input = NewDemande::new(DemandeType::Usine, owner);
  input.payload = serde_json::json!({ "raison_sociale": "SARL Atar Agro" });
  input.documents = vec![DocumentRef {
    name:        "statuts.pdf".into(),
    storage_key: "docs/statuts-1".into(),
  }];
  input
}

fn validation(demande: &Demande) -> TransitionCommit {
  let mut updated = demande.clone();
  updated.status = Status::ValideeChef;
  TransitionCommit {
    expected_status: demande.status,
    entries: vec![NewAuditEntry::new(
      Action::Validate,
      Role::ChefService,
      "chef-1",
      demande.status,
      Status::ValideeChef,
    )],
    demande: updated,
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_roundtrip() {
  let s = store().await;
  let created = s.create(usine("owner-1")).await.unwrap();

  assert_eq!(created.status, Status::Deposee);
  assert_eq!(created.owner, "owner-1");

  let fetched = s.get(created.demande_id).await.unwrap().unwrap();
  assert_eq!(fetched.demande_id, created.demande_id);
  assert_eq!(fetched.reference, created.reference);
  assert_eq!(fetched.demande_type, DemandeType::Usine);
  assert_eq!(fetched.payload["raison_sociale"], "SARL Atar Agro");
  assert_eq!(fetched.documents.len(), 1);
  assert_eq!(fetched.documents[0].name, "statuts.pdf");
}

#[tokio::test]
async fn references_are_sequential_and_unique() {
  let s = store().await;
  let a = s.create(usine("owner-1")).await.unwrap();
  let b = s.create(usine("owner-1")).await.unwrap();
  let c = s
    .create(NewDemande::new(DemandeType::Boulangerie, "owner-2"))
    .await
    .unwrap();

  assert!(a.reference.starts_with("USN-"));
  assert!(c.reference.starts_with("BLG-"));
  assert_ne!(a.reference, b.reference);

  // The counter is shared across types within a year.
  let seq = |r: &str| r.rsplit('-').next().unwrap().to_owned();
  assert_ne!(seq(&a.reference), seq(&b.reference));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_status_type_and_owner() {
  let s = store().await;
  let a = s.create(usine("owner-1")).await.unwrap();
  s.create(usine("owner-2")).await.unwrap();
  s.create(NewDemande::new(DemandeType::Pmne, "owner-1"))
    .await
    .unwrap();

  s.commit_transition(validation(&a)).await.unwrap();

  let all = s.list(&DemandeQuery::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let validated = s
    .list(&DemandeQuery {
      status: Some(Status::ValideeChef),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(validated.len(), 1);
  assert_eq!(validated[0].demande_id, a.demande_id);

  let owned = s
    .list(&DemandeQuery {
      owner: Some("owner-1".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(owned.len(), 2);

  let pmne = s
    .list(&DemandeQuery {
      demande_type: Some(DemandeType::Pmne),
      owner: Some("owner-1".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pmne.len(), 1);

  let limited = s
    .list(&DemandeQuery { limit: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 2);
}

// ─── Transition commits ──────────────────────────────────────────────────────

#[tokio::test]
async fn commit_updates_record_and_appends_entry() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();

  let entries = s.commit_transition(validation(&demande)).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].seq, 1);
  assert_eq!(entries[0].previous_status, Status::Deposee);
  assert_eq!(entries[0].new_status, Status::ValideeChef);

  let stored = s.get(demande.demande_id).await.unwrap().unwrap();
  assert_eq!(stored.status, Status::ValideeChef);
  assert!(stored.updated_at >= demande.updated_at);
}

#[tokio::test]
async fn commit_with_stale_expected_status_conflicts() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();
  s.commit_transition(validation(&demande)).await.unwrap();

  // Same precondition again: the status has moved on.
  let err = s.commit_transition(validation(&demande)).await.unwrap_err();
  assert!(
    matches!(err, StoreError::Conflict { demande_id, expected: Status::Deposee }
      if demande_id == demande.demande_id),
    "{err}"
  );

  // Nothing was appended by the losing commit.
  assert_eq!(s.history(demande.demande_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn commit_on_unknown_demande_is_not_found() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();

  let mut ghost = validation(&demande);
  let ghost_id = Uuid::new_v4();
  ghost.demande.demande_id = ghost_id;
  let err = s.commit_transition(ghost).await.unwrap_err();
  assert!(matches!(err, StoreError::NotFound(id) if id == ghost_id), "{err}");
}

#[tokio::test]
async fn multi_entry_commit_assigns_consecutive_seqs() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();
  s.commit_transition(validation(&demande)).await.unwrap();

  // An opinion-style commit: waypoint plus follow-on hop in one unit.
  let mut updated = s.get(demande.demande_id).await.unwrap().unwrap();
  let held = updated.status;
  updated.status = Status::Retournee;
  updated.return_target = Some(Status::Receptionnee);
  let commit = TransitionCommit {
    expected_status: held,
    entries: vec![
      NewAuditEntry::new(
        Action::Return,
        Role::Ddpi,
        "ddpi-1",
        held,
        Status::Retournee,
      ),
      NewAuditEntry::new(
        Action::Comment,
        Role::Ddpi,
        "ddpi-1",
        Status::Retournee,
        Status::Retournee,
      ),
    ],
    demande: updated,
  };

  let entries = s.commit_transition(commit).await.unwrap();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].seq, 2);
  assert_eq!(entries[1].seq, 3);

  let stored = s.get(demande.demande_id).await.unwrap().unwrap();
  assert_eq!(stored.status, Status::Retournee);
  assert_eq!(stored.return_target, Some(Status::Receptionnee));
}

// ─── Audit reads ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_ordered_by_seq() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();
  s.commit_transition(validation(&demande)).await.unwrap();

  let mut updated = s.get(demande.demande_id).await.unwrap().unwrap();
  updated.status = Status::ValideeDdpi;
  s.commit_transition(TransitionCommit {
    expected_status: Status::ValideeChef,
    entries: vec![NewAuditEntry::new(
      Action::Validate,
      Role::Ddpi,
      "ddpi-1",
      Status::ValideeChef,
      Status::ValideeDdpi,
    )],
    demande: updated,
  })
  .await
  .unwrap();

  let history = s.history(demande.demande_id).await.unwrap();
  let seqs: Vec<i64> = history.iter().map(|e| e.seq).collect();
  assert_eq!(seqs, [1, 2]);
  assert_eq!(history[1].actor_role, Role::Ddpi);
}

#[tokio::test]
async fn opinion_payload_roundtrips() {
  let s = store().await;
  let demande = s
    .create(NewDemande::new(DemandeType::EauxMinerale, "owner-3"))
    .await
    .unwrap();

  let opinion = Opinion {
    avis:         AvisType::Reserve,
    observations: Some("analyse bactériologique à refaire".into()),
    technical_criteria: BTreeMap::from([
      ("captage".to_owned(), true),
      ("laboratoire".to_owned(), false),
    ]),
  };

  let mut updated = demande.clone();
  updated.status = Status::ValideeChef;
  let mut entry = NewAuditEntry::new(
    Action::IssueOpinion,
    Role::Commission,
    "commission-1",
    Status::Deposee,
    Status::ValideeChef,
  );
  entry.opinion = Some(opinion.clone());
  s.commit_transition(TransitionCommit {
    expected_status: Status::Deposee,
    entries: vec![entry],
    demande: updated,
  })
  .await
  .unwrap();

  let history = s.history(demande.demande_id).await.unwrap();
  assert_eq!(history[0].opinion, Some(opinion));
}

#[tokio::test]
async fn find_entry_by_idempotency_key() {
  let s = store().await;
  let demande = s.create(usine("owner-1")).await.unwrap();

  let mut commit = validation(&demande);
  commit.entries[0].idempotency_key = Some("key-42".into());
  let entries = s.commit_transition(commit).await.unwrap();

  let found = s
    .find_entry_by_key(demande.demande_id, "key-42")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.entry_id, entries[0].entry_id);

  assert!(
    s.find_entry_by_key(demande.demande_id, "other")
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.find_entry_by_key(Uuid::new_v4(), "key-42")
      .await
      .unwrap()
      .is_none()
  );
}
