//! [`SqliteStore`] — the SQLite implementation of [`DemandeStore`].

use std::path::Path;

use chrono::{Datelike, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use guichet_core::{
  audit::AuditEntry,
  demande::{Demande, NewDemande},
  status::Status,
  store::{
    DemandeQuery, DemandeStore, StoreResult, TransitionCommit,
  },
};

use crate::{
  Error, Result,
  encode::{
    DemandeRow, EntryRow, RawAuditEntry, RawDemande, encode_demande,
    encode_entry, encode_uuid,
  },
  schema::SCHEMA,
};

const ENTRY_COLUMNS: &str = "entry_id, demande_id, seq, action, actor_role, \
                             actor_id, previous_status, new_status, message, \
                             target_role, opinion, idempotency_key, recorded_at";

const DEMANDE_COLUMNS: &str =
  "demande_id, reference, demande_type, track, status, owner, payload, \
   documents, return_target, return_reason, rejection_reason, \
   complement_message, signed_artifact, created_at, updated_at";

/// Outcome of the conditional update inside the commit transaction.
enum Probe {
  Committed { base_seq: i64 },
  Missing,
  Mismatch,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Guichet demande store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  async fn create_inner(&self, input: NewDemande) -> Result<Demande> {
    let now = Utc::now();
    let mut demande = Demande {
      demande_id:   Uuid::new_v4(),
      reference:    String::new(), // assigned below, inside the transaction
      track:        input.track(),
      demande_type: input.demande_type,
      status:       Status::Deposee,
      owner:        input.owner,
      payload:      input.payload,
      documents:    input.documents,
      return_target: None,
      return_reason: None,
      rejection_reason: None,
      complement_message: None,
      signed_artifact: None,
      created_at: now,
      updated_at: now,
    };

    let row = encode_demande(&demande)?;
    let code = demande.demande_type.code();
    let year = now.year();

    let reference = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<i64> = tx
          .query_row(
            "SELECT next FROM reference_counters WHERE year = ?1",
            rusqlite::params![year],
            |r| r.get(0),
          )
          .optional()?;
        let n = match current {
          Some(n) => {
            tx.execute(
              "UPDATE reference_counters SET next = next + 1 WHERE year = ?1",
              rusqlite::params![year],
            )?;
            n
          }
          None => {
            tx.execute(
              "INSERT INTO reference_counters (year, next) VALUES (?1, 2)",
              rusqlite::params![year],
            )?;
            1
          }
        };
        let reference = format!("{code}-{year}-{n:05}");

        tx.execute(
          &format!(
            "INSERT INTO demandes ({DEMANDE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
          ),
          rusqlite::params![
            row.demande_id,
            reference,
            row.demande_type,
            row.track,
            row.status,
            row.owner,
            row.payload,
            row.documents,
            row.return_target,
            row.return_reason,
            row.rejection_reason,
            row.complement_message,
            row.signed_artifact,
            row.created_at,
            row.updated_at,
          ],
        )?;

        tx.commit()?;
        Ok(reference)
      })
      .await?;

    demande.reference = reference;
    Ok(demande)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_inner(&self, id: Uuid) -> Result<Option<Demande>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDemande> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DEMANDE_COLUMNS} FROM demandes WHERE demande_id = ?1"
              ),
              rusqlite::params![id_str],
              demande_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDemande::into_demande).transpose()
  }

  async fn list_inner(&self, query: &DemandeQuery) -> Result<Vec<Demande>> {
    let status_str = query.status.map(|s| s.to_string());
    let type_str = query.demande_type.map(|t| t.to_string());
    let owner = query.owner.clone();
    let limit_val = query.limit.unwrap_or(100) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawDemande> = self
      .conn
      .call(move |conn| {
        // Fixed parameter positions; SQLite allocates unused lower indexes
        // because ?4/?5 are always referenced.
        let mut conds: Vec<&'static str> = vec![];
        if status_str.is_some() {
          conds.push("status = ?1");
        }
        if type_str.is_some() {
          conds.push("demande_type = ?2");
        }
        if owner.is_some() {
          conds.push("owner = ?3");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {DEMANDE_COLUMNS} FROM demandes
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?4 OFFSET ?5"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              status_str.as_deref(),
              type_str.as_deref(),
              owner.as_deref(),
              limit_val,
              offset_val,
            ],
            demande_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDemande::into_demande).collect()
  }

  // ── Transition commit ─────────────────────────────────────────────────────

  async fn commit_inner(
    &self,
    commit: TransitionCommit,
  ) -> Result<Vec<AuditEntry>> {
    let TransitionCommit { mut demande, expected_status, entries } = commit;
    let demande_id = demande.demande_id;
    let now = Utc::now();
    demande.updated_at = now;

    let mut prepared: Vec<AuditEntry> = entries
      .into_iter()
      .map(|e| AuditEntry {
        entry_id: Uuid::new_v4(),
        demande_id,
        seq: 0, // assigned inside the transaction
        action: e.action,
        actor_role: e.actor_role,
        actor_id: e.actor_id,
        previous_status: e.previous_status,
        new_status: e.new_status,
        message: e.message,
        target_role: e.target_role,
        opinion: e.opinion,
        idempotency_key: e.idempotency_key,
        recorded_at: now,
      })
      .collect();

    let record: DemandeRow = encode_demande(&demande)?;
    let rows: Vec<EntryRow> =
      prepared.iter().map(encode_entry).collect::<Result<_>>()?;
    let expected_str = expected_status.to_string();

    let probe = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The compare-and-set: a concurrent transition that already moved
        // the status makes this a no-op, and the whole commit fails.
        let n = tx.execute(
          "UPDATE demandes
           SET status = ?1, return_target = ?2, return_reason = ?3,
               rejection_reason = ?4, complement_message = ?5,
               signed_artifact = ?6, updated_at = ?7
           WHERE demande_id = ?8 AND status = ?9",
          rusqlite::params![
            record.status,
            record.return_target,
            record.return_reason,
            record.rejection_reason,
            record.complement_message,
            record.signed_artifact,
            record.updated_at,
            record.demande_id,
            expected_str,
          ],
        )?;
        if n == 0 {
          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM demandes WHERE demande_id = ?1",
              rusqlite::params![record.demande_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          return Ok(if exists { Probe::Mismatch } else { Probe::Missing });
        }

        let base_seq: i64 = tx.query_row(
          "SELECT COALESCE(MAX(seq), 0) FROM audit_entries WHERE demande_id = ?1",
          rusqlite::params![record.demande_id],
          |r| r.get(0),
        )?;

        for (i, row) in rows.iter().enumerate() {
          tx.execute(
            &format!(
              "INSERT INTO audit_entries ({ENTRY_COLUMNS})
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            rusqlite::params![
              row.entry_id,
              row.demande_id,
              base_seq + 1 + i as i64,
              row.action,
              row.actor_role,
              row.actor_id,
              row.previous_status,
              row.new_status,
              row.message,
              row.target_role,
              row.opinion,
              row.idempotency_key,
              row.recorded_at,
            ],
          )?;
        }

        tx.commit()?;
        Ok(Probe::Committed { base_seq })
      })
      .await?;

    match probe {
      Probe::Missing => Err(Error::NotFound(demande_id)),
      Probe::Mismatch => {
        Err(Error::Conflict { demande_id, expected: expected_status })
      }
      Probe::Committed { base_seq } => {
        for (i, entry) in prepared.iter_mut().enumerate() {
          entry.seq = base_seq + 1 + i as i64;
        }
        Ok(prepared)
      }
    }
  }

  // ── Audit reads ───────────────────────────────────────────────────────────

  async fn history_inner(&self, id: Uuid) -> Result<Vec<AuditEntry>> {
    let id_str = encode_uuid(id);

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENTRY_COLUMNS} FROM audit_entries
           WHERE demande_id = ?1
           ORDER BY seq ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], entry_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }

  async fn find_entry_by_key_inner(
    &self,
    id: Uuid,
    key: &str,
  ) -> Result<Option<AuditEntry>> {
    let id_str = encode_uuid(id);
    let key = key.to_owned();

    let raw: Option<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ENTRY_COLUMNS} FROM audit_entries
                 WHERE demande_id = ?1 AND idempotency_key = ?2"
              ),
              rusqlite::params![id_str, key],
              entry_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAuditEntry::into_entry).transpose()
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn demande_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDemande> {
  Ok(RawDemande {
    demande_id:         row.get(0)?,
    reference:          row.get(1)?,
    demande_type:       row.get(2)?,
    track:              row.get(3)?,
    status:             row.get(4)?,
    owner:              row.get(5)?,
    payload:            row.get(6)?,
    documents:          row.get(7)?,
    return_target:      row.get(8)?,
    return_reason:      row.get(9)?,
    rejection_reason:   row.get(10)?,
    complement_message: row.get(11)?,
    signed_artifact:    row.get(12)?,
    created_at:         row.get(13)?,
    updated_at:         row.get(14)?,
  })
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAuditEntry> {
  Ok(RawAuditEntry {
    entry_id:        row.get(0)?,
    demande_id:      row.get(1)?,
    seq:             row.get(2)?,
    action:          row.get(3)?,
    actor_role:      row.get(4)?,
    actor_id:        row.get(5)?,
    previous_status: row.get(6)?,
    new_status:      row.get(7)?,
    message:         row.get(8)?,
    target_role:     row.get(9)?,
    opinion:         row.get(10)?,
    idempotency_key: row.get(11)?,
    recorded_at:     row.get(12)?,
  })
}

// ─── DemandeStore impl ───────────────────────────────────────────────────────

impl DemandeStore for SqliteStore {
  async fn create(&self, input: NewDemande) -> StoreResult<Demande> {
    self.create_inner(input).await.map_err(Into::into)
  }

  async fn get(&self, id: Uuid) -> StoreResult<Option<Demande>> {
    self.get_inner(id).await.map_err(Into::into)
  }

  async fn list(&self, query: &DemandeQuery) -> StoreResult<Vec<Demande>> {
    self.list_inner(query).await.map_err(Into::into)
  }

  async fn commit_transition(
    &self,
    commit: TransitionCommit,
  ) -> StoreResult<Vec<AuditEntry>> {
    self.commit_inner(commit).await.map_err(Into::into)
  }

  async fn history(&self, id: Uuid) -> StoreResult<Vec<AuditEntry>> {
    self.history_inner(id).await.map_err(Into::into)
  }

  async fn find_entry_by_key(
    &self,
    id: Uuid,
    key: &str,
  ) -> StoreResult<Option<AuditEntry>> {
    self.find_entry_by_key_inner(id, key).await.map_err(Into::into)
  }
}
