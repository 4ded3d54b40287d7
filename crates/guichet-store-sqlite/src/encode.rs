//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Closed vocabularies
//! (status, role, action, type, track) are stored in their
//! SCREAMING_SNAKE_CASE wire form via strum. Structured fields (payload,
//! documents, opinion) are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use guichet_core::{
  action::{Action, Opinion, Role},
  audit::AuditEntry,
  demande::{Demande, DemandeType, DocumentRef},
  status::{Status, Track},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Closed vocabularies ─────────────────────────────────────────────────────

/// Decode any strum-backed vocabulary column.
pub fn decode_word<T>(column: &str, s: &str) -> Result<T>
where
  T: FromStr,
{
  T::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

// ─── Structured JSON columns ─────────────────────────────────────────────────

pub fn encode_documents(docs: &[DocumentRef]) -> Result<String> {
  Ok(serde_json::to_string(docs)?)
}

pub fn decode_documents(s: &str) -> Result<Vec<DocumentRef>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_opinion(opinion: &Opinion) -> Result<String> {
  Ok(serde_json::to_string(opinion)?)
}

pub fn decode_opinion(s: &str) -> Result<Opinion> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `demandes` row.
pub struct RawDemande {
  pub demande_id:         String,
  pub reference:          String,
  pub demande_type:       String,
  pub track:              String,
  pub status:             String,
  pub owner:              String,
  pub payload:            String,
  pub documents:          String,
  pub return_target:      Option<String>,
  pub return_reason:      Option<String>,
  pub rejection_reason:   Option<String>,
  pub complement_message: Option<String>,
  pub signed_artifact:    Option<String>,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawDemande {
  pub fn into_demande(self) -> Result<Demande> {
    Ok(Demande {
      demande_id:   decode_uuid(&self.demande_id)?,
      reference:    self.reference,
      demande_type: decode_word::<DemandeType>("demande type", &self.demande_type)?,
      track:        decode_word::<Track>("track", &self.track)?,
      status:       decode_word::<Status>("status", &self.status)?,
      owner:        self.owner,
      payload:      serde_json::from_str(&self.payload)?,
      documents:    decode_documents(&self.documents)?,
      return_target: self
        .return_target
        .as_deref()
        .map(|s| decode_word::<Status>("return target", s))
        .transpose()?,
      return_reason:      self.return_reason,
      rejection_reason:   self.rejection_reason,
      complement_message: self.complement_message,
      signed_artifact:    self.signed_artifact,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// The encoded column values of a demande, ready for binding.
#[derive(Clone)]
pub struct DemandeRow {
  pub demande_id:         String,
  pub demande_type:       String,
  pub track:              String,
  pub status:             String,
  pub owner:              String,
  pub payload:            String,
  pub documents:          String,
  pub return_target:      Option<String>,
  pub return_reason:      Option<String>,
  pub rejection_reason:   Option<String>,
  pub complement_message: Option<String>,
  pub signed_artifact:    Option<String>,
  pub created_at:         String,
  pub updated_at:         String,
}

pub fn encode_demande(d: &Demande) -> Result<DemandeRow> {
  Ok(DemandeRow {
    demande_id:         encode_uuid(d.demande_id),
    demande_type:       d.demande_type.to_string(),
    track:              d.track.to_string(),
    status:             d.status.to_string(),
    owner:              d.owner.clone(),
    payload:            serde_json::to_string(&d.payload)?,
    documents:          encode_documents(&d.documents)?,
    return_target:      d.return_target.map(|s| s.to_string()),
    return_reason:      d.return_reason.clone(),
    rejection_reason:   d.rejection_reason.clone(),
    complement_message: d.complement_message.clone(),
    signed_artifact:    d.signed_artifact.clone(),
    created_at:         encode_dt(d.created_at),
    updated_at:         encode_dt(d.updated_at),
  })
}

/// Raw strings read directly from an `audit_entries` row.
pub struct RawAuditEntry {
  pub entry_id:        String,
  pub demande_id:      String,
  pub seq:             i64,
  pub action:          String,
  pub actor_role:      String,
  pub actor_id:        String,
  pub previous_status: String,
  pub new_status:      String,
  pub message:         Option<String>,
  pub target_role:     Option<String>,
  pub opinion:         Option<String>,
  pub idempotency_key: Option<String>,
  pub recorded_at:     String,
}

impl RawAuditEntry {
  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      entry_id:   decode_uuid(&self.entry_id)?,
      demande_id: decode_uuid(&self.demande_id)?,
      seq:        self.seq,
      action:     decode_word::<Action>("action", &self.action)?,
      actor_role: decode_word::<Role>("actor role", &self.actor_role)?,
      actor_id:   self.actor_id,
      previous_status: decode_word::<Status>(
        "previous status",
        &self.previous_status,
      )?,
      new_status: decode_word::<Status>("new status", &self.new_status)?,
      message:    self.message,
      target_role: self
        .target_role
        .as_deref()
        .map(|s| decode_word::<Role>("target role", s))
        .transpose()?,
      opinion: self.opinion.as_deref().map(decode_opinion).transpose()?,
      idempotency_key: self.idempotency_key,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}

/// The encoded column values of one audit entry, ready for binding.
/// `seq` is assigned inside the commit transaction.
#[derive(Clone)]
pub struct EntryRow {
  pub entry_id:        String,
  pub demande_id:      String,
  pub action:          String,
  pub actor_role:      String,
  pub actor_id:        String,
  pub previous_status: String,
  pub new_status:      String,
  pub message:         Option<String>,
  pub target_role:     Option<String>,
  pub opinion:         Option<String>,
  pub idempotency_key: Option<String>,
  pub recorded_at:     String,
}

pub fn encode_entry(e: &AuditEntry) -> Result<EntryRow> {
  Ok(EntryRow {
    entry_id:        encode_uuid(e.entry_id),
    demande_id:      encode_uuid(e.demande_id),
    action:          e.action.to_string(),
    actor_role:      e.actor_role.to_string(),
    actor_id:        e.actor_id.clone(),
    previous_status: e.previous_status.to_string(),
    new_status:      e.new_status.to_string(),
    message:         e.message.clone(),
    target_role:     e.target_role.map(|r| r.to_string()),
    opinion:         e.opinion.as_ref().map(encode_opinion).transpose()?,
    idempotency_key: e.idempotency_key.clone(),
    recorded_at:     encode_dt(e.recorded_at),
  })
}
