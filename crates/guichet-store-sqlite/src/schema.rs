//! SQL schema for the Guichet SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS demandes (
    demande_id         TEXT PRIMARY KEY,
    reference          TEXT NOT NULL UNIQUE,
    demande_type       TEXT NOT NULL,   -- 'USINE' | 'BOULANGERIE' | ...
    track              TEXT NOT NULL,   -- fixed at creation
    status             TEXT NOT NULL,   -- mutated only via the conditional update
    owner              TEXT NOT NULL,
    payload            TEXT NOT NULL DEFAULT 'null',  -- opaque JSON form data
    documents          TEXT NOT NULL DEFAULT '[]',    -- JSON array of refs
    return_target      TEXT,            -- recorded at RETURN time, never inferred
    return_reason      TEXT,
    rejection_reason   TEXT,
    complement_message TEXT,
    signed_artifact    TEXT,
    created_at         TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    updated_at         TEXT NOT NULL
);

-- The audit ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_entries (
    entry_id        TEXT PRIMARY KEY,
    demande_id      TEXT NOT NULL REFERENCES demandes(demande_id),
    seq             INTEGER NOT NULL,   -- per-demande, assigned in the commit tx
    action          TEXT NOT NULL,
    actor_role      TEXT NOT NULL,
    actor_id        TEXT NOT NULL,
    previous_status TEXT NOT NULL,
    new_status      TEXT NOT NULL,
    message         TEXT,
    target_role     TEXT,
    opinion         TEXT,               -- JSON Opinion or NULL
    idempotency_key TEXT,
    recorded_at     TEXT NOT NULL,
    UNIQUE (demande_id, seq),
    UNIQUE (demande_id, idempotency_key)
);

-- Per-year sequence for human-readable references.
CREATE TABLE IF NOT EXISTS reference_counters (
    year INTEGER PRIMARY KEY,
    next INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS demandes_status_idx   ON demandes(status);
CREATE INDEX IF NOT EXISTS demandes_owner_idx    ON demandes(owner);
CREATE INDEX IF NOT EXISTS audit_demande_idx     ON audit_entries(demande_id);

PRAGMA user_version = 1;
";
