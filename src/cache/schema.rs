//! Shadow cache schema (§4.2): documents, tags, links, and the workflow
//! persistence tables live in the same SQLite file so a single transaction
//! can span a document ingest and any workflow bookkeeping it triggers.

use rusqlite::Connection;

use super::error::CacheError;

/// Bumped whenever the DDL below changes incompatibly. Stored in SQLite's
/// own `user_version` pragma so opening an older cache file fails loudly
/// (§7: "SchemaIncompatible") instead of silently misbehaving.
pub const SCHEMA_VERSION: i64 = 2;

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    path            TEXT PRIMARY KEY,
    title           TEXT,
    document_type   TEXT,
    status          TEXT,
    priority        TEXT,
    frontmatter     TEXT NOT NULL,
    content_hash    TEXT NOT NULL,
    size            INTEGER NOT NULL,
    created_at      INTEGER NOT NULL,
    modified_at     INTEGER NOT NULL,
    ingested_at     INTEGER NOT NULL,
    stale           INTEGER NOT NULL DEFAULT 0,
    parse_error     TEXT,
    headings        TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS tags (
    document_path   TEXT NOT NULL REFERENCES documents(path) ON DELETE CASCADE,
    tag             TEXT NOT NULL,
    PRIMARY KEY (document_path, tag)
);
CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);

CREATE TABLE IF NOT EXISTS links (
    source_path     TEXT NOT NULL REFERENCES documents(path) ON DELETE CASCADE,
    target_path     TEXT NOT NULL,
    link_kind       TEXT NOT NULL,
    display_text    TEXT
);
CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_path);
CREATE INDEX IF NOT EXISTS idx_links_target ON links(target_path);

CREATE TABLE IF NOT EXISTS workflow_runs (
    run_id          TEXT PRIMARY KEY,
    workflow_id     TEXT NOT NULL,
    workflow_version INTEGER NOT NULL,
    input_payload   TEXT NOT NULL DEFAULT '{}',
    status          TEXT NOT NULL,
    trigger_path    TEXT,
    started_at      INTEGER NOT NULL,
    finished_at     INTEGER,
    return_value    TEXT,
    error           TEXT
);
CREATE INDEX IF NOT EXISTS idx_workflow_runs_status ON workflow_runs(status);

CREATE TABLE IF NOT EXISTS workflow_steps (
    run_id          TEXT NOT NULL REFERENCES workflow_runs(run_id) ON DELETE CASCADE,
    step_name       TEXT NOT NULL,
    attempt         INTEGER NOT NULL,
    completed_at    INTEGER NOT NULL,
    result          TEXT NOT NULL,
    PRIMARY KEY (run_id, step_name)
);
"#;

/// Open (creating if absent) and migrate the cache database at `path`.
pub fn open_and_migrate(path: &std::path::Path) -> Result<Connection, CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CacheError::StorageUnavailable(e.to_string()))?;
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    migrate(&conn)?;
    Ok(conn)
}

/// Apply the DDL to an already-open connection, stamping `user_version`.
/// Shared by `open_and_migrate` and the in-memory store used in tests.
pub fn migrate(conn: &Connection) -> Result<(), CacheError> {
    conn.pragma_update(None, "foreign_keys", true)?;
    let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found == 0 {
        conn.execute_batch(DDL)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if found != SCHEMA_VERSION {
        return Err(CacheError::SchemaIncompatible { found, expected: SCHEMA_VERSION });
    }
    Ok(())
}
