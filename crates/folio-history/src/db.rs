//! SQLite persistence for version chains and cursors.
//!
//! One database holds both tables: `versions` (append-only chain, ordered by
//! `seq`) and `kv` (flat string table used for durable cursors). Chain-level
//! operations that touch more than one row run inside a transaction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_diff::Diff;
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::store::{CursorStore, VersionStore};
use crate::{DocumentId, HistoryError, NewVersion, Result, VersionId, VersionRecord, now_millis};

/// Thread-safe connection handle.
type ConnHandle = Arc<Mutex<Connection>>;

/// Database handle for history persistence. Clones share one connection.
#[derive(Clone)]
pub struct HistoryDb {
    conn: ConnHandle,
}

const SCHEMA: &str = r#"
-- Version chain (append-only; seq is creation order)
CREATE TABLE IF NOT EXISTS versions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    document_id TEXT NOT NULL,
    diff_from_prev TEXT,
    snapshot TEXT,
    created_at INTEGER NOT NULL,
    last_touched_at INTEGER NOT NULL,
    deleted_at INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_versions_document ON versions(document_id, deleted_at, seq);

-- Flat key/value (durable cursors)
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const VERSION_COLUMNS: &str =
    "seq, id, document_id, diff_from_prev, snapshot, created_at, last_touched_at, deleted_at";

impl HistoryDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Default on-disk location: `<data dir>/folio/history.db`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("folio")
            .join("history.db")
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

// =============================================================================
// Row helpers
// =============================================================================

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    let id: String = row.get(1)?;
    let id = VersionId::parse(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let document_id: String = row.get(2)?;
    Ok(VersionRecord {
        seq: row.get::<_, i64>(0)? as u64,
        id,
        document_id: DocumentId::from(document_id),
        diff_from_prev: row.get(3)?,
        snapshot: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        last_touched_at: row.get::<_, i64>(6)? as u64,
        deleted_at: row.get::<_, i64>(7)? as u64,
    })
}

fn insert_version(conn: &Connection, version: NewVersion) -> rusqlite::Result<VersionRecord> {
    conn.execute(
        "INSERT INTO versions (id, document_id, diff_from_prev, snapshot, created_at, last_touched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            version.id.to_string(),
            version.document_id.as_str(),
            version.diff_from_prev,
            version.snapshot,
            version.created_at as i64,
        ],
    )?;
    let seq = conn.last_insert_rowid() as u64;
    Ok(version.into_record(seq))
}

fn newest_version(conn: &Connection, document: &DocumentId) -> rusqlite::Result<Option<VersionRecord>> {
    conn.query_row(
        &format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE document_id = ?1 AND deleted_at = 0 ORDER BY seq DESC LIMIT 1"
        ),
        params![document.as_str()],
        row_to_version,
    )
    .optional()
}

fn update_snapshot(conn: &Connection, id: VersionId, snapshot: Option<&str>) -> Result<()> {
    let changed = conn.execute(
        "UPDATE versions SET snapshot = ?1, last_touched_at = ?2 WHERE id = ?3 AND deleted_at = 0",
        params![snapshot, now_millis() as i64, id.to_string()],
    )?;
    if changed == 0 {
        return Err(HistoryError::VersionNotFound(id));
    }
    Ok(())
}

/// Insert a newest record and clear the previous newest's snapshot.
fn push_version(
    conn: &Connection,
    document: &DocumentId,
    payload: Option<String>,
    snapshot: &str,
) -> Result<VersionRecord> {
    let previous = newest_version(conn, document)?;
    let record = insert_version(conn, NewVersion::new(document.clone(), payload, snapshot))?;
    if let Some(prev) = previous.filter(VersionRecord::has_snapshot) {
        update_snapshot(conn, prev.id, None)?;
    }
    Ok(record)
}

/// Give `anchor` its snapshot and delete every newer record of the document.
fn truncate_versions(
    conn: &Connection,
    document: &DocumentId,
    anchor: VersionId,
    snapshot: &str,
) -> Result<usize> {
    let anchor_seq: Option<i64> = conn
        .query_row(
            "SELECT seq FROM versions WHERE id = ?1 AND document_id = ?2 AND deleted_at = 0",
            params![anchor.to_string(), document.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let anchor_seq = anchor_seq.ok_or(HistoryError::VersionNotFound(anchor))?;

    update_snapshot(conn, anchor, Some(snapshot))?;
    Ok(conn.execute(
        "DELETE FROM versions WHERE document_id = ?1 AND seq > ?2 AND deleted_at = 0",
        params![document.as_str(), anchor_seq],
    )?)
}

// =============================================================================
// VersionStore
// =============================================================================

impl VersionStore for HistoryDb {
    fn insert(&self, version: NewVersion) -> Result<VersionRecord> {
        let conn = self.conn.lock();
        Ok(insert_version(&conn, version)?)
    }

    fn set_snapshot(&self, id: VersionId, snapshot: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        update_snapshot(&conn, id, snapshot)
    }

    fn list_versions(&self, document: &DocumentId) -> Result<Vec<VersionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE document_id = ?1 AND deleted_at = 0 ORDER BY seq DESC"
        ))?;
        let rows = stmt.query_map(params![document.as_str()], row_to_version)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete(&self, id: VersionId) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM versions WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    fn delete_all(&self, document: &DocumentId) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE versions SET deleted_at = ?1 WHERE document_id = ?2 AND deleted_at = 0",
            params![now_millis().max(1) as i64, document.as_str()],
        )?;
        Ok(changed)
    }

    fn purge_deleted(&self) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute("DELETE FROM versions WHERE deleted_at != 0", [])?)
    }

    fn newest(&self, document: &DocumentId) -> Result<Option<VersionRecord>> {
        let conn = self.conn.lock();
        Ok(newest_version(&conn, document)?)
    }

    fn version_count(&self, document: &DocumentId) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM versions WHERE document_id = ?1 AND deleted_at = 0",
            params![document.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn push(
        &self,
        document: &DocumentId,
        diff_from_prev: Option<&Diff>,
        snapshot: &str,
    ) -> Result<VersionRecord> {
        let payload = diff_from_prev.map(Diff::encode).transpose()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let record = push_version(&tx, document, payload, snapshot)?;
        tx.commit()?;

        debug!(document = %document, version = %record.id, seq = record.seq, "pushed version");
        Ok(record)
    }

    fn truncate_after(
        &self,
        document: &DocumentId,
        anchor: VersionId,
        snapshot: &str,
    ) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = truncate_versions(&tx, document, anchor, snapshot)?;
        tx.commit()?;
        Ok(removed)
    }

    fn prune_and_push(
        &self,
        document: &DocumentId,
        anchor: VersionId,
        anchor_text: &str,
        diff_from_prev: &Diff,
        snapshot: &str,
    ) -> Result<(usize, VersionRecord)> {
        let payload = diff_from_prev.encode()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let pruned = truncate_versions(&tx, document, anchor, anchor_text)?;
        let record = push_version(&tx, document, Some(payload), snapshot)?;
        tx.commit()?;

        debug!(document = %document, version = %record.id, pruned, "pruned and pushed version");
        Ok((pruned, record))
    }
}

// =============================================================================
// CursorStore
// =============================================================================

impl CursorStore for HistoryDb {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
