//! # folio-history
//!
//! Per-document version history for folio documents.
//!
//! Every committed edit appends a [`VersionRecord`] carrying the line diff from
//! the previous version. Only the newest record of a document holds a full
//! snapshot of the text; any older version is rebuilt by starting from that
//! snapshot and replaying inverted diffs backward.
//!
//! ```text
//!  index   record                       stored
//!  ─────   ──────────────────────────   ─────────────────────────────
//!    0     "A\nB\nC"   (newest)         snapshot + diff(t1 → t2)
//!    1     "A\nB"                       diff(t0 → t1)
//!    2     "A"         (oldest)         no diff
//! ```
//!
//! # Components
//!
//! |------------------------------|-----------------------------------------------|
//! | Type                         | Purpose                                       |
//! |------------------------------|-----------------------------------------------|
//! | [`VersionStore`]             | Append-only chain, snapshot-at-top            |
//! | [`CursorStore`]              | Flat key/value table for durable cursors      |
//! | [`VersionReconstructor`]     | Rebuild text at any chain position            |
//! | [`HistoryController`]        | Undo/redo/jump state per open document        |
//! | [`HistoryDb`]                | SQLite backend for both stores                |
//! | [`MemoryVersionStore`]       | In-memory chain (tests, ephemeral documents)  |
//! |------------------------------|-----------------------------------------------|
//!
//! # Concurrency
//!
//! One writer per document. The push sequence (insert the new record, then
//! clear the previous snapshot) spans two records; hosts with more than one
//! writer must serialize `record_edit`/`undo`/`redo` per document, e.g. via
//! [`SharedHistory`].

pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod ids;
pub mod memory;
pub mod reconstruct;
pub mod record;
pub mod retention;
pub mod store;

pub use config::{BranchPolicy, ConfigError, HistoryConfig};
pub use controller::{
    HistoryController, HistoryCursor, HistoryStatus, SharedHistory, VersionSummary,
    shared_history,
};
pub use db::HistoryDb;
pub use error::{HistoryError, IntegrityError};
pub use ids::{DocumentId, VersionId};
pub use memory::{MemoryCursorStore, MemoryVersionStore};
pub use reconstruct::{VersionReconstructor, reconstruct_from};
pub use record::{NewVersion, VersionRecord};
pub use retention::RetentionPolicy;
pub use store::{CursorStore, VersionStore};

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
