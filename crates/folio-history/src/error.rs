//! Error types for history operations.
//!
//! [`IntegrityError`]s mean the stored chain contradicts itself. They are never
//! recovered from: guessing would put wrong text in front of the user.
//! Storage errors pass through unchanged and are never retried here.

use folio_diff::DiffError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::{DocumentId, VersionId};

/// The stored chain for a document cannot be trusted.
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The newest record has no snapshot.
    #[error("newest version of {document} has no snapshot")]
    MissingSnapshot { document: DocumentId },

    /// A record that reconstruction must step over has no diff.
    #[error("version {version} (index {index} of {document}) has no diff")]
    MissingDiff {
        document: DocumentId,
        version: VersionId,
        index: usize,
    },

    /// A stored diff payload does not parse.
    #[error("version {version} carries an unreadable diff: {source}")]
    CorruptDiff {
        version: VersionId,
        #[source]
        source: DiffError,
    },

    /// A stored diff does not replay against the text it should apply to.
    #[error("version {version} diff does not replay: {source}")]
    Replay {
        version: VersionId,
        #[source]
        source: DiffError,
    },
}

/// Errors that can occur during history operations.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Stored history is inconsistent.
    #[error("history integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// The document has no history.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The version does not exist (or is not live) in this document's history.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// A chain position past the oldest record.
    #[error("version index {index} out of range (history has {len} versions)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Diff payload could not be produced.
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl HistoryError {
    /// True for errors that mean the history is corrupt rather than missing.
    pub fn is_integrity(&self) -> bool {
        matches!(self, HistoryError::Integrity(_))
    }

    /// True for not-found conditions the UI can report as such.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HistoryError::DocumentNotFound(_)
                | HistoryError::VersionNotFound(_)
                | HistoryError::IndexOutOfRange { .. }
        )
    }
}
