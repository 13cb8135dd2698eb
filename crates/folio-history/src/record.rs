//! Version records.

use folio_diff::{Diff, DiffError};

use crate::{DocumentId, VersionId, now_millis};

/// One saved edit in a document's history.
///
/// Immutable once written, except that `snapshot` is cleared when the record
/// stops being the newest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub id: VersionId,
    pub document_id: DocumentId,
    /// Creation order, assigned by the store. Reconstruction orders by this,
    /// never by timestamps.
    pub seq: u64,
    /// Encoded diff from the previous version's text to this one's.
    /// `None` only for the first version of a document.
    pub diff_from_prev: Option<String>,
    /// Full text. Present on the newest record only.
    pub snapshot: Option<String>,
    pub created_at: u64,
    pub last_touched_at: u64,
    /// Tombstone (0 = alive).
    pub deleted_at: u64,
}

impl VersionRecord {
    pub fn is_live(&self) -> bool {
        self.deleted_at == 0
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Decode the stored diff payload.
    pub fn diff(&self) -> Result<Option<Diff>, DiffError> {
        self.diff_from_prev.as_deref().map(Diff::decode).transpose()
    }
}

/// A record about to be appended. The store assigns `seq`.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    pub diff_from_prev: Option<String>,
    pub snapshot: Option<String>,
    pub created_at: u64,
}

impl NewVersion {
    /// A fresh newest version carrying `snapshot`.
    pub fn new(document_id: DocumentId, diff_from_prev: Option<String>, snapshot: &str) -> Self {
        Self {
            id: VersionId::new(),
            document_id,
            diff_from_prev,
            snapshot: Some(snapshot.to_string()),
            created_at: now_millis(),
        }
    }

    pub(crate) fn into_record(self, seq: u64) -> VersionRecord {
        VersionRecord {
            id: self.id,
            document_id: self.document_id,
            seq,
            diff_from_prev: self.diff_from_prev,
            snapshot: self.snapshot,
            created_at: self.created_at,
            last_touched_at: self.created_at,
            deleted_at: 0,
        }
    }
}
