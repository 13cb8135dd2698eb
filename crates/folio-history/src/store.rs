//! Storage seams: the version chain and the cursor table.
//!
//! Backends implement the primitive operations. The chain-level operations
//! (`push`, `truncate_after`, `prune_and_push`, `repair_snapshots`) have
//! default implementations built from those primitives in crash-safe order:
//! whichever step fails, the newest live record still holds a snapshot.
//! Transactional backends may override them to run atomically.

use folio_diff::Diff;
use tracing::{debug, warn};

use crate::reconstruct::{newest_snapshot, step_back};
use crate::{DocumentId, HistoryError, NewVersion, Result, VersionId, VersionRecord};

/// Ordered, append-only version records per document.
pub trait VersionStore {
    /// Append a record as the newest for its document. No snapshot bookkeeping.
    fn insert(&self, version: NewVersion) -> Result<VersionRecord>;

    /// Replace one record's snapshot in place.
    ///
    /// Returns [`HistoryError::VersionNotFound`] when no live record has `id`.
    fn set_snapshot(&self, id: VersionId, snapshot: Option<&str>) -> Result<()>;

    /// All live records for a document, newest first (creation order).
    fn list_versions(&self, document: &DocumentId) -> Result<Vec<VersionRecord>>;

    /// Remove a single record. Returns whether it existed.
    fn delete(&self, id: VersionId) -> Result<bool>;

    /// Tombstone every live record for a document. Returns how many.
    fn delete_all(&self, document: &DocumentId) -> Result<usize>;

    /// Drop tombstoned records for all documents. Returns how many.
    fn purge_deleted(&self) -> Result<usize>;

    fn newest(&self, document: &DocumentId) -> Result<Option<VersionRecord>> {
        Ok(self.list_versions(document)?.into_iter().next())
    }

    fn version_count(&self, document: &DocumentId) -> Result<usize> {
        Ok(self.list_versions(document)?.len())
    }

    /// Append a new newest version and clear the previous newest's snapshot.
    ///
    /// The insert happens first. If the clear never happens the chain still
    /// reconstructs, because readers only trust the newest snapshot.
    fn push(
        &self,
        document: &DocumentId,
        diff_from_prev: Option<&Diff>,
        snapshot: &str,
    ) -> Result<VersionRecord> {
        let previous = self.newest(document)?;
        let payload = diff_from_prev.map(Diff::encode).transpose()?;
        let record = self.insert(NewVersion::new(document.clone(), payload, snapshot))?;

        if let Some(prev) = previous.filter(VersionRecord::has_snapshot) {
            self.set_snapshot(prev.id, None)?;
        }

        debug!(document = %document, version = %record.id, seq = record.seq, "pushed version");
        Ok(record)
    }

    /// Make `anchor` the newest record by deleting every newer record, newest
    /// first. Returns how many were deleted.
    ///
    /// `snapshot` must be the anchor's reconstructed text. Before each delete
    /// the next-older record receives its own text as snapshot, so the live
    /// newest record holds a snapshot after every step and a failed delete
    /// leaves a shorter, readable chain.
    fn truncate_after(
        &self,
        document: &DocumentId,
        anchor: VersionId,
        snapshot: &str,
    ) -> Result<usize> {
        let versions = self.list_versions(document)?;
        let index = versions
            .iter()
            .position(|v| v.id == anchor)
            .ok_or(HistoryError::VersionNotFound(anchor))?;
        if index == 0 {
            self.set_snapshot(anchor, Some(snapshot))?;
            return Ok(0);
        }

        let mut text = newest_snapshot(document, &versions[0])?;
        for (position, newer) in versions[..index].iter().enumerate() {
            text = if position + 1 == index {
                snapshot.to_string()
            } else {
                step_back(document, position, newer, &text)?
            };
            self.set_snapshot(versions[position + 1].id, Some(&text))?;
            self.delete(newer.id)?;
        }
        Ok(index)
    }

    /// Truncate to `anchor` (see [`VersionStore::truncate_after`]), then push
    /// the edit on top of it. Returns the number of pruned records and the new
    /// newest record.
    fn prune_and_push(
        &self,
        document: &DocumentId,
        anchor: VersionId,
        anchor_text: &str,
        diff_from_prev: &Diff,
        snapshot: &str,
    ) -> Result<(usize, VersionRecord)> {
        let pruned = self.truncate_after(document, anchor, anchor_text)?;
        let record = self.push(document, Some(diff_from_prev), snapshot)?;
        Ok((pruned, record))
    }

    /// Clear snapshots on every record but the newest. Returns how many were
    /// cleared (non-zero only after an interrupted push).
    fn repair_snapshots(&self, document: &DocumentId) -> Result<usize> {
        let mut cleared = 0;
        for stale in self
            .list_versions(document)?
            .iter()
            .skip(1)
            .filter(|v| v.has_snapshot())
        {
            self.set_snapshot(stale.id, None)?;
            cleared += 1;
        }
        if cleared > 0 {
            warn!(document = %document, cleared, "cleared redundant snapshots");
        }
        Ok(cleared)
    }
}

/// Flat string-keyed table.
pub trait CursorStore {
    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove a key. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}
