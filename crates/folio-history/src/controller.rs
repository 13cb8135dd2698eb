//! Undo/redo/jump over a document's version chain.
//!
//! [`HistoryController`] owns the in-memory cursor of every open document and
//! keeps the [`CursorStore`] in step with it, so reopening a document resumes
//! at the same point in history.
//!
//! # Cursor Model
//!
//! Positions index `list_versions` (0 = newest). The cursor is either
//! [`HistoryCursor::Newest`] (no override, nothing persisted) or
//! [`HistoryCursor::At`] an older position (persisted as that record's
//! [`VersionId`], which stays valid when newer records are pushed). Moving to
//! position 0 always normalizes back to `Newest`.
//!
//! ```text
//!   versions:   [ v2 (newest) , v1 , v0 ]
//!   cursor:       Newest       At(1) At(2)
//!                   ── undo ──▶  ── undo ──▶
//!                   ◀── redo ──  ◀── redo ──
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use folio_diff::compute;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::reconstruct::reconstruct_from;
use crate::store::{CursorStore, VersionStore};
use crate::{
    BranchPolicy, DocumentId, HistoryConfig, HistoryError, Result, VersionId, VersionRecord,
};

/// Where in its history an open document is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HistoryCursor {
    /// At the newest version.
    #[default]
    Newest,
    /// At an older version (index into `list_versions`, always >= 1).
    At(usize),
}

impl HistoryCursor {
    /// Position in `list_versions` order.
    pub fn index(&self) -> usize {
        match self {
            HistoryCursor::Newest => 0,
            HistoryCursor::At(index) => *index,
        }
    }

    fn from_index(index: usize) -> Self {
        if index == 0 {
            HistoryCursor::Newest
        } else {
            HistoryCursor::At(index)
        }
    }
}

impl fmt::Display for HistoryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryCursor::Newest => write!(f, "newest"),
            HistoryCursor::At(index) => write!(f, "@{index}"),
        }
    }
}

/// Undo/redo availability for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStatus {
    pub version_count: usize,
    pub cursor: HistoryCursor,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_steps: usize,
    pub redo_steps: usize,
}

/// A row of a document's history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub id: VersionId,
    pub index: usize,
    pub created_at: u64,
    pub has_snapshot: bool,
    pub is_current: bool,
}

/// Stateful history façade for the editor.
pub struct HistoryController<V, C> {
    versions: V,
    cursors: C,
    config: HistoryConfig,
    /// In-memory cursor per open document.
    open: HashMap<DocumentId, HistoryCursor>,
}

/// Controller shared across threads; the mutex serializes edits and
/// navigation as a unit.
pub type SharedHistory<V, C> = Arc<Mutex<HistoryController<V, C>>>;

/// Wrap a controller for shared use.
pub fn shared_history<V, C>(controller: HistoryController<V, C>) -> SharedHistory<V, C> {
    Arc::new(Mutex::new(controller))
}

impl<V: VersionStore, C: CursorStore> HistoryController<V, C> {
    pub fn new(versions: V, cursors: C) -> Self {
        Self::with_config(versions, cursors, HistoryConfig::default())
    }

    pub fn with_config(versions: V, cursors: C, config: HistoryConfig) -> Self {
        Self {
            versions,
            cursors,
            config,
            open: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn version_store(&self) -> &V {
        &self.versions
    }

    pub fn cursor_store(&self) -> &C {
        &self.cursors
    }

    /// In-memory cursor, or `None` if the document is not open.
    pub fn cursor(&self, document: &DocumentId) -> Option<HistoryCursor> {
        self.open.get(document).copied()
    }

    fn cursor_key(&self, document: &DocumentId) -> String {
        format!("{}{}", self.config.cursor_prefix, document)
    }

    // =========================================================================
    // Open / close
    // =========================================================================

    /// Restore the persisted cursor for a document. Called when it is opened.
    ///
    /// A missing, unparsable, or stale entry falls back to `Newest` (and is
    /// removed), never an error.
    pub fn load_cursor(&mut self, document: &DocumentId) -> Result<HistoryCursor> {
        let key = self.cursor_key(document);
        let cursor = match self.cursors.get(&key)? {
            None => HistoryCursor::Newest,
            Some(value) => match VersionId::parse(&value) {
                Err(_) => {
                    warn!(document = %document, %value, "unparsable persisted cursor, resetting");
                    self.cursors.delete(&key)?;
                    HistoryCursor::Newest
                }
                Ok(id) => {
                    let versions = self.versions.list_versions(document)?;
                    match versions.iter().position(|v| v.id == id) {
                        Some(index) if index > 0 => HistoryCursor::At(index),
                        Some(_) => {
                            self.cursors.delete(&key)?;
                            HistoryCursor::Newest
                        }
                        None => {
                            warn!(document = %document, version = %id, "persisted cursor points at a missing version, resetting");
                            self.cursors.delete(&key)?;
                            HistoryCursor::Newest
                        }
                    }
                }
            },
        };

        debug!(document = %document, %cursor, "loaded cursor");
        self.open.insert(document.clone(), cursor);
        Ok(cursor)
    }

    fn ensure_loaded(&mut self, document: &DocumentId) -> Result<HistoryCursor> {
        match self.open.get(document) {
            Some(cursor) => Ok(*cursor),
            None => self.load_cursor(document),
        }
    }

    /// Forget in-memory state. The persisted cursor stays.
    pub fn close_document(&mut self, document: &DocumentId) {
        self.open.remove(document);
    }

    /// Drop a document's whole history (the document itself was deleted).
    /// Returns how many versions were tombstoned.
    pub fn discard_document(&mut self, document: &DocumentId) -> Result<usize> {
        let removed = self.versions.delete_all(document)?;
        self.cursors.delete(&self.cursor_key(document))?;
        self.open.remove(document);
        info!(document = %document, removed, "discarded history");
        Ok(removed)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Record a committed edit. Returns the new newest record, or `None` when
    /// nothing changed.
    ///
    /// Any redo position is abandoned: the cursor returns to `Newest`. Under
    /// [`BranchPolicy::Prune`] the versions newer than the cursor are deleted
    /// together with the push; under [`BranchPolicy::Append`] they stay and the
    /// edit is diffed against the newest text. An edit that leaves the history
    /// text unchanged records nothing and prunes nothing.
    pub fn record_edit(
        &mut self,
        document: &DocumentId,
        old_text: &str,
        new_text: &str,
    ) -> Result<Option<VersionRecord>> {
        if old_text == new_text {
            return Ok(None);
        }

        let cursor = self.ensure_loaded(document)?;
        let versions = self.versions.list_versions(document)?;

        let record = if versions.is_empty() {
            self.seed(document, old_text, new_text)?
        } else {
            let anchor = match (cursor, self.config.branch_policy) {
                (HistoryCursor::At(index), BranchPolicy::Prune) => Some(index),
                _ => None,
            };
            let base = reconstruct_from(document, &versions, anchor.unwrap_or(0))?;

            if base != old_text {
                warn!(document = %document, %cursor, "edit base differs from history text, diffing against history");
            }
            if base == new_text {
                // Nothing to record; under Prune the redo branch stays.
                if anchor.is_none() {
                    self.set_cursor(document, HistoryCursor::Newest, None)?;
                }
                return Ok(None);
            }

            let diff = compute(&base, new_text);
            debug!(document = %document, stats = %diff.stats(), "recording edit");
            match anchor {
                Some(index) => {
                    let (pruned, record) = self.versions.prune_and_push(
                        document,
                        versions[index].id,
                        &base,
                        &diff,
                        new_text,
                    )?;
                    info!(document = %document, pruned, "pruned redo branch");
                    record
                }
                None => self.versions.push(document, Some(&diff), new_text)?,
            }
        };

        self.set_cursor(document, HistoryCursor::Newest, None)?;
        self.config.retention.apply(&self.versions, document)?;
        Ok(Some(record))
    }

    /// First edit of a document with no history. A non-empty `old_text` is kept
    /// as a baseline version so it stays reachable by undo.
    fn seed(&self, document: &DocumentId, old_text: &str, new_text: &str) -> Result<VersionRecord> {
        if old_text.is_empty() {
            return self.versions.push(document, None, new_text);
        }

        let baseline = self.versions.push(document, None, old_text)?;
        debug!(document = %document, version = %baseline.id, "seeded baseline version");
        let diff = compute(old_text, new_text);
        self.versions.push(document, Some(&diff), new_text)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Step one version into the past. `None` when there is nothing older.
    pub fn undo(&mut self, document: &DocumentId) -> Result<Option<String>> {
        let cursor = self.ensure_loaded(document)?;
        let versions = self.versions.list_versions(document)?;
        let target = cursor.index() + 1;
        if target >= versions.len() {
            return Ok(None);
        }
        self.move_to(document, &versions, target).map(Some)
    }

    /// Step one version toward the newest. `None` when already there.
    pub fn redo(&mut self, document: &DocumentId) -> Result<Option<String>> {
        let HistoryCursor::At(index) = self.ensure_loaded(document)? else {
            return Ok(None);
        };
        let versions = self.versions.list_versions(document)?;
        if versions.is_empty() {
            self.set_cursor(document, HistoryCursor::Newest, None)?;
            return Ok(None);
        }
        let target = (index - 1).min(versions.len() - 1);
        self.move_to(document, &versions, target).map(Some)
    }

    /// Move the cursor to a specific version without recording an edit.
    pub fn jump_to(&mut self, document: &DocumentId, version: VersionId) -> Result<String> {
        self.ensure_loaded(document)?;
        let versions = self.versions.list_versions(document)?;
        let index = versions
            .iter()
            .position(|v| v.id == version)
            .ok_or(HistoryError::VersionNotFound(version))?;
        self.move_to(document, &versions, index)
    }

    /// Reconstruct, then persist the cursor, then update memory.
    fn move_to(
        &mut self,
        document: &DocumentId,
        versions: &[VersionRecord],
        index: usize,
    ) -> Result<String> {
        let text = reconstruct_from(document, versions, index)?;
        let cursor = HistoryCursor::from_index(index);
        self.set_cursor(document, cursor, Some(versions[index].id))?;
        debug!(document = %document, %cursor, "moved cursor");
        Ok(text)
    }

    fn set_cursor(
        &mut self,
        document: &DocumentId,
        cursor: HistoryCursor,
        version: Option<VersionId>,
    ) -> Result<()> {
        let key = self.cursor_key(document);
        match (cursor, version) {
            (HistoryCursor::At(_), Some(id)) => self.cursors.set(&key, &id.to_string())?,
            _ => self.cursors.delete(&key)?,
        }
        self.open.insert(document.clone(), cursor);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Text at the cursor, or `None` for a document with no history.
    pub fn current_text(&mut self, document: &DocumentId) -> Result<Option<String>> {
        let cursor = self.ensure_loaded(document)?;
        let versions = self.versions.list_versions(document)?;
        if versions.is_empty() {
            return Ok(None);
        }
        reconstruct_from(document, &versions, cursor.index().min(versions.len() - 1)).map(Some)
    }

    pub fn status(&mut self, document: &DocumentId) -> Result<HistoryStatus> {
        let cursor = self.ensure_loaded(document)?;
        let version_count = self.versions.version_count(document)?;
        let index = cursor.index();
        let undo_steps = version_count.saturating_sub(index + 1);
        Ok(HistoryStatus {
            version_count,
            cursor,
            can_undo: undo_steps > 0,
            can_redo: index > 0,
            undo_steps,
            redo_steps: index,
        })
    }

    /// History listing for display, newest first.
    pub fn versions(&mut self, document: &DocumentId) -> Result<Vec<VersionSummary>> {
        let current = self.ensure_loaded(document)?.index();
        Ok(self
            .versions
            .list_versions(document)?
            .into_iter()
            .enumerate()
            .map(|(index, record)| VersionSummary {
                id: record.id,
                index,
                created_at: record.created_at,
                has_snapshot: record.has_snapshot(),
                is_current: index == current,
            })
            .collect())
    }

    /// Apply the configured retention policy now. Returns how many versions
    /// were removed. A cursor left pointing past the oldest survivor resets.
    pub fn apply_retention(&mut self, document: &DocumentId) -> Result<usize> {
        let cursor = self.ensure_loaded(document)?;
        let removed = self.config.retention.apply(&self.versions, document)?;
        if removed > 0 && cursor.index() >= self.versions.version_count(document)? {
            self.set_cursor(document, HistoryCursor::Newest, None)?;
        }
        Ok(removed)
    }
}
