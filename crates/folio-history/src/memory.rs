//! In-memory stores.
//!
//! Used for tests and for documents that never touch disk. Clones share state,
//! so a "restart" can be simulated by building a new controller over clones of
//! the same stores.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::store::{CursorStore, VersionStore};
use crate::{DocumentId, HistoryError, NewVersion, Result, VersionId, VersionRecord, now_millis};

#[derive(Default)]
struct Chain {
    /// Every record ever inserted, in creation order.
    records: Vec<VersionRecord>,
    next_seq: u64,
}

/// Version chain held in memory.
#[derive(Clone, Default)]
pub struct MemoryVersionStore {
    chain: Arc<Mutex<Chain>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStore for MemoryVersionStore {
    fn insert(&self, version: NewVersion) -> Result<VersionRecord> {
        let mut chain = self.chain.lock();
        chain.next_seq += 1;
        let record = version.into_record(chain.next_seq);
        chain.records.push(record.clone());
        Ok(record)
    }

    fn set_snapshot(&self, id: VersionId, snapshot: Option<&str>) -> Result<()> {
        let mut chain = self.chain.lock();
        let record = chain
            .records
            .iter_mut()
            .find(|r| r.id == id && r.is_live())
            .ok_or(HistoryError::VersionNotFound(id))?;
        record.snapshot = snapshot.map(str::to_string);
        record.last_touched_at = now_millis();
        Ok(())
    }

    fn list_versions(&self, document: &DocumentId) -> Result<Vec<VersionRecord>> {
        let chain = self.chain.lock();
        Ok(chain
            .records
            .iter()
            .rev()
            .filter(|r| &r.document_id == document && r.is_live())
            .cloned()
            .collect())
    }

    fn delete(&self, id: VersionId) -> Result<bool> {
        let mut chain = self.chain.lock();
        let before = chain.records.len();
        chain.records.retain(|r| r.id != id);
        Ok(chain.records.len() != before)
    }

    fn delete_all(&self, document: &DocumentId) -> Result<usize> {
        let mut chain = self.chain.lock();
        let now = now_millis().max(1);
        let mut count = 0;
        for record in chain
            .records
            .iter_mut()
            .filter(|r| &r.document_id == document && r.is_live())
        {
            record.deleted_at = now;
            count += 1;
        }
        Ok(count)
    }

    fn purge_deleted(&self) -> Result<usize> {
        let mut chain = self.chain.lock();
        let before = chain.records.len();
        chain.records.retain(VersionRecord::is_live);
        Ok(before - chain.records.len())
    }
}

/// Key/value table held in memory.
#[derive(Clone, Default)]
pub struct MemoryCursorStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CursorStore for MemoryCursorStore {
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_is_newest_first_per_document() {
        let store = MemoryVersionStore::new();
        let a = DocumentId::from("a");
        let b = DocumentId::from("b");

        let a1 = store.push(&a, None, "a1").unwrap();
        let b1 = store.push(&b, None, "b1").unwrap();
        let a2 = store.push(&a, None, "a2").unwrap();

        let ids: Vec<_> = store.list_versions(&a).unwrap().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![a2.id, a1.id]);
        assert_eq!(store.newest(&b).unwrap().unwrap().id, b1.id);
        assert!(a2.seq > b1.seq && b1.seq > a1.seq);
    }

    #[test]
    fn test_delete_all_tombstones_then_purge() {
        let store = MemoryVersionStore::new();
        let a = DocumentId::from("a");
        let b = DocumentId::from("b");
        store.push(&a, None, "a1").unwrap();
        store.push(&a, None, "a2").unwrap();
        store.push(&b, None, "b1").unwrap();

        assert_eq!(store.delete_all(&a).unwrap(), 2);
        assert!(store.list_versions(&a).unwrap().is_empty());
        assert!(store.newest(&a).unwrap().is_none());
        assert_eq!(store.version_count(&b).unwrap(), 1);

        assert_eq!(store.delete_all(&a).unwrap(), 0);
        assert_eq!(store.purge_deleted().unwrap(), 2);
        assert_eq!(store.purge_deleted().unwrap(), 0);
    }

    #[test]
    fn test_set_snapshot_on_tombstoned_record_fails() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        let v = store.push(&doc, None, "x").unwrap();
        store.delete_all(&doc).unwrap();

        let err = store.set_snapshot(v.id, None).unwrap_err();
        assert!(matches!(err, HistoryError::VersionNotFound(_)));
    }

    #[test]
    fn test_cursor_store_round_trip() {
        let cursors = MemoryCursorStore::new();
        assert_eq!(cursors.get("cursor:doc").unwrap(), None);

        cursors.set("cursor:doc", "v1").unwrap();
        cursors.set("cursor:doc", "v2").unwrap();
        assert_eq!(cursors.get("cursor:doc").unwrap().as_deref(), Some("v2"));
        assert_eq!(cursors.len(), 1);

        cursors.delete("cursor:doc").unwrap();
        cursors.delete("cursor:doc").unwrap();
        assert!(cursors.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        let other = store.clone();
        store.push(&doc, None, "x").unwrap();
        assert_eq!(other.version_count(&doc).unwrap(), 1);
    }
}
