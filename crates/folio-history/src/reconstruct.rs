//! Rebuilding historical text from the newest snapshot.
//!
//! Record `i` (0 = newest) stores the diff from the text at position `i + 1`
//! to the text at position `i`. Starting from the snapshot at position 0,
//! inverting and applying the diffs of records `0..target` walks the text back
//! one version per step until it reaches `target`. The oldest record's diff,
//! which may be absent, is never needed.

use folio_diff::{apply, invert};
use tracing::error;

use crate::store::VersionStore;
use crate::{DocumentId, HistoryError, IntegrityError, Result, VersionRecord};

/// Reconstructs text at any position of a document's chain.
pub struct VersionReconstructor<'a, V: ?Sized> {
    store: &'a V,
}

impl<'a, V: VersionStore + ?Sized> VersionReconstructor<'a, V> {
    pub fn new(store: &'a V) -> Self {
        Self { store }
    }

    /// Text of the version at `target` (0 = newest) in `list_versions` order.
    pub fn reconstruct(&self, document: &DocumentId, target: usize) -> Result<String> {
        let versions = self.store.list_versions(document)?;
        reconstruct_from(document, &versions, target)
    }
}

/// Reconstruct from an already-fetched chain (newest first).
pub fn reconstruct_from(
    document: &DocumentId,
    versions: &[VersionRecord],
    target: usize,
) -> Result<String> {
    let Some(newest) = versions.first() else {
        return Err(HistoryError::DocumentNotFound(document.clone()));
    };
    if target >= versions.len() {
        return Err(HistoryError::IndexOutOfRange {
            index: target,
            len: versions.len(),
        });
    }

    let mut text = newest_snapshot(document, newest)?;
    for (index, record) in versions[..target].iter().enumerate() {
        text = step_back(document, index, record, &text)?;
    }
    Ok(text)
}

/// The newest record's snapshot, the only one reconstruction trusts.
pub(crate) fn newest_snapshot(document: &DocumentId, newest: &VersionRecord) -> Result<String> {
    match &newest.snapshot {
        Some(snapshot) => Ok(snapshot.clone()),
        None => {
            error!(document = %document, version = %newest.id, "newest version has no snapshot");
            Err(IntegrityError::MissingSnapshot {
                document: document.clone(),
            }
            .into())
        }
    }
}

/// Text one position older: undo `record`'s diff against `text`, the text at
/// `record`'s own position `index`.
pub(crate) fn step_back(
    document: &DocumentId,
    index: usize,
    record: &VersionRecord,
    text: &str,
) -> Result<String> {
    let diff = record
        .diff()
        .map_err(|source| IntegrityError::CorruptDiff {
            version: record.id,
            source,
        })?
        .ok_or_else(|| {
            error!(document = %document, version = %record.id, index, "version has no diff");
            IntegrityError::MissingDiff {
                document: document.clone(),
                version: record.id,
                index,
            }
        })?;

    apply(text, &invert(&diff)).map_err(|source| {
        error!(document = %document, version = %record.id, index, %source, "diff replay failed");
        IntegrityError::Replay {
            version: record.id,
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryVersionStore;
    use folio_diff::compute;

    fn build_chain(store: &MemoryVersionStore, doc: &DocumentId, texts: &[&str]) {
        let mut previous: Option<&str> = None;
        for text in texts {
            let diff = previous.map(|p| compute(p, text));
            store.push(doc, diff.as_ref(), text).unwrap();
            previous = Some(*text);
        }
    }

    #[test]
    fn test_reconstruct_every_position() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        let texts = ["t0", "t0\nt1", "t1\nt2\n", "t3\nt2\n"];
        build_chain(&store, &doc, &texts);

        let reconstructor = VersionReconstructor::new(&store);
        assert_eq!(reconstructor.reconstruct(&doc, 0).unwrap(), texts[3]);
        assert_eq!(reconstructor.reconstruct(&doc, 1).unwrap(), texts[2]);
        assert_eq!(reconstructor.reconstruct(&doc, 2).unwrap(), texts[1]);
        assert_eq!(reconstructor.reconstruct(&doc, 3).unwrap(), texts[0]);
    }

    #[test]
    fn test_reconstruct_not_found_and_out_of_range() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        let reconstructor = VersionReconstructor::new(&store);

        let err = reconstructor.reconstruct(&doc, 0).unwrap_err();
        assert!(matches!(err, HistoryError::DocumentNotFound(_)));

        build_chain(&store, &doc, &["a", "b"]);
        let err = reconstructor.reconstruct(&doc, 2).unwrap_err();
        assert!(matches!(err, HistoryError::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_missing_snapshot_is_integrity_error() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        build_chain(&store, &doc, &["a", "b"]);
        let newest = store.newest(&doc).unwrap().unwrap();
        store.set_snapshot(newest.id, None).unwrap();

        let err = VersionReconstructor::new(&store).reconstruct(&doc, 0).unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(
            err,
            HistoryError::Integrity(IntegrityError::MissingSnapshot { .. })
        ));
    }

    #[test]
    fn test_missing_diff_aborts() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        store.push(&doc, None, "a").unwrap();
        // A second record without a diff breaks the chain.
        store.push(&doc, None, "b").unwrap();

        let reconstructor = VersionReconstructor::new(&store);
        assert_eq!(reconstructor.reconstruct(&doc, 0).unwrap(), "b");
        let err = reconstructor.reconstruct(&doc, 1).unwrap_err();
        assert!(matches!(
            err,
            HistoryError::Integrity(IntegrityError::MissingDiff { index: 0, .. })
        ));
    }

    #[test]
    fn test_mismatched_diff_is_loud() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        store.push(&doc, None, "a\n").unwrap();
        // Diff computed against text the chain never held.
        store
            .push(&doc, Some(&compute("x\n", "y\n")), "b\n")
            .unwrap();

        let err = VersionReconstructor::new(&store).reconstruct(&doc, 1).unwrap_err();
        assert!(matches!(
            err,
            HistoryError::Integrity(IntegrityError::Replay { .. })
        ));
    }

    #[test]
    fn test_redundant_snapshots_are_ignored() {
        let store = MemoryVersionStore::new();
        let doc = DocumentId::from("doc");
        build_chain(&store, &doc, &["one\n", "two\n"]);
        let oldest = store.list_versions(&doc).unwrap()[1].id;
        store.set_snapshot(oldest, Some("stale garbage")).unwrap();

        let reconstructor = VersionReconstructor::new(&store);
        assert_eq!(reconstructor.reconstruct(&doc, 1).unwrap(), "one\n");
    }
}
