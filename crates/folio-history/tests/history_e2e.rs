//! End-to-end history tests through the public API.
//!
//! # Tiers
//!
//! - **Tier 1:** the editing scenario against an in-memory SQLite database
//! - **Tier 2:** restart: cursor and chain reloaded from an on-disk database
//! - **Tier 3:** maintenance: retention, repair, discard and purge

use folio_history::{
    BranchPolicy, DocumentId, HistoryConfig, HistoryController, HistoryCursor, HistoryDb,
    RetentionPolicy, VersionReconstructor, VersionStore,
};
use tempfile::TempDir;

// ============================================================================
// Shared test setup
// ============================================================================

type DbController = HistoryController<HistoryDb, HistoryDb>;

fn controller(db: &HistoryDb) -> DbController {
    HistoryController::new(db.clone(), db.clone())
}

fn edit_through(history: &mut DbController, doc: &DocumentId, texts: &[&str]) {
    let mut previous = "";
    for text in texts {
        history.record_edit(doc, previous, text).unwrap();
        previous = *text;
    }
}

// ============================================================================
// Tier 1: editing scenario
// ============================================================================

#[test]
fn test_scenario_undo_redo_then_edit() {
    let db = HistoryDb::in_memory().unwrap();
    let mut history = controller(&db);
    let doc = DocumentId::from("article-1");

    edit_through(&mut history, &doc, &["A", "A\nB", "A\nB\nC"]);

    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("A\nB"));
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("A"));
    assert_eq!(history.redo(&doc).unwrap().as_deref(), Some("A\nB"));

    let record = history.record_edit(&doc, "A\nB", "A\nX").unwrap().unwrap();
    assert_eq!(record.snapshot.as_deref(), Some("A\nX"));
    assert_eq!(history.cursor(&doc), Some(HistoryCursor::Newest));

    let versions = db.list_versions(&doc).unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].id, record.id);
    assert_eq!(history.current_text(&doc).unwrap().as_deref(), Some("A\nX"));
    assert_eq!(history.redo(&doc).unwrap(), None);

    let reconstructor = VersionReconstructor::new(&db);
    let texts: Vec<String> = (0..3)
        .map(|i| reconstructor.reconstruct(&doc, i).unwrap())
        .collect();
    assert_eq!(texts, vec!["A\nX", "A\nB", "A"]);
}

#[test]
fn test_only_newest_holds_snapshot() {
    let db = HistoryDb::in_memory().unwrap();
    let mut history = controller(&db);
    let doc = DocumentId::from("article-1");

    edit_through(&mut history, &doc, &["one", "one\ntwo", "one\ntwo\nthree"]);
    history.undo(&doc).unwrap();
    history.record_edit(&doc, "one\ntwo", "one\n2").unwrap();
    history.record_edit(&doc, "one\n2", "one\n2\n3").unwrap();

    let versions = db.list_versions(&doc).unwrap();
    let with_snapshot: Vec<usize> = versions
        .iter()
        .enumerate()
        .filter(|(_, v)| v.has_snapshot())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(with_snapshot, vec![0]);
}

#[test]
fn test_documents_are_independent() {
    let db = HistoryDb::in_memory().unwrap();
    let mut history = controller(&db);
    let left = DocumentId::from("left");
    let right = DocumentId::from("right");

    edit_through(&mut history, &left, &["l1", "l2"]);
    edit_through(&mut history, &right, &["r1", "r2", "r3"]);

    assert_eq!(history.undo(&left).unwrap().as_deref(), Some("l1"));
    assert_eq!(history.cursor(&right), Some(HistoryCursor::Newest));
    assert_eq!(history.undo(&right).unwrap().as_deref(), Some("r2"));
    assert_eq!(history.undo(&left).unwrap(), None);
}

#[test]
fn test_append_policy_keeps_abandoned_versions() {
    let db = HistoryDb::in_memory().unwrap();
    let config = HistoryConfig::default().with_branch_policy(BranchPolicy::Append);
    let mut history = HistoryController::with_config(db.clone(), db.clone(), config);
    let doc = DocumentId::from("article-1");

    edit_through(&mut history, &doc, &["A", "A\nB", "A\nB\nC"]);
    history.undo(&doc).unwrap();
    history.record_edit(&doc, "A\nB", "A\nX").unwrap();

    assert_eq!(db.version_count(&doc).unwrap(), 4);
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("A\nB\nC"));
}

// ============================================================================
// Tier 2: restart
// ============================================================================

#[test]
fn test_cursor_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let doc = DocumentId::from("article-1");

    {
        let db = HistoryDb::open(&path).unwrap();
        let mut history = controller(&db);
        edit_through(&mut history, &doc, &["t0", "t0\nt1", "t0\nt1\nt2", "t0\nt1\nt2\nt3"]);
        history.undo(&doc).unwrap();
        assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("t0\nt1"));
    }

    let db = HistoryDb::open(&path).unwrap();
    let mut history = controller(&db);
    assert_eq!(history.load_cursor(&doc).unwrap(), HistoryCursor::At(2));
    assert_eq!(history.current_text(&doc).unwrap().as_deref(), Some("t0\nt1"));
    assert_eq!(history.redo(&doc).unwrap().as_deref(), Some("t0\nt1\nt2"));
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("t0\nt1"));
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("t0"));
}

#[test]
fn test_restart_after_returning_to_newest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let doc = DocumentId::from("article-1");

    {
        let db = HistoryDb::open(&path).unwrap();
        let mut history = controller(&db);
        edit_through(&mut history, &doc, &["a", "a\nb"]);
        history.undo(&doc).unwrap();
        history.redo(&doc).unwrap();
    }

    let db = HistoryDb::open(&path).unwrap();
    let mut history = controller(&db);
    assert_eq!(history.load_cursor(&doc).unwrap(), HistoryCursor::Newest);
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("a"));
}

// ============================================================================
// Tier 3: maintenance
// ============================================================================

#[test]
fn test_retention_caps_history() {
    let db = HistoryDb::in_memory().unwrap();
    let config = HistoryConfig::default().with_retention(RetentionPolicy::keep_latest(4));
    let mut history = HistoryController::with_config(db.clone(), db.clone(), config);
    let doc = DocumentId::from("article-1");

    let texts: Vec<String> = (1..=10)
        .map(|n| (1..=n).map(|i| format!("line {i}\n")).collect())
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    edit_through(&mut history, &doc, &refs);

    assert_eq!(db.version_count(&doc).unwrap(), 4);
    let status = history.status(&doc).unwrap();
    assert_eq!(status.undo_steps, 3);

    let mut oldest = None;
    while let Some(text) = history.undo(&doc).unwrap() {
        oldest = Some(text);
    }
    assert_eq!(oldest.as_deref(), Some(texts[6].as_str()));
}

#[test]
fn test_repair_after_interrupted_push() {
    let db = HistoryDb::in_memory().unwrap();
    let mut history = controller(&db);
    let doc = DocumentId::from("article-1");
    edit_through(&mut history, &doc, &["a", "a\nb", "a\nb\nc"]);

    // Simulate a crash between insert and clear.
    let versions = db.list_versions(&doc).unwrap();
    db.set_snapshot(versions[1].id, Some("a\nb")).unwrap();

    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("a\nb"));
    assert_eq!(db.repair_snapshots(&doc).unwrap(), 1);
    assert_eq!(db.repair_snapshots(&doc).unwrap(), 0);
    assert_eq!(history.undo(&doc).unwrap().as_deref(), Some("a"));
}

#[test]
fn test_discard_then_purge() {
    let db = HistoryDb::in_memory().unwrap();
    let mut history = controller(&db);
    let kept = DocumentId::from("kept");
    let dropped = DocumentId::from("dropped");
    edit_through(&mut history, &kept, &["k1", "k2"]);
    edit_through(&mut history, &dropped, &["d1", "d2", "d3"]);

    assert_eq!(history.discard_document(&dropped).unwrap(), 3);
    assert_eq!(db.version_count(&dropped).unwrap(), 0);
    assert_eq!(db.purge_deleted().unwrap(), 3);
    assert_eq!(db.purge_deleted().unwrap(), 0);
    assert_eq!(db.version_count(&kept).unwrap(), 2);
}
