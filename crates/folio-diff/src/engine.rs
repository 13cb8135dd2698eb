//! Compute, apply, and invert.
//!
//! All three are pure functions over borrowed text. No state, no I/O.

use similar::{ChangeTag, TextDiff};

use crate::{Diff, DiffError, Result, SegmentKind};

/// Compute the line diff that turns `old` into `new`.
///
/// Uses Myers' algorithm over lines. Adjacent changes of the same kind are
/// coalesced into a single segment, so the script alternates kinds.
pub fn compute(old: &str, new: &str) -> Diff {
    let mut diff = Diff::new();
    if old.is_empty() && new.is_empty() {
        return diff;
    }

    let lines = TextDiff::from_lines(old, new);
    for change in lines.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => SegmentKind::Unchanged,
            ChangeTag::Delete => SegmentKind::Removed,
            ChangeTag::Insert => SegmentKind::Added,
        };
        diff.push(kind, change.value());
    }
    diff
}

/// Replay `diff` against `base`.
///
/// Emits `Added` and `Unchanged` text in order and skips `Removed` text. Every
/// `Removed`/`Unchanged` segment is checked against `base` at the current
/// replay offset, and the diff must consume `base` exactly.
pub fn apply(base: &str, diff: &Diff) -> Result<String> {
    let mut out = String::with_capacity(base.len());
    let mut offset = 0;

    for segment in diff.segments() {
        match segment.kind {
            SegmentKind::Added => out.push_str(&segment.text),
            SegmentKind::Removed | SegmentKind::Unchanged => {
                let matches = base
                    .get(offset..)
                    .is_some_and(|rest| rest.starts_with(segment.text.as_str()));
                if !matches {
                    return Err(DiffError::ReplayMismatch {
                        offset,
                        kind: segment.kind,
                    });
                }
                offset += segment.text.len();
                if segment.kind == SegmentKind::Unchanged {
                    out.push_str(&segment.text);
                }
            }
        }
    }

    if offset != base.len() {
        return Err(DiffError::BaseLengthMismatch {
            consumed: offset,
            len: base.len(),
        });
    }
    Ok(out)
}

/// Reverse a diff: `Added` and `Removed` swap, `Unchanged` passes through.
pub fn invert(diff: &Diff) -> Diff {
    let mut inverted = Diff::new();
    for segment in diff.segments() {
        inverted.push(segment.kind.inverse(), &segment.text);
    }
    inverted
}
