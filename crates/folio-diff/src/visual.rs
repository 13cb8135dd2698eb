//! Per-line diff rows for side-by-side display.

use similar::{ChangeTag, TextDiff};

use crate::SegmentKind;

/// One displayed line of a comparison between two texts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualLine {
    pub kind: SegmentKind,
    /// Line content without its terminator.
    pub content: String,
    /// 1-based line number in the old text, if the line exists there.
    pub old_line: Option<usize>,
    /// 1-based line number in the new text, if the line exists there.
    pub new_line: Option<usize>,
}

/// Line-by-line comparison of `old` and `new`.
pub fn visual_diff(old: &str, new: &str) -> Vec<VisualLine> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .map(|change| {
            let kind = match change.tag() {
                ChangeTag::Equal => SegmentKind::Unchanged,
                ChangeTag::Delete => SegmentKind::Removed,
                ChangeTag::Insert => SegmentKind::Added,
            };
            VisualLine {
                kind,
                content: strip_terminator(change.value()).to_string(),
                old_line: change.old_index().map(|i| i + 1),
                new_line: change.new_index().map(|i| i + 1),
            }
        })
        .collect()
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
