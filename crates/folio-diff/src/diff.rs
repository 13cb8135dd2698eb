//! Diff and segment types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::{DiffError, Result};

/// What a segment does to the text it is replayed against.
///
/// Closed set: [`crate::apply`] and [`crate::invert`] match exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SegmentKind {
    /// Lines present only in the new text.
    #[strum(serialize = "added", serialize = "insert")]
    Added,
    /// Lines present only in the old text.
    #[strum(serialize = "removed", serialize = "delete")]
    Removed,
    /// Lines shared by both texts.
    #[strum(serialize = "unchanged", serialize = "equal")]
    Unchanged,
}

impl SegmentKind {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Added => "added",
            SegmentKind::Removed => "removed",
            SegmentKind::Unchanged => "unchanged",
        }
    }

    /// The kind this segment becomes when the diff runs backward.
    pub fn inverse(self) -> Self {
        match self {
            SegmentKind::Added => SegmentKind::Removed,
            SegmentKind::Removed => SegmentKind::Added,
            SegmentKind::Unchanged => SegmentKind::Unchanged,
        }
    }

    /// Marker used in unified-style listings.
    pub fn sigil(&self) -> char {
        match self {
            SegmentKind::Added => '+',
            SegmentKind::Removed => '-',
            SegmentKind::Unchanged => ' ',
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A run of whole lines sharing one [`SegmentKind`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Line content including line terminators.
    pub text: String,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Removed, text)
    }

    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Unchanged, text)
    }

    /// Number of lines in this segment (a trailing partial line counts).
    pub fn line_count(&self) -> usize {
        self.text.split_inclusive('\n').count()
    }
}

/// Line counts per segment kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added_lines: usize,
    pub removed_lines: usize,
    pub unchanged_lines: usize,
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{}", self.added_lines, self.removed_lines)
    }
}

/// An ordered line-level edit script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diff {
    segments: Vec<Segment>,
}

impl Diff {
    /// An empty diff (the diff between two empty texts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from segments, merging adjacent segments of the same kind and
    /// dropping empty ones.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut diff = Self::new();
        for segment in segments {
            diff.push(segment.kind, &segment.text);
        }
        diff
    }

    /// Append text of the given kind, coalescing with the previous segment.
    pub(crate) fn push(&mut self, kind: SegmentKind, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.segments.push(Segment::new(kind, text)),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when replaying the diff leaves its base untouched.
    pub fn is_identity(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.kind == SegmentKind::Unchanged)
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for segment in &self.segments {
            let lines = segment.line_count();
            match segment.kind {
                SegmentKind::Added => stats.added_lines += lines,
                SegmentKind::Removed => stats.removed_lines += lines,
                SegmentKind::Unchanged => stats.unchanged_lines += lines,
            }
        }
        stats
    }

    /// Serialize to the stored payload form.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| DiffError::Codec(e.to_string()))
    }

    /// Parse a stored payload.
    pub fn decode(payload: &str) -> Result<Self> {
        let raw: Vec<Segment> =
            serde_json::from_str(payload).map_err(|e| DiffError::Codec(e.to_string()))?;
        Ok(Self::from_segments(raw))
    }
}

impl FromIterator<Segment> for Diff {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self::from_segments(iter)
    }
}
