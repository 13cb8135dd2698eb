//! Line-oriented diffs for document history.
//!
//! A [`Diff`] is an ordered edit script of [`Segment`]s, each tagged
//! [`SegmentKind::Added`], [`SegmentKind::Removed`] or [`SegmentKind::Unchanged`].
//! Lines are the unit of granularity: segments always hold whole lines (with
//! their terminators), never partial ones.
//!
//! # The Round-Trip Law
//!
//! Everything in folio's history engine rests on two identities holding
//! exactly, for any pair of texts `a` and `b`:
//!
//! ```text
//! apply(a, compute(a, b))                                   == b
//! apply(apply(a, compute(a, b)), invert(&compute(a, b)))    == a
//! ```
//!
//! [`apply`] replays the script against its base and fails with a
//! [`DiffError`] the moment a `Removed`/`Unchanged` segment disagrees with the
//! base, so a diff replayed against the wrong text is an error rather than
//! silently wrong output.
//!
//! # Payload Format
//!
//! [`Diff::encode`] produces a JSON array of `{"kind": .., "text": ..}`
//! objects. It is self-consistent with [`Diff::decode`] and nothing else.

mod diff;
mod engine;
mod error;
mod visual;

pub use diff::{Diff, DiffStats, Segment, SegmentKind};
pub use engine::{apply, compute, invert};
pub use error::DiffError;
pub use visual::{VisualLine, visual_diff};

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
