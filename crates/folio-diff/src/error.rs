//! Error types for diff replay and payload decoding.

use thiserror::Error;

use crate::SegmentKind;

/// Errors that can occur while applying or decoding a diff.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// A `Removed` or `Unchanged` segment did not match the base text.
    ///
    /// The diff is being replayed against a text other than the one it was
    /// computed from.
    #[error("{kind} segment does not match base at byte {offset}")]
    ReplayMismatch { offset: usize, kind: SegmentKind },

    /// The diff consumed less of the base than the base holds.
    #[error("diff consumed {consumed} of {len} base bytes")]
    BaseLengthMismatch { consumed: usize, len: usize },

    /// Payload could not be encoded or decoded.
    #[error("diff codec error: {0}")]
    Codec(String),
}
