//! Bounding history length.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::VersionStore;
use crate::{DocumentId, Result};

/// How many versions a document may keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep at most this many versions (`None` = unbounded). Values below 1
    /// are treated as 1; the newest record is never removed.
    pub max_versions: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::keep_latest(100)
    }
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self { max_versions: None }
    }

    pub fn keep_latest(max_versions: usize) -> Self {
        Self {
            max_versions: Some(max_versions),
        }
    }

    /// How many of `count` versions exceed the limit.
    pub fn excess(&self, count: usize) -> usize {
        match self.max_versions {
            Some(max) => count.saturating_sub(max.max(1)),
            None => 0,
        }
    }

    /// Delete the oldest versions beyond the limit. Returns how many.
    ///
    /// Removal starts from the oldest record, so an interrupted run leaves a
    /// shorter but intact chain.
    pub fn apply<V: VersionStore + ?Sized>(&self, store: &V, document: &DocumentId) -> Result<usize> {
        let versions = store.list_versions(document)?;
        let excess = self.excess(versions.len());
        if excess == 0 {
            return Ok(0);
        }

        for oldest in versions.iter().rev().take(excess) {
            store.delete(oldest.id)?;
        }
        info!(document = %document, removed = excess, kept = versions.len() - excess, "applied retention");
        Ok(excess)
    }
}
