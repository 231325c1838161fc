//! Block Version Cache
//!
//! Remembers the version observed at each height so a height is fetched from
//! the node at most once per run. Heights below the tip do not change while
//! monitoring, so an entry stays valid for the whole run.

use std::collections::BTreeMap;
use tracing::trace;

use crate::types::{BlockHeight, BlockVersion};

/// In-memory height -> version map
#[derive(Debug, Default)]
pub struct BlockVersionCache {
    entries: BTreeMap<BlockHeight, BlockVersion>,
}

impl BlockVersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded version for a height, `None` on a miss
    pub fn get(&self, height: BlockHeight) -> Option<BlockVersion> {
        self.entries.get(&height).copied()
    }

    /// Record (or overwrite) the version for a height
    pub fn put(&mut self, height: BlockHeight, version: BlockVersion) {
        self.entries.insert(height, version);
    }

    pub fn contains(&self, height: BlockHeight) -> bool {
        self.entries.contains_key(&height)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every height strictly below `height`
    ///
    /// Returns the number of evicted entries.
    pub fn prune_below(&mut self, height: BlockHeight) -> usize {
        let kept = self.entries.split_off(&height);
        let removed = self.entries.len();
        self.entries = kept;

        if removed > 0 {
            trace!("Pruned {} cached heights below {}", removed, height);
        }
        removed
    }
}
