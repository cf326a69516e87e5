//! Run-wide identifier registry.

use std::collections::HashSet;

/// Remembers every identifier admitted during a run so that entries
/// cross-listed under several target categories are fetched and emitted once.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    /// Empty registry for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `identifier` is seen, `false` afterwards.
    pub fn admit(&mut self, identifier: &str) -> bool {
        if self.seen.contains(identifier) {
            return false;
        }
        self.seen.insert(identifier.to_string())
    }

    /// Number of identifiers admitted so far.
    pub fn admitted(&self) -> usize {
        self.seen.len()
    }
}
