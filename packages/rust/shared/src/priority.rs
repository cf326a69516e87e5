//! Category prioritizer.
//!
//! Categories are ranked through an explicit override table; every code not in
//! the table shares one default rank that sorts after all overrides. The crawl
//! visits listing pages in this order, one at a time, so cross-category
//! ordering comes from visit order.

use std::collections::{BTreeMap, HashSet};

use crate::types::Category;

/// Baseline rank for codes without an override.
pub const DEFAULT_PRIORITY: u32 = 99;

/// Highest rank an override may take; the default must still sort after it.
pub const MAX_OVERRIDE: u32 = u32::MAX - 1;

/// Override table mapping category codes to ranks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPriorities {
    overrides: BTreeMap<String, u32>,
    default_rank: u32,
}

impl CategoryPriorities {
    /// Build from an explicit override table.
    ///
    /// Overrides above [`MAX_OVERRIDE`] leave no room for a strictly greater
    /// default; [`crate::config::DigestConfig`] rejects them.
    pub fn new(overrides: BTreeMap<String, u32>) -> Self {
        let default_rank = overrides
            .values()
            .max()
            .map_or(DEFAULT_PRIORITY, |max| DEFAULT_PRIORITY.max(max.saturating_add(1)));
        Self {
            overrides,
            default_rank,
        }
    }

    /// Rank for `code`. Any string is accepted.
    pub fn priority(&self, code: &str) -> u32 {
        self.overrides
            .get(code)
            .copied()
            .unwrap_or(self.default_rank)
    }

    /// Rank shared by all codes without an override.
    pub fn default_rank(&self) -> u32 {
        self.default_rank
    }

    /// Trim, de-duplicate (first occurrence wins) and stable-sort codes by rank.
    pub fn order<I, S>(&self, codes: I) -> Vec<Category>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut categories: Vec<Category> = codes
            .into_iter()
            .filter_map(|code| {
                let code = code.as_ref().trim();
                if code.is_empty() || !seen.insert(code.to_string()) {
                    return None;
                }
                Some(Category {
                    code: code.to_string(),
                    priority: self.priority(code),
                })
            })
            .collect();
        categories.sort_by_key(|c| c.priority);
        categories
    }
}

impl Default for CategoryPriorities {
    /// `math.QA` precedes `math.RT`; everything else follows both.
    fn default() -> Self {
        Self::new(default_overrides())
    }
}

/// Built-in override table.
pub(crate) fn default_overrides() -> BTreeMap<String, u32> {
    BTreeMap::from([("math.QA".to_string(), 0), ("math.RT".to_string(), 1)])
}
