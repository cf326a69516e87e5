//! Core domain types for the listing aggregation pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DigestError, Result};

/// Revision assumed when a detail page does not reveal one.
pub const DEFAULT_REVISION: &str = "v1";

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A target category code together with its resolved priority rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    /// Category code, e.g. `math.QA`.
    pub code: String,
    /// Ordering rank; lower is emitted earlier.
    pub priority: u32,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Listing page grouping an entry was found under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Section {
    New,
    Cross,
    Replacement,
    #[default]
    Other,
}

static NEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnew submissions?\b").expect("new section regex"));

static CROSS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bcross-?lists?\b|\bcross submissions?\b").expect("cross section regex")
});

static REPLACEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\breplacements?\b|\breplacement submissions?\b")
        .expect("replacement section regex")
});

impl Section {
    /// Classify a listing heading. Matching is case-insensitive; anything
    /// unrecognised (including an empty heading) is [`Section::Other`].
    pub fn classify(heading: &str) -> Self {
        let normalized = heading.trim().to_lowercase();
        if NEW_RE.is_match(&normalized) {
            Self::New
        } else if CROSS_RE.is_match(&normalized) {
            Self::Cross
        } else if REPLACEMENT_RE.is_match(&normalized) {
            Self::Replacement
        } else {
            Self::Other
        }
    }

    /// Intra-category sort rank (New=0 .. Other=3).
    pub fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Cross => 1,
            Self::Replacement => 2,
            Self::Other => 3,
        }
    }

    /// Label used in emitted records.
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Cross => "cross",
            Self::Replacement => "repl",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Stub / ResolvedRecord
// ---------------------------------------------------------------------------

/// A listing entry that passed filtering and awaits revision resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    /// Canonical repository identifier, e.g. `2401.00010`.
    pub identifier: String,
    /// Category whose listing produced this entry.
    pub source: Category,
    /// Listing section the entry appeared under.
    pub section: Section,
    /// Subject codes declared by the entry; empty when the listing had none.
    pub declared_categories: Vec<String>,
    /// Absolute URL of the entry's abstract (detail) page.
    pub abstract_url: Url,
}

impl Stub {
    /// URL of the full document, derived from the abstract URL.
    pub fn document_url(&self) -> Url {
        document_url(&self.abstract_url)
    }
}

/// A stub with its resolved revision tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub stub: Stub,
    /// Revision tag such as `v1` or `v3`.
    pub revision: String,
}

impl ResolvedRecord {
    /// Record carrying [`DEFAULT_REVISION`].
    pub fn with_default_revision(stub: Stub) -> Self {
        Self {
            stub,
            revision: DEFAULT_REVISION.to_string(),
        }
    }

    /// Compare by category priority, then section rank, then identifier descending.
    pub fn emission_order(&self, other: &Self) -> std::cmp::Ordering {
        let (a, b) = (&self.stub, &other.stub);
        a.source
            .priority
            .cmp(&b.source.priority)
            .then_with(|| a.section.rank().cmp(&b.section.rank()))
            .then_with(|| b.identifier.cmp(&a.identifier))
    }
}

// ---------------------------------------------------------------------------
// EmittedRecord
// ---------------------------------------------------------------------------

/// The externally visible output unit. Sort keys are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedRecord {
    pub identifier: String,
    /// One of `new`, `cross`, `repl`, `other`.
    pub section: String,
    pub abstract_url: String,
    pub document_url: String,
    pub declared_categories: Vec<String>,
    pub revision: String,
}

impl From<ResolvedRecord> for EmittedRecord {
    fn from(record: ResolvedRecord) -> Self {
        let document_url = record.stub.document_url().to_string();
        let Stub {
            identifier,
            section,
            declared_categories,
            abstract_url,
            ..
        } = record.stub;
        Self {
            identifier,
            section: section.label().to_string(),
            abstract_url: abstract_url.to_string(),
            document_url,
            declared_categories,
            revision: record.revision,
        }
    }
}

// ---------------------------------------------------------------------------
// URL derivation
// ---------------------------------------------------------------------------

/// Listing page URL for a category: `{base}/list/{code}/new`.
pub fn listing_url(base: &Url, code: &str) -> Result<Url> {
    let raw = format!("{}/list/{code}/new", base.as_str().trim_end_matches('/'));
    Url::parse(&raw)
        .map_err(|e| DigestError::validation(format!("invalid listing URL '{raw}': {e}")))
}

/// Full document URL: the `/abs/` path segment becomes `/pdf/`.
pub fn document_url(abstract_url: &Url) -> Url {
    let mut url = abstract_url.clone();
    let path = abstract_url.path().replace("/abs/", "/pdf/");
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(id: &str, priority: u32, section: Section) -> Stub {
        Stub {
            identifier: id.into(),
            source: Category {
                code: "math.QA".into(),
                priority,
            },
            section,
            declared_categories: vec!["math.QA".into()],
            abstract_url: Url::parse(&format!("https://arxiv.org/abs/{id}")).unwrap(),
        }
    }

    #[test]
    fn classify_headings() {
        assert_eq!(Section::classify("New submissions (showing 12 of 12 entries)"), Section::New);
        assert_eq!(Section::classify("NEW SUBMISSION"), Section::New);
        assert_eq!(Section::classify("Cross-lists (showing 3 of 3 entries)"), Section::Cross);
        assert_eq!(Section::classify("Crosslist"), Section::Cross);
        assert_eq!(Section::classify("Cross submissions"), Section::Cross);
        assert_eq!(Section::classify("Replacements"), Section::Replacement);
        assert_eq!(Section::classify("Replacement submissions"), Section::Replacement);
        assert_eq!(Section::classify("Announcements"), Section::Other);
        assert_eq!(Section::classify(""), Section::Other);
    }

    #[test]
    fn section_ranks_and_labels() {
        let all = [Section::New, Section::Cross, Section::Replacement, Section::Other];
        let ranks: Vec<u8> = all.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        let labels: Vec<&str> = all.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["new", "cross", "repl", "other"]);
    }

    #[test]
    fn emission_order_keys() {
        let a = ResolvedRecord::with_default_revision(stub("2401.00002", 0, Section::Cross));
        let b = ResolvedRecord::with_default_revision(stub("2401.00010", 0, Section::New));
        let c = ResolvedRecord::with_default_revision(stub("2401.00009", 0, Section::New));
        let d = ResolvedRecord::with_default_revision(stub("2401.99999", 1, Section::New));

        let mut records = vec![d.clone(), a.clone(), c.clone(), b.clone()];
        records.sort_by(ResolvedRecord::emission_order);
        let ids: Vec<&str> = records.iter().map(|r| r.stub.identifier.as_str()).collect();
        assert_eq!(ids, vec!["2401.00010", "2401.00009", "2401.00002", "2401.99999"]);
    }

    #[test]
    fn emitted_record_strips_sort_keys() {
        let record = ResolvedRecord {
            stub: stub("2401.00010", 0, Section::Replacement),
            revision: "v2".into(),
        };
        let emitted = EmittedRecord::from(record);
        assert_eq!(emitted.section, "repl");
        assert_eq!(emitted.document_url, "https://arxiv.org/pdf/2401.00010");
        assert_eq!(emitted.revision, "v2");

        let json = serde_json::to_value(&emitted).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        assert!(json.get("priority").is_none());
        assert!(json.get("section_rank").is_none());
    }

    #[test]
    fn listing_url_template() {
        let base = Url::parse("https://arxiv.org").unwrap();
        assert_eq!(
            listing_url(&base, "math.QA").unwrap().as_str(),
            "https://arxiv.org/list/math.QA/new"
        );

        let mirror = Url::parse("http://localhost:8080/arxiv/").unwrap();
        assert_eq!(
            listing_url(&mirror, "cs.CV").unwrap().as_str(),
            "http://localhost:8080/arxiv/list/cs.CV/new"
        );
    }

    #[test]
    fn document_url_substitutes_segment() {
        let abs = Url::parse("https://arxiv.org/abs/2401.00010").unwrap();
        assert_eq!(document_url(&abs).as_str(), "https://arxiv.org/pdf/2401.00010");
    }
}
