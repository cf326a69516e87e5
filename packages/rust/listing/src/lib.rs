//! Listing page parser.
//!
//! A category's "new submissions" page is a flat run of `h3` headings and `dl`
//! entry lists under `div#dlpage`. Parsing happens in two passes:
//! - [`blocks`] classifies each top-level block as a heading (already mapped
//!   to a [`Section`]) or a list of raw `dt`/`dd` entries;
//! - [`parse_listing`] folds over those blocks, carrying the current section
//!   forward and turning each eligible entry into a [`Stub`].
//!
//! Malformed entries and entries outside the target categories are dropped;
//! nothing here fails the scan.

mod blocks;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use arxivdigest_shared::{Category, Section, Stub};
use regex::Regex;
use scraper::Html;
use tracing::debug;
use url::Url;

pub use blocks::{Block, RawEntry, classify_blocks};

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Identifier inside an abstract link, e.g. `/abs/2401.00010`.
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/abs/([0-9]{4}\.[0-9]{5})").expect("identifier regex")
});

/// Bracketed subject code, e.g. `(math.QA)`.
static SUBJECT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([a-z\-]+\.[A-Z]{2})\)").expect("subject code regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a listing document into stubs, in document order.
///
/// `page_url` resolves relative abstract links; `source` is stamped on every
/// stub; `targets` is the set of category codes an entry must declare at least
/// one of. Entries with no subject text at all are kept (fail-open).
pub fn parse_listing(
    html: &str,
    page_url: &Url,
    source: &Category,
    targets: &BTreeSet<String>,
) -> Vec<Stub> {
    let doc = Html::parse_document(html);
    let blocks = classify_blocks(&doc);
    let stubs = fold_blocks(blocks, page_url, source, targets);

    debug!(category = %source, stubs = stubs.len(), "listing parsed");
    stubs
}

/// Walk classified blocks, tagging each entry with the section of the most
/// recent heading (initially [`Section::Other`]).
pub fn fold_blocks(
    blocks: Vec<Block>,
    page_url: &Url,
    source: &Category,
    targets: &BTreeSet<String>,
) -> Vec<Stub> {
    blocks
        .into_iter()
        .scan(Section::Other, |section, block| {
            let tagged: Vec<(Section, RawEntry)> = match block {
                Block::Heading(next) => {
                    *section = next;
                    Vec::new()
                }
                Block::List(entries) => entries.into_iter().map(|e| (*section, e)).collect(),
            };
            Some(tagged)
        })
        .flatten()
        .filter_map(|(section, entry)| build_stub(entry, section, page_url, source, targets))
        .collect()
}

fn build_stub(
    entry: RawEntry,
    section: Section,
    page_url: &Url,
    source: &Category,
    targets: &BTreeSet<String>,
) -> Option<Stub> {
    let href = entry.abstract_href?;
    let abstract_url = page_url.join(&href).ok()?;
    let identifier = IDENTIFIER_RE
        .captures(abstract_url.as_str())
        .map(|caps| caps[1].to_string())?;

    let declared = declared_categories(&entry.subjects);

    // Fail-open: no subject text means no basis for filtering.
    let keep = entry.subjects.is_empty() || declared.iter().any(|code| targets.contains(code));
    if !keep {
        debug!(
            %identifier,
            categories = ?declared,
            targets = ?targets,
            "skipped entry outside target categories"
        );
        return None;
    }

    Some(Stub {
        identifier,
        source: source.clone(),
        section,
        declared_categories: declared.into_iter().collect(),
        abstract_url,
    })
}

/// Extract the bracketed subject codes from an entry's subject line.
pub fn declared_categories(subjects: &str) -> BTreeSet<String> {
    SUBJECT_CODE_RE
        .captures_iter(subjects)
        .map(|caps| caps[1].to_string())
        .collect()
}
