//! Block classification for listing pages.

use std::sync::LazyLock;

use arxivdigest_shared::Section;
use scraper::{ElementRef, Html, Selector};

static BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#dlpage > h3, div#dlpage > dl").expect("block selector")
});
static DT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt").expect("dt selector"));
static DD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dd").expect("dd selector"));
static ABSTRACT_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[title="Abstract"]"#).expect("abstract link selector")
});
static ABS_HREF_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="/abs/"]"#).expect("abs href selector")
});
static SUBJECTS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".list-subjects").expect("subjects selector"));

/// A top-level listing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// An `h3` heading, already classified.
    Heading(Section),
    /// A `dl` of entries.
    List(Vec<RawEntry>),
}

/// One `dt`/`dd` pair, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    /// Href of the abstract link, as written in the page.
    pub abstract_href: Option<String>,
    /// Subject line text; empty when the entry has none.
    pub subjects: String,
}

/// Classify the page's top-level blocks in document order.
pub fn classify_blocks(doc: &Html) -> Vec<Block> {
    doc.select(&BLOCK_SEL)
        .filter_map(|el| match el.value().name() {
            "h3" => {
                let heading = el.text().collect::<String>();
                Some(Block::Heading(Section::classify(&heading)))
            }
            "dl" => Some(Block::List(list_entries(el))),
            _ => None,
        })
        .collect()
}

/// Pair up `dt` and `dd` elements in order; unpaired trailing items are ignored.
fn list_entries(dl: ElementRef<'_>) -> Vec<RawEntry> {
    dl.select(&DT_SEL)
        .zip(dl.select(&DD_SEL))
        .map(|(dt, dd)| RawEntry {
            abstract_href: abstract_href(dt),
            subjects: subject_text(dd),
        })
        .collect()
}

fn abstract_href(dt: ElementRef<'_>) -> Option<String> {
    dt.select(&ABSTRACT_LINK_SEL)
        .chain(dt.select(&ABS_HREF_SEL))
        .find_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn subject_text(dd: ElementRef<'_>) -> String {
    dd.select(&SUBJECTS_SEL)
        .flat_map(|el| el.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
