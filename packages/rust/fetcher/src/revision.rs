//! Detail-page revision resolution.
//!
//! The revision tag comes from, in order of trust:
//! 1. the canonical link, when it ends in `.../abs/NNNN.NNNNNvK`;
//! 2. a standalone `vK` token in the page's `h1` text;
//! 3. [`DEFAULT_REVISION`].

use std::sync::LazyLock;

use arxivdigest_shared::{DEFAULT_REVISION, ResolvedRecord, Stub};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use crate::Fetcher;

static CANONICAL_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel="canonical"]"#).expect("canonical selector")
});
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("h1 selector"));

static CANONICAL_REVISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/abs/\d{4}\.\d{5}(v\d+)$").expect("canonical revision regex")
});
static TOKEN_REVISION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(v\d+)\b").expect("token revision regex"));

/// Extract a revision tag from a detail page, if it reveals one.
pub fn extract_revision(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    canonical_revision(&doc).or_else(|| heading_revision(&doc))
}

fn canonical_revision(doc: &Html) -> Option<String> {
    let href = doc
        .select(&CANONICAL_SEL)
        .find_map(|el| el.value().attr("href"))?;
    CANONICAL_REVISION_RE
        .captures(href.trim())
        .map(|caps| caps[1].to_string())
}

fn heading_revision(doc: &Html) -> Option<String> {
    let heading = doc
        .select(&H1_SEL)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ");
    TOKEN_REVISION_RE
        .captures(&heading)
        .map(|caps| caps[1].to_string())
}

/// Fetch the stub's detail page and attach its revision.
///
/// Never fails: fetch errors and pages without a recognisable tag both yield
/// [`DEFAULT_REVISION`].
#[instrument(skip_all, fields(identifier = %stub.identifier))]
pub async fn resolve<F: Fetcher>(fetcher: &F, stub: Stub) -> ResolvedRecord {
    let revision = match fetcher.fetch(&stub.abstract_url).await {
        Ok(html) => extract_revision(&html).unwrap_or_else(|| {
            debug!("no revision on detail page, using default");
            DEFAULT_REVISION.to_string()
        }),
        Err(e) => {
            warn!(url = %stub.abstract_url, error = %e, "detail fetch failed, using default revision");
            DEFAULT_REVISION.to_string()
        }
    };

    ResolvedRecord { stub, revision }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpFetcher;
    use arxivdigest_shared::{Category, Section};
    use url::Url;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/abs/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn stub_at(base: &str, id: &str) -> Stub {
        Stub {
            identifier: id.into(),
            source: Category {
                code: "math.QA".into(),
                priority: 0,
            },
            section: Section::New,
            declared_categories: vec!["math.QA".into()],
            abstract_url: Url::parse(&format!("{base}/abs/{id}")).unwrap(),
        }
    }

    #[test]
    fn canonical_link_wins() {
        let html = load_fixture("canonical_v3.html");
        assert_eq!(extract_revision(&html).as_deref(), Some("v3"));
    }

    #[test]
    fn heading_is_second_choice() {
        let html = load_fixture("heading_v2.html");
        assert_eq!(extract_revision(&html).as_deref(), Some("v2"));
    }

    #[test]
    fn nothing_found() {
        let html = load_fixture("plain.html");
        assert_eq!(extract_revision(&html), None);
    }

    #[test]
    fn canonical_beats_heading() {
        let html = r#"<html><head><link rel="canonical" href="https://arxiv.org/abs/2401.00010v4"></head>
            <body><h1>Title v2</h1></body></html>"#;
        assert_eq!(extract_revision(html).as_deref(), Some("v4"));
    }

    #[test]
    fn heading_token_must_stand_alone() {
        let html = r#"<html><body><h1>[2401.00002v2] Braided categories</h1></body></html>"#;
        assert_eq!(extract_revision(html), None);
    }

    #[tokio::test]
    async fn resolve_reads_detail_page() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/abs/2401.00010"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(load_fixture("canonical_v3.html")),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(5).unwrap();
        let record = resolve(&fetcher, stub_at(&server.uri(), "2401.00010")).await;
        assert_eq!(record.revision, "v3");
        assert_eq!(record.stub.identifier, "2401.00010");
    }

    #[tokio::test]
    async fn resolve_defaults_on_fetch_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/abs/2401.00002"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(5).unwrap();
        let record = resolve(&fetcher, stub_at(&server.uri(), "2401.00002")).await;
        assert_eq!(record.revision, DEFAULT_REVISION);
    }
}
