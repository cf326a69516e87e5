//! End-to-end run: categories → listings → dedup → resolve → sorted batches.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use arxivdigest_fetcher::{Fetcher, revision};
use arxivdigest_listing::parse_listing;
use arxivdigest_shared::{
    Category, DigestConfig, DigestError, EmittedRecord, ResolvedRecord, Result, Stub, listing_url,
};

use crate::buffer::CompletionBuffer;
use crate::dedup::Deduplicator;

/// Result of an aggregation run.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// Every released record, in emission order.
    pub records: Vec<EmittedRecord>,
    /// Categories whose listing was fetched and parsed.
    pub categories_visited: usize,
    /// Stubs admitted by the deduplicator.
    pub stubs_admitted: usize,
    /// Stubs dropped because their identifier was already admitted.
    pub duplicates_skipped: usize,
    /// Listing failures (URL, error message). The category is skipped.
    pub errors: Vec<(String, String)>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a listing is parsed and deduplicated.
    fn listing_parsed(&self, category: &Category, admitted: usize, duplicates: usize);
    /// Called as each detail page is resolved.
    fn record_resolved(&self, identifier: &str, current: usize, total: usize);
    /// Called with each sorted batch as it is released.
    fn batch_released(&self, category: &Category, batch: &[EmittedRecord]);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn listing_parsed(&self, _category: &Category, _admitted: usize, _duplicates: usize) {}
    fn record_resolved(&self, _identifier: &str, _current: usize, _total: usize) {}
    fn batch_released(&self, _category: &Category, _batch: &[EmittedRecord]) {}
}

/// State owned by a single run.
#[derive(Default)]
struct RunState {
    dedup: Deduplicator,
    buffer: CompletionBuffer,
}

/// Aggregate the configured categories into one ordered record sequence.
///
/// Listings are fetched one at a time in `config.categories` order; detail
/// pages within a category are resolved concurrently, bounded by
/// `config.concurrency`. A listing that cannot be fetched is logged, recorded
/// in [`AggregateResult::errors`] and skipped.
#[instrument(skip_all, fields(categories = config.categories.len()))]
pub async fn aggregate<F: Fetcher>(
    fetcher: Arc<F>,
    config: &DigestConfig,
    progress: &dyn ProgressReporter,
) -> Result<AggregateResult> {
    if config.categories.is_empty() {
        return Err(DigestError::validation("no categories to aggregate"));
    }

    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut state = RunState::default();
    let mut result = AggregateResult::default();

    let codes: Vec<&str> = config.categories.iter().map(|c| c.code.as_str()).collect();
    info!(
        categories = ?codes,
        concurrency = config.concurrency,
        "starting aggregation"
    );

    for category in &config.categories {
        progress.phase(&format!("Fetching listing for {category}"));

        let url = match listing_url(&config.base_url, &category.code) {
            Ok(url) => url,
            Err(e) => {
                warn!(%category, error = %e, "cannot build listing URL, skipping category");
                result.errors.push((category.code.clone(), e.to_string()));
                continue;
            }
        };

        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "listing fetch failed, skipping category");
                result.errors.push((url.to_string(), e.to_string()));
                continue;
            }
        };
        result.categories_visited += 1;

        let stubs = parse_listing(&html, &url, category, &config.targets);
        let mut admitted = Vec::with_capacity(stubs.len());
        let mut duplicates = 0;
        for stub in stubs {
            if state.dedup.admit(&stub.identifier) {
                admitted.push(stub);
            } else {
                debug!(identifier = %stub.identifier, %category, "already admitted, skipping");
                duplicates += 1;
            }
        }
        result.stubs_admitted += admitted.len();
        result.duplicates_skipped += duplicates;
        progress.listing_parsed(category, admitted.len(), duplicates);

        info!(
            %category,
            admitted = admitted.len(),
            duplicates,
            total_admitted = state.dedup.admitted(),
            "listing processed"
        );

        if admitted.is_empty() {
            continue;
        }

        progress.phase(&format!("Resolving {} entries for {category}", admitted.len()));
        state.buffer.expect(&category.code, admitted.len());
        let batch = resolve_batch(&fetcher, &semaphore, admitted, &mut state.buffer, progress).await;

        progress.batch_released(category, &batch);
        result.records.extend(batch);
    }

    result.elapsed = start.elapsed();

    info!(
        records = result.records.len(),
        categories_visited = result.categories_visited,
        duplicates = result.duplicates_skipped,
        errors = result.errors.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "aggregation complete"
    );

    Ok(result)
}

/// Resolve one category's admitted stubs concurrently and feed the buffer
/// from this task only. Returns whatever the buffer released.
async fn resolve_batch<F: Fetcher>(
    fetcher: &Arc<F>,
    semaphore: &Arc<Semaphore>,
    stubs: Vec<Stub>,
    buffer: &mut CompletionBuffer,
    progress: &dyn ProgressReporter,
) -> Vec<EmittedRecord> {
    let total = stubs.len();
    let mut outstanding: BTreeMap<String, Stub> = stubs
        .iter()
        .map(|stub| (stub.identifier.clone(), stub.clone()))
        .collect();

    let mut tasks = JoinSet::new();
    for stub in stubs {
        let fetcher = Arc::clone(fetcher);
        let semaphore = Arc::clone(semaphore);
        tasks.spawn(async move {
            // Holding the acquire result keeps the permit for the task's lifetime.
            let _permit = semaphore.acquire_owned().await;
            revision::resolve(fetcher.as_ref(), stub).await
        });
    }

    let mut released = Vec::new();
    let mut done = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(record) => {
                outstanding.remove(&record.stub.identifier);
                done += 1;
                progress.record_resolved(&record.stub.identifier, done, total);
                if let Some(batch) = buffer.accept(record) {
                    released.extend(batch);
                }
            }
            Err(e) => warn!(error = %e, "resolution task failed"),
        }
    }

    // Tasks that died never reported back; their stubs still owe a record.
    for (identifier, stub) in outstanding {
        warn!(%identifier, "no resolution result, using default revision");
        done += 1;
        progress.record_resolved(&identifier, done, total);
        if let Some(batch) = buffer.accept(ResolvedRecord::with_default_revision(stub)) {
            released.extend(batch);
        }
    }

    released
}
