//! Bounded lookup pool
//!
//! A fixed number of tokio tasks drain one shared queue of identifiers.
//! Popping the queue is the only contended operation. Workers send each
//! outcome over a channel as soon as it is known, and the map is built by
//! the caller once every worker has exited.

use crate::config::LookupConfig;
use crate::lookup::LookupOutcome;
use crate::provider::{PageResult, SearchProvider, SearchRequest};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type WorkQueue = Arc<Mutex<VecDeque<String>>>;

/// Resolves identifiers to records with bounded concurrency
pub struct LookupPool {
    provider: Arc<dyn SearchProvider>,
    config: LookupConfig,
    cancel: Option<CancellationToken>,
}

impl LookupPool {
    pub fn new(provider: Arc<dyn SearchProvider>, config: LookupConfig) -> Self {
        Self {
            provider,
            config,
            cancel: None,
        }
    }

    /// Sets a token that stops workers before their next identifier
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of workers for `requested` concurrency over `ids` identifiers
    pub fn worker_count(&self, requested: usize, ids: usize) -> usize {
        requested
            .clamp(1, self.config.max_concurrency.max(1))
            .min(ids)
    }

    /// Resolves ids using the configured concurrency
    pub async fn resolve(&self, ids: &[String], location_id: &str) -> BTreeMap<String, LookupOutcome> {
        self.resolve_all(ids, location_id, self.config.concurrency)
            .await
    }

    /// Resolves every distinct id, returning one outcome per id
    ///
    /// Never fails: a failed search becomes an `error` outcome for that id,
    /// and an id left unresolved by cancellation or a crashed worker gets an
    /// `error` outcome too.
    pub async fn resolve_all(
        &self,
        ids: &[String],
        location_id: &str,
        concurrency: usize,
    ) -> BTreeMap<String, LookupOutcome> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
            .map(str::to_string)
            .collect();

        let workers = self.worker_count(concurrency, unique.len());
        if workers == 0 {
            return BTreeMap::new();
        }

        tracing::info!(
            "Resolving {} ids with {} workers (requested {})",
            unique.len(),
            workers,
            concurrency
        );

        let queue: WorkQueue = Arc::new(Mutex::new(unique.iter().cloned().collect()));
        let location_id: Arc<str> = Arc::from(location_id);

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut join_set = JoinSet::new();
        for worker in 0..workers {
            let provider = Arc::clone(&self.provider);
            let queue = Arc::clone(&queue);
            let location_id = Arc::clone(&location_id);
            let cancel = self.cancel.clone();
            let page_size = self.config.page_size;
            let sender = sender.clone();

            join_set.spawn(async move {
                run_worker(worker, provider, queue, location_id, page_size, cancel, sender).await
            });
        }
        drop(sender);

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                tracing::error!("Lookup worker failed: {}", e);
            }
        }

        // Every sender is gone once the workers have exited
        let mut outcomes = BTreeMap::new();
        while let Some(outcome) = receiver.recv().await {
            outcomes.insert(outcome.id.clone(), outcome);
        }

        let cancelled = self.cancel.as_ref().is_some_and(|t| t.is_cancelled());
        for id in unique {
            outcomes.entry(id.clone()).or_insert_with(|| {
                let reason = if cancelled {
                    "lookup cancelled before this id was resolved"
                } else {
                    "lookup worker stopped before this id was resolved"
                };
                LookupOutcome::error(id, reason)
            });
        }

        outcomes
    }
}

async fn run_worker(
    worker: usize,
    provider: Arc<dyn SearchProvider>,
    queue: WorkQueue,
    location_id: Arc<str>,
    page_size: u32,
    cancel: Option<CancellationToken>,
    outcomes: mpsc::UnboundedSender<LookupOutcome>,
) {
    let mut resolved = 0usize;

    loop {
        if cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            tracing::debug!("Lookup worker {} cancelled", worker);
            break;
        }

        let id = match pop(&queue) {
            Some(id) => id,
            None => break,
        };

        // Each search runs in its own task so a panic costs one id, not the worker
        let search = {
            let provider = Arc::clone(&provider);
            let request = SearchRequest::new(id.as_str(), &*location_id, page_size, 1);
            tokio::spawn(async move { provider.search(&request).await })
        };

        let outcome = match search.await {
            Ok(Ok(page)) => classify(&id, page),
            Ok(Err(e)) => {
                tracing::warn!("Lookup for '{}' failed: {}", id, e);
                LookupOutcome::error(id, e.to_string())
            }
            Err(e) => {
                tracing::error!("Lookup for '{}' aborted: {}", id, e);
                LookupOutcome::error(id, format!("lookup task failed: {}", e))
            }
        };

        if outcomes.send(outcome).is_err() {
            break;
        }
        resolved += 1;
    }

    tracing::debug!("Lookup worker {} resolved {} ids", worker, resolved);
}

fn pop(queue: &WorkQueue) -> Option<String> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

/// Classifies the records returned for `id`
pub fn classify(id: &str, page: PageResult) -> LookupOutcome {
    let mut records = page.entities;

    if let Some(position) = records.iter().position(|record| record.matches_id(id)) {
        return LookupOutcome::exact(id, records.swap_remove(position));
    }

    let candidates = records.len();
    match records.into_iter().next() {
        Some(first) => LookupOutcome::fuzzy(id, first, candidates),
        None => LookupOutcome::missing(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::lookup::MatchKind;
    use crate::provider::testing::{page, ScriptedProvider};
    use crate::provider::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(id: &str) -> Entity {
        Entity::new(json!({ "productId": id, "description": format!("Product {}", id) }))
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn pool(provider: Arc<dyn SearchProvider>) -> LookupPool {
        LookupPool::new(provider, LookupConfig::default())
    }

    #[tokio::test]
    async fn test_sequential_exact_matches() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_page("A", 1, page(vec![record("A")], None))
                .with_page("B", 1, page(vec![record("B")], None))
                .with_page("C", 1, page(vec![record("C")], None)),
        );

        let outcomes = pool(provider.clone())
            .resolve_all(&ids(&["A", "B", "C"]), "loc-1", 1)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.values().all(|o| o.match_kind == MatchKind::Exact));
        assert_eq!(provider.call_count(), 3);

        let calls = provider.calls();
        assert!(calls.iter().all(|r| r.page_size == 5 && r.cursor == 1 && r.location_id == "loc-1"));
    }

    #[tokio::test]
    async fn test_match_kinds() {
        let secondary = Entity::new(json!({ "productId": "999", "upc": "S" }));
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_page("E", 1, page(vec![record("X"), record("E")], None))
                .with_page("S", 1, page(vec![secondary.clone()], None))
                .with_page("F", 1, page(vec![record("F1"), record("F2")], None))
                .with_error("X", 1, TransportError::Status { status: 500, body: "down".into() }),
        );

        let outcomes = pool(provider)
            .resolve_all(&ids(&["E", "S", "F", "M", "X"]), "loc-1", 4)
            .await;

        assert_eq!(outcomes["E"].match_kind, MatchKind::Exact);
        assert_eq!(outcomes["E"].record, Some(record("E")));
        assert_eq!(outcomes["S"].match_kind, MatchKind::Exact);
        assert_eq!(outcomes["S"].record, Some(secondary));

        assert_eq!(outcomes["F"].match_kind, MatchKind::Fuzzy);
        assert_eq!(outcomes["F"].record, Some(record("F1")));

        assert_eq!(outcomes["M"].match_kind, MatchKind::Missing);
        assert!(outcomes["M"].record.is_none());

        assert_eq!(outcomes["X"].match_kind, MatchKind::Error);
        assert!(outcomes["X"].message.as_deref().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_empty_ids() {
        let provider = Arc::new(ScriptedProvider::new());
        let outcomes = pool(provider.clone()).resolve_all(&[], "loc-1", 8).await;

        assert!(outcomes.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_looked_up_once() {
        let provider = Arc::new(ScriptedProvider::new().with_page("A", 1, page(vec![record("A")], None)));
        let outcomes = pool(provider.clone())
            .resolve_all(&ids(&["A", " A", "A ", ""]), "loc-1", 8)
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_worker_count_clamps() {
        let config = LookupConfig {
            max_concurrency: 4,
            ..LookupConfig::default()
        };
        let pool = LookupPool::new(Arc::new(ScriptedProvider::new()), config);

        assert_eq!(pool.worker_count(0, 10), 1);
        assert_eq!(pool.worker_count(3, 10), 3);
        assert_eq!(pool.worker_count(100, 10), 4);
        assert_eq!(pool.worker_count(100, 2), 2);
        assert_eq!(pool.worker_count(8, 0), 0);
    }

    /// Tracks how many searches are in flight at once
    #[derive(Default)]
    struct InFlightTracker {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for InFlightTracker {
        async fn search(&self, request: &SearchRequest) -> Result<PageResult, TransportError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(page(vec![record(&request.term)], None))
        }
    }

    #[tokio::test]
    async fn test_in_flight_bounded_by_max_concurrency() {
        let tracker = Arc::new(InFlightTracker::default());
        let config = LookupConfig {
            max_concurrency: 3,
            ..LookupConfig::default()
        };
        let ids: Vec<String> = (0..12).map(|n| format!("id-{}", n)).collect();

        let outcomes = LookupPool::new(tracker.clone(), config)
            .resolve_all(&ids, "loc-1", 50)
            .await;

        assert_eq!(outcomes.len(), 12);
        assert!(outcomes.values().all(|o| o.match_kind == MatchKind::Exact));
        let peak = tracker.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert!(peak >= 1);
    }

    struct PanickingProvider;

    #[async_trait]
    impl SearchProvider for PanickingProvider {
        async fn search(&self, _request: &SearchRequest) -> Result<PageResult, TransportError> {
            panic!("provider blew up");
        }
    }

    #[tokio::test]
    async fn test_panicked_worker_does_not_fail_pool() {
        let outcomes = pool(Arc::new(PanickingProvider))
            .resolve_all(&ids(&["A"]), "loc-1", 1)
            .await;

        assert_eq!(outcomes["A"].match_kind, MatchKind::Error);
    }

    /// Panics on one term and answers every other term with an exact record
    #[derive(Default)]
    struct PanicOnTerm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for PanicOnTerm {
        async fn search(&self, request: &SearchRequest) -> Result<PageResult, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.term == "B" {
                panic!("provider blew up on B");
            }
            Ok(page(vec![record(&request.term)], Some(1)))
        }
    }

    #[tokio::test]
    async fn test_panic_costs_only_that_id() {
        let provider = Arc::new(PanicOnTerm::default());

        let outcomes = pool(provider.clone())
            .resolve_all(&ids(&["A", "B", "C"]), "loc-1", 1)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes["A"].match_kind, MatchKind::Exact);
        assert_eq!(outcomes["B"].match_kind, MatchKind::Error);
        assert!(outcomes["B"].message.as_deref().unwrap().contains("lookup task failed"));
        assert_eq!(outcomes["C"].match_kind, MatchKind::Exact);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_pool_makes_no_calls() {
        let provider = Arc::new(ScriptedProvider::new());
        let token = CancellationToken::new();
        token.cancel();

        let outcomes = pool(provider.clone())
            .with_cancellation(token)
            .resolve_all(&ids(&["A", "B"]), "loc-1", 2)
            .await;

        assert_eq!(provider.call_count(), 0);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes["A"].message.as_deref().unwrap().contains("cancelled"));
    }

    #[test]
    fn test_classify_prefers_exact_over_first() {
        let result = classify("B", page(vec![record("A"), record("B")], None));
        assert_eq!(result.match_kind, MatchKind::Exact);
        assert_eq!(result.record.and_then(|r| r.primary_id()), Some("B".to_string()));
    }
}
