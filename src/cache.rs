//! TTL cache for the merged candidate set, with single-flight refresh
//! coordination.
//!
//! The cache holds one snapshot (the whole candidate set plus its fetch
//! timestamp) and replaces it atomically. Concurrent callers that find the
//! snapshot stale collapse into a single aggregation pass: the first takes
//! the refresh lock and fans out to the sources, late arrivals wait on the
//! same lock, re-check freshness, and reuse the result. Readers that merely
//! clone a fresh snapshot never contend with an in-flight refresh.

use crate::aggregate::Aggregator;
use crate::api::ModelCandidate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

struct Snapshot {
    candidates: Arc<[ModelCandidate]>,
    fetched_at: Instant,
}

/// Process-wide candidate cache for one router instance.
pub struct CandidateCache {
    aggregator: Aggregator,
    ttl: Duration,
    snapshot: RwLock<Option<Snapshot>>,
    /// Single-flight guard: at most one aggregation pass at a time.
    refresh_lock: Mutex<()>,
}

impl CandidateCache {
    /// A zero `ttl` means every read refreshes (still single-flight).
    pub fn new(aggregator: Aggregator, ttl: Duration) -> Self {
        Self {
            aggregator,
            ttl,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current candidate set, refreshing first when the snapshot is absent or
    /// stale. Infallible: on a refresh where every source failed, the last
    /// good snapshot is served if one exists, else an empty set.
    pub async fn get_candidates(&self) -> Arc<[ModelCandidate]> {
        if let Some(candidates) = self.fresh_snapshot().await {
            tracing::debug!(count = candidates.len(), "Serving cached candidates");
            return candidates;
        }
        self.refresh(false).await
    }

    /// Refresh regardless of snapshot age.
    pub async fn force_refresh(&self) -> Arc<[ModelCandidate]> {
        self.refresh(true).await
    }

    /// Drop the snapshot so the next read must refresh.
    pub async fn invalidate(&self) {
        let mut guard = self.snapshot.write().await;
        *guard = None;
    }

    async fn fresh_snapshot(&self) -> Option<Arc<[ModelCandidate]>> {
        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .filter(|snapshot| snapshot.fetched_at.elapsed() < self.ttl)
            .map(|snapshot| snapshot.candidates.clone())
    }

    async fn refresh(&self, force: bool) -> Arc<[ModelCandidate]> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have completed the refresh while we waited on
        // the lock; serve its result instead of fanning out again.
        if !force {
            if let Some(candidates) = self.fresh_snapshot().await {
                return candidates;
            }
        }

        let start = Instant::now();
        let pass = self.aggregator.aggregate().await;
        metrics::histogram!("candidate_cache.refresh.duration_seconds")
            .record(start.elapsed().as_secs_f64());

        if pass.is_complete_failure() {
            metrics::counter!("candidate_cache.refresh.total", "status" => "failure").increment(1);
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                // Stale data over no data. fetched_at is left untouched so
                // the next read retries the sources.
                tracing::warn!(
                    count = snapshot.candidates.len(),
                    "Every source failed; serving previous snapshot"
                );
                return snapshot.candidates.clone();
            }
            tracing::warn!("Every source failed and no snapshot exists; serving empty set");
            return Arc::from(Vec::new());
        }

        metrics::counter!("candidate_cache.refresh.total", "status" => "success").increment(1);
        tracing::info!(
            count = pass.candidates.len(),
            failed_sources = pass.failed_sources,
            total_sources = pass.total_sources,
            "Candidate cache refreshed"
        );

        let candidates: Arc<[ModelCandidate]> = pass.candidates.into();
        let mut guard = self.snapshot.write().await;
        *guard = Some(Snapshot {
            candidates: candidates.clone(),
            fetched_at: Instant::now(),
        });
        candidates
    }
}
