//! Candidate aggregation: concurrent source fan-out, static merge, pattern
//! filtering, and de-duplication by display name.

use crate::api::{ModelCandidate, SourceKind};
use crate::error::RouterError;
use crate::traits::CandidateSource;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Pattern value selecting every static candidate, regardless of name.
///
/// The keyword is inclusive, not exclusive: it widens the ordinary substring
/// match, so a *discovered* candidate whose display name happens to contain
/// `"static"` still passes the filter alongside the static entries.
pub const STATIC_PATTERN_KEYWORD: &str = "static";

/// Default bound on a single source listing call.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one aggregation pass.
#[derive(Debug)]
pub struct AggregatePass {
    /// The merged, filtered, de-duplicated candidate set, in aggregation
    /// order: static candidates first, then each source in configured order.
    pub candidates: Vec<ModelCandidate>,
    /// How many sources failed or timed out this pass.
    pub failed_sources: usize,
    /// How many sources were queried.
    pub total_sources: usize,
    /// How many static candidates entered the merge (before filtering).
    pub static_count: usize,
}

impl AggregatePass {
    /// True when the pass produced nothing because every configured source
    /// failed and no static candidates exist. The cache keeps its previous
    /// snapshot in this case. An empty result from *working* sources is a
    /// valid (empty) pass, not a failure.
    pub fn is_complete_failure(&self) -> bool {
        self.total_sources > 0
            && self.failed_sources == self.total_sources
            && self.static_count == 0
    }
}

/// Merges candidates from every registry source and the static list into one
/// unified set.
///
/// Precedence is fixed: static candidates are concatenated ahead of
/// discovered ones, so the first-occurrence de-duplication rule makes static
/// configuration override discovery on name collisions. Static config is
/// explicit operator intent.
pub struct Aggregator {
    sources: Vec<Arc<dyn CandidateSource>>,
    static_candidates: Vec<ModelCandidate>,
    pattern: Option<String>,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn CandidateSource>>,
        static_candidates: Vec<ModelCandidate>,
        pattern: Option<String>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            static_candidates,
            pattern,
            source_timeout,
        }
    }

    /// Run one aggregation pass. Never fails: a failing or slow source
    /// contributes zero candidates and a warning, and an empty total result
    /// is a valid outcome.
    pub async fn aggregate(&self) -> AggregatePass {
        let mut joins = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = source.clone();
            let timeout = self.source_timeout;
            joins.spawn(async move {
                let origin = source.origin().to_string();
                let start = Instant::now();
                let result = match tokio::time::timeout(timeout, source.list_candidates()).await {
                    Ok(result) => result,
                    Err(_) => Err(RouterError::Timeout),
                };
                metrics::histogram!(
                    "registry_fetch.duration_seconds",
                    "origin" => origin.clone()
                )
                .record(start.elapsed().as_secs_f64());
                (index, origin, result)
            });
        }

        // Listing order within a source and configured source order are both
        // preserved, regardless of completion order.
        let mut per_source: Vec<Option<Vec<ModelCandidate>>> = Vec::new();
        per_source.resize_with(self.sources.len(), || None);
        let mut failed_sources = 0;

        while let Some(joined) = joins.join_next().await {
            match joined {
                Ok((index, origin, Ok(candidates))) => {
                    metrics::counter!(
                        "registry_fetch.total",
                        "origin" => origin.clone(),
                        "status" => "success"
                    )
                    .increment(1);
                    tracing::debug!(origin = %origin, count = candidates.len(), "Source listed");
                    per_source[index] = Some(candidates);
                }
                Ok((_, origin, Err(e))) => {
                    metrics::counter!(
                        "registry_fetch.total",
                        "origin" => origin.clone(),
                        "status" => "failure"
                    )
                    .increment(1);
                    tracing::warn!(
                        origin = %origin,
                        error = %e,
                        "Source listing failed; continuing without it"
                    );
                    failed_sources += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Source listing task aborted; continuing without it");
                    failed_sources += 1;
                }
            }
        }

        let mut merged = self.static_candidates.clone();
        for candidates in per_source.into_iter().flatten() {
            merged.extend(candidates);
        }

        if let Some(pattern) = &self.pattern {
            merged.retain(|candidate| matches_pattern(candidate, pattern));
        }

        AggregatePass {
            candidates: dedupe_by_display_name(merged),
            failed_sources,
            total_sources: self.sources.len(),
            static_count: self.static_candidates.len(),
        }
    }
}

/// Case-insensitive substring match against the display name, with the
/// literal keyword `"static"` additionally selecting every static candidate.
/// See [`STATIC_PATTERN_KEYWORD`] for the inclusive semantics.
pub(crate) fn matches_pattern(candidate: &ModelCandidate, pattern: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    if pattern == STATIC_PATTERN_KEYWORD && candidate.source_kind == SourceKind::Static {
        return true;
    }
    candidate
        .display_name
        .to_ascii_lowercase()
        .contains(&pattern)
}

/// Keep the first occurrence of each display name, in order.
pub(crate) fn dedupe_by_display_name(candidates: Vec<ModelCandidate>) -> Vec<ModelCandidate> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(candidate.display_name.clone()) {
            unique.push(candidate);
        } else {
            tracing::debug!(
                name = %candidate.display_name,
                origin = %candidate.origin,
                "Dropping duplicate candidate"
            );
        }
    }
    unique
}
