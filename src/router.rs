//! The router facade: owns the candidate cache, resolves fallback groups for
//! incoming requests, and executes completions with candidate fallback.

use crate::aggregate::{Aggregator, DEFAULT_SOURCE_TIMEOUT};
use crate::api::{
    DEFAULT_CACHE_TTL, ModelCandidate, RegistrySource, RouterConfig, sanitize_static_candidates,
};
use crate::cache::CandidateCache;
use crate::discovery::HttpRegistryClient;
use crate::error::{Result, RouterError};
use crate::traits::{CandidateSource, ChatPayload, DispatchEngine, DispatchResponse};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Routes completion requests across candidates discovered from deployment
/// registries and configured statically.
///
/// Obtain an instance via [`ModelRouter::builder()`]. Each router owns its
/// own cache and source list; multiple independent routers can coexist in
/// one process.
pub struct ModelRouter {
    cache: CandidateCache,
    engine: Arc<dyn DispatchEngine>,
}

impl ModelRouter {
    /// Create a new [`ModelRouterBuilder`].
    pub fn builder() -> ModelRouterBuilder {
        ModelRouterBuilder::default()
    }

    /// Read-only view of the current merged candidate list, refreshed first
    /// when stale.
    pub async fn candidates(&self) -> Arc<[ModelCandidate]> {
        self.cache.get_candidates().await
    }

    /// Re-aggregate from every source regardless of cache age and return the
    /// result.
    pub async fn refresh_candidates(&self) -> Arc<[ModelCandidate]> {
        self.cache.force_refresh().await
    }

    /// Drop the cached candidate set so the next request re-discovers.
    pub async fn invalidate_cache(&self) {
        self.cache.invalidate().await
    }

    /// Build the fallback group for a request.
    ///
    /// With an explicit name: every candidate with that `display_name`, in
    /// cache order, or [`RouterError::ModelNotFound`]. Without one: the whole
    /// current candidate set. An empty merged set yields
    /// [`RouterError::NoCandidatesAvailable`] in either case.
    pub async fn resolve(&self, requested: Option<&str>) -> Result<Vec<ModelCandidate>> {
        let candidates = self.cache.get_candidates().await;
        if candidates.is_empty() {
            return Err(RouterError::NoCandidatesAvailable);
        }
        match requested {
            Some(name) => {
                let group: Vec<ModelCandidate> = candidates
                    .iter()
                    .filter(|candidate| candidate.display_name == name)
                    .cloned()
                    .collect();
                if group.is_empty() {
                    return Err(RouterError::ModelNotFound(name.to_string()));
                }
                Ok(group)
            }
            None => Ok(candidates.to_vec()),
        }
    }

    /// Resolve a fallback group and execute the payload against it.
    pub async fn complete(
        &self,
        requested: Option<&str>,
        payload: &ChatPayload,
    ) -> Result<DispatchResponse> {
        let group = self.resolve(requested).await?;
        self.execute(&group, payload).await
    }

    /// Dispatch to each candidate in `group`, in order, until one succeeds.
    ///
    /// Transport-class errors advance to the next candidate; any other error
    /// is surfaced immediately, since switching backends will not fix it.
    /// Exhausting the group yields [`RouterError::AllCandidatesFailed`]
    /// wrapping the last transport error.
    #[tracing::instrument(skip(self, group, payload), fields(group_size = group.len()))]
    pub async fn execute(
        &self,
        group: &[ModelCandidate],
        payload: &ChatPayload,
    ) -> Result<DispatchResponse> {
        if group.is_empty() {
            return Err(RouterError::NoCandidatesAvailable);
        }

        let mut attempts = 0;
        let mut last_error = None;
        for candidate in group {
            attempts += 1;
            let start = Instant::now();
            let result = self.engine.dispatch(candidate, payload).await;

            metrics::histogram!(
                "dispatch.duration_seconds",
                "model" => candidate.display_name.clone()
            )
            .record(start.elapsed().as_secs_f64());
            let status = if result.is_ok() { "success" } else { "failure" };
            metrics::counter!(
                "dispatch.total",
                "model" => candidate.display_name.clone(),
                "status" => status
            )
            .increment(1);

            match result {
                Ok(response) => {
                    tracing::debug!(
                        model = %candidate.display_name,
                        origin = %candidate.origin,
                        attempt = attempts,
                        "Dispatch succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transport() => {
                    tracing::warn!(
                        model = %candidate.display_name,
                        origin = %candidate.origin,
                        error = %e,
                        "Dispatch failed; trying next candidate"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(RouterError::AllCandidatesFailed {
            attempts,
            source: Box::new(last_error.unwrap_or(RouterError::NoCandidatesAvailable)),
        })
    }
}

enum SourceSpec {
    Registry(RegistrySource),
    Custom(Arc<dyn CandidateSource>),
}

/// Builder for constructing a [`ModelRouter`] from registry sources, a static
/// candidate list, and a dispatch engine.
///
/// ```rust,no_run
/// # use omniroute::api::RegistrySource;
/// # use omniroute::router::ModelRouter;
/// # fn example(engine: std::sync::Arc<dyn omniroute::traits::DispatchEngine>) -> anyhow::Result<()> {
/// let router = ModelRouter::builder()
///     .registry_source(RegistrySource::new("https://registry.example.com"))
///     .model_pattern("72b")
///     .dispatch_engine_arc(engine)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ModelRouterBuilder {
    sources: Vec<SourceSpec>,
    static_candidates: Vec<ModelCandidate>,
    pattern: Option<String>,
    cache_ttl: Option<Duration>,
    source_timeout: Option<Duration>,
    engine: Option<Arc<dyn DispatchEngine>>,
}

impl ModelRouterBuilder {
    /// Start from the `OMNIROUTE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().config(RouterConfig::from_env())
    }

    /// Apply a [`RouterConfig`]: registry URLs (with shared TLS/auth
    /// settings), cache TTL, and pattern filter.
    pub fn config(mut self, config: RouterConfig) -> Self {
        for source in config.registry_sources() {
            self.sources.push(SourceSpec::Registry(source));
        }
        if let Some(pattern) = config.model_pattern {
            self.pattern = Some(pattern);
        }
        self.cache_ttl = Some(config.cache_ttl);
        self
    }

    /// Add one registry source.
    pub fn registry_source(mut self, source: RegistrySource) -> Self {
        self.sources.push(SourceSpec::Registry(source));
        self
    }

    /// Add one registry source by URL with default TLS/auth settings.
    pub fn registry_url(self, base_url: impl Into<String>) -> Self {
        self.registry_source(RegistrySource::new(base_url))
    }

    /// Add a custom candidate source implementation.
    pub fn source<S: CandidateSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(SourceSpec::Custom(Arc::new(source)));
        self
    }

    /// Append pre-built static candidates. Malformed entries are dropped
    /// with a warning at build time.
    pub fn static_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.static_candidates.extend(candidates);
        self
    }

    /// Append static candidates produced by a hook, evaluated once here.
    pub fn static_candidates_with<F>(self, hook: F) -> Self
    where
        F: FnOnce() -> Vec<ModelCandidate>,
    {
        self.static_candidates(hook())
    }

    /// Case-insensitive substring filter on candidate names; the literal
    /// keyword `"static"` keeps only static candidates.
    pub fn model_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Maximum snapshot age before a refresh. Zero means always refresh.
    /// Defaults to 300 seconds.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Bound on a single source listing call. Defaults to 10 seconds.
    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = Some(timeout);
        self
    }

    /// Set the dispatch engine that executes resolved requests.
    pub fn dispatch_engine<E: DispatchEngine + 'static>(self, engine: E) -> Self {
        self.dispatch_engine_arc(Arc::new(engine))
    }

    /// Set the dispatch engine from a shared handle.
    pub fn dispatch_engine_arc(mut self, engine: Arc<dyn DispatchEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Validate the configuration and construct the router.
    ///
    /// Fails with [`RouterError::Config`] when no source of candidates is
    /// configured at all (no registry, no custom source, no static list) or
    /// when the dispatch engine is missing.
    pub fn build(self) -> Result<Arc<ModelRouter>> {
        let static_candidates = sanitize_static_candidates(self.static_candidates);

        if self.sources.is_empty() && static_candidates.is_empty() {
            return Err(RouterError::Config(
                "At least one registry source or a static candidate list is required".to_string(),
            ));
        }

        let engine = self.engine.ok_or_else(|| {
            RouterError::Config("A dispatch engine is required".to_string())
        })?;

        let mut sources: Vec<Arc<dyn CandidateSource>> = Vec::with_capacity(self.sources.len());
        for spec in self.sources {
            match spec {
                SourceSpec::Registry(source) => {
                    tracing::info!(origin = %source.base_url, verify_tls = source.verify_tls, "Registering registry source");
                    sources.push(Arc::new(HttpRegistryClient::new(source)?));
                }
                SourceSpec::Custom(source) => {
                    tracing::info!(origin = %source.origin(), "Registering custom source");
                    sources.push(source);
                }
            }
        }

        let aggregator = Aggregator::new(
            sources,
            static_candidates,
            self.pattern,
            self.source_timeout.unwrap_or(DEFAULT_SOURCE_TIMEOUT),
        );
        let cache = CandidateCache::new(aggregator, self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL));

        Ok(Arc::new(ModelRouter { cache, engine }))
    }
}
