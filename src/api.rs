//! Public API types: candidate records, registry source configuration, and
//! router configuration from the environment or a static candidate list.

use crate::error::{Result, RouterError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Listed by a remote deployment registry.
    Discovered,
    /// Supplied by the operator in a static candidate list. This is the
    /// default so that parsed static lists need not spell it out.
    #[default]
    Static,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovered => write!(f, "discovered"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// The `origin` value carried by every static candidate.
pub const STATIC_ORIGIN: &str = "static";

fn default_origin() -> String {
    STATIC_ORIGIN.to_string()
}

/// One routable backend: the name callers request by, the opaque target the
/// dispatch engine understands, and the connection parameters to pass through.
///
/// Candidates are created fresh on every aggregation pass and never mutated;
/// the cache replaces the whole merged set atomically.
///
/// # Example JSON (static list entry)
///
/// ```json
/// {
///   "display_name": "gpt-4o-mini",
///   "backend_target": "openai/gpt-4o-mini",
///   "endpoint_params": { "api_key_env": "OPENAI_API_KEY" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    /// The name callers request this backend by. Unique within a merged set.
    pub display_name: String,
    /// Provider+model identifier understood by the dispatch engine. Opaque
    /// to the router.
    pub backend_target: String,
    /// Whether this candidate was discovered or statically configured.
    #[serde(default)]
    pub source_kind: SourceKind,
    /// The registry base URL this candidate was discovered from, or
    /// [`STATIC_ORIGIN`] for static entries.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Opaque connection parameters (api_base, api_key, flags) passed through
    /// to the dispatch engine untouched.
    #[serde(default)]
    pub endpoint_params: serde_json::Value,
    /// Opaque descriptive fields (deployment id, provider, description).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ModelCandidate {
    /// Build a static candidate from a name and backend target.
    pub fn new_static(
        display_name: impl Into<String>,
        backend_target: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            backend_target: backend_target.into(),
            source_kind: SourceKind::Static,
            origin: STATIC_ORIGIN.to_string(),
            endpoint_params: serde_json::Value::Null,
            metadata: serde_json::Value::Null,
        }
    }

    /// Set the opaque endpoint parameter bag.
    pub fn with_endpoint_params(mut self, params: serde_json::Value) -> Self {
        self.endpoint_params = params;
        self
    }

    /// Set the opaque metadata bag.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this entry carries enough to be routable: a non-empty
    /// `display_name` and `backend_target`.
    pub fn is_routable(&self) -> bool {
        !self.display_name.is_empty() && !self.backend_target.is_empty()
    }
}

/// Drop malformed static entries (empty name or target) with a warning and
/// force the static tagging on the survivors.
///
/// Matching the registry client's behavior for discovered entries: malformed
/// input is skipped, never fatal.
pub fn sanitize_static_candidates(candidates: Vec<ModelCandidate>) -> Vec<ModelCandidate> {
    candidates
        .into_iter()
        .filter_map(|mut candidate| {
            if !candidate.is_routable() {
                tracing::warn!(
                    name = %candidate.display_name,
                    "Skipping static candidate without a model name or backend target"
                );
                return None;
            }
            candidate.source_kind = SourceKind::Static;
            candidate.origin = STATIC_ORIGIN.to_string();
            Some(candidate)
        })
        .collect()
}

/// Parse a static candidate list (JSON array) from a string.
///
/// Malformed *entries* are skipped with a warning; a body that is not a JSON
/// array of objects is a [`RouterError::Config`].
pub fn static_candidates_from_str(s: &str) -> Result<Vec<ModelCandidate>> {
    let candidates: Vec<ModelCandidate> = serde_json::from_str(s)
        .map_err(|e| RouterError::Config(format!("Invalid static candidate list JSON: {}", e)))?;
    Ok(sanitize_static_candidates(candidates))
}

/// Read and parse a static candidate list from a JSON file.
pub fn static_candidates_from_file(path: impl AsRef<Path>) -> Result<Vec<ModelCandidate>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        RouterError::Config(format!(
            "Failed to read static candidate file '{}': {}",
            path.display(),
            e
        ))
    })?;
    static_candidates_from_str(&contents)
}

/// One configured upstream discovery endpoint. Immutable after router
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySource {
    /// Base URL of the registry (scheme + host + optional port).
    pub base_url: String,
    /// Verify the registry's TLS certificate. Off by default; registries are
    /// commonly deployed with self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,
    /// Optional bearer token attached to listing calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl RegistrySource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            verify_tls: false,
            auth_token: None,
        }
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Env var naming a single registry URL.
pub const REGISTRY_URL_ENV: &str = "OMNIROUTE_REGISTRY_URL";
/// Env var naming a comma-separated registry URL list. Overrides
/// [`REGISTRY_URL_ENV`] when both are set.
pub const REGISTRY_URLS_ENV: &str = "OMNIROUTE_REGISTRY_URLS";
/// Env var toggling TLS verification (`1`/`true` to enable).
pub const VERIFY_TLS_ENV: &str = "OMNIROUTE_VERIFY_TLS";
/// Env var overriding the cache TTL in seconds.
pub const CACHE_TTL_ENV: &str = "OMNIROUTE_CACHE_TTL_SECS";
/// Env var setting the candidate name-pattern filter.
pub const MODEL_PATTERN_ENV: &str = "OMNIROUTE_MODEL_PATTERN";
/// Env var supplying a bearer token for registry listing calls.
pub const AUTH_TOKEN_ENV: &str = "OMNIROUTE_AUTH_TOKEN";

/// Default cache TTL when unconfigured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Router configuration assembled from the environment or built by hand and
/// handed to [`ModelRouterBuilder::config`](crate::router::ModelRouterBuilder::config).
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Registry base URLs, in configured order.
    pub registry_urls: Vec<String>,
    /// TLS verification for all registry sources.
    pub verify_tls: bool,
    /// Maximum snapshot age before a refresh. Zero means always refresh.
    pub cache_ttl: Duration,
    /// Case-insensitive substring filter on candidate names, or the literal
    /// keyword `"static"` to keep only static candidates.
    pub model_pattern: Option<String>,
    /// Bearer token attached to registry listing calls.
    pub auth_token: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            registry_urls: Vec::new(),
            verify_tls: false,
            cache_ttl: DEFAULT_CACHE_TTL,
            model_pattern: None,
            auth_token: None,
        }
    }
}

impl RouterConfig {
    /// Assemble a configuration from `OMNIROUTE_*` environment variables.
    ///
    /// `OMNIROUTE_REGISTRY_URLS` (comma-separated) overrides
    /// `OMNIROUTE_REGISTRY_URL` when both are set. An unparseable TTL falls
    /// back to the default with a warning rather than failing.
    pub fn from_env() -> Self {
        let registry_urls = match std::env::var(REGISTRY_URLS_ENV) {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => std::env::var(REGISTRY_URL_ENV)
                .ok()
                .filter(|url| !url.is_empty())
                .into_iter()
                .collect(),
        };

        let verify_tls = std::env::var(VERIFY_TLS_ENV)
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                v == "1" || v == "true" || v == "yes"
            })
            .unwrap_or(false);

        let cache_ttl = match std::env::var(CACHE_TTL_ENV) {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        "Unparseable {} value; using default TTL",
                        CACHE_TTL_ENV
                    );
                    DEFAULT_CACHE_TTL
                }
            },
            Err(_) => DEFAULT_CACHE_TTL,
        };

        let model_pattern = std::env::var(MODEL_PATTERN_ENV)
            .ok()
            .filter(|p| !p.is_empty());
        let auth_token = std::env::var(AUTH_TOKEN_ENV).ok().filter(|t| !t.is_empty());

        Self {
            registry_urls,
            verify_tls,
            cache_ttl,
            model_pattern,
            auth_token,
        }
    }

    /// The registry sources described by this configuration.
    pub fn registry_sources(&self) -> Vec<RegistrySource> {
        self.registry_urls
            .iter()
            .map(|url| RegistrySource {
                base_url: url.clone(),
                verify_tls: self.verify_tls,
                auth_token: self.auth_token.clone(),
            })
            .collect()
    }
}
