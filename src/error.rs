//! Error types for the omniroute router.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Unified error type covering configuration, discovery, resolution, and
/// dispatch failures.
///
/// Discovery-layer variants ([`RegistryUnreachable`](Self::RegistryUnreachable),
/// [`RegistryMalformedResponse`](Self::RegistryMalformedResponse)) are absorbed
/// per-source by the aggregator and never reach callers directly. Resolution
/// and dispatch variants are surfaced to the caller.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid or missing configuration (no sources, bad env value, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A registry source could not be reached (connection refused, TLS
    /// failure, non-2xx status, timeout).
    #[error("Registry '{origin}' unreachable: {reason}")]
    RegistryUnreachable { origin: String, reason: String },

    /// A registry source answered with a body that does not conform to the
    /// deployment-listing schema.
    #[error("Registry '{origin}' returned a malformed response: {reason}")]
    RegistryMalformedResponse { origin: String, reason: String },

    /// The merged candidate set (after filtering) is empty.
    #[error("No candidates available")]
    NoCandidatesAvailable,

    /// An explicit model name was requested but matches no candidate.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Every candidate in the fallback group failed at the transport level.
    /// Wraps the last underlying error.
    #[error("All {attempts} candidates failed; last error: {source}")]
    AllCandidatesFailed {
        attempts: usize,
        #[source]
        source: Box<RouterError>,
    },

    /// A transport-level failure from the dispatch engine (connection reset,
    /// DNS, protocol error). Eligible for fallback to the next candidate.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The operation exceeded its configured timeout.
    #[error("Timeout")]
    Timeout,

    /// The backend is currently unavailable (HTTP 5xx and the like).
    #[error("Unavailable")]
    Unavailable,

    /// The backend returned HTTP 429 (too many requests).
    #[error("Rate limited")]
    RateLimited,

    /// The backend rejected the credentials (HTTP 401/403).
    #[error("Unauthorized")]
    Unauthorized,

    /// The payload itself was rejected. Switching backends will not fix it.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RouterError {
    /// Returns `true` for transport-class errors where trying the next
    /// candidate in a fallback group may succeed:
    /// [`Transport`](Self::Transport), [`Timeout`](Self::Timeout),
    /// [`Unavailable`](Self::Unavailable), and [`RateLimited`](Self::RateLimited).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout | Self::Unavailable | Self::RateLimited
        )
    }
}
