//! Seam traits at the router's boundaries: candidate discovery sources and
//! the dispatch engine, plus the payload and response types flowing through
//! them.

use crate::api::ModelCandidate;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One upstream that can contribute candidates to an aggregation pass.
///
/// The built-in implementation is
/// [`HttpRegistryClient`](crate::discovery::HttpRegistryClient); embedders can
/// register custom sources via
/// [`ModelRouterBuilder::source`](crate::router::ModelRouterBuilder::source).
/// Implementations are stateless per call: each invocation produces a fresh
/// listing.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Stable identifier for this source, used in logs and candidate
    /// `origin` fields (typically the base URL).
    fn origin(&self) -> &str;

    /// List the currently routable candidates at this source.
    ///
    /// Failures are per-source: the aggregator absorbs an `Err` as "zero
    /// candidates from this source" and continues with the rest.
    async fn list_candidates(&self) -> Result<Vec<ModelCandidate>>;
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// The message payload handed to the dispatch engine, unchanged, for every
/// candidate attempted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature. Engine default if `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate. Engine default if `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

/// Token counts for a completed dispatch, if the backend reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// The response produced by a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResponse {
    /// The generated text.
    pub text: String,
    /// `display_name` of the candidate that served the request.
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// The external request-execution capability.
///
/// The router resolves a candidate and hands its `backend_target` and
/// endpoint parameters to this engine; the wire protocol of the inference
/// call itself lives behind this trait. Transport-class errors
/// (where [`RouterError::is_transport`](crate::error::RouterError::is_transport)
/// is `true`) make the router advance to the next candidate in the fallback
/// group; any other error is surfaced to the caller immediately.
#[async_trait]
pub trait DispatchEngine: Send + Sync {
    /// Execute a completion against one resolved candidate.
    async fn dispatch(
        &self,
        candidate: &ModelCandidate,
        payload: &ChatPayload,
    ) -> Result<DispatchResponse>;
}
