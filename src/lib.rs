//! Dynamic model registry and routing facade for remote inference deployments.
//!
//! Omniroute discovers running model deployments from one or more registry
//! sources, merges them with statically configured candidates, caches the
//! merged set with a TTL and single-flight refresh, and routes completion
//! requests across the resulting candidates with transport-failure fallback.
//!
//! # Key concepts
//!
//! - **[`ModelRouter`](router::ModelRouter)** — the facade that owns the
//!   candidate cache and performs request-level decisions: resolving a
//!   fallback group and retrying across it on transport failure.
//! - **[`ModelCandidate`](api::ModelCandidate)** — one routable backend: the
//!   name callers request by, an opaque backend target, and pass-through
//!   endpoint parameters.
//! - **[`CandidateSource`](traits::CandidateSource)** — one upstream that can
//!   contribute candidates; [`HttpRegistryClient`](discovery::HttpRegistryClient)
//!   is the built-in implementation for deployment registries.
//! - **[`DispatchEngine`](traits::DispatchEngine)** — the external execution
//!   capability the router hands resolved backends to.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use omniroute::api::RegistrySource;
//! use omniroute::router::ModelRouter;
//! use omniroute::traits::{ChatMessage, ChatPayload, DispatchEngine};
//!
//! # async fn example(engine: std::sync::Arc<dyn DispatchEngine>) -> anyhow::Result<()> {
//! let router = ModelRouter::builder()
//!     .registry_source(RegistrySource::new("https://registry.example.com"))
//!     .cache_ttl(std::time::Duration::from_secs(300))
//!     .dispatch_engine_arc(engine)
//!     .build()?;
//!
//! let payload = ChatPayload {
//!     messages: vec![ChatMessage::user("Hello")],
//!     ..Default::default()
//! };
//! let response = router.complete(Some("qwen-7b"), &payload).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod discovery;
pub mod error;
pub mod router;
pub mod traits;

#[cfg(test)]
mod mock;
