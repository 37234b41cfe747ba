#![allow(dead_code)]

//! Shared mock sources and dispatch engines for integration tests.

use async_trait::async_trait;
use omniroute::api::{ModelCandidate, SourceKind};
use omniroute::error::{Result, RouterError};
use omniroute::traits::{CandidateSource, ChatPayload, DispatchEngine, DispatchResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Build a discovered candidate with placeholder endpoint params.
pub fn discovered_candidate(name: &str, origin: &str) -> ModelCandidate {
    ModelCandidate {
        display_name: name.to_string(),
        backend_target: format!("openai/{name}"),
        source_kind: SourceKind::Discovered,
        origin: origin.to_string(),
        endpoint_params: serde_json::json!({ "api_base": format!("http://{name}:8000/v1") }),
        metadata: serde_json::Value::Null,
    }
}

/// Display names of a candidate slice, in order.
pub fn names(candidates: &[ModelCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.display_name.as_str()).collect()
}

/// In-memory candidate source with configurable latency and failure.
pub struct MockSource {
    origin: String,
    candidates: Vec<ModelCandidate>,
    delay_ms: u64,
    fail_after: Option<u32>,
    calls: Arc<AtomicU32>,
}

impl MockSource {
    pub fn new(origin: &str, candidates: Vec<ModelCandidate>) -> Self {
        Self {
            origin: origin.to_string(),
            candidates,
            delay_ms: 0,
            fail_after: None,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A source that fails on every call.
    pub fn failing(origin: &str) -> Self {
        Self::new(origin, Vec::new()).fail_after(0)
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Succeed this many calls, then fail.
    pub fn fail_after(mut self, successes: u32) -> Self {
        self.fail_after = Some(successes);
        self
    }

    /// Shared counter of `list_candidates` invocations.
    pub fn call_counter(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

#[async_trait]
impl CandidateSource for MockSource {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn list_candidates(&self) -> Result<Vec<ModelCandidate>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }

        if let Some(successes) = self.fail_after {
            if call >= successes {
                return Err(RouterError::RegistryUnreachable {
                    origin: self.origin.clone(),
                    reason: "mock source failure".to_string(),
                });
            }
        }

        Ok(self.candidates.clone())
    }
}

/// What the mock engine does when asked to dispatch to a given model.
#[derive(Debug, Clone, Copy)]
pub enum DispatchBehavior {
    Succeed,
    TransportError,
    Unavailable,
    InvalidRequest,
    Unauthorized,
}

/// Dispatch engine with per-model scripted behavior and an attempt log.
#[derive(Default)]
pub struct MockDispatchEngine {
    behaviors: HashMap<String, DispatchBehavior>,
    attempts: Mutex<Vec<String>>,
}

impl MockDispatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior for one display name. Unscripted models succeed.
    pub fn with_behavior(mut self, name: &str, behavior: DispatchBehavior) -> Self {
        self.behaviors.insert(name.to_string(), behavior);
        self
    }

    /// Display names dispatched to, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DispatchEngine for MockDispatchEngine {
    async fn dispatch(
        &self,
        candidate: &ModelCandidate,
        _payload: &ChatPayload,
    ) -> Result<DispatchResponse> {
        self.attempts
            .lock()
            .unwrap()
            .push(candidate.display_name.clone());

        match self
            .behaviors
            .get(&candidate.display_name)
            .copied()
            .unwrap_or(DispatchBehavior::Succeed)
        {
            DispatchBehavior::Succeed => Ok(DispatchResponse {
                text: format!("response from {}", candidate.display_name),
                model: candidate.display_name.clone(),
                usage: None,
            }),
            DispatchBehavior::TransportError => Err(RouterError::Transport(format!(
                "connection reset by {}",
                candidate.display_name
            ))),
            DispatchBehavior::Unavailable => Err(RouterError::Unavailable),
            DispatchBehavior::InvalidRequest => {
                Err(RouterError::InvalidRequest("malformed payload".to_string()))
            }
            DispatchBehavior::Unauthorized => Err(RouterError::Unauthorized),
        }
    }
}
