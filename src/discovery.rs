//! HTTP registry client: lists running model deployments from one registry
//! source and maps each into a normalized candidate record.

use crate::api::{ModelCandidate, RegistrySource, SourceKind};
use crate::error::{Result, RouterError};
use crate::traits::CandidateSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Listing endpoint appended to every registry base URL.
pub const DEPLOYMENTS_PATH: &str = "/api/serving/deployments";

/// Status a deployment (and at least one of its instances) must report to be
/// considered routable.
const STATUS_DEPLOYED: &str = "DEPLOYED";

/// Discovered backends sit behind the registry's load balancer and do not
/// check keys; the dispatch engine still expects one to be present.
const PLACEHOLDER_API_KEY: &str = "no_key";

/// One deployment descriptor as returned by the listing endpoint. Every field
/// is optional at the wire level; [`HttpRegistryClient`] decides which
/// omissions disqualify the entry.
#[derive(Debug, Deserialize)]
struct DeploymentDescriptor {
    #[serde(default)]
    id: Option<String>,
    /// Deployment name (not the model name).
    #[serde(default)]
    name: Option<String>,
    /// Model name; becomes the candidate's `display_name`.
    #[serde(default)]
    m_name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    /// Load-balancer port fronting the deployment's instances.
    #[serde(default)]
    lb_port: Option<u16>,
    #[serde(default)]
    instances: Vec<DeploymentInstance>,
}

#[derive(Debug, Deserialize)]
struct DeploymentInstance {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    host_name: Option<String>,
}

/// Talks to one remote deployment registry. Stateless per call; the router
/// constructs one instance per configured source URL.
pub struct HttpRegistryClient {
    source: RegistrySource,
    client: Client,
}

impl HttpRegistryClient {
    /// Build a client for one registry source. TLS verification follows
    /// `source.verify_tls`.
    pub fn new(source: RegistrySource) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!source.verify_tls)
            .build()
            .map_err(|e| {
                RouterError::Config(format!(
                    "Failed to build HTTP client for '{}': {}",
                    source.base_url, e
                ))
            })?;
        Ok(Self { source, client })
    }

    fn unreachable(&self, reason: impl std::fmt::Display) -> RouterError {
        RouterError::RegistryUnreachable {
            origin: self.source.base_url.clone(),
            reason: reason.to_string(),
        }
    }

    /// Map one descriptor into a candidate, or `None` when the deployment is
    /// not routable. Missing required fields are a skip, never a failure of
    /// the whole listing.
    fn map_descriptor(&self, descriptor: DeploymentDescriptor) -> Option<ModelCandidate> {
        let display_name = match descriptor.m_name.clone().or_else(|| descriptor.name.clone()) {
            Some(name) if !name.is_empty() => name,
            _ => {
                tracing::warn!(
                    origin = %self.source.base_url,
                    id = descriptor.id.as_deref().unwrap_or("<unknown>"),
                    "Skipping deployment without a model name"
                );
                return None;
            }
        };

        if descriptor.status.as_deref() != Some(STATUS_DEPLOYED) {
            tracing::debug!(
                origin = %self.source.base_url,
                name = %display_name,
                status = descriptor.status.as_deref().unwrap_or("<none>"),
                "Skipping deployment that is not running"
            );
            return None;
        }

        let Some(port) = descriptor.lb_port else {
            tracing::warn!(
                origin = %self.source.base_url,
                name = %display_name,
                "Skipping deployment without a load-balancer port"
            );
            return None;
        };

        let host = descriptor
            .instances
            .iter()
            .find(|i| i.status.as_deref() == Some(STATUS_DEPLOYED))
            .and_then(|i| i.host_name.clone());
        let Some(host) = host else {
            tracing::warn!(
                origin = %self.source.base_url,
                name = %display_name,
                "Skipping deployment without a running instance"
            );
            return None;
        };

        Some(ModelCandidate {
            display_name: display_name.clone(),
            // Discovered deployments expose an OpenAI-compatible endpoint.
            backend_target: format!("openai/{display_name}"),
            source_kind: SourceKind::Discovered,
            origin: self.source.base_url.clone(),
            endpoint_params: json!({
                "api_base": format!("http://{host}:{port}/v1"),
                "api_key": PLACEHOLDER_API_KEY,
            }),
            metadata: json!({
                "id": descriptor.id,
                "deployment": descriptor.name,
            }),
        })
    }
}

#[async_trait]
impl CandidateSource for HttpRegistryClient {
    fn origin(&self) -> &str {
        &self.source.base_url
    }

    async fn list_candidates(&self) -> Result<Vec<ModelCandidate>> {
        let url = format!(
            "{}{}",
            self.source.base_url.trim_end_matches('/'),
            DEPLOYMENTS_PATH
        );

        let mut request = self.client.get(&url);
        if let Some(token) = &self.source.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| self.unreachable(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.unreachable(format!("HTTP {}", status)));
        }

        let descriptors: Vec<DeploymentDescriptor> =
            response
                .json()
                .await
                .map_err(|e| RouterError::RegistryMalformedResponse {
                    origin: self.source.base_url.clone(),
                    reason: e.to_string(),
                })?;

        let total = descriptors.len();
        let candidates: Vec<ModelCandidate> = descriptors
            .into_iter()
            .filter_map(|d| self.map_descriptor(d))
            .collect();

        tracing::debug!(
            origin = %self.source.base_url,
            listed = total,
            routable = candidates.len(),
            "Listed deployments"
        );
        Ok(candidates)
    }
}
