//! Review service adapter and decision normalization
//!
//! The review service replies with a loosely-typed payload that has drifted
//! across deployments (near-synonym status strings, several optional input
//! fields). Everything is normalized to the closed `Decision` vocabulary
//! right here at the boundary; the engine never sees raw payloads.

use super::ReviewService;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Artifact override supplied alongside a decision
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOverride {
    Inline(String),
    Path(PathBuf),
}

/// Normalized review decision
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Gate disabled or bypassed on the reviewer's side
    NoHitl { artifact: Option<ArtifactOverride> },
    Approve { artifact: Option<ArtifactOverride> },
    Reject { reason: Option<String> },
    /// Pause the run; only an external resume advances it
    Wait,
    /// Free-text revision instructions supplied
    HasInput {
        input: String,
        artifact: Option<ArtifactOverride>,
    },
}

/// Context handed to the review service for one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ReviewRequest {
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Raw review-gate config block, forwarded verbatim
    pub config: serde_json::Value,
    pub loop_index: u32,
}

/// Raw wire shape of a review decision, before normalization
#[derive(Debug, Default, Deserialize)]
pub struct RawDecision {
    pub status: Option<String>,
    pub input: Option<String>,
    pub instructions: Option<String>,
    pub information: Option<String>,
    pub reason: Option<String>,
    pub html: Option<String>,
    pub html_path: Option<String>,
}

impl RawDecision {
    fn free_text(&self) -> Option<String> {
        [&self.input, &self.instructions, &self.information]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn artifact(&self) -> Option<ArtifactOverride> {
        if let Some(html) = self.html.as_ref().filter(|h| !h.trim().is_empty()) {
            return Some(ArtifactOverride::Inline(html.clone()));
        }
        self.html_path
            .as_ref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| ArtifactOverride::Path(PathBuf::from(p)))
    }
}

/// Normalize a raw decision to the closed vocabulary
///
/// The wait synonyms that accumulated across revisions of the review service
/// (`wait-for-response`, `wait-for-human`, `active`) all mean `Wait`; anything
/// outside the known vocabulary is rejected, never guessed.
pub fn normalize(raw: RawDecision) -> Result<Decision> {
    let status = raw.status.as_deref().unwrap_or("").trim().to_lowercase();

    match status.as_str() {
        "no-hitl" => Ok(Decision::NoHitl {
            artifact: raw.artifact(),
        }),
        "approve" | "approved" => Ok(Decision::Approve {
            artifact: raw.artifact(),
        }),
        "reject" | "rejected" => Ok(Decision::Reject {
            reason: raw.reason.clone().or_else(|| raw.free_text()),
        }),
        "wait" | "wait-for-response" | "wait-for-human" | "active" => Ok(Decision::Wait),
        "has-input" => Ok(Decision::HasInput {
            input: raw.free_text().unwrap_or_default(),
            artifact: raw.artifact(),
        }),
        other => Err(Error::UnknownDecision(other.to_string())),
    }
}

/// reqwest-backed review service
pub struct HttpReviewService {
    client: Client,
    default_endpoint: Option<String>,
}

impl HttpReviewService {
    pub fn new(default_endpoint: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            default_endpoint,
        })
    }
}

#[async_trait]
impl ReviewService for HttpReviewService {
    async fn review(&self, request: &ReviewRequest) -> Result<Decision> {
        let endpoint = request
            .config
            .get("endpoint")
            .and_then(|v| v.as_str())
            .or(self.default_endpoint.as_deref())
            .ok_or_else(|| Error::ReviewFailed("no review endpoint configured".to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::ReviewFailed(format!("{}: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ReviewFailed(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        let raw: RawDecision = response
            .json()
            .await
            .map_err(|e| Error::ReviewFailed(format!("unparseable decision: {}", e)))?;

        normalize(raw)
    }
}
