//! Instance configuration document

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Default canonical artifact file name within the artifacts directory
pub const DEFAULT_ARTIFACT_NAME: &str = "output.html";

/// Generation-backend overrides carried by an instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Review-gate (HITL) configuration block
///
/// `enable` is the only required field. Unknown keys are preserved and
/// forwarded verbatim to the review service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewGateConfig {
    pub enable: bool,
    pub endpoint: Option<String>,
    pub max_loops: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ReviewGateConfig {
    /// Regeneration loop bound, defaulting to a small single digit
    pub fn loop_bound(&self) -> u32 {
        self.max_loops.unwrap_or(3)
    }

    /// The raw block as JSON, forwarded to the review service
    pub fn as_raw(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Instance configuration document (config.yaml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Optional self-declared id; must agree with the instance directory name
    pub id: Option<String>,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub model: ModelConfig,
    /// Review-gate block; its absence is a hard failure on any send path
    pub hitl: Option<ReviewGateConfig>,
    pub artifact_name: Option<String>,
}

impl InstanceConfig {
    /// Load and validate the configuration for an instance
    pub async fn load(path: &Path, instance_id: &str) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "cannot read instance config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: InstanceConfig = serde_yaml::from_str(&content)?;

        if let Some(declared) = &config.id {
            if declared != instance_id {
                return Err(Error::ConfigMismatch {
                    declared: declared.clone(),
                    resolved: instance_id.to_string(),
                });
            }
        }

        Ok(config)
    }

    /// Artifact file name for this instance
    pub fn artifact_name(&self) -> &str {
        self.artifact_name.as_deref().unwrap_or(DEFAULT_ARTIFACT_NAME)
    }

    /// The review-gate block, or `MissingReviewConfig`
    pub fn review_gate(&self, instance_id: &str) -> Result<&ReviewGateConfig> {
        self.hitl
            .as_ref()
            .ok_or_else(|| Error::MissingReviewConfig(instance_id.to_string()))
    }

    /// True when no delivery recipients are configured at all
    pub fn has_no_recipients(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty()
    }
}
