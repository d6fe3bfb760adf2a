//! Instance resolution and durable storage
//!
//! An instance is a named, durable unit of work: a directory holding its
//! configuration document, prompt template, state document, artifacts and
//! logs. `InstanceContext` is constructed once per invocation and threaded
//! through every operation instead of any global path state.

pub mod config;
pub mod state;
pub mod store;

pub use config::{InstanceConfig, ModelConfig, ReviewGateConfig, DEFAULT_ARTIFACT_NAME};
pub use state::{ProgressEntry, RunOutcome, RunState, RunStatus};
pub use store::InstanceStore;

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Resolved per-invocation view of one instance
#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub id: String,
    pub dir: PathBuf,
    pub config: InstanceConfig,
}

impl InstanceContext {
    /// Resolve an instance id under the instances root and load its config
    pub async fn load(instances_root: &Path, id: &str) -> Result<Self> {
        let dir = instances_root.join(id);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "instance '{}' not found under {}",
                id,
                instances_root.display()
            )));
        }

        let config = InstanceConfig::load(&dir.join("config.yaml"), id).await?;

        Ok(Self {
            id: id.to_string(),
            dir,
            config,
        })
    }

    pub fn template_path(&self) -> PathBuf {
        self.dir.join("prompt.md")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.dir.join("artifacts")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join("logs")
    }

    /// Canonical artifact path for this instance
    pub fn artifact_path(&self) -> PathBuf {
        self.artifacts_dir().join(self.config.artifact_name())
    }

    /// Read the base prompt template
    pub async fn read_template(&self) -> Result<String> {
        let path = self.template_path();
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::Config(format!(
                "cannot read prompt template {}: {}",
                path.display(),
                e
            ))
        })
    }
}
