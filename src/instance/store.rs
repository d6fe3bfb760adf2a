//! File-backed instance store
//!
//! Owns the state document, the append-only progress log and the artifact
//! archiving convention. All access is single-writer-per-instance; the store
//! does not take cross-process locks.

use super::state::{RunOutcome, RunState};
use super::InstanceContext;
use crate::error::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Durable store for one instance's run state and artifacts
pub struct InstanceStore {
    state_path: PathBuf,
    logs_dir: PathBuf,
}

impl InstanceStore {
    pub fn new(ctx: &InstanceContext) -> Self {
        Self {
            state_path: ctx.state_path(),
            logs_dir: ctx.logs_dir(),
        }
    }

    /// Create/overwrite the state document with a fresh `active` run
    pub async fn activate(&self) -> Result<RunState> {
        let state = RunState::activated(Utc::now());
        self.save_state(&state).await?;
        Ok(state)
    }

    /// Load the current state document
    pub async fn load_state(&self) -> Result<RunState> {
        if !self.state_path.exists() {
            return Err(Error::NotFound(format!(
                "no state document at {}",
                self.state_path.display()
            )));
        }
        let json = fs::read_to_string(&self.state_path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn save_state(&self, state: &RunState) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.state_path, json).await?;
        Ok(())
    }

    /// Append a milestone to the progress log and mirror it to logs/run.log
    ///
    /// Best-effort: a logging failure must never abort the caller's run.
    pub async fn record_progress(&self, message: &str) {
        let now = Utc::now();

        match self.load_state().await {
            Ok(mut state) => {
                state.progress.push(super::ProgressEntry {
                    timestamp: now,
                    message: message.to_string(),
                });
                if let Err(e) = self.save_state(&state).await {
                    warn!("failed to persist progress '{}': {}", message, e);
                }
            }
            Err(e) => warn!("failed to load state for progress '{}': {}", message, e),
        }

        if let Err(e) = self.append_run_log(&format!("{} {}\n", now.to_rfc3339(), message)).await {
            warn!("failed to append run log: {}", e);
        }
    }

    async fn append_run_log(&self, line: &str) -> Result<()> {
        fs::create_dir_all(&self.logs_dir).await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.logs_dir.join("run.log"))
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Set `last_error` without changing the run status
    ///
    /// Used when a tolerated collaborator failure should stay visible in the
    /// state document. Best-effort, same policy as `record_progress`.
    pub async fn record_error(&self, message: &str) {
        match self.load_state().await {
            Ok(mut state) => {
                state.last_error = Some(message.to_string());
                if let Err(e) = self.save_state(&state).await {
                    warn!("failed to persist last_error: {}", e);
                }
            }
            Err(e) => warn!("failed to load state to record error: {}", e),
        }
    }

    /// Dump a verbose debug document (prompt, raw response) into the logs dir
    ///
    /// Best-effort, same policy as `record_progress`.
    pub async fn dump_debug(&self, name: &str, content: &str) {
        let write = async {
            fs::create_dir_all(&self.logs_dir).await?;
            let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
            fs::write(self.logs_dir.join(format!("{}-{}.txt", name, stamp)), content).await?;
            Ok::<(), std::io::Error>(())
        };
        if let Err(e) = write.await {
            warn!("failed to dump debug document '{}': {}", name, e);
        }
    }

    /// Apply a terminal outcome, read-modify-write
    pub async fn finalize(&self, outcome: RunOutcome) -> Result<()> {
        let mut state = self.load_state().await?;
        state.finalize(outcome, Utc::now());
        self.save_state(&state).await
    }

    /// Write an artifact, archiving any existing file at `path` first
    ///
    /// The previous file is renamed to the first free numbered sibling
    /// (`name-1.html`, `name-2.html`, ...) so no version a human may have
    /// been reviewing is ever destroyed.
    pub async fn write_artifact(&self, path: &Path, content: &str) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if path.exists() {
            let archived = next_archive_path(path, |p| p.exists());
            fs::rename(path, &archived).await?;
        }

        fs::write(path, content).await?;
        Ok(path.to_path_buf())
    }

    /// Read an artifact back
    pub async fn read_artifact(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "artifact not found: {}",
                path.display()
            )));
        }
        Ok(fs::read_to_string(path).await?)
    }
}

/// First free numbered sibling for an artifact being archived
pub fn next_archive_path(path: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let ext = path.extension().and_then(|s| s.to_str());
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut index = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{}-{}.{}", stem, index, ext),
            None => format!("{}-{}", stem, index),
        };
        let candidate = parent.join(name);
        if !exists(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
