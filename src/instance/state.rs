//! Run-state document types
//!
//! One mutable record per instance, read-modify-write on every transition.
//! The progress log inside it is append-only and never reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run status for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is in flight, or paused awaiting an external resume
    Active,
    /// Run completed successfully
    Finished,
    /// Run ended with an error or a rejection
    Abort,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Abort)
    }
}

/// One progress-log milestone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// The durable state document (state.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_html_path: Option<String>,
    pub last_send_id: Option<String>,
    #[serde(default)]
    pub progress: Vec<ProgressEntry>,
}

impl RunState {
    /// Fresh document for a newly activated run
    pub fn activated(now: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::Active,
            started_at: now,
            finished_at: None,
            last_error: None,
            last_html_path: None,
            last_send_id: None,
            progress: Vec::new(),
        }
    }

    /// Latest progress entry, if any
    pub fn latest_progress(&self) -> Option<&ProgressEntry> {
        self.progress.last()
    }
}

/// Terminal outcome applied by `finalize`
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Finished {
        last_html_path: Option<String>,
        last_send_id: Option<String>,
    },
    Abort {
        last_error: String,
    },
}

impl RunState {
    /// Apply a terminal outcome in place
    pub fn finalize(&mut self, outcome: RunOutcome, now: DateTime<Utc>) {
        self.finished_at = Some(now);
        match outcome {
            RunOutcome::Finished {
                last_html_path,
                last_send_id,
            } => {
                self.status = RunStatus::Finished;
                if last_html_path.is_some() {
                    self.last_html_path = last_html_path;
                }
                if last_send_id.is_some() {
                    self.last_send_id = last_send_id;
                }
            }
            RunOutcome::Abort { last_error } => {
                self.status = RunStatus::Abort;
                self.last_error = Some(last_error);
            }
        }
    }
}
