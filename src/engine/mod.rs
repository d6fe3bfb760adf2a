//! Instance workflow engine
//!
//! One parametrized engine drives every flow variant: generate, send and
//! generate-then-send are the same loop with mode flags, each runnable
//! synchronously or as a fire-and-continue background task. The engine owns
//! no global state; everything durable lives in the per-instance store.

mod deliver;
mod generate;
mod review;

pub use review::GateOutcome;

use crate::clients::{DeliveryTransport, GenerationBackend, ReviewService};
use crate::error::{Error, Result};
use crate::instance::{InstanceContext, InstanceStore, ProgressEntry, RunOutcome, RunState};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Mode flags for one engine invocation
///
/// The three public operations are spellings of this one struct; there are no
/// separate code paths per flow variant.
#[derive(Debug, Clone, Default)]
pub struct Operation {
    pub generate: bool,
    pub send: bool,
    /// Skip the review gate (used when resuming an already-approved run)
    pub skip_review: bool,
    /// Free-text instructions fed to the prompt composer
    pub instructions: Option<String>,
    /// Revise the existing artifact instead of generating fresh
    pub edit: bool,
    /// Explicit base artifact for edit mode; missing is a hard error
    pub base_artifact: Option<PathBuf>,
}

impl Operation {
    pub fn generate_only() -> Self {
        Self {
            generate: true,
            ..Default::default()
        }
    }

    pub fn send_only() -> Self {
        Self {
            send: true,
            ..Default::default()
        }
    }

    pub fn generate_then_send() -> Self {
        Self {
            generate: true,
            send: true,
            ..Default::default()
        }
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_edit(mut self, edit: bool) -> Self {
        self.edit = edit;
        self
    }

    pub fn bypass_review(mut self) -> Self {
        self.skip_review = true;
        self
    }
}

/// Synchronous or fire-and-continue execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Sync,
    Async,
}

impl ExecMode {
    pub fn from_async_flag(run_async: bool) -> Self {
        if run_async {
            ExecMode::Async
        } else {
            ExecMode::Sync
        }
    }
}

/// External decision advancing a paused run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResumeDecision {
    Approve,
    Modify,
    Reject,
}

/// Caller-visible result of one operation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Generated { html_path: String, content: String },
    Sent { send_id: String },
    /// Paused at the review gate; only an external resume advances the run
    Waiting,
    /// Background mode accepted; poll status to observe completion
    Accepted { instance_id: String },
    Rejected { reason: String },
}

/// Internal result of driving a run to its suspension or completion point
pub(crate) enum DriveResult {
    Generated { html_path: PathBuf, content: String },
    Sent { html_path: PathBuf, send_id: String },
    Waiting,
}

/// The workflow orchestrator
#[derive(Clone)]
pub struct WorkflowEngine {
    instances_root: PathBuf,
    pub(crate) generation: Arc<dyn GenerationBackend>,
    pub(crate) delivery: Arc<dyn DeliveryTransport>,
    pub(crate) review: Arc<dyn ReviewService>,
}

impl WorkflowEngine {
    pub fn new(
        instances_root: PathBuf,
        generation: Arc<dyn GenerationBackend>,
        delivery: Arc<dyn DeliveryTransport>,
        review: Arc<dyn ReviewService>,
    ) -> Self {
        Self {
            instances_root,
            generation,
            delivery,
            review,
        }
    }

    pub fn instances_root(&self) -> &Path {
        &self.instances_root
    }

    /// Execute one operation against an instance
    ///
    /// Activation (durable `status=active`) always happens before this
    /// returns; in async mode the remaining work is handed to a background
    /// task that finalizes the state document itself.
    pub async fn execute(
        &self,
        instance_id: &str,
        op: Operation,
        mode: ExecMode,
    ) -> Result<Outcome> {
        let ctx = InstanceContext::load(&self.instances_root, instance_id).await?;
        let store = InstanceStore::new(&ctx);
        store.activate().await?;

        match mode {
            ExecMode::Sync => self.run(&ctx, &store, &op).await,
            ExecMode::Async => {
                let engine = self.clone();
                let id = instance_id.to_string();
                tokio::spawn(async move {
                    engine.run_background(&ctx, &store, &op).await;
                    debug!("background task for instance '{}' exited", id);
                });
                Ok(Outcome::Accepted {
                    instance_id: instance_id.to_string(),
                })
            }
        }
    }

    /// Advance a paused run with an external decision
    pub async fn resume(
        &self,
        instance_id: &str,
        decision: ResumeDecision,
        information: Option<String>,
    ) -> Result<Outcome> {
        match decision {
            ResumeDecision::Approve => {
                self.execute(instance_id, Operation::send_only().bypass_review(), ExecMode::Sync)
                    .await
            }
            ResumeDecision::Modify => {
                let instructions = information
                    .filter(|text| !text.trim().is_empty())
                    .ok_or_else(|| {
                        Error::Validation(
                            "resume with 'modify' requires revision instructions".to_string(),
                        )
                    })?;
                let op = Operation::generate_then_send()
                    .with_instructions(Some(instructions))
                    .with_edit(true);
                self.execute(instance_id, op, ExecMode::Sync).await
            }
            ResumeDecision::Reject => {
                let ctx = InstanceContext::load(&self.instances_root, instance_id).await?;
                let store = InstanceStore::new(&ctx);
                let reason = information
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or_else(|| "rejected by reviewer".to_string());
                store
                    .record_progress(&format!("resume: rejected ({})", reason))
                    .await;
                store
                    .finalize(RunOutcome::Abort {
                        last_error: format!("hitl_rejected: {}", reason),
                    })
                    .await?;
                Ok(Outcome::Rejected { reason })
            }
        }
    }

    /// Current state document
    pub async fn status(&self, instance_id: &str) -> Result<RunState> {
        let ctx = InstanceContext::load(&self.instances_root, instance_id).await?;
        InstanceStore::new(&ctx).load_state().await
    }

    /// Progress entries, latest-only or the full sequence
    pub async fn progress(&self, instance_id: &str, full: bool) -> Result<Vec<ProgressEntry>> {
        let state = self.status(instance_id).await?;
        if full {
            Ok(state.progress)
        } else {
            Ok(state.progress.into_iter().last().into_iter().collect())
        }
    }

    /// Drive a run and finalize the state document from its outcome
    async fn run(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        op: &Operation,
    ) -> Result<Outcome> {
        match self.drive(ctx, store, op).await {
            Ok(DriveResult::Generated { html_path, content }) => {
                let path = html_path.display().to_string();
                store
                    .finalize(RunOutcome::Finished {
                        last_html_path: Some(path.clone()),
                        last_send_id: None,
                    })
                    .await?;
                Ok(Outcome::Generated {
                    html_path: path,
                    content,
                })
            }
            Ok(DriveResult::Sent { html_path, send_id }) => {
                store
                    .finalize(RunOutcome::Finished {
                        last_html_path: Some(html_path.display().to_string()),
                        last_send_id: Some(send_id.clone()),
                    })
                    .await?;
                Ok(Outcome::Sent { send_id })
            }
            // Paused: status stays active, nothing to finalize
            Ok(DriveResult::Waiting) => Ok(Outcome::Waiting),
            Err(e) => {
                if let Err(f) = store
                    .finalize(RunOutcome::Abort {
                        last_error: e.to_string(),
                    })
                    .await
                {
                    warn!(
                        "failed to finalize aborted run for '{}': {}",
                        ctx.id, f
                    );
                }
                Err(e)
            }
        }
    }

    /// Background-mode wrapper: errors and panics are both converted into a
    /// terminal abort so a run can never stay `active` forever
    async fn run_background(&self, ctx: &InstanceContext, store: &InstanceStore, op: &Operation) {
        let result = AssertUnwindSafe(self.run(ctx, store, op)).catch_unwind().await;
        match result {
            Ok(Ok(outcome)) => {
                debug!("background run for '{}' finished: {:?}", ctx.id, outcome)
            }
            // run() already finalized the abort
            Ok(Err(e)) => warn!("background run for '{}' aborted: {}", ctx.id, e),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("background run for '{}' panicked: {}", ctx.id, message);
                if let Err(e) = store
                    .finalize(RunOutcome::Abort {
                        last_error: format!("internal error: {}", message),
                    })
                    .await
                {
                    warn!("failed to finalize panicked run for '{}': {}", ctx.id, e);
                }
            }
        }
    }

    /// The one flow: optional generation, then the optional send path
    /// (review gate, delivery)
    async fn drive(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        op: &Operation,
    ) -> Result<DriveResult> {
        let artifact_path = ctx.artifact_path();

        if op.send {
            // Validation failures must surface before any collaborator call
            ctx.config.review_gate(&ctx.id)?;
            if ctx.config.has_no_recipients() {
                return Err(Error::NoRecipientsConfigured(ctx.id.clone()));
            }
        }

        let mut html = None;
        if op.generate {
            let content = self
                .generation_step(
                    ctx,
                    store,
                    op.instructions.as_deref(),
                    op.edit,
                    op.base_artifact.as_deref(),
                )
                .await?;
            html = Some(content);
        }

        if !op.send {
            return Ok(DriveResult::Generated {
                content: html.unwrap_or_default(),
                html_path: artifact_path,
            });
        }

        let html = match html {
            Some(content) => content,
            None => store.read_artifact(&artifact_path).await?,
        };

        let html = match self.review_gate(ctx, store, html, op.skip_review).await? {
            GateOutcome::Proceed { html } => html,
            GateOutcome::Paused => {
                store.record_progress("waiting for human review").await;
                return Ok(DriveResult::Waiting);
            }
        };

        let send_id = self.delivery_step(ctx, store, &html).await?;
        Ok(DriveResult::Sent {
            html_path: artifact_path,
            send_id,
        })
    }
}
