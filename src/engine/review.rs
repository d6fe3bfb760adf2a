//! Review gate
//!
//! The bounded decision loop between generation and delivery. It must never
//! deadlock the instance: `wait` suspends durably, `has-input` regenerates at
//! most `max_loops` times, loop exhaustion counts as implicit approval, and a
//! disabled gate never blocks delivery on a collaborator failure.

use super::WorkflowEngine;
use crate::clients::review::{ArtifactOverride, Decision};
use crate::clients::ReviewRequest;
use crate::error::{Error, Result};
use crate::instance::{InstanceContext, InstanceStore};
use tracing::{info, warn};

/// Where the gate left the run
pub enum GateOutcome {
    /// Deliver this artifact
    Proceed { html: String },
    /// Suspend; persisted status stays `active` until an external resume
    Paused,
}

impl WorkflowEngine {
    /// Evaluate the review gate for one send operation
    pub(crate) async fn review_gate(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        mut html: String,
        skip: bool,
    ) -> Result<GateOutcome> {
        let gate = ctx.config.review_gate(&ctx.id)?.clone();

        if skip {
            info!("review gate bypassed for instance '{}'", ctx.id);
            store.record_progress("review gate bypassed").await;
            return Ok(GateOutcome::Proceed { html });
        }

        let bound = gate.loop_bound();
        let mut loop_index = 0u32;

        loop {
            let request = ReviewRequest {
                instance_id: ctx.id.clone(),
                html_path: Some(ctx.artifact_path().display().to_string()),
                html: Some(html.clone()),
                config: gate.as_raw(),
                loop_index,
            };

            let decision = match self.review.review(&request).await {
                Ok(decision) => decision,
                Err(e) => {
                    if gate.enable {
                        return Err(e);
                    }
                    // Disabled gates must never block delivery; keep the
                    // error text visible in the state document.
                    warn!(
                        "review service error ignored for '{}' (gate disabled): {}",
                        ctx.id, e
                    );
                    store.record_error(&e.to_string()).await;
                    store
                        .record_progress("review gate disabled, proceeding despite review error")
                        .await;
                    return Ok(GateOutcome::Proceed { html });
                }
            };

            match decision {
                Decision::NoHitl { artifact } => {
                    html = self.adopt_override(ctx, store, artifact, html).await?;
                    store.record_progress("review gate reported no-hitl").await;
                    return Ok(GateOutcome::Proceed { html });
                }
                Decision::Approve { artifact } => {
                    html = self.adopt_override(ctx, store, artifact, html).await?;
                    store.record_progress("review approved").await;
                    return Ok(GateOutcome::Proceed { html });
                }
                Decision::Wait => {
                    // Zero loop budget consumed; not retried automatically
                    return Ok(GateOutcome::Paused);
                }
                Decision::Reject { reason } => {
                    return Err(Error::ReviewRejected(
                        reason.unwrap_or_else(|| "rejected by reviewer".to_string()),
                    ));
                }
                Decision::HasInput { input, artifact } => {
                    if input.is_empty() {
                        html = self.adopt_override(ctx, store, artifact, html).await?;
                        store
                            .record_progress("review returned empty input, treating as approve")
                            .await;
                        return Ok(GateOutcome::Proceed { html });
                    }
                    if loop_index >= bound {
                        // Exhaustion is implicit approval, never a deadlock
                        store
                            .record_progress("review loop bound reached, proceeding")
                            .await;
                        return Ok(GateOutcome::Proceed { html });
                    }
                    loop_index += 1;
                    store
                        .record_progress(&format!(
                            "regenerating from reviewer input (loop {})",
                            loop_index
                        ))
                        .await;
                    html = self
                        .generation_step(ctx, store, Some(&input), true, None)
                        .await?;
                }
            }
        }
    }

    /// Adopt a reviewer-supplied artifact, persisting it through the
    /// archiving rule so it becomes the canonical version
    async fn adopt_override(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        artifact: Option<ArtifactOverride>,
        current: String,
    ) -> Result<String> {
        match artifact {
            None => Ok(current),
            Some(ArtifactOverride::Inline(html)) => {
                store.write_artifact(&ctx.artifact_path(), &html).await?;
                store
                    .record_progress("adopted reviewer-supplied artifact")
                    .await;
                Ok(html)
            }
            Some(ArtifactOverride::Path(path)) => {
                let html = store.read_artifact(&path).await?;
                store.write_artifact(&ctx.artifact_path(), &html).await?;
                store
                    .record_progress("adopted reviewer-supplied artifact")
                    .await;
                Ok(html)
            }
        }
    }
}
