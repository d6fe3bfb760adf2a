//! Generation step
//!
//! One backend call, no retry at this layer; the result is written through
//! the store's archiving rule so no previous version is ever destroyed.

use super::WorkflowEngine;
use crate::error::Result;
use crate::instance::{InstanceContext, InstanceStore};
use crate::prompt;
use std::path::Path;

impl WorkflowEngine {
    /// Produce an artifact and persist it at the instance's canonical path
    ///
    /// Milestones are discrete ("generating" / "saving artifact" /
    /// "generated") so a status poller sees fine-grained progress.
    pub(crate) async fn generation_step(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        instructions: Option<&str>,
        edit: bool,
        base_artifact: Option<&Path>,
    ) -> Result<String> {
        let template = ctx.read_template().await?;

        let existing = if edit {
            prompt::resolve_base_artifact(base_artifact, &ctx.artifact_path()).await?
        } else {
            None
        };

        let prompt_text = prompt::compose(&template, instructions, existing.as_deref());
        store.dump_debug("prompt", &prompt_text).await;

        store.record_progress("generating").await;
        let content = self
            .generation
            .generate(&prompt_text, &ctx.config.model)
            .await?;
        store.dump_debug("response", &content.text).await;

        store.record_progress("saving artifact").await;
        store
            .write_artifact(&ctx.artifact_path(), &content.html)
            .await?;

        store.record_progress("generated").await;
        Ok(content.html)
    }
}
