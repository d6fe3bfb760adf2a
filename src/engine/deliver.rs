//! Delivery step

use super::WorkflowEngine;
use crate::clients::Envelope;
use crate::error::{Error, Result};
use crate::instance::{InstanceContext, InstanceStore};

impl WorkflowEngine {
    /// Hand the approved artifact to the delivery transport
    ///
    /// Empty to/cc/bcc is a hard stop, not a default-to-sender fallback: the
    /// review gate already authorized exactly this delivery.
    pub(crate) async fn delivery_step(
        &self,
        ctx: &InstanceContext,
        store: &InstanceStore,
        html: &str,
    ) -> Result<String> {
        let config = &ctx.config;
        if config.has_no_recipients() {
            return Err(Error::NoRecipientsConfigured(ctx.id.clone()));
        }

        let envelope = Envelope {
            from_name: config.from_name.clone(),
            from_email: config.from_email.clone(),
            to: config.to.clone(),
            cc: config.cc.clone(),
            bcc: config.bcc.clone(),
            subject: config.subject.clone(),
            html: html.to_string(),
        };

        store.record_progress("sending").await;
        let send_id = self.delivery.deliver(&envelope).await?;
        store.record_progress("sent").await;
        Ok(send_id)
    }
}
