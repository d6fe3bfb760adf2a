//! Collaborator boundary
//!
//! The generation backend, delivery transport and review service are external
//! collaborators. The engine only sees these traits; the HTTP implementations
//! here are thin adapters that normalize provider-specific shapes at the
//! boundary.

pub mod delivery;
pub mod generation;
pub mod review;

pub use delivery::{Envelope, HttpDeliveryTransport};
pub use generation::{GeneratedContent, HttpGenerationBackend};
pub use review::{ArtifactOverride, Decision, HttpReviewService, ReviewRequest};

use crate::error::Result;
use crate::instance::ModelConfig;
use async_trait::async_trait;

/// Generation backend: prompt in, generated text with an HTML block out
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str, model: &ModelConfig) -> Result<GeneratedContent>;
}

/// Delivery transport: envelope in, delivery id out
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn deliver(&self, envelope: &Envelope) -> Result<String>;
}

/// Human-review service: run context in, normalized decision out
#[async_trait]
pub trait ReviewService: Send + Sync {
    async fn review(&self, request: &ReviewRequest) -> Result<Decision>;
}
