use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Instance config declares id '{declared}' but resolves to '{resolved}'")]
    ConfigMismatch { declared: String, resolved: String },

    #[error("Instance config has no review-gate (hitl) block: {0}")]
    MissingReviewConfig(String),

    #[error("No recipients configured for instance '{0}' (to/cc/bcc all empty)")]
    NoRecipientsConfigured(String),

    #[error("Requested base artifact not found: {}", .0.display())]
    BaseArtifactNotFound(PathBuf),

    #[error("Generation backend request failed: {0}")]
    GenerationRequest(String),

    #[error("Generation backend returned no usable content: {0}")]
    GenerationEmpty(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Review service failed: {0}")]
    ReviewFailed(String),

    #[error("hitl_rejected: {0}")]
    ReviewRejected(String),

    #[error("hitl_unknown_status: {0}")]
    UnknownDecision(String),

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
