//! HTTP generation backend adapter
//!
//! Providers disagree on response shape, so the adapter normalizes whatever
//! comes back to plain text plus an extracted HTML block. Retries, if wanted,
//! belong to the backend itself; this layer makes exactly one call.

use super::GenerationBackend;
use crate::error::{Error, Result};
use crate::instance::ModelConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Normalized generation result
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    /// Full text returned by the backend
    pub text: String,
    /// The extracted HTML document
    pub html: String,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// reqwest-backed generation backend
pub struct HttpGenerationBackend {
    client: Client,
    default_endpoint: Option<String>,
}

impl HttpGenerationBackend {
    pub fn new(default_endpoint: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            default_endpoint,
        })
    }

    fn endpoint<'a>(&'a self, model: &'a ModelConfig) -> Result<&'a str> {
        model
            .endpoint
            .as_deref()
            .or(self.default_endpoint.as_deref())
            .ok_or_else(|| {
                Error::Config("no generation endpoint configured (instance or default)".to_string())
            })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(&self, prompt: &str, model: &ModelConfig) -> Result<GeneratedContent> {
        let endpoint = self.endpoint(model)?;
        let request = GenerationRequest {
            prompt,
            model: model.model.as_deref(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::GenerationRequest(format!("{}: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GenerationRequest(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::GenerationRequest(format!("unparseable response body: {}", e)))?;

        let text = extract_text(&body)
            .ok_or_else(|| Error::GenerationEmpty("no text field in backend response".to_string()))?;
        let html = extract_html(&text)?;

        Ok(GeneratedContent { text, html })
    }
}

/// Pull the generated text out of a provider-specific response shape
pub fn extract_text(body: &serde_json::Value) -> Option<String> {
    let candidates = [
        &body["content"][0]["text"],
        &body["choices"][0]["message"]["content"],
        &body["choices"][0]["text"],
        &body["content"],
        &body["output"],
        &body["text"],
        &body["response"],
    ];
    candidates
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .find(|s| !s.trim().is_empty())
}

/// Extract the HTML document from generated text
///
/// Accepts a fenced ```html block, a bare <html>...</html> span (with any
/// preceding doctype), or a response that is already just markup.
pub fn extract_html(text: &str) -> Result<String> {
    let fenced = Regex::new(r"(?s)```(?:html|HTML)\s*\n?(.*?)```").expect("static regex");
    if let Some(captures) = fenced.captures(text) {
        let block = captures[1].trim();
        if !block.is_empty() {
            return Ok(block.to_string());
        }
    }

    let span = Regex::new(r"(?is)(<!DOCTYPE[^>]*>\s*)?<html.*</html>").expect("static regex");
    if let Some(found) = span.find(text) {
        return Ok(found.as_str().trim().to_string());
    }

    let trimmed = text.trim();
    if trimmed.starts_with('<') && !trimmed.is_empty() {
        return Ok(trimmed.to_string());
    }

    Err(Error::GenerationEmpty(
        "no HTML block found in generated text".to_string(),
    ))
}
