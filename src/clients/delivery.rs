//! HTTP delivery transport adapter

use super::DeliveryTransport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One outbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub from_name: String,
    pub from_email: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
struct DeliveryResponse {
    #[serde(alias = "id", alias = "messageId")]
    message_id: Option<String>,
}

/// reqwest-backed delivery transport
pub struct HttpDeliveryTransport {
    client: Client,
    endpoint: String,
}

impl HttpDeliveryTransport {
    pub fn new(endpoint: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl DeliveryTransport for HttpDeliveryTransport {
    async fn deliver(&self, envelope: &Envelope) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| Error::DeliveryFailed(format!("{}: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::DeliveryFailed(format!(
                "{} returned {}: {}",
                self.endpoint, status, body
            )));
        }

        let parsed: DeliveryResponse = response
            .json()
            .await
            .map_err(|e| Error::DeliveryFailed(format!("unparseable response: {}", e)))?;

        parsed
            .message_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::DeliveryFailed("transport returned no message id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_response_field_aliases() {
        for body in [
            r#"{"message_id": "m-1"}"#,
            r#"{"id": "m-1"}"#,
            r#"{"messageId": "m-1"}"#,
        ] {
            let parsed: DeliveryResponse = serde_json::from_str(body).unwrap();
            assert_eq!(parsed.message_id.as_deref(), Some("m-1"));
        }
    }

    #[test]
    fn test_envelope_serializes_recipient_lists() {
        let envelope = Envelope {
            from_name: "Marketing".to_string(),
            from_email: "news@example.com".to_string(),
            to: vec!["a@example.com".to_string()],
            cc: vec![],
            bcc: vec!["b@example.com".to_string()],
            subject: "Digest".to_string(),
            html: "<html/>".to_string(),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["to"][0], "a@example.com");
        assert_eq!(json["bcc"][0], "b@example.com");
        assert!(json["cc"].as_array().unwrap().is_empty());
    }
}
