//! Analytics backend HTTP client
//!
//! Thin reqwest wrapper over the backend boundary: report upload (multipart
//! file or JSON URL body), visualization fetch, and feedback submission.
//! Only response status is interpreted for upload and feedback; the fetch
//! body is returned raw for downstream per-artifact validation.

use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::session::ReportSource;

const USER_AGENT: &str = concat!("irvis/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend client errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("backend returned status {0}: {1}")]
    Rejected(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Analytics backend API client
#[derive(Debug, Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let base_url = base_url.into();
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &irvis_common::config::BackendConfig) -> Result<Self, BackendError> {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /upload with the selected report source.
    ///
    /// File mode sends a multipart body with a `file` field; URL mode sends
    /// a JSON `{"url": ...}` body. Only the status is interpreted.
    pub async fn upload_report(&self, source: &ReportSource) -> Result<(), BackendError> {
        let endpoint = format!("{}/upload", self.base_url);

        let request = match source {
            ReportSource::File {
                file_name,
                media_type,
                bytes,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(media_type)
                    .map_err(|e| BackendError::Parse(format!("invalid media type: {}", e)))?;
                let form = reqwest::multipart::Form::new().part("file", part);
                self.http_client.post(&endpoint).multipart(form)
            }
            ReportSource::Url(report_url) => self
                .http_client
                .post(&endpoint)
                .json(&json!({ "url": report_url })),
        };

        tracing::debug!(endpoint = %endpoint, mode = source.mode(), "uploading report source");

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::check_status(response).await?;

        tracing::info!(mode = source.mode(), "report source accepted by backend");
        Ok(())
    }

    /// GET /visualizations, returning the raw payload for downstream
    /// per-artifact validation.
    pub async fn fetch_visualizations(&self) -> Result<Value, BackendError> {
        let endpoint = format!("{}/visualizations", self.base_url);

        tracing::debug!(endpoint = %endpoint, "fetching visualization payload");

        let response = self
            .http_client
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// POST /feedback. Failures are the caller's to absorb.
    pub async fn send_feedback(&self, feedback: &str) -> Result<(), BackendError> {
        let endpoint = format!("{}/feedback", self.base_url);

        let response = self
            .http_client
            .post(&endpoint)
            .json(&json!({ "feedback": feedback }))
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected(status.as_u16(), body));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BackendClient::new("http://127.0.0.1:5000");
        assert!(client.is_ok());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://127.0.0.1:5000/").expect("client builds");
        assert_eq!(client.base_url(), "http://127.0.0.1:5000");
    }
}
