//! Conversion requests
//!
//! [`TransportClient`] sends one request per opened document and folds every
//! possible outcome into `Result<ConvertedDocument, ConversionFailure>`.
//! Requests are never retried.

use async_trait::async_trait;
use thiserror::Error;

use crate::envelope::{ConversionFailure, ConversionRequest, ConvertedDocument};

/// Longest raw error body echoed back to the user
const MAX_RAW_ERROR_CHARS: usize = 500;

/// Raw HTTP outcome
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

/// Sends a JSON body and returns the raw response
#[async_trait(?Send)]
pub trait Transport {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpResponse, TransportError>;
}

/// `reqwest` transport; uses `fetch` on wasm32
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

pub struct TransportClient<T: Transport> {
    transport: T,
    endpoint: String,
}

impl<T: Transport> TransportClient<T> {
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request the conversion of `path`
    pub async fn convert(&self, path: &str) -> Result<ConvertedDocument, ConversionFailure> {
        let body = serde_json::to_string(&ConversionRequest { path })
            .map_err(|e| ConversionFailure::transport(e.to_string()).with_path(path))?;

        match self.transport.post_json(&self.endpoint, body).await {
            Ok(response) => normalize(response).map_err(|f| f.with_path(path)),
            Err(e) => Err(ConversionFailure::transport(e.to_string()).with_path(path)),
        }
    }
}

/// Fold a raw response into the single result shape
pub fn normalize(response: HttpResponse) -> Result<ConvertedDocument, ConversionFailure> {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();

    if (200..300).contains(&response.status) {
        let value = parsed.ok_or_else(|| ConversionFailure::transport("Malformed response"))?;
        if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
            return Err(failure_from_value(value)
                .unwrap_or_else(|| ConversionFailure::transport("Malformed response")));
        }
        return serde_json::from_value::<ConvertedDocument>(value)
            .map_err(|_| ConversionFailure::transport("Malformed response"));
    }

    if let Some(failure) = parsed.and_then(failure_from_value) {
        return Err(failure);
    }

    let raw = response.body.trim();
    if raw.is_empty() {
        Err(ConversionFailure::transport(format!(
            "Request failed with status {}",
            response.status
        )))
    } else {
        Err(ConversionFailure::transport(
            raw.chars().take(MAX_RAW_ERROR_CHARS).collect::<String>(),
        ))
    }
}

fn failure_from_value(value: serde_json::Value) -> Option<ConversionFailure> {
    value.get("error").and_then(|e| e.as_str())?;
    serde_json::from_value(value).ok()
}

/// Absolute endpoint URL; relative endpoints are joined to `origin`
pub fn resolve_endpoint(endpoint: &str, origin: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{}{}", origin, endpoint)
    } else {
        format!("{}/{}", origin, endpoint)
    }
}
