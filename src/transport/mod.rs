//! HTTP transport seam.
//!
//! The execution core depends only on the [`Transport`] trait; the
//! default implementation is [`HttpTransport`] (reqwest). TLS,
//! connection handling and timeouts live behind this seam, never in the
//! core.

pub mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::HttpMethod;

/// One fully-assembled outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A decoded response. Non-2xx statuses are returned here, not as
/// errors; only network-level failures become [`TransportError`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Other(String),
}
