use async_trait::async_trait;
use reqwest::Proxy;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use url::Url;

use super::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::config::HttpMethod;

/// reqwest-backed [`Transport`]. Owns TLS, pooling and deadlines; the
/// execution core imposes no timeout of its own.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        // Minimal production-friendly defaults (env-overridable).
        let timeout_secs = env::var("OPCALL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));

        if let Ok(proxy_url) = env::var("OPCALL_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            req = req.header(name, value);
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // Decode the body here so the core only ever sees JSON. Error
        // bodies that are not JSON are preserved as a string value.
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
