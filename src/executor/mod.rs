//! Request execution
//!
//! One call moves through resolve → cache check → transport → transform
//! → cache write. Outcomes are always a discriminated [`ApiResult`];
//! transport and upstream failures are captured into it, never thrown,
//! so a batch can report one bad item inline without unwinding.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::auth::AuthApplier;
use crate::cache::{CacheKey, CacheKeyGenerator, FileCacheStore};
use crate::config::{EndpointDescriptor, ParamHints, ServiceConfig};
use crate::params;
use crate::transform;
use crate::transport::{Transport, TransportRequest};
use crate::Error;

/// Flattened error payload carried inside an [`ApiResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl From<&Error> for ApiError {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            status: error.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMetadata {
    /// True when the data came from the cache without touching the
    /// network.
    pub cached: bool,
    pub timestamp_ms: u64,
    /// Position of this result within a batch, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// The outcome of a single call: either transformed data or a
/// structured error, plus execution metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub metadata: ResultMetadata,
}

impl ApiResult {
    pub fn success(data: Value, cached: bool) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: ResultMetadata {
                cached,
                timestamp_ms: now_ms(),
                index: None,
            },
        }
    }

    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError::from(error)),
            metadata: ResultMetadata {
                cached: false,
                timestamp_ms: now_ms(),
                index: None,
            },
        }
    }
}

/// Executes one declaratively-described operation at a time.
///
/// Exactly one request is ever in flight; callers that need many calls
/// go through the batch orchestrator, which stays strictly sequential to
/// be a good citizen toward rate-limited upstream APIs.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    cache: FileCacheStore,
    keygen: CacheKeyGenerator,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, cache: FileCacheStore) -> Self {
        Self {
            transport,
            cache,
            keygen: CacheKeyGenerator::new(),
        }
    }

    pub fn cache(&self) -> &FileCacheStore {
        &self.cache
    }

    /// Execute one call. GET endpoints with a positive `cache_ttl` are
    /// served from the cache on a key hit, skipping transport and
    /// transform entirely; on success the *post-transform* result is
    /// stored so live and cached responses are identical in shape.
    pub async fn execute(
        &self,
        service: &ServiceConfig,
        endpoint: &EndpointDescriptor,
        raw: &Map<String, Value>,
        hints: &ParamHints,
    ) -> ApiResult {
        let mapped = match params::resolve(endpoint, raw, hints) {
            Ok(mapped) => mapped,
            Err(e) => return ApiResult::failure(&e),
        };

        let url = format!(
            "{}{}",
            service.base_url.trim_end_matches('/'),
            mapped.interpolate_path(&endpoint.path)
        );
        let mut headers = service.headers.clone();
        headers.extend(mapped.headers.clone());
        let mut query = mapped.query_pairs();
        let logical_url = url_with_query(&url, &query);

        // The key is computed before credentials are applied; secret
        // headers never participate in it.
        let cache_key = self.cache_key(service, endpoint, &logical_url, &headers);
        if let Some(key) = &cache_key {
            if let Some(data) = self.cache.get(key) {
                debug!(key = %key, "cache hit");
                return ApiResult::success(data, true);
            }
        }

        if let Some(auth) = &service.auth {
            AuthApplier::apply(&service.name, auth, &mut headers, &mut query);
        }
        headers.insert(
            "x-opcall-request-id".to_string(),
            Uuid::new_v4().to_string(),
        );

        let response = match self
            .transport
            .send(TransportRequest {
                url,
                method: endpoint.method,
                headers,
                query,
                body: mapped.body.clone().map(Value::Object),
            })
            .await
        {
            Ok(response) => response,
            Err(e) => return ApiResult::failure(&Error::Transport(e)),
        };

        if !response.is_success() {
            return ApiResult::failure(&Error::UpstreamHttp {
                status: response.status,
                body: response.body,
            });
        }

        let data = transform::apply(response.body, &endpoint.transform);

        if let Some(key) = &cache_key {
            self.cache
                .set(key, &data, endpoint.cache_ttl.unwrap_or(0), &logical_url);
        }

        ApiResult::success(data, false)
    }

    fn cache_key(
        &self,
        service: &ServiceConfig,
        endpoint: &EndpointDescriptor,
        logical_url: &str,
        headers: &HashMap<String, String>,
    ) -> Option<CacheKey> {
        if !endpoint.method.is_cacheable() || !endpoint.cache_enabled() {
            return None;
        }
        Some(self.keygen.generate(
            &service.name,
            &endpoint.name,
            endpoint.method,
            logical_url,
            headers,
        ))
    }
}

/// The logical request URL: path plus sorted query string. Used for the
/// cache key and entry metadata, not for the wire request.
fn url_with_query(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let mut sorted: Vec<&(String, String)> = query.iter().collect();
    sorted.sort();
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .extend_pairs(sorted.iter().map(|(k, v)| (k, v)));
            parsed.to_string()
        }
        Err(_) => {
            let qs: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{}?{}", url, qs.join("&"))
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_url_sorts_query_pairs() {
        let a = url_with_query(
            "https://api.test/v1/items",
            &[("b".into(), "2".into()), ("a".into(), "1".into())],
        );
        let b = url_with_query(
            "https://api.test/v1/items",
            &[("a".into(), "1".into()), ("b".into(), "2".into())],
        );
        assert_eq!(a, b);
        assert_eq!(a, "https://api.test/v1/items?a=1&b=2");
    }

    #[test]
    fn api_error_flattens_crate_error() {
        let err = Error::UpstreamHttp {
            status: 503,
            body: Value::Null,
        };
        let api = ApiError::from(&err);
        assert_eq!(api.kind, "upstream_http");
        assert_eq!(api.status, Some(503));
    }
}
