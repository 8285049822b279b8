//! Cache key generation.
//!
//! Keys are derived from a canonical, secret-free description of the
//! request: `{service, endpoint, method, url, headers}` where only an
//! explicit allow-list of headers participates (lower-cased, sorted) and
//! credential-bearing headers are always excluded. Two callers with
//! different credentials therefore share one entry for the same logical
//! request; that sharing is deliberate.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use crate::auth::is_secret_header;
use crate::config::HttpMethod;

/// Headers that may influence the response shape and so participate in
/// the cache key.
pub const HEADER_ALLOWLIST: &[&str] = &[
    "accept",
    "accept-language",
    "content-type",
    "x-api-version",
    "prefer",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hash: String,
    pub service: String,
    pub endpoint: String,
}

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    service: &'a str,
    endpoint: &'a str,
    method: &'a str,
    url: &'a str,
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn generate(
        &self,
        service: &str,
        endpoint: &str,
        method: HttpMethod,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> CacheKey {
        let mut canonical_headers = BTreeMap::new();
        for (name, value) in headers {
            let lower = name.to_ascii_lowercase();
            if HEADER_ALLOWLIST.contains(&lower.as_str()) && !is_secret_header(&lower) {
                canonical_headers.insert(lower, value.to_ascii_lowercase());
            }
        }
        if let Some(salt) = &self.salt {
            canonical_headers.insert("x-opcall-key-salt".to_string(), salt.clone());
        }

        let canonical = Canonical {
            service,
            endpoint,
            method: method.as_str(),
            url,
            headers: canonical_headers,
        };
        let serialized = serde_json::to_string(&canonical).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        CacheKey {
            hash,
            service: service.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn generate(h: &HashMap<String, String>) -> CacheKey {
        CacheKeyGenerator::new().generate(
            "gh",
            "repos",
            HttpMethod::Get,
            "https://api.github.com/users/octocat/repos?per_page=10",
            h,
        )
    }

    #[test]
    fn deterministic_and_header_order_independent() {
        let a = generate(&headers(&[("Accept", "application/json"), ("Prefer", "minimal")]));
        let b = generate(&headers(&[("prefer", "MINIMAL"), ("accept", "application/JSON")]));
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn allowlisted_header_value_changes_key() {
        let a = generate(&headers(&[("accept", "application/json")]));
        let b = generate(&headers(&[("accept", "text/csv")]));
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn secret_headers_never_change_key() {
        let anon = generate(&headers(&[("accept", "application/json")]));
        let authed = generate(&headers(&[
            ("accept", "application/json"),
            ("Authorization", "Bearer token-a"),
            ("X-API-Key", "key-b"),
            ("Cookie", "session=1"),
        ]));
        assert_eq!(anon.hash, authed.hash);
    }

    #[test]
    fn unlisted_headers_are_ignored() {
        let a = generate(&headers(&[("x-request-id", "1")]));
        let b = generate(&headers(&[("x-request-id", "2")]));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn url_method_and_identity_feed_the_key() {
        let base = generate(&HashMap::new());
        let gen = CacheKeyGenerator::new();
        let other_url = gen.generate(
            "gh",
            "repos",
            HttpMethod::Get,
            "https://api.github.com/users/octocat/repos?per_page=20",
            &HashMap::new(),
        );
        assert_ne!(base.hash, other_url.hash);

        let salted = CacheKeyGenerator::new().with_salt("v2").generate(
            "gh",
            "repos",
            HttpMethod::Get,
            "https://api.github.com/users/octocat/repos?per_page=10",
            &HashMap::new(),
        );
        assert_ne!(base.hash, salted.hash);
    }
}
