//! Credential resolution and request authentication.
//!
//! Credentials are looked up in the OS keyring first, then in the
//! environment. The header names written here are exactly the ones the
//! cache key generator refuses to hash, so two callers with different
//! credentials share one cache entry for the same logical request.

use keyring::Entry;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::env;

use crate::config::AuthConfig;

/// Headers that may carry credentials. Never included in cache keys.
pub static SECRET_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "authorization",
        "proxy-authorization",
        "x-api-key",
        "api-key",
        "x-auth-token",
        "cookie",
    ])
});

pub fn is_secret_header(name: &str) -> bool {
    SECRET_HEADERS.contains(name.to_ascii_lowercase().as_str())
}

pub struct AuthApplier;

impl AuthApplier {
    /// Resolve the credential for a service: keyring entry first, then
    /// the configured env var, then `{SERVICE}_API_KEY`.
    pub fn resolve_credential(service: &str, auth: &AuthConfig) -> Option<String> {
        if let Ok(entry) = Entry::new("opcall", service) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        if let Some(var) = &auth.key_env {
            if let Ok(key) = env::var(var) {
                return Some(key);
            }
        }

        env::var(format!("{}_API_KEY", service.to_uppercase().replace('-', "_"))).ok()
    }

    /// Inject the credential into outgoing headers or query parameters
    /// per the auth type. Unknown types and missing credentials leave
    /// the request untouched.
    pub fn apply(
        service: &str,
        auth: &AuthConfig,
        headers: &mut HashMap<String, String>,
        query: &mut Vec<(String, String)>,
    ) {
        let Some(credential) = Self::resolve_credential(service, auth) else {
            tracing::debug!(service, "no credential resolved, sending unauthenticated");
            return;
        };
        match auth.auth_type.as_str() {
            "bearer" => {
                headers.insert("authorization".to_string(), format!("Bearer {credential}"));
            }
            "header" => {
                let name = auth.header_name.as_deref().unwrap_or("x-api-key");
                headers.insert(name.to_ascii_lowercase(), credential);
            }
            "query" => {
                let name = auth.param_name.as_deref().unwrap_or("api_key");
                query.push((name.to_string(), credential));
            }
            other => {
                tracing::warn!(auth_type = other, "unknown auth type, skipping");
            }
        }
    }
}
