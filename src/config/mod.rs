//! Configuration structures
//!
//! This module contains the declarative types consumed by the execution
//! core: service descriptors, endpoint descriptors, auth configuration,
//! transform steps and parameter hints. Discovery and parsing of config
//! files is owned by the caller; this core only consumes already-resolved
//! values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::{Error, Result};

/// HTTP method for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods that carry a request body; the rest put unhinted
    /// parameters in the query string.
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    /// Only GET responses are cacheable.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

/// Declarative description of one callable operation.
///
/// `path` is a URL path template containing `{name}` placeholders that
/// are substituted with path-parameter values at resolution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub default_params: Map<String, Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Cache TTL in seconds. Caching is enabled only when this is > 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<i64>,
    #[serde(default)]
    pub transform: Vec<TransformStep>,
}

impl EndpointDescriptor {
    /// All distinct `{name}` placeholders in the path template, in
    /// template order.
    pub fn path_placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let name = &rest[open + 1..open + close];
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
            rest = &rest[open + close + 1..];
        }
        names
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_ttl.map_or(false, |ttl| ttl > 0)
    }
}

/// Service-level configuration: base URL plus optional auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
}

/// One declarative reshaping step applied to a decoded response body.
///
/// Steps run in declared order, each consuming the prior step's output.
/// The config shape is loose (an object carrying either an `extract` or
/// a `rename` key); it is decoded once, here, into a tagged variant so
/// the pipeline only ever consumes typed steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStep {
    Extract { paths: Vec<String> },
    Rename { mapping: Vec<(String, String)> },
}

impl<'de> Deserialize<'de> for TransformStep {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Paths {
            // Shorthand: extract: "items[*].id"
            One(String),
            Many(Vec<String>),
        }

        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            extract: Option<Paths>,
            #[serde(default)]
            rename: Option<std::collections::BTreeMap<String, String>>,
        }

        let raw = Raw::deserialize(deserializer)?;
        match (raw.extract, raw.rename) {
            (Some(Paths::One(path)), None) => Ok(TransformStep::Extract { paths: vec![path] }),
            (Some(Paths::Many(paths)), None) => Ok(TransformStep::Extract { paths }),
            (None, Some(mapping)) => Ok(TransformStep::Rename {
                mapping: mapping.into_iter().collect(),
            }),
            _ => Err(serde::de::Error::custom(
                "transform step must have exactly one of `extract` or `rename`",
            )),
        }
    }
}

/// Where a parameter belongs in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamTarget {
    Path,
    Query,
    Header,
    Body,
}

/// Parameter names the caller explicitly tagged with a destination.
/// Hinted keys override automatic method-based inference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamHints {
    #[serde(default)]
    pub path: HashSet<String>,
    #[serde(default)]
    pub query: HashSet<String>,
    #[serde(default)]
    pub header: HashSet<String>,
    #[serde(default)]
    pub body: HashSet<String>,
}

impl ParamHints {
    pub fn classify(&self, key: &str) -> Option<ParamTarget> {
        if self.path.contains(key) {
            Some(ParamTarget::Path)
        } else if self.header.contains(key) {
            Some(ParamTarget::Header)
        } else if self.query.contains(key) {
            Some(ParamTarget::Query)
        } else if self.body.contains(key) {
            Some(ParamTarget::Body)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty() && self.header.is_empty() && self.body.is_empty()
    }
}

/// An alias bound to a `service.endpoint` name, optionally carrying
/// default parameters that form the lowest-precedence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    pub target: String,
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

/// A resolved set of services, endpoints and aliases, as handed over by
/// the config layer. Endpoints are keyed by `service.endpoint`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSet {
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointDescriptor>,
    #[serde(default)]
    pub aliases: HashMap<String, AliasConfig>,
}

impl ConfigSet {
    /// Look up an endpoint by `service.endpoint` name or alias. Returns
    /// the owning service, the descriptor, and any alias defaults.
    pub fn lookup(
        &self,
        name: &str,
    ) -> Result<(&ServiceConfig, &EndpointDescriptor, Map<String, Value>)> {
        let (target, defaults) = match self.aliases.get(name) {
            Some(alias) => (alias.target.as_str(), alias.defaults.clone()),
            None => (name, Map::new()),
        };
        let endpoint = self
            .endpoints
            .get(target)
            .ok_or_else(|| Error::EndpointNotFound(name.to_string()))?;
        let service_name = target
            .split_once('.')
            .map(|(s, _)| s)
            .ok_or_else(|| Error::EndpointNotFound(name.to_string()))?;
        let service = self
            .services
            .get(service_name)
            .ok_or_else(|| Error::EndpointNotFound(name.to_string()))?;
        Ok((service, endpoint, defaults))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transform_step_decodes_extract_list() {
        let step: TransformStep = serde_json::from_value(json!({
            "extract": ["items[*].id", "total"]
        }))
        .unwrap();
        assert_eq!(
            step,
            TransformStep::Extract {
                paths: vec!["items[*].id".into(), "total".into()]
            }
        );
    }

    #[test]
    fn transform_step_decodes_extract_shorthand() {
        let step: TransformStep = serde_json::from_value(json!({ "extract": "data.id" })).unwrap();
        assert_eq!(
            step,
            TransformStep::Extract {
                paths: vec!["data.id".into()]
            }
        );
    }

    #[test]
    fn transform_step_decodes_rename() {
        let step: TransformStep = serde_json::from_value(json!({
            "rename": { "items[*].name": "items[*].label" }
        }))
        .unwrap();
        assert_eq!(
            step,
            TransformStep::Rename {
                mapping: vec![("items[*].name".into(), "items[*].label".into())]
            }
        );
    }

    #[test]
    fn transform_step_rejects_ambiguous_shape() {
        let result: std::result::Result<TransformStep, _> = serde_json::from_value(json!({
            "extract": ["a"],
            "rename": { "b": "c" }
        }));
        assert!(result.is_err());

        let result: std::result::Result<TransformStep, _> = serde_json::from_value(json!({}));
        assert!(result.is_err());
    }

    #[test]
    fn path_placeholders_in_template_order() {
        let ep: EndpointDescriptor = serde_json::from_value(json!({
            "name": "user_repo",
            "method": "GET",
            "path": "/users/{user}/repos/{repo}/issues/{user}"
        }))
        .unwrap();
        assert_eq!(ep.path_placeholders(), vec!["user", "repo"]);
        assert!(!ep.cache_enabled());
    }

    #[test]
    fn cache_enabled_requires_positive_ttl() {
        let mut ep: EndpointDescriptor = serde_json::from_value(json!({
            "name": "e", "path": "/x", "cache_ttl": 300
        }))
        .unwrap();
        assert!(ep.cache_enabled());
        ep.cache_ttl = Some(0);
        assert!(!ep.cache_enabled());
        ep.cache_ttl = None;
        assert!(!ep.cache_enabled());
    }

    #[test]
    fn lookup_resolves_alias_with_defaults() {
        let cfg: ConfigSet = serde_json::from_value(json!({
            "services": { "gh": { "name": "gh", "base_url": "https://api.github.com" } },
            "endpoints": {
                "gh.repos": { "name": "repos", "path": "/users/{user}/repos" }
            },
            "aliases": {
                "myrepos": { "target": "gh.repos", "defaults": { "user": "octocat" } }
            }
        }))
        .unwrap();

        let (service, endpoint, defaults) = cfg.lookup("myrepos").unwrap();
        assert_eq!(service.name, "gh");
        assert_eq!(endpoint.name, "repos");
        assert_eq!(defaults.get("user").unwrap(), "octocat");

        assert!(matches!(
            cfg.lookup("gh.missing"),
            Err(Error::EndpointNotFound(_))
        ));
    }
}
