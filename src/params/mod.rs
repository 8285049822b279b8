//! Parameter layer merging and resolution
//!
//! Raw parameters arrive in layers (alias defaults, batch item, CLI
//! overrides) that are merged left-to-right with later layers winning on
//! key collision. The resolver then classifies every merged key into
//! path, query, header or body slots against an endpoint descriptor.
//! Resolution is a pure function with no side effects.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::{EndpointDescriptor, ParamHints, ParamTarget};
use crate::{Error, Result};

/// The classified outcome of parameter resolution.
///
/// Invariant: every `{name}` placeholder in the endpoint's path template
/// has a value in `path`, or [`resolve`] fails with all missing names.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRequest {
    pub path: HashMap<String, Value>,
    pub query: Map<String, Value>,
    pub headers: HashMap<String, String>,
    pub body: Option<Map<String, Value>>,
}

impl MappedRequest {
    /// Substitute path parameters into the endpoint's `{name}` template.
    pub fn interpolate_path(&self, template: &str) -> String {
        let mut path = template.to_string();
        for (name, value) in &self.path {
            path = path.replace(&format!("{{{}}}", name), &value_to_string(value));
        }
        path
    }

    /// Query parameters as string pairs, in key order. Array values are
    /// joined with commas.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect()
    }
}

/// Merge parameter layers left-to-right; later layers overwrite earlier
/// keys. Precedence for a batch call is
/// `alias-defaults < batch-item < CLI-override`.
pub fn merge_layers(layers: &[&Map<String, Value>]) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Classify raw parameters into a [`MappedRequest`] per the endpoint
/// descriptor.
///
/// Priority order:
/// 1. keys matching a path placeholder are path parameters; missing
///    placeholders are collected and reported together,
/// 2. hinted keys go where the hint says,
/// 3. remaining keys are inferred from the HTTP method (GET/DELETE go to
///    the query string, POST/PUT/PATCH to the body),
/// 4. endpoint `default_params` fill in last and never overwrite.
pub fn resolve(
    endpoint: &EndpointDescriptor,
    raw: &Map<String, Value>,
    hints: &ParamHints,
) -> Result<MappedRequest> {
    let placeholders = endpoint.path_placeholders();

    let mut mapped = MappedRequest {
        path: HashMap::new(),
        query: Map::new(),
        headers: endpoint.headers.clone(),
        body: None,
    };
    let mut body = Map::new();

    let place = |key: &str, value: &Value, mapped: &mut MappedRequest, body: &mut Map<String, Value>| {
        let target = if placeholders.iter().any(|p| p == key) {
            ParamTarget::Path
        } else {
            hints.classify(key).unwrap_or(if endpoint.method.sends_body() {
                ParamTarget::Body
            } else {
                ParamTarget::Query
            })
        };
        match target {
            ParamTarget::Path => {
                mapped.path.insert(key.to_string(), value.clone());
            }
            ParamTarget::Query => {
                mapped.query.insert(key.to_string(), value.clone());
            }
            ParamTarget::Header => {
                mapped.headers.insert(key.to_string(), value_to_string(value));
            }
            ParamTarget::Body => {
                body.insert(key.to_string(), value.clone());
            }
        }
    };

    for (key, value) in raw.iter() {
        place(key, value, &mut mapped, &mut body);
    }
    for (key, value) in endpoint.default_params.iter() {
        if !raw.contains_key(key) {
            place(key, value, &mut mapped, &mut body);
        }
    }

    let missing: Vec<String> = placeholders
        .iter()
        .filter(|name| !mapped.path.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::ParamRequired { names: missing });
    }

    if !body.is_empty() {
        mapped.body = Some(body);
    }
    Ok(mapped)
}

/// Render a scalar or array parameter value as a string. Arrays are
/// comma-joined; anything else falls back to its JSON form.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
