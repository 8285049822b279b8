//! Dot-notation path engine for response reshaping.
//!
//! Grammar: dot-separated object segments (`a.b`), bracket literal
//! indices (`items[2]`) and the wildcard segment `[*]`, which broadcasts
//! the remaining sub-path over every array element and yields a
//! position-aligned array of results. Missing intermediate nodes resolve
//! to "absent" rather than erroring.

use serde_json::{json, Value};

/// Path error
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("cannot set value at path: {0}")]
    CannotSetValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Parse a path string into segments.
///
/// `"items[2].id"` becomes `[Key("items"), Index(2), Key("id")]`;
/// `"items[*].id"` uses `Wildcard` in place of the index.
pub fn parse(path: &str) -> Result<Vec<Segment>, PathError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(PathError::InvalidPath("empty path".to_string()));
    }

    let mut segments = Vec::new();
    for part in trimmed.split('.') {
        if part.is_empty() {
            return Err(PathError::InvalidPath(format!("empty segment in '{path}'")));
        }
        let mut rest = part;
        if let Some(bracket) = rest.find('[') {
            let key = &rest[..bracket];
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            rest = &rest[bracket..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    return Err(PathError::InvalidPath(format!("unclosed bracket in '{path}'")));
                };
                let inner = &stripped[..close];
                if inner == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    let idx = inner.parse::<usize>().map_err(|_| {
                        PathError::InvalidPath(format!("bad index '{inner}' in '{path}'"))
                    })?;
                    segments.push(Segment::Index(idx));
                }
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return Err(PathError::InvalidPath(format!(
                    "trailing characters '{rest}' in '{path}'"
                )));
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }
    Ok(segments)
}

/// Read the value at `path`. A wildcard yields an owned array aligned
/// with the source array; elements where the sub-path is absent become
/// `null` so positions stay stable. Returns `None` when the whole path
/// is absent.
pub fn get(value: &Value, path: &str) -> Option<Value> {
    let segments = parse(path).ok()?;
    get_segments(value, &segments)
}

fn get_segments(value: &Value, segments: &[Segment]) -> Option<Value> {
    let Some(first) = segments.first() else {
        return Some(value.clone());
    };
    let rest = &segments[1..];
    match first {
        Segment::Key(key) => value.get(key).and_then(|v| get_segments(v, rest)),
        Segment::Index(idx) => value.get(idx).and_then(|v| get_segments(v, rest)),
        Segment::Wildcard => value.as_array().map(|arr| {
            Value::Array(
                arr.iter()
                    .map(|el| get_segments(el, rest).unwrap_or(Value::Null))
                    .collect(),
            )
        }),
    }
}

/// Write `new` at `path`, creating intermediate containers as needed.
///
/// Through an existing array, a wildcard distributes an array value
/// element-by-element (position-aligned) and broadcasts a scalar to
/// every element. Where no container exists yet at the wildcard, the
/// incoming value is taken as the already-aligned result and placed
/// directly, which is what collapses `items[*].id` extraction into
/// `{items: [1, 2]}`.
pub fn set(value: &mut Value, path: &str, new: Value) -> Result<(), PathError> {
    let segments = parse(path)?;
    set_segments(value, &segments, new);
    Ok(())
}

fn set_segments(value: &mut Value, segments: &[Segment], new: Value) {
    let Some(first) = segments.first() else {
        *value = new;
        return;
    };
    let rest = &segments[1..];
    match first {
        Segment::Key(key) => {
            if !value.is_object() {
                *value = json!({});
            }
            if let Value::Object(map) = value {
                if rest.first() == Some(&Segment::Wildcard)
                    && !map.get(key).is_some_and(Value::is_array)
                {
                    map.insert(key.clone(), Value::Null);
                }
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                set_segments(slot, rest, new);
            }
        }
        Segment::Index(idx) => {
            if !value.is_array() {
                *value = json!([]);
            }
            if let Value::Array(arr) = value {
                while arr.len() <= *idx {
                    arr.push(Value::Null);
                }
                set_segments(&mut arr[*idx], rest, new);
            }
        }
        Segment::Wildcard => match value {
            Value::Array(arr) => match new {
                Value::Array(values) => {
                    for (el, v) in arr.iter_mut().zip(values) {
                        set_segments(el, rest, v);
                    }
                }
                scalar => {
                    for el in arr.iter_mut() {
                        set_segments(el, rest, scalar.clone());
                    }
                }
            },
            // No container here yet: the incoming value is already the
            // aligned result of the remaining sub-path.
            other => *other = new,
        },
    }
}

/// Remove the value at `path`. Object keys are removed; array indices
/// are spliced out; a wildcard applies the removal to every element.
/// Absent paths are a no-op.
pub fn delete(value: &mut Value, path: &str) -> Result<(), PathError> {
    let segments = parse(path)?;
    delete_segments(value, &segments);
    Ok(())
}

fn delete_segments(value: &mut Value, segments: &[Segment]) {
    let Some(first) = segments.first() else {
        return;
    };
    let rest = &segments[1..];
    if rest.is_empty() {
        match (first, value) {
            (Segment::Key(key), Value::Object(map)) => {
                map.remove(key);
            }
            (Segment::Index(idx), Value::Array(arr)) => {
                if *idx < arr.len() {
                    arr.remove(*idx);
                }
            }
            (Segment::Wildcard, Value::Array(arr)) => {
                arr.clear();
            }
            _ => {}
        }
        return;
    }
    match (first, value) {
        (Segment::Key(key), Value::Object(map)) => {
            if let Some(child) = map.get_mut(key) {
                delete_segments(child, rest);
            }
        }
        (Segment::Index(idx), Value::Array(arr)) => {
            if let Some(child) = arr.get_mut(*idx) {
                delete_segments(child, rest);
            }
        }
        (Segment::Wildcard, Value::Array(arr)) => {
            for el in arr.iter_mut() {
                delete_segments(el, rest);
            }
        }
        _ => {}
    }
}
