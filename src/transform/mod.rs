//! Response transformation pipeline
//!
//! Applies an ordered list of declarative [`TransformStep`]s to a
//! decoded response body. Step *i + 1* consumes exactly step *i*'s
//! output. A failing step is logged and its input passed through
//! unchanged, so one bad step degrades gracefully instead of discarding
//! the whole response; [`apply`] itself never fails.

pub mod path;

pub use path::{PathError, Segment};

use serde_json::{json, Value};
use tracing::warn;

use crate::config::TransformStep;

/// Run all steps in declared order. Never fails: a step that errors is
/// skipped with a warning and its input becomes its output.
pub fn apply(payload: Value, steps: &[TransformStep]) -> Value {
    steps.iter().enumerate().fold(payload, |input, (i, step)| {
        match apply_step(&input, step) {
            Ok(output) => output,
            Err(e) => {
                warn!(step = i, error = %e, "transform step failed, passing input through");
                input
            }
        }
    })
}

fn apply_step(input: &Value, step: &TransformStep) -> Result<Value, PathError> {
    match step {
        TransformStep::Extract { paths } => extract(input, paths),
        TransformStep::Rename { mapping } => rename(input, mapping),
    }
}

/// Build a new value containing only the requested paths. Absent paths
/// are skipped; wildcard results stay position-aligned with the source
/// array.
fn extract(input: &Value, paths: &[String]) -> Result<Value, PathError> {
    let mut out = json!({});
    for p in paths {
        // Validate the path even when it resolves to nothing, so typos
        // surface as a logged warning instead of silently matching.
        path::parse(p)?;
        if let Some(value) = path::get(input, p) {
            path::set(&mut out, p, value)?;
        }
    }
    Ok(out)
}

/// For each `(old, new)` pair: read the value at `old` on a deep copy,
/// write it at `new` (creating intermediate containers), delete `old`.
fn rename(input: &Value, mapping: &[(String, String)]) -> Result<Value, PathError> {
    let mut out = input.clone();
    for (old, new) in mapping {
        let Some(value) = path::get(&out, old) else {
            continue;
        };
        path::delete(&mut out, old)?;
        path::set(&mut out, new, value)?;
    }
    Ok(out)
}
