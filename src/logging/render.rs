//! Text rendering of log arguments
//!
//! Scalars render in their natural form, maps and arrays as pretty-printed JSON.
//! Rendering never fails: cycles, opaque values and objects whose lock was
//! poisoned are replaced with bracketed placeholders.

use std::collections::HashSet;

use thiserror::Error;

use super::value::{ObjectKind, ObjectRef, Structure, Value};

/// Marker substituted where an object is visited a second time
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// Marker substituted below the nesting limit
pub const TRUNCATED_MARKER: &str = "[Truncated]";

/// Maximum object nesting rendered before truncating
pub const MAX_DEPTH: usize = 128;

/// Reasons an object cannot be walked
#[derive(Debug, Error)]
enum RenderError {
    #[error("{0} lock is poisoned")]
    Poisoned(&'static str),
}

/// Render an argument list, joining the pieces with a single space
pub fn render(args: &[Value]) -> String {
    args.iter()
        .map(render_value)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render one argument
///
/// Each call starts with an empty visited set.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Text(s) => s.clone(),
        Value::Opaque(name) => opaque_placeholder(name),
        Value::Object(obj) => {
            let mut seen = HashSet::new();
            match to_json(obj, &mut seen, 0) {
                Ok(json) => serde_json::to_string_pretty(&json)
                    .unwrap_or_else(|_| object_placeholder(obj.kind())),
                Err(err) => {
                    tracing::debug!(error = %err, "falling back to placeholder");
                    object_placeholder(obj.kind())
                }
            }
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if f == 0.0 {
        // Also catches negative zero
        "0".to_string()
    } else {
        // Display already prints integral floats without a fractional part
        f.to_string()
    }
}

fn opaque_placeholder(type_name: &str) -> String {
    format!("[{}]", type_name)
}

fn object_placeholder(kind: ObjectKind) -> String {
    format!("[object {}]", kind.as_str())
}

fn to_json(
    obj: &ObjectRef,
    seen: &mut HashSet<usize>,
    depth: usize,
) -> Result<serde_json::Value, RenderError> {
    if !seen.insert(obj.identity()) {
        return Ok(serde_json::Value::String(CIRCULAR_MARKER.to_string()));
    }
    if depth >= MAX_DEPTH {
        return Ok(serde_json::Value::String(TRUNCATED_MARKER.to_string()));
    }

    let kind = obj.kind().as_str();
    // Clone the children out so no lock is held while descending
    let snapshot = obj
        .read(Structure::clone)
        .map_err(|_| RenderError::Poisoned(kind))?;

    match snapshot {
        Structure::Map(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (key, field) in &fields {
                map.insert(key.clone(), child_json(field, seen, depth)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        Structure::Array(items) => items
            .iter()
            .map(|item| child_json(item, seen, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
    }
}

fn child_json(
    value: &Value,
    seen: &mut HashSet<usize>,
    depth: usize,
) -> Result<serde_json::Value, RenderError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        // Non-finite floats become null, as in JSON
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Opaque(name) => serde_json::Value::String(opaque_placeholder(name)),
        Value::Object(obj) => to_json(obj, seen, depth + 1)?,
    })
}
