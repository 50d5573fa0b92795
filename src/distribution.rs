use crate::types::Distribution;

/// Non-fatal problem found while parsing one distribution cell. A bad cell
/// degrades to an empty (or partial) Distribution; it never aborts the
/// surrounding aggregation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseWarning {
    #[error("cell is not valid JSON")]
    InvalidJson,

    #[error("top-level JSON value is not an object")]
    NotAnObject,

    #[error("value for key {key:?} is not numeric")]
    NonNumeric { key: String },
}

/// Parse one raw cell into a category → count mapping.
///
/// Empty, whitespace-only, and literal `null` cells mean "no data" and yield
/// an empty Distribution with no warnings. Anything else is parsed as JSON:
/// non-object shapes and unparseable text yield an empty Distribution plus a
/// warning; inside an object, numeric values truncate toward zero (negatives
/// clamp to 0) and non-numeric values drop their key with a per-key warning.
pub fn parse(raw: &str) -> (Distribution, Vec<ParseWarning>) {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return (Distribution::new(), Vec::new());
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return (Distribution::new(), vec![ParseWarning::InvalidJson]),
    };

    let object = match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => return (Distribution::new(), Vec::new()),
        _ => return (Distribution::new(), vec![ParseWarning::NotAnObject]),
    };

    let mut dist = Distribution::new();
    let mut warnings = Vec::new();
    for (key, value) in object {
        if let Some(count) = value.as_u64() {
            dist.insert(key, count);
        } else if let Some(float) = value.as_f64() {
            // Covers negative integers and floats: clamp below zero,
            // truncate toward zero otherwise.
            dist.insert(key, if float > 0.0 { float as u64 } else { 0 });
        } else {
            warnings.push(ParseWarning::NonNumeric { key });
        }
    }
    (dist, warnings)
}

/// Parse a cell and log any warnings with field context. This is the entry
/// point the aggregation engine uses; warnings never propagate further.
pub fn parse_logged(field: &str, raw: &str) -> Distribution {
    let (dist, warnings) = parse(raw);
    for warning in &warnings {
        tracing::warn!(field = %field, warning = %warning, "malformed distribution cell");
    }
    dist
}
