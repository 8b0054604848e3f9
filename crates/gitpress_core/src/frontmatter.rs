//! Shared frontmatter parsing and serialization utilities.
//!
//! This module is the codec between a file's raw text and the
//! (frontmatter, body) pair the editor works with. Parsing is lenient by
//! design: a missing, unterminated or undecodable frontmatter block is
//! never an error, the whole input simply becomes the body. An article
//! with broken metadata must still open.

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{GitpressError, Result};

/// Result of splitting raw file text into frontmatter and body.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// The parsed frontmatter as an ordered map. Empty if the text has no
    /// (valid) frontmatter block.
    pub frontmatter: IndexMap<String, Value>,
    /// The body content after the frontmatter.
    pub body: String,
}

/// Parse frontmatter and body from raw content.
///
/// Detects a leading `---` delimited YAML block (`\n` and `\r\n` line
/// endings both accepted). If the block is missing, unterminated, or not
/// valid YAML, returns empty frontmatter and the entire input as body.
/// Silent recovery, never an error.
pub fn parse(content: &str) -> ParsedDocument {
    if !content.starts_with("---\n") && !content.starts_with("---\r\n") {
        return ParsedDocument {
            frontmatter: IndexMap::new(),
            body: content.to_string(),
        };
    }

    // Skip the opening delimiter line
    let rest = match content.strip_prefix("---\r\n") {
        Some(rest) => rest,
        None => &content[4..],
    };

    // Find the closing delimiter: a "---" line, or "---" at end of input
    let (frontmatter_str, body) = if let Some(idx) = rest.find("\n---\n") {
        (&rest[..idx], &rest[idx + 5..])
    } else if let Some(idx) = rest.find("\n---\r\n") {
        (&rest[..idx], &rest[idx + 6..])
    } else if let Some(stripped) = rest.strip_suffix("\n---") {
        (stripped, "")
    } else {
        // Unterminated block - treat the whole input as body
        return ParsedDocument {
            frontmatter: IndexMap::new(),
            body: content.to_string(),
        };
    };

    // An all-whitespace block is an empty mapping, not a YAML error
    if frontmatter_str.trim().is_empty() {
        return ParsedDocument {
            frontmatter: IndexMap::new(),
            body: body.to_string(),
        };
    }

    match serde_yaml::from_str::<IndexMap<String, Value>>(frontmatter_str) {
        Ok(frontmatter) => ParsedDocument {
            frontmatter,
            body: body.to_string(),
        },
        Err(e) => {
            log::debug!("frontmatter did not decode, treating whole file as body: {e}");
            ParsedDocument {
                frontmatter: IndexMap::new(),
                body: content.to_string(),
            }
        }
    }
}

/// Serialize frontmatter and body back to raw content.
///
/// If the frontmatter is empty the body is returned unchanged; otherwise
/// the YAML block (trimmed of trailing whitespace) is prepended between
/// `---` delimiters.
///
/// Round-trip law: for any output of this function, [`parse`] yields an
/// equivalent mapping (values may be re-quoted) and a byte-equal body.
pub fn serialize(frontmatter: &IndexMap<String, Value>, body: &str) -> Result<String> {
    if frontmatter.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{}\n---\n{}", yaml.trim_end(), body))
}

/// Get a string property value.
pub fn get_string<'a>(frontmatter: &'a IndexMap<String, Value>, key: &str) -> Option<&'a str> {
    frontmatter.get(key).and_then(|v| v.as_str())
}

/// Set a property in frontmatter (in place).
pub fn set_property(frontmatter: &mut IndexMap<String, Value>, key: &str, value: Value) {
    frontmatter.insert(key.to_string(), value);
}

/// Remove a property from frontmatter (in place), preserving the order of
/// the remaining keys.
pub fn remove_property(frontmatter: &mut IndexMap<String, Value>, key: &str) -> Option<Value> {
    frontmatter.shift_remove(key)
}

// ============================================================================
// JSON conversion for the frontmatter-editor panel
// ============================================================================
//
// The settings panel in the web UI edits frontmatter as a JSON object, so
// the mapping crosses the IPC boundary as JSON and comes back the same way.

/// Convert a frontmatter mapping to a JSON object for the UI.
pub fn to_json(frontmatter: &IndexMap<String, Value>) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = frontmatter
        .iter()
        .map(|(k, v)| (k.clone(), yaml_to_json(v.clone())))
        .collect();
    serde_json::Value::Object(map)
}

/// Convert a JSON object from the UI back into a frontmatter mapping.
///
/// Returns an error if the value is not a JSON object.
pub fn from_json(value: serde_json::Value) -> Result<IndexMap<String, Value>> {
    match value {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, json_to_yaml(v)))
            .collect()),
        other => Err(GitpressError::FrontmatterNotMapping(other.to_string())),
    }
}

/// Convert a serde_yaml::Value to serde_json::Value
fn yaml_to_json(yaml: Value) -> serde_json::Value {
    match yaml {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            } else {
                serde_json::Value::Null
            }
        }
        Value::String(s) => serde_json::Value::String(s),
        Value::Sequence(seq) => {
            serde_json::Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        Value::Mapping(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s,
                    other => serde_yaml::to_string(&other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default(),
                };
                obj.insert(key, yaml_to_json(v));
            }
            serde_json::Value::Object(obj)
        }
        // Tagged values (rare in article frontmatter) lose their tag
        Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Convert a serde_json::Value to serde_yaml::Value
fn json_to_yaml(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else if let Some(f) = n.as_f64() {
                Value::Number(f.into())
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::Sequence(arr.into_iter().map(json_to_yaml).collect())
        }
        serde_json::Value::Object(obj) => {
            let map: serde_yaml::Mapping = obj
                .into_iter()
                .map(|(k, v)| (Value::String(k), json_to_yaml(v)))
                .collect();
            Value::Mapping(map)
        }
    }
}
