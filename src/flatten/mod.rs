//! Flattening of nested JSON sources into flat key/value maps.
//!
//! Every source document is a nested JSON object. Flattening walks it and
//! produces one entry per leaf, keyed by the dot-joined names of the enclosing
//! properties:
//!
//! ```text
//! {"a": 1, "b": {"c": 2, "d": {"e": 3}}}   =>   a = "1", b.c = "2", b.d.e = "3"
//! ```
//!
//! Empty or whitespace-only property names are dropped from the key. Leaves
//! are classified as [`RawLeaf::PlainScalar`] or, when an object declares a
//! `type` property (case-insensitive), as a single [`RawLeaf::TypedObject`]
//! covering the whole subtree.
//!
//! # Modes
//!
//! - [`flatten_variables`]: every scalar becomes a string. Numbers use the
//!   shortest round-trip decimal form, booleans `true`/`false`, `null` the
//!   empty string.
//! - [`flatten_secrets`]: typed objects become [`Injection`]s. Unknown types
//!   and missing required properties are errors. Untyped scalars are kept as
//!   plain text, rendered like variables, so they take part in overrides,
//!   collision checks and reference resolution.
//!
//! Sources may carry `//` and `/* */` comments and trailing commas; see
//! [`relax`].
//!
//! Duplicate keys inside one document (literal duplicates or paths that
//! collapse to the same key) keep the later occurrence and log a warning.

mod lenient;
mod node;

use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::core::SviError;
use crate::injection::Injection;
use crate::utils::bytes_to_string;

pub use lenient::relax;
pub use node::{JsonNode, Scalar};

/// Flattened leaf before conversion into a category-specific value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLeaf {
    /// Scalar value; `None` for JSON `null`
    PlainScalar(Option<String>),
    /// Object carrying a `type` property, with lowercased property names
    TypedObject {
        /// Declared type as written
        type_name: String,
        /// Scalar properties keyed by lowercased name
        properties: HashMap<String, String>,
    },
}

/// Which leaves the walk should capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Variables,
    Secrets,
}

/// Flatten a variable source: every scalar leaf becomes a string.
pub fn flatten_variables(source_name: &str, json: &[u8]) -> Result<BTreeMap<String, String>> {
    let leaves = flatten(source_name, json, Mode::Variables)?;

    let mut flat = BTreeMap::new();
    for (key, leaf) in leaves {
        let RawLeaf::PlainScalar(value) = leaf else {
            continue;
        };
        let value = value.unwrap_or_default();
        debug!("Found key {} with value {}", key, value);
        insert_with_warning(&mut flat, key, value, source_name);
    }

    Ok(flat)
}

/// Flatten a secret source: typed objects become injections, untyped scalars
/// plain text.
pub fn flatten_secrets(source_name: &str, json: &[u8]) -> Result<BTreeMap<String, Injection>> {
    let leaves = flatten(source_name, json, Mode::Secrets)?;

    let mut flat = BTreeMap::new();
    for (key, leaf) in leaves {
        match leaf {
            RawLeaf::TypedObject {
                type_name,
                properties,
            } => {
                let injection = Injection::from_typed_object(&key, &type_name, &properties)?;
                debug!("Found key {} with {}", key, injection);
                insert_with_warning(&mut flat, key, injection, source_name);
            }
            RawLeaf::PlainScalar(value) => {
                let value = value.unwrap_or_default();
                debug!("Found untyped key {} with value {}", key, value);
                insert_with_warning(&mut flat, key, Injection::plain(value), source_name);
            }
        }
    }

    Ok(flat)
}

/// Render a JSON scalar with the flattening rules; `None` for objects and arrays.
///
/// ```rust
/// use svi_cli::flatten::scalar_to_string;
/// use serde_json::json;
///
/// assert_eq!(scalar_to_string(&json!(3)).as_deref(), Some("3"));
/// assert_eq!(scalar_to_string(&json!(true)).as_deref(), Some("true"));
/// assert_eq!(scalar_to_string(&json!(null)).as_deref(), Some(""));
/// assert_eq!(scalar_to_string(&json!([1])), None);
/// ```
pub fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => Some(String::new()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() => Scalar::format_float(f),
            _ => n.to_string(),
        }),
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

fn insert_with_warning<T>(flat: &mut BTreeMap<String, T>, key: String, value: T, source: &str) {
    if flat.contains_key(&key) {
        warn!("Key {} already exists in {}, overwriting", key, source);
    }
    flat.insert(key, value);
}

fn flatten(source_name: &str, json: &[u8], mode: Mode) -> Result<Vec<(String, RawLeaf)>> {
    debug!("Parsing JSON {} of size {}", source_name, bytes_to_string(json.len() as u64));

    let root: JsonNode = serde_json::from_slice(&relax(json)).map_err(|e| SviError::JsonParse {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })?;

    let JsonNode::Object(properties) = root else {
        return Err(SviError::JsonParse {
            source_name: source_name.to_string(),
            reason: format!("root must be an object, found {}", root.kind()),
        }
        .into());
    };

    let mut walker = Walker {
        source_name,
        mode,
        path: Vec::new(),
        leaves: Vec::new(),
    };
    walker.walk_object(&properties)?;
    Ok(walker.leaves)
}

struct Walker<'a> {
    source_name: &'a str,
    mode: Mode,
    path: Vec<&'a str>,
    leaves: Vec<(String, RawLeaf)>,
}

impl<'a> Walker<'a> {
    fn key(&self) -> String {
        self.path
            .iter()
            .filter(|segment| !segment.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    }

    fn walk_object(&mut self, properties: &'a [(String, JsonNode)]) -> Result<()> {
        for (name, node) in properties {
            self.path.push(name.as_str());
            self.walk_node(node)?;
            self.path.pop();
        }
        Ok(())
    }

    fn walk_node(&mut self, node: &'a JsonNode) -> Result<()> {
        match node {
            JsonNode::Scalar(scalar) => {
                let key = self.key();
                self.leaves.push((key, RawLeaf::PlainScalar(scalar.render())));
            }
            JsonNode::Object(properties) => {
                let typed = match self.mode {
                    Mode::Secrets => typed_object(properties),
                    Mode::Variables => None,
                };
                match typed {
                    Some(leaf) => {
                        let key = self.key();
                        self.leaves.push((key, leaf));
                    }
                    None => self.walk_object(properties)?,
                }
            }
            JsonNode::Array => {
                return Err(SviError::UnsupportedLeaf {
                    source_name: self.source_name.to_string(),
                    key: self.key(),
                    kind: node.kind().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Capture an object as a typed leaf if it has a scalar `type` property.
fn typed_object(properties: &[(String, JsonNode)]) -> Option<RawLeaf> {
    let mut scalars = HashMap::new();
    for (name, node) in properties {
        if let JsonNode::Scalar(scalar) = node {
            scalars.insert(name.trim().to_ascii_lowercase(), scalar.render().unwrap_or_default());
        }
    }

    let type_name = scalars.remove("type")?;
    Some(RawLeaf::TypedObject {
        type_name,
        properties: scalars,
    })
}
