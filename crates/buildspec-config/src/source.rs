//! KDL recipe source.
//!
//! Reads recipe text into the generic [`Section`] tree:
//!
//! ```kdl
//! # EASYCONFIGFORMAT 2.0
//! name "zlib"
//! SUPPORTED {
//!     versions "1.2.7, 1.2.8"
//!     toolchains "GCC 4.7.2"
//! }
//! "> 1.2.7" {
//!     configopts "--static"
//! }
//! ```
//!
//! Nodes with a children block become sections named after the node; nodes
//! without one become scalars (one argument: that value, several: a list).
//! Lines starting with `#` plus whitespace (or a lone `#`) are header comments
//! and are dropped before the KDL parser sees them; `#"raw"#` names are kept.
//! Integers must fit `i64` or `u64`.

use kdl::{KdlDocument, KdlNode, KdlValue};
use serde_json::Value;

use crate::format::{FormatVersion, format_version};
use crate::section::Section;
use crate::{ConfigError, ConfigResult};

/// Recipe text split into its header and generic section tree.
#[derive(Debug, Clone)]
pub struct RecipeSource {
    pub format_version: Option<FormatVersion>,
    pub sections: Section,
}

/// Parse recipe text into a [`RecipeSource`].
pub fn parse_section_tree(text: &str) -> ConfigResult<RecipeSource> {
    let format_version = format_version(text);

    let body: String = text
        .lines()
        .map(|line| if is_hash_comment(line) { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n");

    let doc: KdlDocument = body.parse()?;
    let sections = document_to_section(&doc)?;

    Ok(RecipeSource {
        format_version,
        sections,
    })
}

/// `# ...` lines carry the format header; `#"raw"#` and `#true` are KDL.
fn is_hash_comment(line: &str) -> bool {
    line.trim_start()
        .strip_prefix('#')
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn document_to_section(doc: &KdlDocument) -> ConfigResult<Section> {
    let mut section = Section::new();

    for node in doc.nodes() {
        let key = node.name().value().to_string();

        if let Some(property) = node.entries().iter().find_map(|e| e.name()) {
            return Err(ConfigError::UnsupportedProperty {
                node: key,
                property: property.value().to_string(),
            });
        }

        match node.children() {
            Some(children) => {
                if !node.entries().is_empty() {
                    return Err(ConfigError::UnexpectedValueType {
                        key,
                        found: "arguments on a section node".to_string(),
                    });
                }
                section.insert_section(key, document_to_section(children)?);
            }
            None => {
                let value = node_value(&key, node)?;
                section.insert_value(key, value);
            }
        }
    }

    Ok(section)
}

fn node_value(key: &str, node: &KdlNode) -> ConfigResult<Value> {
    let mut args = node
        .entries()
        .iter()
        .map(|e| kdl_to_json(key, e.value()))
        .collect::<ConfigResult<Vec<_>>>()?;
    Ok(match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    })
}

fn kdl_to_json(key: &str, value: &KdlValue) -> ConfigResult<Value> {
    let json = if let Some(s) = value.as_string() {
        Value::String(s.to_string())
    } else if let Some(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Some(i) = value.as_integer() {
        i64::try_from(i)
            .map(Value::from)
            .or_else(|_| u64::try_from(i).map(Value::from))
            .map_err(|_| ConfigError::UnexpectedValueType {
                key: key.to_string(),
                found: format!("integer out of range ({})", i),
            })?
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    };
    Ok(json)
}
