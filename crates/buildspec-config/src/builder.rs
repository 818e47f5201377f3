//! Section classifier and typed tree builder.
//!
//! Turns a generic [`Section`] into a [`TypedNode`]. Section headers are
//! classified as `DEFAULT`, `SUPPORTED`, `DEPENDENCIES`, or a version gate;
//! `versions` and `toolchains` values are parsed into predicate lists.

use buildspec_core::{Dependency, ToolchainPredicate, VersionPredicate};
use serde_json::Value;
use tracing::debug;

use crate::section::{Section, SectionEntry};
use crate::tree::{
    ConfigValue, KEY_DEPENDENCIES, KEY_TOOLCHAINS, KEY_VERSIONS, LeafValue, SECTION_MARKER_DEFAULT,
    SECTION_MARKER_DEPENDENCIES, SECTION_MARKER_SUPPORTED, SectionKey, TypedNode,
};
use crate::{ConfigError, ConfigResult};

type MarkerClassifier = fn(&str) -> Option<SectionKey>;

/// Section header classifiers, tried in order.
///
/// Toolchain predicates go first: `GCC 4.6` must never be read as a version.
const SECTION_MARKER_CLASSIFIERS: &[(&str, MarkerClassifier)] = &[
    ("toolchain version", classify_toolchain),
    ("version", classify_version),
];

fn classify_toolchain(marker: &str) -> Option<SectionKey> {
    ToolchainPredicate::parse(marker).map(SectionKey::Toolchain)
}

/// A bare word such as a mistyped `Dependencies` is not a version marker.
fn classify_version(marker: &str) -> Option<SectionKey> {
    VersionPredicate::parse(marker)
        .filter(|p| p.version().as_str().contains(|c: char| c.is_ascii_digit()))
        .map(SectionKey::Version)
}

/// Classify a section header that is not one of the literal markers.
pub fn classify_marker(marker: &str) -> ConfigResult<SectionKey> {
    for (kind, classify) in SECTION_MARKER_CLASSIFIERS {
        if let Some(key) = classify(marker) {
            debug!(marker, kind, "Classified section marker");
            return Ok(key);
        }
    }
    Err(ConfigError::UnsupportedSectionMarker(marker.to_string()))
}

/// Build the typed tree for a whole recipe.
///
/// The root is seeded with empty `DEFAULT` and `SUPPORTED` sections so both
/// are always present afterwards.
pub fn build_tree(source: &Section) -> ConfigResult<TypedNode> {
    let mut root = TypedNode::root();
    let default = root.nested();
    let supported = root.nested();
    root.insert_section(SectionKey::Default, default);
    root.insert_section(SectionKey::Supported, supported);
    build_level(source, root)
}

fn build_level(source: &Section, mut current: TypedNode) -> ConfigResult<TypedNode> {
    debug!(depth = current.depth(), entries = source.len(), "Processing section level");

    for (key, entry) in source.iter() {
        match entry {
            SectionEntry::Section(section) => match key {
                SECTION_MARKER_DEFAULT => {
                    let child = build_level(section, current.nested())?;
                    if current.is_root() {
                        current.insert_section(SectionKey::Default, child);
                    } else {
                        debug!(depth = current.depth(), "Merging nested DEFAULT into its level");
                        current.absorb(child);
                    }
                }
                SECTION_MARKER_SUPPORTED => {
                    if !current.is_root() {
                        return Err(ConfigError::MisplacedSection {
                            section: key.to_string(),
                            context: format!("below the top level (depth {})", current.depth()),
                        });
                    }
                    let child = build_level(section, current.nested())?;
                    current.insert_section(SectionKey::Supported, child);
                }
                SECTION_MARKER_DEPENDENCIES => {
                    let deps = parse_dependencies(section)?;
                    debug!(count = deps.len(), depth = current.depth(), "Parsed dependencies");
                    let leaf = LeafValue::Config(ConfigValue::Dependencies(deps));
                    if current.is_root() {
                        let mut bucket = current.nested();
                        bucket.insert_value(KEY_DEPENDENCIES, leaf);
                        current.insert_section(SectionKey::Default, bucket);
                    } else {
                        current.insert_value(KEY_DEPENDENCIES, leaf);
                    }
                }
                _ => {
                    let marker = classify_marker(key)?;
                    let child = build_level(section, current.nested())?;
                    debug!(marker = %marker, depth = child.depth(), "Converted section");
                    current.insert_section(marker, child);
                }
            },
            SectionEntry::Value(value) => {
                let leaf = coerce_value(key, value)?;
                current.insert_value(key, leaf);
            }
        }
    }

    Ok(current)
}

fn coerce_value(key: &str, value: &Value) -> ConfigResult<LeafValue> {
    match key {
        KEY_VERSIONS => {
            let list = parse_predicate_list(key, value, "version predicates", VersionPredicate::parse)?;
            Ok(LeafValue::Versions(list))
        }
        KEY_TOOLCHAINS => {
            let list = parse_predicate_list(
                key,
                value,
                "toolchain predicates",
                ToolchainPredicate::parse,
            )?;
            Ok(LeafValue::Toolchains(list))
        }
        _ => Ok(LeafValue::Config(ConfigValue::Scalar(value.clone()))),
    }
}

/// Parse a comma-separated string, or a list of strings, into predicates.
fn parse_predicate_list<P>(
    key: &str,
    value: &Value,
    kind: &str,
    parse: fn(&str) -> Option<P>,
) -> ConfigResult<Vec<P>> {
    let items: Vec<&str> = match value {
        Value::String(s) => s.split(',').collect(),
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_str().ok_or_else(|| unexpected_type(key, v)))
            .collect::<ConfigResult<_>>()?,
        other => return Err(unexpected_type(key, other)),
    };

    items
        .into_iter()
        .map(|item| {
            parse(item.trim()).ok_or_else(|| ConfigError::InvalidPredicateList {
                key: key.to_string(),
                kind: kind.to_string(),
                value: value_text(value),
            })
        })
        .collect()
}

fn parse_dependencies(section: &Section) -> ConfigResult<Vec<Dependency>> {
    section
        .iter()
        .map(|(name, entry)| match entry {
            SectionEntry::Section(_) => {
                Err(ConfigError::NestedDependencySection(name.to_string()))
            }
            SectionEntry::Value(value) => {
                let raw = dependency_text(name, value)?;
                Dependency::parse(name, &raw).map_err(ConfigError::InvalidDependency)
            }
        })
        .collect()
}

/// A dependency value as text; list values are joined field by field.
fn dependency_text(name: &str, value: &Value) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(fields) => fields
            .iter()
            .map(|field| match field {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(unexpected_type(name, other)),
            })
            .collect::<ConfigResult<Vec<_>>>()
            .map(|fields| fields.join("; ")),
        other => Err(unexpected_type(name, other)),
    }
}

fn unexpected_type(key: &str, value: &Value) -> ConfigError {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    };
    ConfigError::UnexpectedValueType {
        key: key.to_string(),
        found: format!("{} ({})", found, value),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
