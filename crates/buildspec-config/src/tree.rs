//! Typed recipe tree.
//!
//! The interpreted form of a [`Section`](crate::section::Section): section
//! headers become markers or predicates, `versions`/`toolchains` become
//! predicate lists and `DEPENDENCIES` becomes a dependency list.

use buildspec_core::{Dependency, ToolchainPredicate, VersionPredicate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const SECTION_MARKER_DEFAULT: &str = "DEFAULT";
pub const SECTION_MARKER_SUPPORTED: &str = "SUPPORTED";
pub const SECTION_MARKER_DEPENDENCIES: &str = "DEPENDENCIES";

pub const KEY_VERSIONS: &str = "versions";
pub const KEY_TOOLCHAINS: &str = "toolchains";
pub const KEY_DEPENDENCIES: &str = "dependencies";

/// A flat key/value configuration.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// A resolvable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(Value),
    Dependencies(Vec<Dependency>),
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        ConfigValue::Scalar(value)
    }
}

impl ConfigValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            ConfigValue::Scalar(v) => Some(v),
            ConfigValue::Dependencies(_) => None,
        }
    }

    pub fn as_dependencies(&self) -> Option<&[Dependency]> {
        match self {
            ConfigValue::Dependencies(deps) => Some(deps),
            ConfigValue::Scalar(_) => None,
        }
    }
}

/// What a nested section is keyed by.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionKey {
    Default,
    Supported,
    Toolchain(ToolchainPredicate),
    Version(VersionPredicate),
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKey::Default => f.write_str(SECTION_MARKER_DEFAULT),
            SectionKey::Supported => f.write_str(SECTION_MARKER_SUPPORTED),
            SectionKey::Toolchain(p) => write!(f, "{}", p),
            SectionKey::Version(p) => write!(f, "{}", p),
        }
    }
}

/// A named leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    Config(ConfigValue),
    /// Parsed `versions` list; acts as a gate when resolving.
    Versions(Vec<VersionPredicate>),
    /// Parsed `toolchains` list; acts as a gate when resolving.
    Toolchains(Vec<ToolchainPredicate>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEntry {
    Section(SectionKey, TypedNode),
    Value(String, LeafValue),
}

/// One level of the typed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedNode {
    depth: usize,
    entries: Vec<NodeEntry>,
}

impl TypedNode {
    /// An empty root (depth 0).
    pub fn root() -> Self {
        Self::at_depth(0)
    }

    pub(crate) fn at_depth(depth: usize) -> Self {
        Self {
            depth,
            entries: Vec::new(),
        }
    }

    /// An empty node one level below this one.
    pub fn nested(&self) -> Self {
        Self::at_depth(self.depth + 1)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn entries(&self) -> &[NodeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a leaf, replacing an existing leaf with the same key in place.
    pub fn insert_value(&mut self, key: impl Into<String>, value: LeafValue) {
        let key = key.into();
        let existing = self.entries.iter_mut().find_map(|entry| match entry {
            NodeEntry::Value(k, v) if *k == key => Some(v),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = value,
            None => self.entries.push(NodeEntry::Value(key, value)),
        }
    }

    /// Insert a section; a section with an equal key absorbs the new entries.
    pub fn insert_section(&mut self, key: SectionKey, node: TypedNode) {
        match self.section_mut(&key) {
            Some(existing) => existing.absorb(node),
            None => self.entries.push(NodeEntry::Section(key, node)),
        }
    }

    /// Merge all entries of `other` into this node.
    pub fn absorb(&mut self, other: TypedNode) {
        for entry in other.entries {
            match entry {
                NodeEntry::Section(key, mut node) => {
                    node.set_depth(self.depth + 1);
                    self.insert_section(key, node);
                }
                NodeEntry::Value(key, value) => self.insert_value(key, value),
            }
        }
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for entry in &mut self.entries {
            if let NodeEntry::Section(_, node) = entry {
                node.set_depth(depth + 1);
            }
        }
    }

    pub fn section(&self, key: &SectionKey) -> Option<&TypedNode> {
        self.entries.iter().find_map(|entry| match entry {
            NodeEntry::Section(k, node) if k == key => Some(node),
            _ => None,
        })
    }

    fn section_mut(&mut self, key: &SectionKey) -> Option<&mut TypedNode> {
        self.entries.iter_mut().find_map(|entry| match entry {
            NodeEntry::Section(k, node) if k == key => Some(node),
            _ => None,
        })
    }

    /// Remove and return a section.
    pub fn take_section(&mut self, key: &SectionKey) -> Option<TypedNode> {
        let pos = self
            .entries
            .iter()
            .position(|entry| matches!(entry, NodeEntry::Section(k, _) if k == key))?;
        match self.entries.remove(pos) {
            NodeEntry::Section(_, node) => Some(node),
            NodeEntry::Value(..) => None,
        }
    }

    pub fn value(&self, key: &str) -> Option<&LeafValue> {
        self.entries.iter().find_map(|entry| match entry {
            NodeEntry::Value(k, v) if k == key => Some(v),
            _ => None,
        })
    }

    /// Consume the node, yielding its entries in order.
    pub fn into_entries(self) -> Vec<NodeEntry> {
        self.entries
    }
}
