//! Multidimensional build recipe parsing and resolution.
//!
//! This crate handles:
//! - Reading recipe text (KDL) into a generic section tree
//! - Classifying sections into a typed, predicate-gated tree
//! - Squashing that tree for one concrete version and toolchain

pub mod builder;
pub mod error;
pub mod format;
pub mod model;
pub mod resolve;
pub mod section;
pub mod source;
pub mod tree;

pub use builder::{build_tree, classify_marker};
pub use error::{ConfigError, ConfigResult};
pub use format::{FormatVersion, format_version};
pub use model::{RecipeModel, RecipeSummary, Supported};
pub use resolve::{ResolveRequest, check_ranges, squash};
pub use section::{Section, SectionEntry};
pub use source::{RecipeSource, parse_section_tree};
pub use tree::{ConfigMap, ConfigValue, LeafValue, NodeEntry, SectionKey, TypedNode};
