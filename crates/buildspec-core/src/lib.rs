//! Core types for multidimensional build recipes.
//!
//! This crate contains:
//! - Loose software versions
//! - Version and toolchain predicates with overlap/conflict rules
//! - The specificity-ordered predicate store
//! - Dependency declarations

pub mod dependency;
pub mod error;
pub mod ordered;
pub mod predicate;
pub mod version;

pub use dependency::Dependency;
pub use error::{Error, Result};
pub use ordered::{OrderedPredicates, RangeConflict, Update};
pub use predicate::{
    Operator, Overlap, RangePredicate, ToolchainPredicate, ToolchainSpec, VersionPredicate,
};
pub use version::Version;
