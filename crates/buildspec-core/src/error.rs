//! Error types for buildspec core types.

use thiserror::Error;

use crate::ordered::RangeConflict;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid version: '{0}'")]
    InvalidVersion(String),

    #[error("invalid predicate: '{0}'")]
    InvalidPredicate(String),

    #[error("invalid dependency {name} = '{value}': {message}")]
    InvalidDependency {
        name: String,
        value: String,
        message: String,
    },

    #[error("range conflict: {0}")]
    RangeConflict(#[from] RangeConflict),
}

pub type Result<T> = std::result::Result<T, Error>;
