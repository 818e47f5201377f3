//! Recipe parsing and resolution errors.

use buildspec_core::RangeConflict;

use crate::format::FormatVersion;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    Parse(#[from] kdl::KdlError),

    #[error("missing format version header (expected '# EASYCONFIGFORMAT <major>.<minor>')")]
    MissingFormatVersion,

    #[error("unsupported format version {found} (only {})", .supported.join(", "))]
    UnsupportedFormatVersion {
        found: FormatVersion,
        supported: Vec<String>,
    },

    #[error("unsupported section marker '{0}'")]
    UnsupportedSectionMarker(String),

    #[error("section '{section}' is not allowed {context}")]
    MisplacedSection { section: String, context: String },

    #[error("unsupported key '{0}' in SUPPORTED section (only 'versions' and 'toolchains')")]
    UnsupportedSupportedKey(String),

    #[error("missing or empty '{0}' in SUPPORTED section")]
    MissingSupported(String),

    #[error("unsupported nested section '{0}' in DEPENDENCIES section")]
    NestedDependencySection(String),

    #[error(transparent)]
    InvalidDependency(buildspec_core::Error),

    #[error("failed to parse '{value}' as list of {kind} for key '{key}'")]
    InvalidPredicateList {
        key: String,
        kind: String,
        value: String,
    },

    #[error("unexpected value type for key '{key}': {found}")]
    UnexpectedValueType { key: String, found: String },

    #[error("unsupported property '{property}' on '{node}'")]
    UnsupportedProperty { node: String, property: String },

    #[error("range conflict: {0}")]
    RangeConflict(#[from] RangeConflict),

    #[error("{kind} '{requested}' not supported (only {})", .supported.join(", "))]
    UnsupportedRequest {
        kind: String,
        requested: String,
        supported: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Mistakes in the shape of the recipe itself.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ConfigError::UnsupportedSectionMarker(_)
                | ConfigError::MisplacedSection { .. }
                | ConfigError::UnsupportedSupportedKey(_)
                | ConfigError::MissingSupported(_)
                | ConfigError::NestedDependencySection(_)
                | ConfigError::InvalidDependency(_)
                | ConfigError::InvalidPredicateList { .. }
                | ConfigError::UnexpectedValueType { .. }
                | ConfigError::UnsupportedProperty { .. }
        )
    }

    pub(crate) fn unsupported(
        kind: &str,
        requested: &str,
        supported: impl IntoIterator<Item = String>,
    ) -> Self {
        ConfigError::UnsupportedRequest {
            kind: kind.to_string(),
            requested: requested.to_string(),
            supported: supported.into_iter().collect(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
