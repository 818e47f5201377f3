//! Dependency declarations.
//!
//! A declaration is a name plus a raw value of the form
//! `version[; toolchain[; versionsuffix]]`, e.g. `zlib = 1.2.7; GCC 4.7.2`.

use serde::{Deserialize, Serialize};

use crate::predicate::{ToolchainPredicate, ToolchainSpec};
use crate::version::Version;
use crate::{Error, Result};

const FIELD_SEPARATOR: char = ';';

/// A parsed dependency with a required name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    /// Toolchain to build the dependency with, when not the parent's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versionsuffix: Option<String>,
}

impl Dependency {
    /// Parse the raw value declared for `name`.
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid(name, raw, "missing name"));
        }

        let mut fields = raw.split(FIELD_SEPARATOR).map(str::trim);

        let version = fields.next().unwrap_or_default();
        if version.is_empty() {
            return Err(invalid(name, raw, "missing version"));
        }
        if Version::parse(version).is_none() {
            return Err(invalid(name, raw, &format!("invalid version '{}'", version)));
        }

        let toolchain = match fields.next() {
            None | Some("") => None,
            Some(text) => {
                let predicate = ToolchainPredicate::parse(text)
                    .ok_or_else(|| invalid(name, raw, &format!("invalid toolchain '{}'", text)))?;
                let spec = predicate.as_spec().ok_or_else(|| {
                    invalid(name, raw, &format!("toolchain '{}' must name one version", text))
                })?;
                Some(spec)
            }
        };

        let versionsuffix = fields
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(extra) = fields.next() {
            return Err(invalid(name, raw, &format!("unexpected field '{}'", extra)));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            toolchain,
            versionsuffix,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn invalid(name: &str, raw: &str, message: &str) -> Error {
    Error::InvalidDependency {
        name: name.to_string(),
        value: raw.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_only() {
        let dep = Dependency::parse("zlib", "1.2.7").unwrap();
        assert_eq!(dep.name(), "zlib");
        assert_eq!(dep.version(), "1.2.7");
        assert!(dep.toolchain.is_none());
        assert!(dep.versionsuffix.is_none());
    }

    #[test]
    fn test_with_toolchain_and_suffix() {
        let dep = Dependency::parse("Python", " 2.7.3 ; GCC 4.7.2 ; -bare").unwrap();
        assert_eq!(dep.version(), "2.7.3");
        let tc = dep.toolchain.unwrap();
        assert_eq!(tc.name, "GCC");
        assert_eq!(tc.version, "4.7.2");
        assert_eq!(dep.versionsuffix.as_deref(), Some("-bare"));
    }

    #[test]
    fn test_missing_version() {
        let err = Dependency::parse("zlib", "  ").unwrap_err();
        assert!(matches!(err, Error::InvalidDependency { ref message, .. } if message == "missing version"));
    }

    #[test]
    fn test_missing_name() {
        assert!(Dependency::parse("", "1.0").is_err());
    }

    #[test]
    fn test_toolchain_must_be_exact() {
        assert!(Dependency::parse("zlib", "1.2.7; GCC >= 4.7").is_err());
        assert!(Dependency::parse("zlib", "1.2.7; >= 4.7").is_err());
    }

    #[test]
    fn test_too_many_fields() {
        assert!(Dependency::parse("zlib", "1.2.7; GCC 4.7.2; -x; extra").is_err());
    }
}
