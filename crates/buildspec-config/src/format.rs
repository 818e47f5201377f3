//! Recipe format version header.
//!
//! Every recipe starts with a line such as `# EASYCONFIGFORMAT 2.0`.

use derive_more::Display;
use regex::Regex;
use std::sync::LazyLock;

pub const FORMAT_VERSION_KEYWORD: &str = "EASYCONFIGFORMAT";

/// Format assumed for recipes written before the header existed.
pub const FORMAT_DEFAULT_VERSION: FormatVersion = FormatVersion { major: 1, minor: 0 };

/// Format versions this crate has a parser for.
pub const SUPPORTED_FORMAT_VERSIONS: &[FormatVersion] = &[FormatVersion { major: 2, minor: 0 }];

static FORMAT_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#\s+EASYCONFIGFORMAT\s*(?P<major>\d+)\.(?P<minor>\d+)\s*$").unwrap()
});

/// A `major.minor` recipe format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{major}.{minor}")]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether recipes in this format can be parsed.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_FORMAT_VERSIONS.contains(self)
    }

    /// The header line announcing this version, newline included.
    pub fn header(&self) -> String {
        format!("# {} {}\n", FORMAT_VERSION_KEYWORD, self)
    }
}

/// Extract the format version from recipe text, if the header is present.
pub fn format_version(text: &str) -> Option<FormatVersion> {
    let caps = FORMAT_VERSION_REGEX.captures(text)?;
    let major = caps["major"].parse().ok()?;
    let minor = caps["minor"].parse().ok()?;
    Some(FormatVersion { major, minor })
}
