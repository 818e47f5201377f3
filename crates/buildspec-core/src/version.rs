//! Loose software versions.
//!
//! Versions are compared component-wise: numeric runs numerically, alphabetic
//! runs lexically, numbers sorting before text. Dots only separate components,
//! so `1.0` and `1.00` compare equal while `1.0 < 1.0.1`.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::{Error, Result};

static COMPONENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+|[A-Za-z]+|\.|[^0-9A-Za-z.]+").unwrap());

/// One comparable piece of a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Component {
    Number(u64),
    Text(String),
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Number(a), Component::Number(b)) => a.cmp(b),
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
            (Component::Number(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A software or toolchain version such as `4.6.3`, `2012a` or `1.2-rc1`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    components: Vec<Component>,
}

impl Version {
    /// Parse a version, returning `None` for empty or whitespace-bearing text.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty()
            || text.chars().any(|c| c.is_whitespace() || c == ',')
            || !text.chars().any(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }

        let mut components = Vec::new();
        for piece in COMPONENT_REGEX.find_iter(text) {
            let piece = piece.as_str();
            if piece == "." {
                continue;
            }
            let component = match piece.parse::<u64>() {
                Ok(n) => Component::Number(n),
                Err(_) => Component::Text(piece.to_string()),
            };
            components.push(component);
        }

        Some(Self {
            raw: text.to_string(),
            components,
        })
    }

    /// The version exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_components_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("4.6.3") < v("4.7"));
        assert!(v("10") > v("9.99"));
    }

    #[test]
    fn test_shorter_prefix_sorts_first() {
        assert!(v("1.0") < v("1.0.1"));
        assert_eq!(v("1.0"), v("1.00"));
    }

    #[test]
    fn test_text_components() {
        assert!(v("2012a") < v("2012b"));
        assert!(v("1.2") < v("1.2rc1"));
        assert!(v("1.2-rc1") > v("1.2"));
    }

    #[test]
    fn test_display_keeps_original_text() {
        assert_eq!(v("1.00").to_string(), "1.00");
    }

    #[test]
    fn test_invalid_versions() {
        assert!(Version::parse("").is_none());
        assert!(Version::parse("1 .0").is_none());
        assert!(Version::parse("1.0,2.0").is_none());
        assert!(Version::parse("...").is_none());
        assert!(matches!(
            "".parse::<Version>(),
            Err(Error::InvalidVersion(_))
        ));
    }
}
