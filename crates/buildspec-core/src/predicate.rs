//! Version and toolchain predicates.
//!
//! A predicate is an operator plus a version (`>= 4.6`, `== 1.0`), optionally
//! prefixed with a toolchain name (`GCC >= 4.6`). Predicates gate recipe
//! sections, so two predicates over the same dimension must either be disjoint
//! or one must be a refinement of the other; anything else is ambiguous.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Bound;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::version::Version;
use crate::{Error, Result};

static VERSION_PREDICATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<op>==|!=|>=|<=|>|<)?\s*(?P<version>\S+)\s*$").unwrap()
});

static TOOLCHAIN_PREDICATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>[A-Za-z][A-Za-z0-9_+\-]*)\s+(?P<predicate>\S.*?)\s*$").unwrap()
});

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            _ => None,
        }
    }

    /// Whether the operator's boundary value itself satisfies it.
    fn includes_boundary(&self) -> bool {
        matches!(self, Operator::Eq | Operator::Ge | Operator::Le)
    }

    fn same_family(&self, other: Operator) -> bool {
        matches!(
            (self, other),
            (Operator::Gt | Operator::Ge, Operator::Gt | Operator::Ge)
                | (Operator::Lt | Operator::Le, Operator::Lt | Operator::Le)
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How two predicates over the same dimension relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// No value satisfies both.
    Disjoint,
    /// Values satisfy both, and one predicate refines the other (or they are equal).
    Refinement,
    /// Values satisfy both and neither is a clean refinement.
    Conflict,
}

/// An operator applied to a version, e.g. `>= 4.6.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionPredicate {
    operator: Operator,
    version: Version,
}

impl VersionPredicate {
    /// Parse `[op] version`; a missing operator means `==`.
    ///
    /// Returns `None` for anything that is not a well-formed predicate.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_PREDICATE_REGEX.captures(text)?;
        let operator = match caps.name("op") {
            Some(op) => Operator::from_symbol(op.as_str())?,
            None => Operator::Eq,
        };
        let version = Version::parse(&caps["version"])?;
        // `>>1` and friends would otherwise slip through as a version
        if version.as_str().starts_with(['=', '!', '<', '>']) {
            return None;
        }
        Some(Self { operator, version })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether `value` satisfies this predicate.
    pub fn test(&self, value: &Version) -> bool {
        match self.operator {
            Operator::Eq => value == &self.version,
            Operator::Ne => value != &self.version,
            Operator::Gt => value > &self.version,
            Operator::Ge => value >= &self.version,
            Operator::Lt => value < &self.version,
            Operator::Le => value <= &self.version,
        }
    }

    /// Like [`test`](Self::test), for unparsed input; invalid versions never match.
    pub fn test_str(&self, value: &str) -> bool {
        Version::parse(value).is_some_and(|v| self.test(&v))
    }

    /// The single version this predicate stands for, if it has one.
    pub fn get_version_str(&self) -> Option<&str> {
        match self.operator {
            Operator::Eq => Some(self.version.as_str()),
            _ => None,
        }
    }

    fn bounds(&self) -> (Bound<&Version>, Bound<&Version>) {
        let v = &self.version;
        match self.operator {
            Operator::Eq => (Bound::Included(v), Bound::Included(v)),
            Operator::Gt => (Bound::Excluded(v), Bound::Unbounded),
            Operator::Ge => (Bound::Included(v), Bound::Unbounded),
            Operator::Lt => (Bound::Unbounded, Bound::Excluded(v)),
            Operator::Le => (Bound::Unbounded, Bound::Included(v)),
            Operator::Ne => (Bound::Unbounded, Bound::Unbounded),
        }
    }

    /// Whether some version satisfies both predicates.
    ///
    /// Versions are treated as dense: there is always a version strictly
    /// between two distinct ones.
    pub fn overlaps(&self, other: &VersionPredicate) -> bool {
        match (self.operator, other.operator) {
            (Operator::Ne, Operator::Ne) => true,
            (Operator::Ne, _) => other.test_range_beyond(&self.version),
            (_, Operator::Ne) => self.test_range_beyond(&other.version),
            _ => {
                let (self_lo, self_hi) = self.bounds();
                let (other_lo, other_hi) = other.bounds();
                let lo = max_lower(self_lo, other_lo);
                let hi = min_upper(self_hi, other_hi);
                match (lo, hi) {
                    (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
                    (Bound::Included(l), Bound::Included(h)) => l <= h,
                    (Bound::Included(l) | Bound::Excluded(l), Bound::Included(h) | Bound::Excluded(h)) => {
                        l < h
                    }
                }
            }
        }
    }

    /// Whether this range holds anywhere apart from the single value `hole`.
    fn test_range_beyond(&self, hole: &Version) -> bool {
        !(self.operator == Operator::Eq && &self.version == hole)
    }

    /// Classify how this predicate relates to `other`.
    pub fn overlap_with(&self, other: &VersionPredicate) -> Overlap {
        if self == other {
            return Overlap::Refinement;
        }
        if !self.overlaps(other) {
            return Overlap::Disjoint;
        }

        let self_in_other = other.test(&self.version);
        let other_in_self = self.test(&other.version);

        match (self_in_other, other_in_self) {
            (true, true) => {
                let same_boundary = self.version == other.version;
                let one_strict = self.operator.includes_boundary()
                    ^ other.operator.includes_boundary();
                if self.operator.same_family(other.operator) && same_boundary && one_strict {
                    Overlap::Refinement
                } else {
                    Overlap::Conflict
                }
            }
            (true, false) | (false, true) => Overlap::Refinement,
            (false, false) => Overlap::Conflict,
        }
    }

    /// Whether this predicate is more specific than `other`.
    ///
    /// `None` when the two conflict and no order exists. Disjoint predicates
    /// are ordered by boundary so the order is total over compatible sets.
    pub fn is_stricter_than(&self, other: &VersionPredicate) -> Option<bool> {
        match self.overlap_with(other) {
            Overlap::Conflict => None,
            Overlap::Disjoint => Some(self.version > other.version),
            Overlap::Refinement => {
                if self == other {
                    return Some(false);
                }
                let self_in_other = other.test(&self.version);
                let other_in_self = self.test(&other.version);
                Some(self_in_other && !other_in_self)
            }
        }
    }
}

fn max_lower<'a>(a: Bound<&'a Version>, b: Bound<&'a Version>) -> Bound<&'a Version> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.max(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.max(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i > e {
                Bound::Included(i)
            } else {
                Bound::Excluded(e)
            }
        }
    }
}

fn min_upper<'a>(a: Bound<&'a Version>, b: Bound<&'a Version>) -> Bound<&'a Version> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.min(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.min(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i < e {
                Bound::Included(i)
            } else {
                Bound::Excluded(e)
            }
        }
    }
}

impl FromStr for VersionPredicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidPredicate(s.to_string()))
    }
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.version)
    }
}

/// A concrete toolchain: name plus exact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSpec {
    pub name: String,
    pub version: String,
}

/// A toolchain name with a version predicate, e.g. `GCC >= 4.6`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolchainPredicate {
    name: String,
    predicate: VersionPredicate,
}

impl ToolchainPredicate {
    /// Parse `name [op] version`; returns `None` when malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = TOOLCHAIN_PREDICATE_REGEX.captures(text)?;
        let predicate = VersionPredicate::parse(&caps["predicate"])?;
        Some(Self {
            name: caps["name"].to_string(),
            predicate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, name: &str, version: &Version) -> bool {
        self.name == name && self.predicate.test(version)
    }

    pub fn test_str(&self, name: &str, version: &str) -> bool {
        self.name == name && self.predicate.test_str(version)
    }

    pub fn get_version_str(&self) -> Option<&str> {
        self.predicate.get_version_str()
    }

    /// The concrete toolchain this predicate names, if its version is exact.
    pub fn as_spec(&self) -> Option<ToolchainSpec> {
        self.get_version_str().map(|version| ToolchainSpec {
            name: self.name.clone(),
            version: version.to_string(),
        })
    }
}

impl FromStr for ToolchainPredicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidPredicate(s.to_string()))
    }
}

impl fmt::Display for ToolchainPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.predicate)
    }
}

/// A predicate that can live in an [`OrderedPredicates`](crate::OrderedPredicates) store.
pub trait RangePredicate: Clone + PartialEq + fmt::Display {
    /// The version range used for ordering and conflict checks.
    fn range(&self) -> &VersionPredicate;
}

impl RangePredicate for VersionPredicate {
    fn range(&self) -> &VersionPredicate {
        self
    }
}

impl RangePredicate for ToolchainPredicate {
    fn range(&self) -> &VersionPredicate {
        &self.predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(s: &str) -> VersionPredicate {
        s.parse().unwrap()
    }

    fn ver(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_version_predicates() {
        let p = vp(">= 4.6.3");
        assert_eq!(p.operator(), Operator::Ge);
        assert_eq!(p.version().as_str(), "4.6.3");
        assert_eq!(p.to_string(), ">= 4.6.3");

        let exact = vp("1.0");
        assert_eq!(exact.operator(), Operator::Eq);
        assert_eq!(exact.to_string(), "== 1.0");

        assert_eq!(vp("<2.0").operator(), Operator::Lt);
    }

    #[test]
    fn test_invalid_version_predicates() {
        assert!(VersionPredicate::parse("").is_none());
        assert!(VersionPredicate::parse(">").is_none());
        assert!(VersionPredicate::parse("> 1.0 2.0").is_none());
        assert!(VersionPredicate::parse(">> 1.0").is_none());
        assert!(VersionPredicate::parse("GCC 4.6").is_none());
        assert!(matches!(
            "=~ 1".parse::<VersionPredicate>(),
            Err(Error::InvalidPredicate(_))
        ));
    }

    #[test]
    fn test_version_predicate_test() {
        assert!(vp("> 2.0").test(&ver("2.5")));
        assert!(!vp("> 2.0").test(&ver("2.0")));
        assert!(vp(">= 2.0").test(&ver("2.0")));
        assert!(vp("!= 2.0").test(&ver("2.1")));
        assert!(vp("< 1.10").test(&ver("1.9")));
        assert!(!vp("== 1.0").test_str("not a version"));
    }

    #[test]
    fn test_get_version_str_only_for_exact() {
        assert_eq!(vp("== 1.2").get_version_str(), Some("1.2"));
        assert_eq!(vp("> 1.2").get_version_str(), None);
    }

    #[test]
    fn test_overlap_table() {
        assert_eq!(vp("> 3").overlap_with(&vp("> 3")), Overlap::Refinement);
        assert_eq!(vp("> 3").overlap_with(&vp("< 2")), Overlap::Disjoint);
        assert_eq!(vp("< 3").overlap_with(&vp("> 2")), Overlap::Conflict);
        assert_eq!(vp("> 3").overlap_with(&vp("== 3")), Overlap::Disjoint);
        assert_eq!(vp(">= 3").overlap_with(&vp("== 3")), Overlap::Conflict);
        assert_eq!(vp("> 3").overlap_with(&vp(">= 3")), Overlap::Refinement);
        assert_eq!(vp("> 1.0").overlap_with(&vp("> 2.0")), Overlap::Refinement);
        assert_eq!(vp("== 4").overlap_with(&vp(">= 3")), Overlap::Refinement);
        assert_eq!(vp("< 3").overlap_with(&vp(">= 3")), Overlap::Disjoint);
        assert_eq!(vp("<= 3").overlap_with(&vp(">= 3")), Overlap::Conflict);
        assert_eq!(vp("!= 3").overlap_with(&vp("== 3")), Overlap::Disjoint);
        assert_eq!(vp("!= 3").overlap_with(&vp("== 4")), Overlap::Refinement);
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let preds = ["> 3", ">= 3", "== 3", "< 2", "<= 5", "!= 4", "== 1.0"];
        for a in preds {
            for b in preds {
                assert_eq!(
                    vp(a).overlap_with(&vp(b)),
                    vp(b).overlap_with(&vp(a)),
                    "{a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_strictness() {
        assert_eq!(vp("> 2.0").is_stricter_than(&vp("> 1.0")), Some(true));
        assert_eq!(vp("> 1.0").is_stricter_than(&vp("> 2.0")), Some(false));
        assert_eq!(vp("> 3").is_stricter_than(&vp(">= 3")), Some(true));
        assert_eq!(vp("< 2").is_stricter_than(&vp("< 3")), Some(true));
        assert_eq!(vp("< 3").is_stricter_than(&vp("> 2")), None);
    }

    #[test]
    fn test_toolchain_predicate() {
        let tc: ToolchainPredicate = "GCC >= 4.6".parse().unwrap();
        assert_eq!(tc.name(), "GCC");
        assert_eq!(tc.to_string(), "GCC >= 4.6");
        assert!(tc.test_str("GCC", "4.7.2"));
        assert!(!tc.test_str("GCC", "4.5"));
        assert!(!tc.test_str("icc", "4.7.2"));
        assert!(tc.as_spec().is_none());

        let exact: ToolchainPredicate = "goolf 1.4.10".parse().unwrap();
        assert_eq!(
            exact.as_spec(),
            Some(ToolchainSpec {
                name: "goolf".to_string(),
                version: "1.4.10".to_string(),
            })
        );
    }

    #[test]
    fn test_toolchain_predicate_rejects_plain_versions() {
        assert!(ToolchainPredicate::parse("> 2.0").is_none());
        assert!(ToolchainPredicate::parse("2.0").is_none());
        assert!(ToolchainPredicate::parse("GCC").is_none());
        assert!(ToolchainPredicate::parse("GCC >").is_none());
    }
}
