//! Squashing a typed recipe tree into one flat configuration.
//!
//! The tree is walked depth-first for a concrete (toolchain name, toolchain
//! version, version) request:
//! - matching toolchain sections are promoted straight into their level;
//! - matching version sections are collected per predicate and applied after
//!   the level's own values, least specific first, so the narrowest range wins;
//! - `versions` / `toolchains` values gate their whole level.
//!
//! Every predicate seen is registered in a per-dimension store so ambiguous
//! ranges abort the resolve instead of silently picking a winner.

use buildspec_core::{OrderedPredicates, ToolchainPredicate, Version, VersionPredicate};
use std::collections::BTreeMap;
use tracing::debug;

use crate::tree::{
    ConfigMap, KEY_TOOLCHAINS, KEY_VERSIONS, LeafValue, NodeEntry, SectionKey, TypedNode,
};
use crate::{ConfigError, ConfigResult};

/// Data gathered from matching version sections, keyed by their predicate.
type VersionData = OrderedPredicates<VersionPredicate, ConfigMap>;

/// One concrete resolve request.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub toolchain_name: String,
    pub toolchain_version: Version,
    pub version: Version,
}

impl ResolveRequest {
    /// Build a request from text; unparseable versions can never be supported.
    pub fn parse(toolchain_name: &str, toolchain_version: &str, version: &str) -> ConfigResult<Self> {
        let toolchain_version = Version::parse(toolchain_version).ok_or_else(|| {
            ConfigError::unsupported("toolchain version", toolchain_version, Vec::new())
        })?;
        let version = Version::parse(version)
            .ok_or_else(|| ConfigError::unsupported("version", version, Vec::new()))?;
        Ok(Self {
            toolchain_name: toolchain_name.to_string(),
            toolchain_version,
            version,
        })
    }
}

/// Predicates seen so far, for conflict detection across the whole resolve.
#[derive(Debug, Default)]
struct Sanity {
    versions: OrderedPredicates<VersionPredicate>,
    toolchains: BTreeMap<String, OrderedPredicates<ToolchainPredicate>>,
}

impl Sanity {
    fn register_version(&mut self, predicate: &VersionPredicate) -> ConfigResult<()> {
        self.versions.add(predicate.clone(), (), false)?;
        Ok(())
    }

    fn register_toolchain(&mut self, predicate: &ToolchainPredicate) -> ConfigResult<()> {
        self.toolchains
            .entry(predicate.name().to_string())
            .or_default()
            .add(predicate.clone(), (), false)?;
        Ok(())
    }
}

struct Resolver<'a> {
    request: &'a ResolveRequest,
    sanity: Sanity,
}

impl Resolver<'_> {
    /// Resolve one level; `None` when a gate discarded the level.
    fn resolve_level(&mut self, node: &TypedNode) -> ConfigResult<Option<(VersionData, ConfigMap)>> {
        let request = self.request;
        let mut result = ConfigMap::new();
        let mut promoted = ConfigMap::new();
        let mut data = VersionData::new();

        for entry in node.entries() {
            match entry {
                NodeEntry::Section(SectionKey::Toolchain(predicate), child) => {
                    self.sanity.register_toolchain(predicate)?;
                    if !predicate.test(&request.toolchain_name, &request.toolchain_version) {
                        debug!(marker = %predicate, "Skipping section for other toolchain");
                        continue;
                    }
                    debug!(marker = %predicate, depth = child.depth(), "Entering matching toolchain section");
                    if let Some((child_data, child_result)) = self.resolve_level(child)? {
                        promoted.extend(child_result);
                        data.absorb(&child_data)?;
                    }
                }
                NodeEntry::Section(SectionKey::Version(predicate), child) => {
                    self.sanity.register_version(predicate)?;
                    if !predicate.test(&request.version) {
                        debug!(marker = %predicate, "Skipping section for other version");
                        continue;
                    }
                    debug!(marker = %predicate, depth = child.depth(), "Entering matching version section");
                    if let Some((child_data, child_result)) = self.resolve_level(child)? {
                        data.absorb(&child_data)?;
                        data.add(predicate.clone(), child_result, true)?;
                    }
                }
                NodeEntry::Section(key @ (SectionKey::Default | SectionKey::Supported), _) => {
                    return Err(ConfigError::MisplacedSection {
                        section: key.to_string(),
                        context: "in a finalized recipe".to_string(),
                    });
                }
                NodeEntry::Value(_, LeafValue::Toolchains(predicates)) => {
                    let mut matched = false;
                    for predicate in predicates {
                        self.sanity.register_toolchain(predicate)?;
                        matched |= predicate.test(&request.toolchain_name, &request.toolchain_version);
                    }
                    if !matched {
                        debug!(depth = node.depth(), "No matching toolchains, discarding level");
                        return Ok(None);
                    }
                }
                NodeEntry::Value(_, LeafValue::Versions(predicates)) => {
                    let mut matched = false;
                    for predicate in predicates {
                        self.sanity.register_version(predicate)?;
                        matched |= predicate.test(&request.version);
                    }
                    if !matched {
                        debug!(depth = node.depth(), "No matching versions, discarding level");
                        return Ok(None);
                    }
                }
                NodeEntry::Value(key, LeafValue::Config(value)) => {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        result.extend(promoted);
        apply_version_data(&mut result, &data);

        debug!(depth = node.depth(), ordered = %data, keys = result.len(), "Resolved level");
        Ok(Some((data, result)))
    }
}

/// Apply collected version data, least specific first.
fn apply_version_data(result: &mut ConfigMap, data: &VersionData) {
    for (_, values) in data.iter_least_specific() {
        result.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Squash `tree` for `request`.
///
/// Fails with [`ConfigError::RangeConflict`] on ambiguous ranges and with
/// [`ConfigError::UnsupportedRequest`] when the top-level gates reject the
/// request.
pub fn squash(tree: &TypedNode, request: &ResolveRequest) -> ConfigResult<ConfigMap> {
    debug!(
        toolchain = %request.toolchain_name,
        toolchain_version = %request.toolchain_version,
        version = %request.version,
        "Start squash"
    );

    let mut resolver = Resolver {
        request,
        sanity: Sanity::default(),
    };

    let Some((data, mut result)) = resolver.resolve_level(tree)? else {
        return Err(rejection(tree, request));
    };
    apply_version_data(&mut result, &data);

    debug!(keys = result.len(), "End squash");
    Ok(result)
}

/// Check that sibling ranges are unambiguous at every level of `node`.
///
/// Needs no request, so it also covers branches a given squash never enters.
pub fn check_ranges(node: &TypedNode) -> ConfigResult<()> {
    let mut sanity = Sanity::default();
    for entry in node.entries() {
        match entry {
            NodeEntry::Section(SectionKey::Toolchain(predicate), child) => {
                sanity.register_toolchain(predicate)?;
                check_ranges(child)?;
            }
            NodeEntry::Section(SectionKey::Version(predicate), child) => {
                sanity.register_version(predicate)?;
                check_ranges(child)?;
            }
            NodeEntry::Section(_, child) => check_ranges(child)?,
            NodeEntry::Value(_, LeafValue::Toolchains(predicates)) => {
                for predicate in predicates {
                    sanity.register_toolchain(predicate)?;
                }
            }
            NodeEntry::Value(_, LeafValue::Versions(predicates)) => {
                for predicate in predicates {
                    sanity.register_version(predicate)?;
                }
            }
            NodeEntry::Value(_, LeafValue::Config(_)) => {}
        }
    }
    Ok(())
}

/// Explain why the top-level gates rejected `request`.
fn rejection(tree: &TypedNode, request: &ResolveRequest) -> ConfigError {
    if let Some(LeafValue::Versions(versions)) = tree.value(KEY_VERSIONS) {
        if !versions.iter().any(|p| p.test(&request.version)) {
            return ConfigError::unsupported(
                "version",
                request.version.as_str(),
                versions.iter().map(|p| p.to_string()),
            );
        }
    }

    let toolchains = match tree.value(KEY_TOOLCHAINS) {
        Some(LeafValue::Toolchains(toolchains)) => toolchains.iter().map(|p| p.to_string()).collect(),
        _ => Vec::new(),
    };
    ConfigError::unsupported(
        "toolchain",
        &format!("{} {}", request.toolchain_name, request.toolchain_version),
        toolchains,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_tree;
    use crate::section::Section;
    use crate::tree::ConfigValue;
    use serde_json::json;

    /// Build and hoist a tree the way a finalized model looks: no DEFAULT or
    /// SUPPORTED sections left, gates at the root.
    fn tree(source: Section) -> TypedNode {
        let mut root = build_tree(&source).unwrap();
        let default = root.take_section(&SectionKey::Default).unwrap();
        root.absorb(default);
        let supported = root.take_section(&SectionKey::Supported).unwrap();
        root.absorb(supported);
        root
    }

    fn request(tc: &str, tcv: &str, v: &str) -> ResolveRequest {
        ResolveRequest::parse(tc, tcv, v).unwrap()
    }

    fn scalar(map: &ConfigMap, key: &str) -> serde_json::Value {
        map[key].as_scalar().unwrap().clone()
    }

    fn supported() -> Section {
        Section::new()
            .with_value("versions", "1.0, 2.5, 3.0")
            .with_value("toolchains", "GCC 4.7.2, goolf 1.4.10")
    }

    #[test]
    fn test_deeper_section_overrides_default() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_section("DEFAULT", Section::new().with_value("a", 1))
                .with_section("> 2.0", Section::new().with_value("a", 2)),
        );
        let high = squash(&t, &request("GCC", "4.7.2", "2.5")).unwrap();
        assert_eq!(scalar(&high, "a"), json!(2));
        let low = squash(&t, &request("GCC", "4.7.2", "1.0")).unwrap();
        assert_eq!(scalar(&low, "a"), json!(1));
    }

    #[test]
    fn test_narrower_sibling_wins() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_section("> 2.0", Section::new().with_value("x", 2))
                .with_section("> 1.0", Section::new().with_value("x", 1)),
        );
        let result = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        assert_eq!(scalar(&result, "x"), json!(2));
    }

    #[test]
    fn test_ambiguous_siblings_conflict() {
        let t = tree(
            Section::new()
                .with_section("< 3.0", Section::new().with_value("x", 1))
                .with_section("> 2.0", Section::new().with_value("x", 2)),
        );
        let err = squash(&t, &request("GCC", "4.7.2", "2.5")).unwrap_err();
        assert!(matches!(err, ConfigError::RangeConflict(_)));
    }

    #[test]
    fn test_conflict_detected_even_when_not_matching() {
        let t = tree(
            Section::new()
                .with_section(">= 5.0", Section::new().with_value("x", 1))
                .with_section("== 5.0", Section::new().with_value("x", 2)),
        );
        assert!(matches!(
            squash(&t, &request("GCC", "4.7.2", "1.0")),
            Err(ConfigError::RangeConflict(_))
        ));
    }

    #[test]
    fn test_toolchain_conflicts_are_per_name() {
        let t = tree(
            Section::new()
                .with_section("GCC >= 4.6", Section::new().with_value("x", 1))
                .with_section("icc < 5", Section::new().with_value("x", 2)),
        );
        assert!(squash(&t, &request("GCC", "4.7.2", "1.0")).is_ok());

        let clash = tree(
            Section::new()
                .with_section("GCC >= 4.6", Section::new().with_value("x", 1))
                .with_section("GCC < 5", Section::new().with_value("x", 2)),
        );
        assert!(matches!(
            squash(&clash, &request("GCC", "4.7.2", "1.0")),
            Err(ConfigError::RangeConflict(_))
        ));
    }

    #[test]
    fn test_toolchain_section_promoted() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_value("opt", "base")
                .with_section("GCC >= 4.6", Section::new().with_value("opt", "gcc"))
                .with_section("goolf >= 1.4", Section::new().with_value("opt", "goolf")),
        );
        let gcc = squash(&t, &request("GCC", "4.7.2", "1.0")).unwrap();
        assert_eq!(scalar(&gcc, "opt"), json!("gcc"));
        let goolf = squash(&t, &request("goolf", "1.4.10", "1.0")).unwrap();
        assert_eq!(scalar(&goolf, "opt"), json!("goolf"));
    }

    #[test]
    fn test_version_section_inside_toolchain_section() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_value("x", 0)
                .with_section(
                    "GCC >= 4.6",
                    Section::new()
                        .with_value("y", "gcc")
                        .with_section("> 2.0", Section::new().with_value("x", 2)),
                ),
        );
        let result = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        assert_eq!(scalar(&result, "x"), json!(2));
        assert_eq!(scalar(&result, "y"), json!("gcc"));

        let other = squash(&t, &request("goolf", "1.4.10", "3.0")).unwrap();
        assert_eq!(scalar(&other, "x"), json!(0));
        assert!(!other.contains_key("y"));
    }

    #[test]
    fn test_nested_version_sections_most_specific_wins() {
        let t = tree(
            Section::new().with_section(
                "> 1.0",
                Section::new()
                    .with_value("x", 1)
                    .with_value("only_outer", true)
                    .with_section("> 2.0", Section::new().with_value("x", 2)),
            ),
        );
        let result = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        assert_eq!(scalar(&result, "x"), json!(2));
        assert_eq!(scalar(&result, "only_outer"), json!(true));

        let mid = squash(&t, &request("GCC", "4.7.2", "1.5")).unwrap();
        assert_eq!(scalar(&mid, "x"), json!(1));
    }

    #[test]
    fn test_gate_discards_level() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_section(
                    "> 2.0",
                    Section::new()
                        .with_value("toolchains", "goolf 1.4.10")
                        .with_value("x", "goolf-only"),
                ),
        );
        let gcc = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        assert!(!gcc.contains_key("x"));
        let goolf = squash(&t, &request("goolf", "1.4.10", "3.0")).unwrap();
        assert_eq!(scalar(&goolf, "x"), json!("goolf-only"));
    }

    #[test]
    fn test_unsupported_version_rejected_at_root() {
        let t = tree(Section::new().with_section("SUPPORTED", supported()));
        let err = squash(&t, &request("GCC", "4.7.2", "9.9")).unwrap_err();
        match err {
            ConfigError::UnsupportedRequest {
                kind, supported, ..
            } => {
                assert_eq!(kind, "version");
                assert_eq!(supported, vec!["== 1.0", "== 2.5", "== 3.0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unsupported_toolchain_rejected_at_root() {
        let t = tree(Section::new().with_section("SUPPORTED", supported()));
        let err = squash(&t, &request("icc", "13.0", "1.0")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedRequest { ref kind, .. } if kind == "toolchain"
        ));
    }

    #[test]
    fn test_unparseable_request() {
        assert!(matches!(
            ResolveRequest::parse("GCC", "", "1.0"),
            Err(ConfigError::UnsupportedRequest { .. })
        ));
    }

    #[test]
    fn test_dependencies_resolve_with_their_section() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_section("DEPENDENCIES", Section::new().with_value("zlib", "1.2.7"))
                .with_section(
                    "> 2.0",
                    Section::new().with_section(
                        "DEPENDENCIES",
                        Section::new().with_value("zlib", "1.2.8"),
                    ),
                ),
        );
        let new = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        let deps = new["dependencies"].as_dependencies().unwrap();
        assert_eq!(deps[0].version(), "1.2.8");

        let old = squash(&t, &request("GCC", "4.7.2", "1.0")).unwrap();
        let deps = old["dependencies"].as_dependencies().unwrap();
        assert_eq!(deps[0].version(), "1.2.7");
    }

    #[test]
    fn test_repeated_squash_is_stable() {
        let t = tree(
            Section::new()
                .with_section("SUPPORTED", supported())
                .with_value("list", json!(["a", "b"]))
                .with_section("> 2.0", Section::new().with_value("x", 2)),
        );
        let first = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        let mut mutated = first.clone();
        mutated.insert("list".to_string(), ConfigValue::Scalar(json!([])));

        let other = squash(&t, &request("goolf", "1.4.10", "1.0")).unwrap();
        assert!(!other.contains_key("x"));

        let second = squash(&t, &request("GCC", "4.7.2", "3.0")).unwrap();
        assert_eq!(first, second);
        assert_eq!(scalar(&second, "list"), json!(["a", "b"]));
    }

    #[test]
    fn test_check_ranges_covers_unvisited_branches() {
        let t = tree(
            Section::new().with_section(
                "GCC >= 4.6",
                Section::new()
                    .with_section("< 3.0", Section::new().with_value("x", 1))
                    .with_section("> 2.0", Section::new().with_value("x", 2)),
            ),
        );
        // a goolf request never enters the GCC branch
        assert!(squash(&t, &request("goolf", "1.4.10", "2.5")).is_ok());
        assert!(matches!(check_ranges(&t), Err(ConfigError::RangeConflict(_))));
    }

    #[test]
    fn test_check_ranges_is_per_level() {
        let t = tree(
            Section::new()
                .with_section("GCC 4.7.2", Section::new().with_section("< 3.0", Section::new()))
                .with_section("goolf 1.4.10", Section::new().with_section("> 2.0", Section::new())),
        );
        assert!(check_ranges(&t).is_ok());
    }

    #[test]
    fn test_leftover_marker_section_rejected() {
        let root = build_tree(&Section::new()).unwrap();
        assert!(matches!(
            squash(&root, &request("GCC", "4.7.2", "1.0")),
            Err(ConfigError::MisplacedSection { .. })
        ));
    }
}
