//! Recipe model: parse, finalize and query a multidimensional recipe.
//!
//! Mandatory sections:
//!
//! ```text
//! SUPPORTED {
//!     versions "1.0, 2.0"            // first one is the default
//!     toolchains "GCC 4.7.2"         // first one is the default
//! }
//! ```
//!
//! Optional: a `DEFAULT` section, `DEPENDENCIES` sections, and any number of
//! sections gated by `[<op>] <version>` or `<toolchain> [<op>] <version>`,
//! nested to any depth.

use buildspec_core::{ToolchainPredicate, ToolchainSpec, VersionPredicate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::builder::build_tree;
use crate::format::{FormatVersion, SUPPORTED_FORMAT_VERSIONS};
use crate::resolve::{ResolveRequest, check_ranges, squash};
use crate::section::Section;
use crate::source::parse_section_tree;
use crate::tree::{
    ConfigMap, ConfigValue, KEY_TOOLCHAINS, KEY_VERSIONS, LeafValue, NodeEntry, SectionKey,
    TypedNode,
};
use crate::{ConfigError, ConfigResult};

/// The ranges a recipe declares support for.
#[derive(Debug, Clone, PartialEq)]
pub struct Supported {
    pub versions: Vec<VersionPredicate>,
    pub toolchains: Vec<ToolchainPredicate>,
}

impl Supported {
    /// Distinct toolchain names, in declaration order.
    pub fn toolchain_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for tc in &self.toolchains {
            if !names.contains(&tc.name()) {
                names.push(tc.name());
            }
        }
        names
    }
}

type DefaultDerivation = fn(&Supported) -> Option<Value>;

/// Defaults derived from the first supported entries: (default key, supported key, derivation).
const DEFAULT_DERIVATIONS: &[(&str, &str, DefaultDerivation)] = &[
    ("version", KEY_VERSIONS, derive_default_version),
    ("toolchain", KEY_TOOLCHAINS, derive_default_toolchain),
];

fn derive_default_version(supported: &Supported) -> Option<Value> {
    let first = supported.versions.first()?;
    first.get_version_str().map(Value::from)
}

fn derive_default_toolchain(supported: &Supported) -> Option<Value> {
    let first = supported.toolchains.first()?;
    first
        .as_spec()
        .and_then(|spec| serde_json::to_value(spec).ok())
}

/// A parsed, finalized recipe.
#[derive(Debug, Clone)]
pub struct RecipeModel {
    format_version: Option<FormatVersion>,
    default: ConfigMap,
    supported: Supported,
    sections: TypedNode,
}

impl RecipeModel {
    /// Parse recipe text. The format version header is required and must name
    /// a supported format.
    pub fn from_kdl(text: &str) -> ConfigResult<Self> {
        let source = parse_section_tree(text)?;
        let format_version = source
            .format_version
            .ok_or(ConfigError::MissingFormatVersion)?;
        if !format_version.is_supported() {
            return Err(ConfigError::UnsupportedFormatVersion {
                found: format_version,
                supported: SUPPORTED_FORMAT_VERSIONS.iter().map(|v| v.to_string()).collect(),
            });
        }
        let mut model = Self::from_section(&source.sections)?;
        model.format_version = Some(format_version);
        Ok(model)
    }

    /// Read and parse a recipe file.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_kdl(&text)
    }

    /// Interpret an already-parsed generic section tree.
    pub fn from_section(source: &Section) -> ConfigResult<Self> {
        let mut sections = build_tree(source)?;

        // DEFAULT never nests: its entries live at the root, where anything
        // deeper that matches overrides them
        let default_node = sections
            .take_section(&SectionKey::Default)
            .unwrap_or_else(|| sections.nested());
        let mut default = ConfigMap::new();
        for entry in default_node.entries() {
            if let NodeEntry::Value(key, LeafValue::Config(value)) = entry {
                default.insert(key.clone(), value.clone());
            }
        }
        sections.absorb(default_node);

        let supported_node = sections
            .take_section(&SectionKey::Supported)
            .unwrap_or_else(|| sections.nested());
        let supported = Self::extract_supported(supported_node)?;
        sections.insert_value(KEY_VERSIONS, LeafValue::Versions(supported.versions.clone()));
        sections.insert_value(
            KEY_TOOLCHAINS,
            LeafValue::Toolchains(supported.toolchains.clone()),
        );
        check_ranges(&sections)?;

        for (key, supported_key, derive) in DEFAULT_DERIVATIONS {
            match derive(&supported) {
                Some(value) => {
                    debug!(key, value = %value, "Using first supported entry as default");
                    default.insert(key.to_string(), ConfigValue::Scalar(value));
                }
                None => {
                    warn!(
                        key,
                        supported = supported_key,
                        "First supported entry can't be used as default"
                    );
                }
            }
        }

        debug!(?supported, "Parsed supported ranges");
        debug!(keys = default.len(), "Parsed defaults");

        Ok(Self {
            format_version: None,
            default,
            supported,
            sections,
        })
    }

    fn extract_supported(node: TypedNode) -> ConfigResult<Supported> {
        let mut versions = Vec::new();
        let mut toolchains = Vec::new();

        for entry in node.into_entries() {
            match entry {
                NodeEntry::Value(_, LeafValue::Versions(list)) => versions = list,
                NodeEntry::Value(_, LeafValue::Toolchains(list)) => toolchains = list,
                NodeEntry::Value(key, LeafValue::Config(_)) => {
                    return Err(ConfigError::UnsupportedSupportedKey(key));
                }
                NodeEntry::Section(key, _) => {
                    return Err(ConfigError::UnsupportedSupportedKey(key.to_string()));
                }
            }
        }

        if versions.is_empty() {
            return Err(ConfigError::MissingSupported(KEY_VERSIONS.to_string()));
        }
        if toolchains.is_empty() {
            return Err(ConfigError::MissingSupported(KEY_TOOLCHAINS.to_string()));
        }

        Ok(Supported {
            versions,
            toolchains,
        })
    }

    pub fn format_version(&self) -> Option<FormatVersion> {
        self.format_version
    }

    /// Flat defaults, including the derived `version` / `toolchain`.
    pub fn default(&self) -> &ConfigMap {
        &self.default
    }

    pub fn supported(&self) -> &Supported {
        &self.supported
    }

    /// The typed tree with defaults hoisted and supported ranges as gates.
    pub fn sections(&self) -> &TypedNode {
        &self.sections
    }

    /// The default version, if the first supported version is exact.
    pub fn default_version(&self) -> Option<&str> {
        self.default
            .get("version")
            .and_then(ConfigValue::as_scalar)
            .and_then(Value::as_str)
    }

    /// The default toolchain, if the first supported toolchain is exact.
    pub fn default_toolchain(&self) -> Option<ToolchainSpec> {
        let value = self.default.get("toolchain")?.as_scalar()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Resolve the configuration for one toolchain and version.
    ///
    /// Every call returns an independently owned map.
    pub fn squash(
        &self,
        toolchain_name: &str,
        toolchain_version: &str,
        version: &str,
    ) -> ConfigResult<ConfigMap> {
        let request = ResolveRequest::parse(toolchain_name, toolchain_version, version)?;
        squash(&self.sections, &request)
    }

    /// Check a request against the supported ranges and return the defaults.
    ///
    /// This does not select a path through the gated sections; use
    /// [`squash`](Self::squash) for the fully resolved configuration.
    pub fn get_specs_for(
        &self,
        version: Option<&str>,
        toolchain_name: Option<&str>,
        toolchain_version: Option<&str>,
    ) -> ConfigResult<ConfigMap> {
        match version {
            None => debug!("No version specified"),
            Some(v) if self.supported.versions.iter().any(|p| p.test_str(v)) => {
                debug!(version = v, "Version is supported");
            }
            Some(v) => {
                return Err(ConfigError::unsupported(
                    "version",
                    v,
                    self.supported.versions.iter().map(|p| p.to_string()),
                ));
            }
        }

        match toolchain_name {
            None => debug!("Toolchain name not specified"),
            Some(name) if self.supported.toolchain_names().contains(&name) => {
                debug!(toolchain = name, "Toolchain is supported");
                let candidates: Vec<&ToolchainPredicate> = self
                    .supported
                    .toolchains
                    .iter()
                    .filter(|tc| tc.name() == name)
                    .collect();
                match toolchain_version {
                    None => debug!("Toolchain version not specified"),
                    Some(tcv) if candidates.iter().any(|tc| tc.test_str(name, tcv)) => {
                        debug!(toolchain = name, version = tcv, "Toolchain version is supported");
                    }
                    Some(tcv) => {
                        return Err(ConfigError::unsupported(
                            &format!("toolchain {} version", name),
                            tcv,
                            candidates.iter().map(|tc| tc.to_string()),
                        ));
                    }
                }
            }
            Some(name) => {
                return Err(ConfigError::unsupported(
                    "toolchain",
                    name,
                    self.supported
                        .toolchain_names()
                        .into_iter()
                        .map(str::to_string),
                ));
            }
        }

        Ok(self.default.clone())
    }
}

/// Summary of a recipe's declared ranges and defaults.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    pub versions: Vec<String>,
    pub toolchains: Vec<String>,
    pub default: ConfigMap,
}

impl From<&RecipeModel> for RecipeSummary {
    fn from(model: &RecipeModel) -> Self {
        Self {
            format_version: model.format_version.map(|v| v.to_string()),
            versions: model.supported.versions.iter().map(|p| p.to_string()).collect(),
            toolchains: model
                .supported
                .toolchains
                .iter()
                .map(|p| p.to_string())
                .collect(),
            default: model.default.clone(),
        }
    }
}
