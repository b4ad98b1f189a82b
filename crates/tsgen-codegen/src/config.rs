//! Generator configuration.
//!
//! Configuration is read from a JSON file with camelCase keys. Every field is
//! optional:
//!
//! ```json
//! {
//!   "outputPath": "frontend/types",
//!   "defaultNamespace": "Api",
//!   "typeMappings": { "crate::Timestamp": "string" },
//!   "pathAliases": { "@types": "frontend/types" },
//!   "useConstEnums": false
//! }
//! ```
//!
//! Relative paths are resolved against `basePath`, which defaults to the
//! directory containing the config file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::registry::TypeMapping;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Root of the generated file tree.
    pub output_path: PathBuf,

    /// Line terminator written to generated files.
    pub new_line: String,

    /// Base directory for every relative path in this config.
    pub base_path: Option<PathBuf>,

    /// External type overrides keyed by full Rust path, e.g.
    /// `"chrono::NaiveTime": "string"`. These win over built-in mappings.
    pub type_mappings: BTreeMap<String, TypeMapping>,

    /// Attribute path whose presence on a member (or a counterpart of it)
    /// omits the member from the output.
    pub custom_ignore_attribute: Option<String>,

    /// Types whose members are wrapped in [`Config::member_wrapper_type`].
    pub types_to_wrap_members_for: Vec<String>,

    /// Generic wrapper applied to members of [`Config::types_to_wrap_members_for`].
    pub member_wrapper_type: Option<String>,

    /// Import path aliases, checked in declaration order.
    pub path_aliases: IndexMap<String, PathBuf>,

    /// Prefix stripped from import paths that no alias matched.
    pub root_path: Option<PathBuf>,

    pub use_const_enums: bool,

    /// Render nullable members as `name?: T` instead of `name: T | null`.
    pub use_optional_for_nullables: bool,

    /// Marker trait whose generic argument a type must be a structural subset of.
    pub structural_subset_of: Option<String>,

    /// Namespace for types that declare none of their own.
    pub default_namespace: Option<String>,

    /// Namespaces keyed by module path prefix (`"crate::api"`). The longest
    /// matching prefix wins over `defaultNamespace`.
    pub module_namespaces: IndexMap<String, String>,

    /// Emit `@SourceTypeName` doc tags for every generated type.
    pub type_names_doc: bool,

    /// Quiet period before a watched change is processed.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("."),
            new_line: "\n".to_string(),
            base_path: None,
            type_mappings: BTreeMap::new(),
            custom_ignore_attribute: None,
            types_to_wrap_members_for: Vec::new(),
            member_wrapper_type: None,
            path_aliases: IndexMap::new(),
            root_path: None,
            use_const_enums: true,
            use_optional_for_nullables: true,
            structural_subset_of: None,
            default_namespace: None,
            module_namespaces: IndexMap::new(),
            type_names_doc: false,
            debounce_ms: 200,
        }
    }
}

impl Config {
    /// Read a config file, defaulting `basePath` to the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        if config.base_path.is_none() {
            config.base_path = Some(
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            );
        }
        if config.new_line.is_empty() {
            config.new_line = "\n".to_string();
        }
        Ok(config)
    }

    /// Resolve a config-relative path against `basePath`.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_path)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Module-level namespace for `module`: the longest matching entry of
    /// `moduleNamespaces`, else `defaultNamespace`.
    pub fn namespace_for_module(&self, module: &str) -> Option<&str> {
        self.module_namespaces
            .iter()
            .filter(|(prefix, _)| {
                module == prefix.as_str()
                    || module
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with("::"))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, ns)| ns.as_str())
            .or(self.default_namespace.as_deref())
    }

    /// Path aliases with their targets resolved against `basePath`.
    pub fn resolved_path_aliases(&self) -> Vec<(String, PathBuf)> {
        self.path_aliases
            .iter()
            .map(|(alias, target)| (alias.clone(), self.resolve_path(target)))
            .collect()
    }

    pub fn resolved_root_path(&self) -> Option<PathBuf> {
        self.root_path.as_deref().map(|p| self.resolve_path(p))
    }
}
