//! Type registry for mapping external Rust type paths to TypeScript types.
//!
//! The registry is the data-driven way to teach the resolver about types it
//! cannot see in the scanned sources. Built-in mappings for common crates are
//! registered by [`TypeRegistry::with_builtins`]; alias declarations in the
//! sources and the `typeMappings` config section are layered on top, in that
//! order, so configuration always wins.
//!
//! # Built-in mappings
//!
//! | Rust type | TypeScript |
//! |-----------|------------|
//! | `uuid::Uuid` | `string` |
//! | `chrono::DateTime`, `chrono::NaiveDate` | `string` |
//! | `chrono::NaiveDateTime`, `chrono::NaiveTime` | `string` |
//! | `time::OffsetDateTime`, `time::Date` | `string` |
//! | `url::Url` | `string` |
//! | `rust_decimal::Decimal` | `number` |
//! | `smol_str::SmolStr`, `compact_str::CompactString` | `string` |
//! | `bytes::Bytes` | `number[]` |
//! | `serde_json::Value` | `any` |
//! | `std::time::Duration` | `number` |
//!
//! # Custom mappings
//!
//! ```
//! use tsgen_codegen::{TypeMapping, TypeRegistry};
//!
//! let mut registry = TypeRegistry::with_builtins();
//! registry.register("my_crate::Money", TypeMapping::inline("string"));
//! registry.register(
//!     "bigdecimal::BigDecimal",
//!     TypeMapping::import("BigDecimal", "vendor/big-decimal.ts").named(),
//! );
//! assert!(registry.contains("my_crate::Money"));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;

use crate::ts::TsTypeReference;

/// What an external type path maps to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeMapping {
    /// TypeScript type text, emitted verbatim.
    Inline(String),
    /// A type exported by a hand-written TypeScript module.
    Import {
        name: String,
        from: PathBuf,
        #[serde(default = "default_import")]
        default: bool,
    },
}

fn default_import() -> bool {
    true
}

impl TypeMapping {
    pub fn inline(ts_type: impl Into<String>) -> Self {
        TypeMapping::Inline(ts_type.into())
    }

    /// A default import of `name` from `from`.
    pub fn import(name: impl Into<String>, from: impl Into<PathBuf>) -> Self {
        TypeMapping::Import {
            name: name.into(),
            from: from.into(),
            default: true,
        }
    }

    /// Turn an import mapping into a named import. Inline mappings are
    /// returned unchanged.
    pub fn named(self) -> Self {
        match self {
            TypeMapping::Import { name, from, .. } => TypeMapping::Import {
                name,
                from,
                default: false,
            },
            inline => inline,
        }
    }

    /// The reference this mapping produces. `base` resolves relative module
    /// paths of imports.
    pub fn to_reference(&self, base: Option<&std::path::Path>) -> TsTypeReference {
        match self {
            TypeMapping::Inline(text) => TsTypeReference::primitive(text.clone()),
            TypeMapping::Import { name, from, default } => {
                let file = match base {
                    Some(base) if from.is_relative() => base.join(from),
                    _ => from.clone(),
                };
                TsTypeReference::imported(name.clone(), file, *default)
            }
        }
    }
}

/// A registry of fully-qualified Rust type path -> [`TypeMapping`] associations.
///
/// Keys never include generic arguments: `chrono::DateTime<Utc>` is looked up
/// as `chrono::DateTime`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    mappings: HashMap<String, TypeMapping>,
}

impl TypeRegistry {
    /// Create an empty registry with no mappings.
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in mappings.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    pub fn register_builtins(&mut self) {
        for path in [
            "uuid::Uuid",
            "chrono::DateTime",
            "chrono::NaiveDate",
            "chrono::NaiveDateTime",
            "chrono::NaiveTime",
            "time::OffsetDateTime",
            "time::Date",
            "url::Url",
            "smol_str::SmolStr",
            "compact_str::CompactString",
        ] {
            self.register(path, TypeMapping::inline("string"));
        }

        self.register("rust_decimal::Decimal", TypeMapping::inline("number"));
        self.register("std::time::Duration", TypeMapping::inline("number"));
        self.register("bytes::Bytes", TypeMapping::inline("number[]"));
        self.register("serde_json::Value", TypeMapping::inline("any"));
    }

    /// Layer the alias-declared mappings of a source graph on top.
    pub fn extend_inline(&mut self, mappings: &BTreeMap<String, String>) {
        for (path, ts_type) in mappings {
            self.register(path.clone(), TypeMapping::inline(ts_type.clone()));
        }
    }

    /// Layer configured mappings on top.
    pub fn extend(&mut self, mappings: &BTreeMap<String, TypeMapping>) {
        for (path, mapping) in mappings {
            self.register(path.clone(), mapping.clone());
        }
    }

    /// Register a mapping for a fully-qualified Rust type path, replacing any
    /// previous one.
    pub fn register(&mut self, name: impl Into<String>, mapping: TypeMapping) {
        self.mappings.insert(name.into(), mapping);
    }

    pub fn get(&self, name: &str) -> Option<&TypeMapping> {
        self.mappings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    pub fn unregister(&mut self, name: &str) -> Option<TypeMapping> {
        self.mappings.remove(name)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
