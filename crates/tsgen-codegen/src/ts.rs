//! TypeScript intermediate representation.
//!
//! [`TsTypeReference`] is what a source type resolves to; [`TsTypeDefinition`]
//! is one generated declaration. Both are plain values, rebuilt on every pass.

use std::path::{Path, PathBuf};

use crate::imports::{ImportKey, ImportMapping};

/// Name of the nested namespace that holds module imports inside a
/// `declare namespace` block.
pub const IMPORTED_MODULES_NAMESPACE: &str = "__ImportedModules";

/// A reference to a TypeScript type.
///
/// Optionality lives on the reference itself; composites render an optional
/// element inline as `T | undefined`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TsTypeReference {
    /// A TypeScript keyword or verbatim type text.
    Primitive { name: String, optional: bool },
    /// Another generated type, bare or namespace-qualified.
    Named { name: String, optional: bool },
    /// A type that lives in another module file and must be imported.
    Imported {
        name: String,
        source_file: PathBuf,
        default_import: bool,
        optional: bool,
    },
    Array {
        element: Box<TsTypeReference>,
        optional: bool,
    },
    Dictionary {
        key: Box<TsTypeReference>,
        value: Box<TsTypeReference>,
        optional: bool,
    },
    Generic {
        base: Box<TsTypeReference>,
        args: Vec<TsTypeReference>,
        optional: bool,
    },
}

impl TsTypeReference {
    pub fn primitive(name: impl Into<String>) -> Self {
        TsTypeReference::Primitive {
            name: name.into(),
            optional: false,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TsTypeReference::Named {
            name: name.into(),
            optional: false,
        }
    }

    pub fn imported(
        name: impl Into<String>,
        source_file: impl Into<PathBuf>,
        default_import: bool,
    ) -> Self {
        TsTypeReference::Imported {
            name: name.into(),
            source_file: source_file.into(),
            default_import,
            optional: false,
        }
    }

    pub fn array(element: TsTypeReference) -> Self {
        TsTypeReference::Array {
            element: Box::new(element),
            optional: false,
        }
    }

    pub fn dictionary(key: TsTypeReference, value: TsTypeReference) -> Self {
        TsTypeReference::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
            optional: false,
        }
    }

    pub fn generic(base: TsTypeReference, args: Vec<TsTypeReference>) -> Self {
        TsTypeReference::Generic {
            base: Box::new(base),
            args,
            optional: false,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            TsTypeReference::Primitive { optional, .. }
            | TsTypeReference::Named { optional, .. }
            | TsTypeReference::Imported { optional, .. }
            | TsTypeReference::Array { optional, .. }
            | TsTypeReference::Dictionary { optional, .. }
            | TsTypeReference::Generic { optional, .. } => *optional,
        }
    }

    /// The same reference with its optional flag set to `value`.
    pub fn with_optional(mut self, value: bool) -> Self {
        match &mut self {
            TsTypeReference::Primitive { optional, .. }
            | TsTypeReference::Named { optional, .. }
            | TsTypeReference::Imported { optional, .. }
            | TsTypeReference::Array { optional, .. }
            | TsTypeReference::Dictionary { optional, .. }
            | TsTypeReference::Generic { optional, .. } => *optional = value,
        }
        self
    }

    /// Every `Imported` reference reachable from this one, depth first.
    pub fn imports(&self) -> Vec<&TsTypeReference> {
        let mut out = Vec::new();
        self.collect_imports(&mut out);
        out
    }

    fn collect_imports<'a>(&'a self, out: &mut Vec<&'a TsTypeReference>) {
        match self {
            TsTypeReference::Primitive { .. } | TsTypeReference::Named { .. } => {}
            TsTypeReference::Imported { .. } => out.push(self),
            TsTypeReference::Array { element, .. } => element.collect_imports(out),
            TsTypeReference::Dictionary { key, value, .. } => {
                key.collect_imports(out);
                value.collect_imports(out);
            }
            TsTypeReference::Generic { base, args, .. } => {
                base.collect_imports(out);
                for arg in args {
                    arg.collect_imports(out);
                }
            }
        }
    }

    /// Render the reference as TypeScript type text. Top-level optionality
    /// is left to the caller.
    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        match self {
            TsTypeReference::Primitive { name, .. } | TsTypeReference::Named { name, .. } => {
                name.clone()
            }
            TsTypeReference::Imported {
                name,
                source_file,
                default_import,
                ..
            } => ctx.imported_name(source_file, name, *default_import),
            TsTypeReference::Array { element, .. } => {
                if element.is_optional() {
                    format!("({} | undefined)[]", element.render(ctx))
                } else {
                    format!("{}[]", element.render(ctx))
                }
            }
            TsTypeReference::Dictionary { key, value, .. } => {
                format!("{{[item: {}]: {}}}", key.render(ctx), render_inline(value, ctx))
            }
            TsTypeReference::Generic { base, args, .. } => {
                let args: Vec<_> = args.iter().map(|a| render_inline(a, ctx)).collect();
                format!("{}<{}>", base.render(ctx), args.join(", "))
            }
        }
    }
}

fn render_inline(reference: &TsTypeReference, ctx: &RenderContext<'_>) -> String {
    let text = reference.render(ctx);
    if reference.is_optional() {
        format!("{text} | undefined")
    } else {
        text
    }
}

/// What a reference needs to know about the file it is rendered into.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub namespace_file: bool,
    pub imports: &'a ImportMapping,
}

impl<'a> RenderContext<'a> {
    pub fn new(namespace_file: bool, imports: &'a ImportMapping) -> Self {
        Self {
            namespace_file,
            imports,
        }
    }

    fn imported_name(&self, source_file: &Path, name: &str, default_import: bool) -> String {
        let key = ImportKey::new(source_file, (!default_import).then_some(name));
        let local = self.imports.alias(&key).unwrap_or(name);
        if self.namespace_file {
            format!("{IMPORTED_MODULES_NAMESPACE}.{local}")
        } else {
            local.to_string()
        }
    }
}

/// Doc comment attached to a declaration or member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// De-indented comment text.
    pub lines: Vec<String>,
    /// Tag lines such as `@deprecated`.
    pub tags: Vec<String>,
}

impl DocComment {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.tags.is_empty()
    }
}

/// One member of a generated interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsInterfaceMember {
    pub name: String,
    pub ty: TsTypeReference,
    /// Explicitly optional, independent of the type's own optionality.
    pub is_optional: bool,
    pub doc: Option<DocComment>,
}

/// A derived-type union emitted next to its owning interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedUnion {
    pub name: String,
    pub members: Vec<TsTypeReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDefinition {
    pub name: String,
    pub type_params: Vec<String>,
    pub extends: Vec<TsTypeReference>,
    pub members: Vec<TsInterfaceMember>,
    pub derived_union: Option<DerivedUnion>,
    /// Discriminant member name, for concrete types.
    pub discriminant: Option<String>,
    pub must_be_subset_of: Vec<TsTypeReference>,
    pub doc: Option<DocComment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub members: Vec<String>,
    pub is_const: bool,
    pub doc: Option<DocComment>,
}

/// One generated declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsTypeDefinition {
    Interface(InterfaceDefinition),
    Enum(EnumDefinition),
}

impl TsTypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TsTypeDefinition::Interface(def) => &def.name,
            TsTypeDefinition::Enum(def) => &def.name,
        }
    }

    /// Every reference that may need an import, in member, extends,
    /// derived-union, subset order.
    pub fn references(&self) -> Vec<&TsTypeReference> {
        match self {
            TsTypeDefinition::Interface(def) => def
                .members
                .iter()
                .map(|m| &m.ty)
                .chain(def.extends.iter())
                .chain(def.derived_union.iter().flat_map(|u| u.members.iter()))
                .chain(def.must_be_subset_of.iter())
                .collect(),
            TsTypeDefinition::Enum(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(reference: &TsTypeReference) -> String {
        let imports = ImportMapping::default();
        reference.render(&RenderContext::new(false, &imports))
    }

    #[test]
    fn test_array_of_optional_element() {
        let reference =
            TsTypeReference::array(TsTypeReference::primitive("number").with_optional(true));
        assert_eq!(render(&reference), "(number | undefined)[]");
        assert!(!reference.is_optional());
    }

    #[test]
    fn test_dictionary_rendering() {
        let reference = TsTypeReference::dictionary(
            TsTypeReference::primitive("string"),
            TsTypeReference::primitive("boolean"),
        );
        assert_eq!(render(&reference), "{[item: string]: boolean}");

        let optional_value = TsTypeReference::dictionary(
            TsTypeReference::primitive("number"),
            TsTypeReference::named("User").with_optional(true),
        );
        assert_eq!(render(&optional_value), "{[item: number]: User | undefined}");
    }

    #[test]
    fn test_generic_rendering() {
        let reference = TsTypeReference::generic(
            TsTypeReference::named("Api.Page"),
            vec![
                TsTypeReference::named("User"),
                TsTypeReference::primitive("string").with_optional(true),
            ],
        );
        assert_eq!(render(&reference), "Api.Page<User, string | undefined>");
    }

    #[test]
    fn test_imported_in_namespace_file_uses_nested_namespace() {
        let mut imports = ImportMapping::default();
        let reference = TsTypeReference::imported("Money", "/out/Money.type.ts", true);
        imports.assign_all([&reference]);

        let text = reference.render(&RenderContext::new(true, &imports));
        assert_eq!(text, "__ImportedModules.Money");
        let text = reference.render(&RenderContext::new(false, &imports));
        assert_eq!(text, "Money");
    }

    #[test]
    fn test_imports_are_collected_depth_first() {
        let a = TsTypeReference::imported("A", "/a.type.ts", true);
        let b = TsTypeReference::imported("B", "/b.type.ts", true);
        let reference =
            TsTypeReference::generic(a.clone(), vec![TsTypeReference::array(b.clone())]);
        assert_eq!(reference.imports(), vec![&a, &b]);
    }
}
