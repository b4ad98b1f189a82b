//! Per-file `use` analysis and conversion of `syn` types.
//!
//! `use` items are flattened into a map from local name to full path:
//!
//! - `use crate::models::User` maps `"User"` to `"crate::models::User"`
//! - `use super::money::Money as Cash` maps `"Cash"` to `"crate::money::Money"`
//!   (relative to the current module)
//! - glob imports are not tracked
//!
//! Written paths are rewritten through that map and `self`/`super` prefixes
//! are made absolute. Matching against declared types happens later, once
//! every file has been read.

use std::collections::HashMap;

use syn::punctuated::Punctuated;
use syn::{GenericArgument, Item, PathArguments, Token, Type, TypeParamBound, TypePath, UseTree};

use crate::graph::TypeRef;

/// Path given to types that have no TypeScript counterpart. Nothing maps it,
/// so it resolves to `unknown`.
pub(crate) const OPAQUE: &str = "_";

/// Per-module resolution context.
#[derive(Debug, Clone)]
pub(crate) struct SourceContext {
    /// Absolute module path, e.g. `crate::models`.
    pub module: String,
    /// Maps local name -> fully-qualified path.
    imports: HashMap<String, String>,
}

impl SourceContext {
    /// Build a context from the `use` items of one module body.
    pub fn new(module: impl Into<String>, items: &[Item]) -> Self {
        let mut imports = HashMap::new();
        for item in items {
            if let Item::Use(item_use) = item {
                collect_imports(&item_use.tree, &[], &mut imports);
            }
        }
        Self {
            module: module.into(),
            imports,
        }
    }

    pub fn import(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    /// Rewrite a written path through the import map and make `self` and
    /// `super` prefixes absolute.
    pub fn qualify(&self, path: &syn::Path) -> String {
        let mut segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        if path.leading_colon.is_none()
            && let Some(full) = segments.first().and_then(|first| self.imports.get(first))
        {
            let mut expanded: Vec<String> = full.split("::").map(str::to_string).collect();
            expanded.extend(segments.drain(1..));
            segments = expanded;
        }
        absolutize(&segments, &self.module)
    }

    /// Convert a written type. Names in `params` are generic parameters.
    pub fn convert(&self, ty: &Type, params: &[String]) -> TypeRef {
        match ty {
            Type::Path(TypePath { qself: None, path }) => self.convert_path(path, params),
            Type::Reference(r) => self.convert(&r.elem, params),
            Type::Paren(p) => self.convert(&p.elem, params),
            Type::Group(g) => self.convert(&g.elem, params),
            Type::Slice(s) => TypeRef::Slice(Box::new(self.convert(&s.elem, params))),
            Type::Array(a) => TypeRef::Slice(Box::new(self.convert(&a.elem, params))),
            Type::Tuple(t) => {
                TypeRef::Tuple(t.elems.iter().map(|e| self.convert(e, params)).collect())
            }
            // `dyn Trait` and `impl Trait` stand for their first trait bound.
            Type::TraitObject(t) => self.convert_bounds(&t.bounds, params),
            Type::ImplTrait(t) => self.convert_bounds(&t.bounds, params),
            _ => TypeRef::path(OPAQUE),
        }
    }

    fn convert_bounds(
        &self,
        bounds: &Punctuated<TypeParamBound, Token![+]>,
        params: &[String],
    ) -> TypeRef {
        bounds
            .iter()
            .find_map(|bound| match bound {
                TypeParamBound::Trait(t) => Some(self.convert_path(&t.path, params)),
                _ => None,
            })
            .unwrap_or_else(|| TypeRef::path(OPAQUE))
    }

    pub fn convert_path(&self, path: &syn::Path, params: &[String]) -> TypeRef {
        if path.leading_colon.is_none()
            && path.segments.len() == 1
            && let Some(segment) = path.segments.first()
            && segment.arguments.is_empty()
        {
            let name = segment.ident.to_string();
            if params.contains(&name) {
                return TypeRef::Param(name);
            }
        }

        let args = match path.segments.last().map(|s| &s.arguments) {
            Some(PathArguments::AngleBracketed(angle)) => angle
                .args
                .iter()
                .filter_map(|arg| match arg {
                    GenericArgument::Type(ty) => Some(self.convert(ty, params)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        TypeRef::generic(self.qualify(path), args)
    }
}

/// Recursively flatten a `UseTree` into import entries.
fn collect_imports(tree: &UseTree, prefix: &[String], imports: &mut HashMap<String, String>) {
    match tree {
        UseTree::Path(p) => {
            let mut new_prefix = prefix.to_vec();
            new_prefix.push(p.ident.to_string());
            collect_imports(&p.tree, &new_prefix, imports);
        }
        UseTree::Name(n) => {
            let name = n.ident.to_string();
            // `use foo::{self}` imports the module `foo`.
            if name == "self" {
                if let Some(last) = prefix.last() {
                    imports.insert(last.clone(), prefix.join("::"));
                }
                return;
            }
            let full_path = make_full_path(prefix, &name);
            imports.insert(name, full_path);
        }
        UseTree::Rename(r) => {
            let full_path = make_full_path(prefix, &r.ident.to_string());
            imports.insert(r.rename.to_string(), full_path);
        }
        UseTree::Glob(_) => {}
        UseTree::Group(g) => {
            for item in &g.items {
                collect_imports(item, prefix, imports);
            }
        }
    }
}

/// Join prefix segments with the final name using `::`.
fn make_full_path(prefix: &[String], name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}::{}", prefix.join("::"), name)
    }
}

/// Resolve leading `self` and `super` segments against `module`.
fn absolutize(segments: &[String], module: &str) -> String {
    let mut base: Option<Vec<&str>> = None;
    let mut rest = segments;
    while let Some((first, tail)) = rest.split_first() {
        match first.as_str() {
            "self" => {
                base.get_or_insert_with(|| module.split("::").collect());
            }
            "super" => {
                let current = base.get_or_insert_with(|| module.split("::").collect());
                if current.len() > 1 {
                    current.pop();
                }
            }
            _ => break,
        }
        rest = tail;
    }

    match base {
        Some(base) => base
            .into_iter()
            .map(str::to_string)
            .chain(rest.iter().cloned())
            .collect::<Vec<_>>()
            .join("::"),
        None => segments.join("::"),
    }
}
