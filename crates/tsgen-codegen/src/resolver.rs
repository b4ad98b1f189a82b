//! Type reference resolution.
//!
//! [`TypeResolver`] maps a [`TypeRef`] from the source graph onto a
//! [`TsTypeReference`]. It also answers the type-level questions every
//! builder needs (output namespace, whether a type is generated, where its
//! module file lives), so those rules are written down exactly once.
//!
//! Resolution order:
//!
//! | Step | Rule | Result |
//! |------|------|--------|
//! | 1 | `Option<T>` | resolve `T`, mark optional |
//! | 2 | generic parameter | `T` |
//! | 3 | registered external type | mapping, verbatim |
//! | 4 | declared type with a replace directive | literal, or restart on the replacement |
//! | 5 | `Box`, `Rc`, `Arc`, `Cow`, ... | resolve the inner type |
//! | 6 | numbers, text, `bool`, `()` | `number`, `string`, `boolean`, `null` |
//! | 7 | maps, then sequences | `{[item: K]: V}`, `T[]` |
//! | 8 | declared type | bare, `Ns.Name`, or an import of its module file |
//! | 9 | anything else | `unknown` |

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::Config;
use crate::graph::{Attribute, TypeGraph, TypeNode, TypeRef, TypeOverride};
use crate::registry::TypeRegistry;
use crate::ts::TsTypeReference;

/// Replacement chains longer than this resolve to `unknown`.
const MAX_DEPTH: usize = 32;

const NUMBER_TYPES: &[&str] = &[
    "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64", "i128", "isize",
    "f32", "f64", "NonZeroU8", "NonZeroU16", "NonZeroU32", "NonZeroU64", "NonZeroU128",
    "NonZeroUsize", "NonZeroI8", "NonZeroI16", "NonZeroI32", "NonZeroI64", "NonZeroI128",
    "NonZeroIsize", "NonZero",
];

const STRING_TYPES: &[&str] = &["String", "str", "char", "PathBuf", "Path", "OsString", "OsStr"];

const TRANSPARENT_TYPES: &[&str] = &[
    "Box", "Rc", "Arc", "Cow", "RefCell", "Cell", "Mutex", "RwLock",
];

const DICTIONARY_TYPES: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

const ENUMERABLE_TYPES: &[&str] = &[
    "Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet", "BinaryHeap",
];

/// Crates whose well-known type names are recognized by their last segment.
const WELL_KNOWN_ROOTS: &[&str] = &["std", "core", "alloc", "indexmap", "hashbrown"];

/// The file a reference is rendered into.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    /// Namespace of the file being generated; `None` for module files.
    pub namespace: Option<&'a str>,
    /// Reference a type itself even if it owns a derived-type union.
    pub bypass_union: bool,
}

impl<'a> ResolveContext<'a> {
    pub fn new(namespace: Option<&'a str>) -> Self {
        Self {
            namespace,
            bypass_union: false,
        }
    }

    pub fn bypass_union(self) -> Self {
        Self {
            bypass_union: true,
            ..self
        }
    }

    fn with_union(self) -> Self {
        Self {
            bypass_union: false,
            ..self
        }
    }
}

/// Resolves source type references against one graph snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    graph: &'a TypeGraph,
    config: &'a Config,
    registry: &'a TypeRegistry,
}

impl<'a> TypeResolver<'a> {
    pub fn new(graph: &'a TypeGraph, config: &'a Config, registry: &'a TypeRegistry) -> Self {
        Self {
            graph,
            config,
            registry,
        }
    }

    pub fn graph(&self) -> &'a TypeGraph {
        self.graph
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Resolve `ty` as seen from a file in `ctx.namespace`.
    ///
    /// Never fails: anything unrecognized becomes `unknown`.
    pub fn resolve(&self, ty: &TypeRef, ctx: ResolveContext<'_>) -> TsTypeReference {
        self.resolve_at(ty, ctx, 0)
    }

    fn resolve_at(&self, ty: &TypeRef, ctx: ResolveContext<'_>, depth: usize) -> TsTypeReference {
        if depth > MAX_DEPTH {
            return unknown();
        }

        let mut ty = ty;
        let mut optional = false;
        while let Some(inner) = option_inner(ty) {
            ty = inner;
            optional = true;
        }

        let reference = self.resolve_required(ty, ctx, depth);
        if optional {
            reference.with_optional(true)
        } else {
            reference
        }
    }

    fn resolve_required(
        &self,
        ty: &TypeRef,
        ctx: ResolveContext<'_>,
        depth: usize,
    ) -> TsTypeReference {
        let (path, args) = match ty {
            TypeRef::Param(name) => return TsTypeReference::primitive(name.clone()),
            TypeRef::Slice(element) => {
                let element = self.resolve_at(element, ctx.with_union(), depth + 1);
                return TsTypeReference::array(element);
            }
            TypeRef::Tuple(items) if items.is_empty() => return TsTypeReference::primitive("null"),
            TypeRef::Tuple(_) => return unknown(),
            TypeRef::Path { path, args } => (path.as_str(), args.as_slice()),
        };

        if let Some(mapping) = self.registry.get(path) {
            return mapping.to_reference(self.config.base_path.as_deref());
        }

        let declared = self.graph.get(path);
        if let Some(node) = declared
            && let Some(replacement) = node.attrs.replace_type()
        {
            return match replacement {
                TypeOverride::Literal(text) => TsTypeReference::primitive(text.clone()),
                TypeOverride::Type(other) => self.resolve_at(other, ctx, depth + 1),
            };
        }

        if let Some(name) = well_known_name(path) {
            if TRANSPARENT_TYPES.contains(&name)
                && let Some(inner) = args.first()
            {
                return self.resolve_at(inner, ctx, depth + 1);
            }
            if NUMBER_TYPES.contains(&name) {
                return TsTypeReference::primitive("number");
            }
            if STRING_TYPES.contains(&name) {
                return TsTypeReference::primitive("string");
            }
            if name == "bool" {
                return TsTypeReference::primitive("boolean");
            }
            if DICTIONARY_TYPES.contains(&name)
                && let [key, value, ..] = args
            {
                return TsTypeReference::dictionary(
                    self.resolve_at(key, ctx.with_union(), depth + 1),
                    self.resolve_at(value, ctx.with_union(), depth + 1),
                );
            }
            if ENUMERABLE_TYPES.contains(&name)
                && let Some(element) = args.first()
            {
                let element = self.resolve_at(element, ctx.with_union(), depth + 1);
                return TsTypeReference::array(element);
            }
        }

        match declared {
            Some(node) => self.resolve_declared(node, args, ctx, depth),
            None => unknown(),
        }
    }

    fn resolve_declared(
        &self,
        node: &TypeNode,
        args: &[TypeRef],
        ctx: ResolveContext<'_>,
        depth: usize,
    ) -> TsTypeReference {
        let node = self.augment_target(node).unwrap_or(node);
        let union = if ctx.bypass_union {
            None
        } else {
            self.union_name(node)
        };

        let base = match self.namespace_of(node) {
            Some(ns) => {
                let name = union.unwrap_or_else(|| node.name.clone());
                if ctx.namespace == Some(ns) {
                    TsTypeReference::named(name)
                } else {
                    TsTypeReference::named(format!("{ns}.{name}"))
                }
            }
            None => match self.module_file(node) {
                Some(file) => match union {
                    Some(union) => TsTypeReference::imported(union, file, false),
                    None => TsTypeReference::imported(node.name.clone(), file, true),
                },
                None => return unknown(),
            },
        };

        if args.is_empty() {
            base
        } else {
            let args = args
                .iter()
                .map(|arg| self.resolve_at(arg, ctx.with_union(), depth + 1))
                .collect();
            TsTypeReference::generic(base, args)
        }
    }

    /// The type whose declaration `node` completes, when it carries the
    /// augment directive: its base, else its first interface.
    pub fn augment_target(&self, node: &TypeNode) -> Option<&'a TypeNode> {
        if !node.attrs.contains(&Attribute::AugmentParent) {
            return None;
        }
        node.base
            .iter()
            .chain(node.interfaces.iter())
            .next()
            .and_then(|target| self.graph.lookup(target))
            .filter(|target| target.id != node.id)
    }

    /// Output namespace of a type.
    ///
    /// Augmenting types live with their parent. Otherwise the first
    /// namespace directive on the type or its enclosing types wins, then the
    /// module-level namespace from the config.
    pub fn namespace_of(&self, node: &TypeNode) -> Option<&'a str> {
        let node = match self.augment_target(node) {
            Some(parent) => parent,
            None => self.graph.get(&node.id)?,
        };
        self.graph
            .enclosing_chain(node)
            .into_iter()
            .find_map(|t| t.attrs.namespace())
            .or_else(|| self.config.namespace_for_module(&node.module))
    }

    /// Whether a declaration is generated: the first explicit switch on the
    /// type or its enclosing types decides, and a namespace directive
    /// implies generation.
    pub fn should_generate(&self, node: &TypeNode) -> bool {
        let Some(node) = self.graph.get(&node.id) else {
            return false;
        };
        for t in self.graph.enclosing_chain(node) {
            if let Some(generate) = t.attrs.generate() {
                return generate;
            }
            if t.attrs.namespace().is_some() {
                return true;
            }
        }
        false
    }

    /// Derived-type union alias of a type, if it has one.
    pub fn union_name(&self, node: &TypeNode) -> Option<String> {
        node.attrs.derived_union().map(|name| match name {
            Some(name) => name.to_string(),
            None => format!("{}Types", node.name),
        })
    }

    /// Absolute module-file path of a type without a namespace.
    pub fn module_file(&self, node: &TypeNode) -> Option<PathBuf> {
        self.graph
            .declared_output_path(node)
            .map(|path| self.config.output_dir().join(path))
    }

    /// Absolute path of a namespace file.
    pub fn namespace_file(&self, namespace: &str) -> PathBuf {
        self.config.output_dir().join(format!("{namespace}.d.ts"))
    }

    /// Discriminant member name. Concrete types only; the directive is
    /// inherited from the base chain.
    pub fn type_member_name(&self, node: &TypeNode) -> Option<String> {
        if node.is_abstract {
            return None;
        }
        std::iter::once(node)
            .chain(self.graph.base_chain(node))
            .find_map(|t| t.attrs.type_member())
            .map(|name| name.unwrap_or("$type").to_string())
    }

    /// Generic wrapper applied to every member of `node`.
    pub fn member_wrapper(&self, node: &TypeNode) -> Option<&'a str> {
        let related: Vec<&TypeNode> = std::iter::once(self.graph.get(&node.id)?)
            .chain(self.graph.base_chain(node))
            .chain(self.graph.all_interfaces(self.graph.get(&node.id)?))
            .collect();

        if let Some(wrapper) = related.iter().find_map(|t| t.attrs.wrap_members()) {
            return Some(wrapper);
        }

        let wrapper = self.config.member_wrapper_type.as_deref()?;
        related
            .iter()
            .any(|t| {
                self.config
                    .types_to_wrap_members_for
                    .iter()
                    .any(|entry| *entry == t.id || *entry == t.name)
            })
            .then_some(wrapper)
    }

    /// Whether `@SourceTypeName` tags are emitted for a type.
    pub fn type_names_doc(&self, node: &TypeNode) -> bool {
        self.config.type_names_doc
            || self
                .graph
                .enclosing_chain(node)
                .iter()
                .any(|t| t.attrs.contains(&Attribute::TypeNamesDoc))
    }

    /// The closest interface or base type marked canonical, searching
    /// interfaces before the base at every level.
    pub fn canonical_type(&self, node: &TypeNode) -> Option<&'a TypeNode> {
        let mut visited = HashSet::new();
        self.find_canonical(node, &mut visited)
    }

    fn find_canonical(
        &self,
        node: &TypeNode,
        visited: &mut HashSet<String>,
    ) -> Option<&'a TypeNode> {
        for parent_ref in node.interfaces.iter().chain(node.base.iter()) {
            let Some(parent) = self.graph.lookup(parent_ref) else {
                continue;
            };
            if !visited.insert(parent.id.clone()) {
                continue;
            }
            if parent.attrs.contains(&Attribute::Canonical) {
                return Some(parent);
            }
            if let Some(found) = self.find_canonical(parent, visited) {
                return Some(found);
            }
        }
        None
    }
}

fn unknown() -> TsTypeReference {
    TsTypeReference::primitive("unknown")
}

fn option_inner(ty: &TypeRef) -> Option<&TypeRef> {
    match ty {
        TypeRef::Path { path, args }
            if args.len() == 1 && well_known_name(path) == Some("Option") =>
        {
            args.first()
        }
        _ => None,
    }
}

/// The bare name of a standard or well-known collection type, if `path`
/// refers to one: either a single segment or a path rooted in a known crate.
fn well_known_name(path: &str) -> Option<&str> {
    match path.split_once("::") {
        None => Some(path),
        Some((root, _)) if WELL_KNOWN_ROOTS.contains(&root) => path.rsplit("::").next(),
        Some(_) => None,
    }
}
