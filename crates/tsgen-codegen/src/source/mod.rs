//! Rust source provider.
//!
//! Scans Rust files with `syn` and builds a [`TypeGraph`]:
//!
//! | Item | Becomes |
//! |------|---------|
//! | `#[derive(TypeScript)] struct` | class (or struct/record via `#[ts(kind = ..)]`) |
//! | `#[derive(TypeScript)] enum` | enum, variant names only |
//! | `#[typescript] trait` | interface; `fn x(&self) -> T` methods are members |
//! | `impl Trait for Type` | adds `Trait` to `Type`'s interfaces |
//! | `impl Type { pub const .. }` | constant members |
//! | `type Alias = ..` | expanded where used |
//! | `#[typescript(type = "..")] type Alias = ..` | external type mapping |
//!
//! Files are parsed one at a time into plain declarations. Building the graph
//! then matches every written path against the declared types of all files,
//! so declarations can reference each other across files in any order.

mod attrs;
mod types;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use syn::ext::IdentExt;
use syn::{Fields, FnArg, ImplItem, Item, ReturnType, TraitItem, TypeParamBound, Visibility};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::graph::{
    Attribute, Attributes, MemberNode, TypeGraph, TypeKind, TypeNode, TypeOverride, TypeRef,
};
use crate::watch::{ChangeScope, TypeGraphSource};

use attrs::{
    Directive, deprecation, directives, doc_lines, has_marker_derive, has_typescript_attr,
    literal, other_attributes, serde_attributes,
};
use types::SourceContext;

/// Alias chains longer than this are left unexpanded.
const MAX_ALIAS_DEPTH: usize = 16;

/// Declarations read from one file, with paths qualified but not yet
/// matched against other files.
#[derive(Debug, Clone, Default)]
struct FileItems {
    types: Vec<TypeNode>,
    impls: Vec<ImplBlock>,
    aliases: Vec<AliasDecl>,
    mappings: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct ImplBlock {
    module: String,
    self_path: String,
    interface: Option<TypeRef>,
    /// The impl block carries `#[typescript]`.
    annotated: bool,
    constants: Vec<MemberNode>,
}

#[derive(Debug, Clone)]
struct AliasDecl {
    id: String,
    module: String,
    params: Vec<String>,
    target: TypeRef,
}

/// Where one file's declarations come from and go to.
struct FileInfo<'a> {
    source_file: &'a Path,
    output_dir: &'a Path,
}

/// A set of parsed source files.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: BTreeMap<PathBuf, FileItems>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Add source text as the file at `rel_path` under the source root.
    pub fn add_str(&mut self, rel_path: &Path, source: &str) -> Result<()> {
        self.insert(rel_path.to_path_buf(), rel_path, source)
    }

    /// Read and add `path`, placed relative to `root`.
    pub fn add_file(&mut self, root: &Path, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => PathBuf::from(path.file_name().unwrap_or_default()),
        };
        self.insert(path.to_path_buf(), &rel, &source)
    }

    /// Add every `.rs` file under `root`, skipping `target/` and hidden
    /// directories.
    pub fn add_dir(&mut self, root: &Path) -> Result<()> {
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));
        for entry in walker {
            let entry = entry.map_err(|source| Error::Walk {
                path: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "rs") {
                self.add_file(root, entry.path())?;
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path).is_some()
    }

    fn insert(&mut self, key: PathBuf, rel: &Path, source: &str) -> Result<()> {
        let parse_error = |source: syn::Error| Error::Parse {
            path: key.clone(),
            source,
        };
        let file = syn::parse_file(source).map_err(parse_error)?;
        let output_dir = rel.parent().unwrap_or_else(|| Path::new(""));
        let info = FileInfo {
            source_file: &key,
            output_dir,
        };
        let ctx = SourceContext::new(module_path(rel), &file.items);
        let mut items = FileItems::default();
        extract_items(&file.items, &ctx, &info, &mut items).map_err(parse_error)?;
        self.files.insert(key, items);
        Ok(())
    }

    /// Match every written path against the declared types and build the
    /// snapshot.
    pub fn build_graph(&self) -> TypeGraph {
        let mut canon = Canonicalizer::default();
        for items in self.files.values() {
            for node in &items.types {
                canon.declare(&node.id);
            }
            for (id, _) in &items.mappings {
                canon.declare(id);
            }
            for alias in &items.aliases {
                canon.declare(&alias.id);
                canon.aliases.insert(alias.id.clone(), alias.clone());
            }
        }

        let mut nodes: IndexMap<String, TypeNode> = IndexMap::new();
        for items in self.files.values() {
            for node in &items.types {
                let node = canon.node(node);
                nodes.insert(node.id.clone(), node);
            }
        }

        for block in self.files.values().flat_map(|items| &items.impls) {
            let Some(id) = canon.lookup(&block.self_path, &block.module) else {
                continue;
            };
            let Some(node) = nodes.get_mut(&id) else {
                continue;
            };
            if let Some(interface) = &block.interface {
                let interface = canon.canonical(interface, &block.module, 0);
                let declared = interface.path_str().is_some_and(|p| canon.is_declared(p));
                if (declared || block.annotated) && !node.interfaces.contains(&interface) {
                    node.interfaces.push(interface);
                }
            }
            for constant in &block.constants {
                let constant = canon.member(constant, &block.module);
                node.members.push(constant);
            }
        }

        let mut graph = TypeGraph::new();
        for node in nodes.into_values() {
            graph.insert(node);
        }
        for (id, ts_type) in self.files.values().flat_map(|items| &items.mappings) {
            graph.add_external_mapping(id.clone(), ts_type.clone());
        }
        graph
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "target" || name.starts_with('.'))
}

/// Module path of a file relative to the source root: `lib.rs` and
/// `main.rs` at the root and `mod.rs` anywhere name their directory.
fn module_path(rel: &Path) -> String {
    let components: Vec<String> = rel
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let mut segments = vec!["crate".to_string()];
    for (i, segment) in components.iter().enumerate() {
        let last = i + 1 == components.len();
        let root_file = i == 0 && (segment == "lib" || segment == "main");
        if last && (segment == "mod" || root_file) {
            continue;
        }
        segments.push(segment.clone());
    }
    segments.join("::")
}

fn extract_items(
    items: &[Item],
    ctx: &SourceContext,
    info: &FileInfo<'_>,
    out: &mut FileItems,
) -> syn::Result<()> {
    for item in items {
        match item {
            Item::Struct(s)
                if has_marker_derive(&s.attrs, ctx) || has_typescript_attr(&s.attrs) =>
            {
                out.types.push(struct_node(s, ctx, info)?);
            }
            Item::Enum(e) if has_marker_derive(&e.attrs, ctx) || has_typescript_attr(&e.attrs) => {
                out.types.push(enum_node(e, ctx, info)?);
            }
            Item::Trait(t) if has_typescript_attr(&t.attrs) => {
                out.types.push(trait_node(t, ctx, info)?);
            }
            Item::Impl(i) => {
                if let Some(block) = impl_block(i, ctx)? {
                    out.impls.push(block);
                }
            }
            Item::Type(t) => alias(t, ctx, out)?,
            Item::Mod(m) => {
                if let Some((_, content)) = &m.content {
                    let module = format!("{}::{}", ctx.module, m.ident.unraw());
                    let child = SourceContext::new(module, content);
                    extract_items(content, &child, info, out)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn type_params(generics: &syn::Generics) -> Vec<String> {
    generics.type_params().map(|p| p.ident.to_string()).collect()
}

fn new_node(
    ident: &syn::Ident,
    kind: TypeKind,
    generics: &syn::Generics,
    ctx: &SourceContext,
    info: &FileInfo<'_>,
) -> TypeNode {
    let mut node = TypeNode::new(format!("{}::{}", ctx.module, ident.unraw()), kind);
    node.type_params = type_params(generics);
    node.source_file = Some(info.source_file.to_path_buf());
    node.output_path = Some(info.output_dir.join(format!("{}.type.ts", node.name)));
    node
}

fn apply_type_attrs(
    node: &mut TypeNode,
    attrs: &[syn::Attribute],
    ctx: &SourceContext,
) -> syn::Result<()> {
    let marked = has_marker_derive(attrs, ctx) || has_typescript_attr(attrs);
    for directive in directives(attrs)? {
        match directive {
            Directive::Attr(attr) => node.attrs.push(attr),
            Directive::Extends(ty) => node.base = Some(ctx.convert(&ty, &node.type_params)),
            Directive::ReplaceWith(ty) => node.attrs.push(Attribute::ReplaceType(
                TypeOverride::Type(ctx.convert(&ty, &node.type_params)),
            )),
            Directive::Kind(kind) => node.kind = kind,
            Directive::Abstract => node.is_abstract = true,
        }
    }
    if let Some(deprecated) = deprecation(attrs) {
        node.attrs.push(deprecated);
    }
    for other in other_attributes(attrs) {
        node.attrs.push(other);
    }
    // Explicit `generate = false` comes first and wins.
    if marked {
        node.attrs.push(Attribute::Generate(true));
    }
    node.doc = doc_lines(attrs);
    Ok(())
}

fn apply_member_attrs(
    member: &mut MemberNode,
    attrs: &[syn::Attribute],
    ctx: &SourceContext,
    params: &[String],
) -> syn::Result<()> {
    for directive in directives(attrs)? {
        match directive {
            Directive::Attr(attr) => member.attrs.push(attr),
            Directive::ReplaceWith(ty) => member
                .attrs
                .push(Attribute::ReplaceType(TypeOverride::Type(ctx.convert(&ty, params)))),
            // Type-level directives have no meaning on members.
            Directive::Extends(_) | Directive::Kind(_) | Directive::Abstract => {}
        }
    }
    for attr in serde_attributes(attrs)
        .into_iter()
        .chain(deprecation(attrs))
        .chain(other_attributes(attrs))
    {
        member.attrs.push(attr);
    }
    member.doc = doc_lines(attrs);
    Ok(())
}

fn struct_node(
    s: &syn::ItemStruct,
    ctx: &SourceContext,
    info: &FileInfo<'_>,
) -> syn::Result<TypeNode> {
    let mut node = new_node(&s.ident, TypeKind::Class, &s.generics, ctx, info);
    apply_type_attrs(&mut node, &s.attrs, ctx)?;

    // Tuple and unit structs have no members.
    if let Fields::Named(named) = &s.fields {
        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let ty = ctx.convert(&field.ty, &node.type_params);
            let mut member = MemberNode::field(ident.unraw().to_string(), ty);
            member.is_public = matches!(field.vis, Visibility::Public(_));
            apply_member_attrs(&mut member, &field.attrs, ctx, &node.type_params)?;
            node.members.push(member);
        }
    }
    Ok(node)
}

fn enum_node(e: &syn::ItemEnum, ctx: &SourceContext, info: &FileInfo<'_>) -> syn::Result<TypeNode> {
    let mut node = new_node(&e.ident, TypeKind::Enum, &e.generics, ctx, info);
    apply_type_attrs(&mut node, &e.attrs, ctx)?;
    node.kind = TypeKind::Enum;

    for variant in &e.variants {
        let mut skipped: Attributes = serde_attributes(&variant.attrs).into_iter().collect();
        for directive in directives(&variant.attrs)? {
            if let Directive::Attr(attr) = directive {
                skipped.push(attr);
            }
        }
        if skipped.contains(&Attribute::Ignore) || skipped.contains(&Attribute::DataIgnore) {
            continue;
        }
        node.variants.push(variant.ident.unraw().to_string());
    }
    Ok(node)
}

fn trait_node(
    t: &syn::ItemTrait,
    ctx: &SourceContext,
    info: &FileInfo<'_>,
) -> syn::Result<TypeNode> {
    let mut node = new_node(&t.ident, TypeKind::Interface, &t.generics, ctx, info);
    apply_type_attrs(&mut node, &t.attrs, ctx)?;

    for bound in &t.supertraits {
        if let TypeParamBound::Trait(bound) = bound {
            node.interfaces.push(ctx.convert_path(&bound.path, &node.type_params));
        }
    }

    for item in &t.items {
        let TraitItem::Fn(method) = item else {
            continue;
        };
        let Some(ty) = getter_type(&method.sig) else {
            continue;
        };
        let mut member = MemberNode::property(
            method.sig.ident.unraw().to_string(),
            ctx.convert(ty, &node.type_params),
        );
        member.has_default = method.default.is_some();
        apply_member_attrs(&mut member, &method.attrs, ctx, &node.type_params)?;
        node.members.push(member);
    }
    Ok(node)
}

/// Return type of a `fn name(&self) -> T` getter.
fn getter_type(sig: &syn::Signature) -> Option<&syn::Type> {
    let takes_only_self =
        sig.inputs.len() == 1 && matches!(sig.inputs.first(), Some(FnArg::Receiver(_)));
    if !takes_only_self || !sig.generics.params.is_empty() {
        return None;
    }
    match &sig.output {
        ReturnType::Type(_, ty) => Some(&**ty),
        ReturnType::Default => None,
    }
}

fn impl_block(i: &syn::ItemImpl, ctx: &SourceContext) -> syn::Result<Option<ImplBlock>> {
    let syn::Type::Path(self_ty) = &*i.self_ty else {
        return Ok(None);
    };
    let params = type_params(&i.generics);

    let interface = match &i.trait_ {
        Some((Some(_negative), _, _)) => return Ok(None),
        Some((None, path, _)) => Some(ctx.convert_path(path, &params)),
        None => None,
    };

    let mut constants = Vec::new();
    for item in &i.items {
        let ImplItem::Const(c) = item else {
            continue;
        };
        if !matches!(c.vis, Visibility::Public(_)) && interface.is_none() {
            continue;
        }
        let Some(value) = literal(&c.expr) else {
            continue;
        };
        let mut member =
            MemberNode::constant(c.ident.unraw().to_string(), ctx.convert(&c.ty, &params), value);
        apply_member_attrs(&mut member, &c.attrs, ctx, &params)?;
        constants.push(member);
    }

    if interface.is_none() && constants.is_empty() {
        return Ok(None);
    }
    Ok(Some(ImplBlock {
        module: ctx.module.clone(),
        self_path: ctx.qualify(&self_ty.path),
        interface,
        annotated: has_typescript_attr(&i.attrs),
        constants,
    }))
}

fn alias(t: &syn::ItemType, ctx: &SourceContext, out: &mut FileItems) -> syn::Result<()> {
    let id = format!("{}::{}", ctx.module, t.ident.unraw());
    for directive in directives(&t.attrs)? {
        if let Directive::Attr(Attribute::ReplaceType(TypeOverride::Literal(ts_type))) = directive {
            out.mappings.push((id, ts_type));
            return Ok(());
        }
    }
    let params = type_params(&t.generics);
    out.aliases.push(AliasDecl {
        id,
        module: ctx.module.clone(),
        target: ctx.convert(&t.ty, &params),
        params,
    });
    Ok(())
}

/// Matches qualified paths against every declared type.
#[derive(Debug, Default)]
struct Canonicalizer {
    declared: HashSet<String>,
    /// Last path segment -> declared ids with that name.
    by_name: HashMap<String, Vec<String>>,
    aliases: HashMap<String, AliasDecl>,
}

impl Canonicalizer {
    fn declare(&mut self, id: &str) {
        if self.declared.insert(id.to_string()) {
            let name = id.rsplit("::").next().unwrap_or(id);
            self.by_name.entry(name.to_string()).or_default().push(id.to_string());
        }
    }

    fn is_declared(&self, id: &str) -> bool {
        self.declared.contains(id)
    }

    /// The declared id a written path refers to from `module`:
    ///
    /// 1. the path itself
    /// 2. the path relative to `module`
    /// 3. the path with its crate name replaced by `crate`
    /// 4. for a bare name, the only declared type with that name
    fn lookup(&self, path: &str, module: &str) -> Option<String> {
        if self.is_declared(path) {
            return Some(path.to_string());
        }
        let local = format!("{module}::{path}");
        if self.is_declared(&local) {
            return Some(local);
        }
        if let Some((first, rest)) = path.split_once("::")
            && first != "crate"
        {
            let own = format!("crate::{rest}");
            if self.is_declared(&own) {
                return Some(own);
            }
        }
        if !path.contains("::")
            && let Some([only]) = self.by_name.get(path).map(Vec::as_slice)
        {
            return Some(only.clone());
        }
        None
    }

    fn canonical(&self, ty: &TypeRef, module: &str, depth: usize) -> TypeRef {
        match ty {
            TypeRef::Path { path, args } => {
                let args: Vec<TypeRef> =
                    args.iter().map(|a| self.canonical(a, module, depth)).collect();
                let Some(id) = self.lookup(path, module) else {
                    return TypeRef::generic(path.clone(), args);
                };
                match self.aliases.get(&id) {
                    Some(alias) if depth < MAX_ALIAS_DEPTH => {
                        let expanded = substitute(&alias.target, &alias.params, &args);
                        self.canonical(&expanded, &alias.module, depth + 1)
                    }
                    _ => TypeRef::generic(id, args),
                }
            }
            TypeRef::Param(_) => ty.clone(),
            TypeRef::Slice(inner) => TypeRef::Slice(Box::new(self.canonical(inner, module, depth))),
            TypeRef::Tuple(elems) => {
                TypeRef::Tuple(elems.iter().map(|e| self.canonical(e, module, depth)).collect())
            }
        }
    }

    fn attrs(&self, attrs: &Attributes, module: &str) -> Attributes {
        attrs
            .iter()
            .map(|attr| match attr {
                Attribute::ReplaceType(TypeOverride::Type(ty)) => {
                    Attribute::ReplaceType(TypeOverride::Type(self.canonical(ty, module, 0)))
                }
                other => other.clone(),
            })
            .collect()
    }

    fn member(&self, member: &MemberNode, module: &str) -> MemberNode {
        MemberNode {
            ty: self.canonical(&member.ty, module, 0),
            attrs: self.attrs(&member.attrs, module),
            ..member.clone()
        }
    }

    fn node(&self, node: &TypeNode) -> TypeNode {
        let module = node.module.as_str();
        let interfaces = node
            .interfaces
            .iter()
            .map(|i| self.canonical(i, module, 0))
            // Supertraits such as `Send` or `Debug` have no declaration.
            .filter(|i| i.path_str().is_some_and(|p| self.is_declared(p)))
            .collect();
        TypeNode {
            base: node.base.as_ref().map(|b| self.canonical(b, module, 0)),
            interfaces,
            members: node.members.iter().map(|m| self.member(m, module)).collect(),
            attrs: self.attrs(&node.attrs, module),
            ..node.clone()
        }
    }
}

/// Replace alias parameters with the arguments of a use site.
fn substitute(ty: &TypeRef, params: &[String], args: &[TypeRef]) -> TypeRef {
    match ty {
        TypeRef::Param(name) => params
            .iter()
            .position(|p| p == name)
            .and_then(|i| args.get(i))
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        TypeRef::Path { path, args: inner } => TypeRef::generic(
            path.clone(),
            inner.iter().map(|a| substitute(a, params, args)).collect(),
        ),
        TypeRef::Slice(inner) => TypeRef::Slice(Box::new(substitute(inner, params, args))),
        TypeRef::Tuple(elems) => {
            TypeRef::Tuple(elems.iter().map(|e| substitute(e, params, args)).collect())
        }
    }
}

/// A [`TypeGraphSource`] over a directory of Rust sources.
#[derive(Debug, Clone)]
pub struct RustSource {
    root: PathBuf,
    config_file: Option<PathBuf>,
    sources: SourceSet,
}

impl RustSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_file: None,
            sources: SourceSet::new(),
        }
    }

    /// Treat changes to `path` like workspace changes.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TypeGraphSource for RustSource {
    fn classify(&self, path: &Path) -> ChangeScope {
        if path.file_name().is_some_and(|name| name == "Cargo.toml")
            || self.config_file.as_deref() == Some(path)
        {
            return ChangeScope::Reload;
        }
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return ChangeScope::Ignore;
        };
        let in_skipped_dir = rel.components().any(|c| match c {
            Component::Normal(s) => s == "target" || s.to_string_lossy().starts_with('.'),
            _ => false,
        });
        if path.extension().is_some_and(|e| e == "rs") && !in_skipped_dir {
            ChangeScope::SourceFile
        } else {
            ChangeScope::Ignore
        }
    }

    fn load(&mut self) -> Result<TypeGraph> {
        if !self.root.is_dir() {
            return Err(Error::Load(format!(
                "source root {} is not a directory",
                self.root.display()
            )));
        }
        let mut sources = SourceSet::new();
        sources.add_dir(&self.root)?;
        self.sources = sources;
        Ok(self.sources.build_graph())
    }

    fn reload_file(&mut self, path: &Path) -> Result<TypeGraph> {
        if path.is_file() {
            self.sources.add_file(&self.root, path)?;
        } else {
            self.sources.remove(path);
        }
        Ok(self.sources.build_graph())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Literal;
    use indoc::indoc;

    fn graph(files: &[(&str, &str)]) -> TypeGraph {
        let mut set = SourceSet::new();
        for (path, source) in files {
            set.add_str(Path::new(path), source).unwrap();
        }
        set.build_graph()
    }

    #[test]
    fn test_module_path() {
        assert_eq!(module_path(Path::new("lib.rs")), "crate");
        assert_eq!(module_path(Path::new("models/mod.rs")), "crate::models");
        assert_eq!(module_path(Path::new("models/user.rs")), "crate::models::user");
        assert_eq!(module_path(Path::new("api.rs")), "crate::api");
    }

    #[test]
    fn test_extract_struct() {
        let graph = graph(&[(
            "models/user.rs",
            indoc! {r#"
                use tsgen_codegen::TypeScript;

                /// A registered user.
                #[derive(TypeScript)]
                #[ts(namespace = "Api")]
                pub struct User {
                    pub id: u64,
                    #[serde(rename = "displayName")]
                    pub name: Option<String>,
                    secret: String,
                }

                pub struct Unmarked {
                    pub x: u8,
                }
            "#},
        )]);

        assert_eq!(graph.len(), 1);
        let user = graph.get("crate::models::user::User").unwrap();
        assert_eq!(user.kind, TypeKind::Class);
        assert_eq!(user.attrs.namespace(), Some("Api"));
        assert_eq!(user.attrs.generate(), Some(true));
        assert_eq!(user.doc, vec![" A registered user."]);
        assert_eq!(user.output_path.as_deref(), Some(Path::new("models/User.type.ts")));
        assert_eq!(user.source_file.as_deref(), Some(Path::new("models/user.rs")));

        assert_eq!(user.members.len(), 3);
        assert_eq!(user.members[1].attrs.rename(), Some("displayName"));
        assert_eq!(
            user.members[1].ty,
            TypeRef::generic("Option", vec![TypeRef::path("String")])
        );
        assert!(!user.members[2].is_public);
    }

    #[test]
    fn test_cross_file_references() {
        let graph = graph(&[
            (
                "shapes.rs",
                indoc! {r#"
                    use crate::money::Money;

                    #[derive(TypeScript)]
                    pub struct Order {
                        pub total: Money,
                        pub lines: Vec<Line>,
                        pub parent: super::Root,
                    }

                    #[derive(TypeScript)]
                    pub struct Line;
                "#},
            ),
            ("money.rs", "#[derive(TypeScript)] pub struct Money;"),
            ("lib.rs", "#[derive(TypeScript)] pub struct Root;"),
        ]);

        let order = graph.get("crate::shapes::Order").unwrap();
        assert_eq!(order.members[0].ty, TypeRef::path("crate::money::Money"));
        assert_eq!(
            order.members[1].ty,
            TypeRef::generic("Vec", vec![TypeRef::path("crate::shapes::Line")])
        );
        assert_eq!(order.members[2].ty, TypeRef::path("crate::Root"));
    }

    #[test]
    fn test_traits_and_impls() {
        let graph = graph(&[(
            "lib.rs",
            indoc! {r#"
                #[typescript(namespace = "Api", derived_union)]
                pub trait Shape: Send + Named {
                    fn area(&self) -> f64;
                    fn sides(&self) -> u32 { 0 }
                    fn scale(&mut self, by: f64);
                }

                #[typescript]
                pub trait Named {
                    fn name(&self) -> String;
                }

                #[derive(TypeScript)]
                pub struct Circle {
                    pub radius: f64,
                }

                impl Shape for Circle {
                    fn area(&self) -> f64 { 0.0 }
                }

                impl std::fmt::Debug for Circle {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { Ok(()) }
                }

                impl Circle {
                    pub const KIND: &'static str = "circle";
                    pub const VERSION: f64 = 3.3;
                    const HIDDEN: u8 = 1;
                }
            "#},
        )]);

        let shape = graph.get("crate::Shape").unwrap();
        assert_eq!(shape.kind, TypeKind::Interface);
        assert_eq!(shape.interfaces, vec![TypeRef::path("crate::Named")]);
        let names: Vec<_> = shape.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["area", "sides"]);
        assert!(shape.members[1].has_default);

        let circle = graph.get("crate::Circle").unwrap();
        assert_eq!(circle.interfaces, vec![TypeRef::path("crate::Shape")]);
        let kind = circle.member("KIND").unwrap();
        assert_eq!(kind.constant, Some(Literal::Str("circle".into())));
        assert_eq!(
            circle.member("VERSION").unwrap().constant,
            Some(Literal::Number("3.3".into()))
        );
        assert!(circle.member("HIDDEN").is_none());
    }

    #[test]
    fn test_annotated_impl_keeps_undeclared_trait() {
        let graph = graph(&[(
            "lib.rs",
            indoc! {r#"
                #[derive(TypeScript)]
                pub struct User;

                #[typescript]
                impl tsgen::SubsetOf<UserDto> for User {}
            "#},
        )]);
        let user = graph.get("crate::User").unwrap();
        assert_eq!(
            user.interfaces,
            vec![TypeRef::generic("tsgen::SubsetOf", vec![TypeRef::path("UserDto")])]
        );
    }

    #[test]
    fn test_aliases() {
        let graph = graph(&[(
            "lib.rs",
            indoc! {r#"
                pub type Id = u64;
                pub type Lookup<V> = std::collections::HashMap<Id, V>;

                #[typescript(type = "string")]
                pub type Timestamp = i64;

                #[derive(TypeScript)]
                pub struct Index {
                    pub entries: Lookup<Timestamp>,
                }
            "#},
        )]);

        let index = graph.get("crate::Index").unwrap();
        assert_eq!(
            index.members[0].ty,
            TypeRef::generic(
                "std::collections::HashMap",
                vec![TypeRef::path("u64"), TypeRef::path("crate::Timestamp")]
            )
        );
        assert_eq!(
            graph.external_mappings().get("crate::Timestamp").map(String::as_str),
            Some("string")
        );
    }

    #[test]
    fn test_enum_and_directives() {
        let graph = graph(&[(
            "lib.rs",
            indoc! {r#"
                #[derive(TypeScript)]
                #[ts(const_enum, generate = false)]
                pub enum Status {
                    Active,
                    #[serde(skip)]
                    Hidden,
                    Failed { reason: String },
                }

                #[derive(TypeScript)]
                #[ts(kind = "record", extends = "Base<u8>", abstract, type_member = "kind")]
                pub struct Derived<T> {
                    #[ts(as = "Base<T>")]
                    #[deprecated(note = "gone")]
                    pub old: T,
                }

                #[derive(TypeScript)]
                pub struct Base<T> {
                    pub value: T,
                }
            "#},
        )]);

        let status = graph.get("crate::Status").unwrap();
        assert_eq!(status.variants, vec!["Active", "Failed"]);
        assert!(status.attrs.contains(&Attribute::ConstEnum));
        assert_eq!(status.attrs.generate(), Some(false));

        let derived = graph.get("crate::Derived").unwrap();
        assert_eq!(derived.kind, TypeKind::Record);
        assert!(derived.is_abstract);
        assert_eq!(derived.type_params, vec!["T"]);
        assert_eq!(
            derived.base,
            Some(TypeRef::generic("crate::Base", vec![TypeRef::path("u8")]))
        );
        assert_eq!(derived.attrs.type_member(), Some(Some("kind")));
        let old = &derived.members[0];
        assert_eq!(old.ty, TypeRef::param("T"));
        assert_eq!(
            old.attrs.replace_type(),
            Some(&TypeOverride::Type(TypeRef::generic(
                "crate::Base",
                vec![TypeRef::param("T")]
            )))
        );
        assert_eq!(old.attrs.deprecated(), Some(Some("gone")));
    }

    #[test]
    fn test_inline_modules() {
        let graph = graph(&[(
            "lib.rs",
            indoc! {r#"
                pub mod api {
                    use super::Shared;

                    #[derive(TypeScript)]
                    pub struct Request {
                        pub shared: Shared,
                    }
                }

                #[derive(TypeScript)]
                pub struct Shared;
            "#},
        )]);
        let request = graph.get("crate::api::Request").unwrap();
        assert_eq!(request.members[0].ty, TypeRef::path("crate::Shared"));
    }

    #[test]
    fn test_invalid_directive_reports_file() {
        let mut set = SourceSet::new();
        let err = set
            .add_str(
                Path::new("bad.rs"),
                "#[derive(TypeScript)] #[ts(namespace = 1)] struct Bad;",
            )
            .unwrap_err();
        assert!(matches!(err, Error::Parse { ref path, .. } if path == Path::new("bad.rs")));
    }

    #[test]
    fn test_rust_source_load_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("target")).unwrap();
        fs::write(src.join("lib.rs"), "#[derive(TypeScript)] pub struct A;").unwrap();
        fs::write(src.join("target/gen.rs"), "#[derive(TypeScript)] pub struct Ignored;").unwrap();

        let mut source = RustSource::new(&src);
        let graph = source.load().unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get("crate::A").is_some());

        let extra = src.join("extra.rs");
        fs::write(&extra, "#[derive(TypeScript)] pub struct B;").unwrap();
        let graph = source.reload_file(&extra).unwrap();
        assert!(graph.get("crate::extra::B").is_some());

        fs::remove_file(&extra).unwrap();
        let graph = source.reload_file(&extra).unwrap();
        assert!(graph.get("crate::extra::B").is_none());
    }

    #[test]
    fn test_classify() {
        let source = RustSource::new("/ws/src").with_config_file("/ws/tsgen.json");
        assert_eq!(source.classify(Path::new("/ws/Cargo.toml")), ChangeScope::Reload);
        assert_eq!(source.classify(Path::new("/ws/tsgen.json")), ChangeScope::Reload);
        assert_eq!(source.classify(Path::new("/ws/src/a.rs")), ChangeScope::SourceFile);
        assert_eq!(source.classify(Path::new("/ws/src/target/a.rs")), ChangeScope::Ignore);
        assert_eq!(source.classify(Path::new("/ws/src/notes.md")), ChangeScope::Ignore);
        assert_eq!(source.classify(Path::new("/ws/build.rs")), ChangeScope::Ignore);
    }

    #[test]
    fn test_missing_root_is_load_error() {
        let mut source = RustSource::new("/definitely/not/here");
        assert!(matches!(source.load(), Err(Error::Load(_))));
    }
}
