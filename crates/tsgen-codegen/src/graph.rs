//! The source type graph.
//!
//! A [`TypeGraph`] is an immutable snapshot of every declared type the
//! generator can see. Providers (such as the Rust source scanner in
//! [`crate::source`]) build a fresh snapshot per pass; the builders only ever
//! read from it.
//!
//! Type references inside the graph ([`TypeRef`]) are kept as written, except
//! that paths to declared types are canonical type ids, so a reference can be
//! resolved with a plain map lookup.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// The declaration kind of a [`TypeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Record,
}

/// A reference to a type as it appears in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A path type with optional generic arguments, e.g. `Vec<T>` or
    /// `crate::models::User`.
    Path { path: String, args: Vec<TypeRef> },
    /// An unbound generic parameter of the enclosing declaration.
    Param(String),
    /// `[T]` or `[T; N]`.
    Slice(Box<TypeRef>),
    /// `(A, B)`. The empty tuple is the unit type.
    Tuple(Vec<TypeRef>),
}

impl TypeRef {
    pub fn path(path: impl Into<String>) -> Self {
        TypeRef::Path {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(path: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Path {
            path: path.into(),
            args,
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        TypeRef::Param(name.into())
    }

    /// Full path of a path type, without generic arguments.
    pub fn path_str(&self) -> Option<&str> {
        match self {
            TypeRef::Path { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Last `::` segment of a path type.
    pub fn last_segment(&self) -> Option<&str> {
        self.path_str()
            .map(|p| p.rsplit("::").next().unwrap_or(p))
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Path { args, .. } => args,
            _ => &[],
        }
    }
}

/// Replacement for a type, from a "replace type" directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeOverride {
    /// Literal TypeScript text.
    Literal(String),
    /// Resolve this type instead.
    Type(TypeRef),
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Str(String),
    /// Numeric literal text, e.g. `3.3`.
    Number(String),
    Bool(bool),
}

/// One annotation on a type or member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Explicit generation switch.
    Generate(bool),
    Namespace(String),
    ReplaceType(TypeOverride),
    /// Derived-type union, optionally with a custom union name.
    DerivedUnion(Option<String>),
    /// Discriminant member, optionally with a custom member name.
    TypeMember(Option<String>),
    AugmentParent,
    TypeNamesDoc,
    Canonical,
    ConstEnum,
    /// Wrap every member type of this type (and its subtypes) in a generic.
    WrapMembers(String),
    Rename(String),
    /// Excluded from serialization.
    DataIgnore,
    /// Excluded from TypeScript output.
    Ignore,
    Optional,
    Deprecated(Option<String>),
    /// Comment text meant for TypeScript output only.
    Comment(String),
    /// Any other attribute, by path.
    Other(String),
}

/// The attribute set of a type or member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    pub fn new(attrs: Vec<Attribute>) -> Self {
        Self(attrs)
    }

    pub fn push(&mut self, attr: Attribute) {
        self.0.push(attr);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, attr: &Attribute) -> bool {
        self.0.contains(attr)
    }

    pub fn generate(&self) -> Option<bool> {
        self.0.iter().find_map(|a| match a {
            Attribute::Generate(value) => Some(*value),
            _ => None,
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Attribute::Namespace(ns) => Some(ns.as_str()),
            _ => None,
        })
    }

    pub fn replace_type(&self) -> Option<&TypeOverride> {
        self.0.iter().find_map(|a| match a {
            Attribute::ReplaceType(replacement) => Some(replacement),
            _ => None,
        })
    }

    /// `Some(custom_name)` when the derived-union directive is present.
    pub fn derived_union(&self) -> Option<Option<&str>> {
        self.0.iter().find_map(|a| match a {
            Attribute::DerivedUnion(name) => Some(name.as_deref()),
            _ => None,
        })
    }

    /// `Some(custom_name)` when the discriminant directive is present.
    pub fn type_member(&self) -> Option<Option<&str>> {
        self.0.iter().find_map(|a| match a {
            Attribute::TypeMember(name) => Some(name.as_deref()),
            _ => None,
        })
    }

    pub fn rename(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Attribute::Rename(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn wrap_members(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Attribute::WrapMembers(wrapper) => Some(wrapper.as_str()),
            _ => None,
        })
    }

    /// `Some(message)` when the deprecation marker is present.
    pub fn deprecated(&self) -> Option<Option<&str>> {
        self.0.iter().find_map(|a| match a {
            Attribute::Deprecated(message) => Some(message.as_deref()),
            _ => None,
        })
    }

    pub fn comment(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Attribute::Comment(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Whether an [`Attribute::Other`] matches `path`, either exactly or by
    /// trailing segments (`internal` matches `api::internal`).
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|a| match a {
            Attribute::Other(p) => {
                p == path
                    || p.ends_with(&format!("::{path}"))
                    || path.ends_with(&format!("::{p}"))
            }
            _ => false,
        })
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether a member is a property (getter) or a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
}

/// A declared member of a [`TypeNode`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemberNode {
    pub name: String,
    pub ty: TypeRef,
    pub kind: MemberKind,
    pub attrs: Attributes,
    pub is_public: bool,
    pub is_static: bool,
    pub is_indexer: bool,
    /// Value of a compile-time constant field.
    pub constant: Option<Literal>,
    /// Interface member with a default body.
    pub has_default: bool,
    /// Raw doc comment lines.
    pub doc: Vec<String>,
}

impl MemberNode {
    /// A public instance property.
    pub fn property(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: MemberKind::Property,
            attrs: Attributes::default(),
            is_public: true,
            is_static: false,
            is_indexer: false,
            constant: None,
            has_default: false,
            doc: Vec::new(),
        }
    }

    /// A public instance field.
    pub fn field(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            kind: MemberKind::Field,
            ..Self::property(name, ty)
        }
    }

    /// A public constant field.
    pub fn constant(name: impl Into<String>, ty: TypeRef, value: Literal) -> Self {
        Self {
            is_static: true,
            constant: Some(value),
            ..Self::field(name, ty)
        }
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn with_doc(mut self, lines: &[&str]) -> Self {
        self.doc = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn indexer(mut self) -> Self {
        self.is_indexer = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Whether the member takes part in generation at all: public instance
    /// properties and fields, plus constant fields.
    pub fn is_eligible(&self) -> bool {
        self.is_public && !self.is_indexer && (!self.is_static || self.constant.is_some())
    }
}

/// A declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    /// Qualified, unique id, e.g. `crate::models::User`.
    pub id: String,
    pub name: String,
    /// Module path that owns the declaration, e.g. `crate::models`.
    pub module: String,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    pub base: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub members: Vec<MemberNode>,
    /// Enum member names in declaration order.
    pub variants: Vec<String>,
    pub attrs: Attributes,
    /// Id of the type this one is nested in.
    pub enclosing: Option<String>,
    pub source_file: Option<PathBuf>,
    /// Module-file location relative to the output root, for types without
    /// a namespace.
    pub output_path: Option<PathBuf>,
    pub is_abstract: bool,
    /// Raw doc comment lines.
    pub doc: Vec<String>,
}

impl TypeNode {
    pub fn new(id: impl Into<String>, kind: TypeKind) -> Self {
        let id = id.into();
        let (module, name) = match id.rsplit_once("::") {
            Some((module, name)) => (module.to_string(), name.to_string()),
            None => (String::new(), id.clone()),
        };
        Self {
            id,
            name,
            module,
            kind,
            type_params: Vec::new(),
            base: None,
            interfaces: Vec::new(),
            members: Vec::new(),
            variants: Vec::new(),
            attrs: Attributes::default(),
            enclosing: None,
            source_file: None,
            output_path: None,
            is_abstract: kind == TypeKind::Interface,
            doc: Vec::new(),
        }
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interface(mut self, iface: TypeRef) -> Self {
        self.interfaces.push(iface);
        self
    }

    pub fn with_member(mut self, member: MemberNode) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_attr(mut self, attr: Attribute) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn nested_in(mut self, enclosing: impl Into<String>) -> Self {
        self.enclosing = Some(enclosing.into());
        self
    }

    pub fn declared_in(mut self, source_file: impl Into<PathBuf>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_doc(mut self, lines: &[&str]) -> Self {
        self.doc = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    /// Find a declared member by name.
    pub fn member(&self, name: &str) -> Option<&MemberNode> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A snapshot of every declared type.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: IndexMap<String, TypeNode>,
    external_mappings: BTreeMap<String, String>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, replacing any previous type with the same id.
    pub fn insert(&mut self, node: TypeNode) -> Option<TypeNode> {
        self.types.insert(node.id.clone(), node)
    }

    pub fn with_type(mut self, node: TypeNode) -> Self {
        self.insert(node);
        self
    }

    /// Register an external-type override declared alongside the sources.
    pub fn add_external_mapping(&mut self, path: impl Into<String>, ts_type: impl Into<String>) {
        self.external_mappings.insert(path.into(), ts_type.into());
    }

    pub fn external_mappings(&self) -> &BTreeMap<String, String> {
        &self.external_mappings
    }

    pub fn get(&self, id: &str) -> Option<&TypeNode> {
        self.types.get(id)
    }

    /// Every declared type, in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The declared type a reference points at, if any.
    pub fn lookup(&self, ty: &TypeRef) -> Option<&TypeNode> {
        ty.path_str().and_then(|path| self.types.get(path))
    }

    pub fn base_of(&self, node: &TypeNode) -> Option<&TypeNode> {
        node.base.as_ref().and_then(|base| self.lookup(base))
    }

    /// Base types from the immediate base outward.
    pub fn base_chain<'a>(&'a self, node: &TypeNode) -> Vec<&'a TypeNode> {
        let mut chain: Vec<&TypeNode> = Vec::new();
        let mut seen = HashSet::from([node.id.as_str()]);
        let mut current = self.base_of(node);
        while let Some(base) = current {
            if !seen.insert(base.id.as_str()) {
                break;
            }
            chain.push(base);
            current = self.base_of(base);
        }
        chain
    }

    /// The type itself followed by its enclosing types, innermost first.
    pub fn enclosing_chain<'a>(&'a self, node: &'a TypeNode) -> Vec<&'a TypeNode> {
        let mut chain = vec![node];
        let mut seen = HashSet::from([node.id.as_str()]);
        let mut current = node.enclosing.as_deref().and_then(|id| self.get(id));
        while let Some(outer) = current {
            if !seen.insert(outer.id.as_str()) {
                break;
            }
            chain.push(outer);
            current = outer.enclosing.as_deref().and_then(|id| self.get(id));
        }
        chain
    }

    /// Every interface reference the type implements, directly, through its
    /// interfaces, or through its base chain. Deduplicated, first-seen order.
    pub fn interface_refs<'a>(&'a self, node: &'a TypeNode) -> Vec<&'a TypeRef> {
        let mut result: Vec<&TypeRef> = Vec::new();
        let mut seen: HashSet<&TypeRef> = HashSet::new();
        let mut stack: Vec<&TypeNode> = vec![node];
        stack.extend(self.base_chain(node));

        let mut index = 0;
        while index < stack.len() {
            let current = stack[index];
            index += 1;
            for iface in &current.interfaces {
                if !seen.insert(iface) {
                    continue;
                }
                result.push(iface);
                if let Some(declared) = self.lookup(iface) {
                    stack.push(declared);
                }
            }
        }
        result
    }

    /// Declared interface types from [`TypeGraph::interface_refs`].
    pub fn all_interfaces<'a>(&'a self, node: &'a TypeNode) -> Vec<&'a TypeNode> {
        self.interface_refs(node)
            .into_iter()
            .filter_map(|iface| self.lookup(iface))
            .collect()
    }

    /// Whether a value of `candidate` is also a `target`.
    pub fn is_assignable_to(&self, candidate: &TypeNode, target: &TypeNode) -> bool {
        candidate.id == target.id
            || self.base_chain(candidate).iter().any(|b| b.id == target.id)
            || self
                .interface_refs(candidate)
                .iter()
                .any(|i| i.path_str() == Some(target.id.as_str()))
    }

    /// Concrete types that are a `target`, excluding `target` itself, sorted
    /// by name and then by id.
    pub fn find_assignable_concrete_types<'a>(&'a self, target: &TypeNode) -> Vec<&'a TypeNode> {
        let mut found: Vec<&TypeNode> = self
            .types()
            .filter(|t| t.id != target.id && !t.is_abstract && !t.is_interface())
            .filter(|t| self.is_assignable_to(t, target))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Raw doc comment of a type. A TypeScript-only comment wins over the
    /// general doc text.
    pub fn doc_comment(&self, node: &TypeNode) -> Option<Vec<String>> {
        doc_lines(&node.attrs, &node.doc)
    }

    pub fn member_doc_comment(&self, member: &MemberNode) -> Option<Vec<String>> {
        doc_lines(&member.attrs, &member.doc)
    }

    /// Module-file location of a type, relative to the output root.
    pub fn declared_output_path(&self, node: &TypeNode) -> Option<PathBuf> {
        node.output_path.clone()
    }

    /// Types declared in one source file.
    pub fn types_in_file<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = &'a TypeNode> {
        self.types()
            .filter(move |t| t.source_file.as_deref() == Some(path))
    }
}

fn doc_lines(attrs: &Attributes, doc: &[String]) -> Option<Vec<String>> {
    if let Some(comment) = attrs.comment() {
        return Some(comment.lines().map(str::to_string).collect());
    }
    if doc.is_empty() {
        None
    } else {
        Some(doc.to_vec())
    }
}
