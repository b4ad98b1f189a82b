//! Interface member construction.
//!
//! A member's rename, ignore and optional directives can sit on the member
//! itself, on the same-named member of an implemented interface, or on the
//! same-named member of a base type. [`LookupChain`] materializes that list
//! once per member so every rule searches it the same way.

use crate::docs::DocBuilder;
use crate::graph::{Attribute, Literal, MemberNode, TypeGraph, TypeNode, TypeOverride};
use crate::naming::{camel_case, quoted};
use crate::resolver::{ResolveContext, TypeResolver};
use crate::ts::{TsInterfaceMember, TsTypeReference};

/// A member followed by its counterparts on the owner's interfaces and base
/// chain, in search order.
#[derive(Debug, Clone)]
pub struct LookupChain<'a> {
    member: &'a MemberNode,
    interfaces: Vec<&'a MemberNode>,
    bases: Vec<&'a MemberNode>,
}

impl<'a> LookupChain<'a> {
    pub fn new(graph: &'a TypeGraph, owner: &'a TypeNode, member: &'a MemberNode) -> Self {
        let counterpart = |t: &'a TypeNode| {
            t.member(&member.name)
                .filter(|other| !std::ptr::eq(*other, member))
        };
        Self {
            member,
            interfaces: graph
                .all_interfaces(owner)
                .into_iter()
                .filter_map(counterpart)
                .collect(),
            bases: graph
                .base_chain(owner)
                .into_iter()
                .filter_map(counterpart)
                .collect(),
        }
    }

    pub fn member(&self) -> &'a MemberNode {
        self.member
    }

    /// Every link: the member, then interface counterparts, then base
    /// counterparts.
    pub fn iter(&self) -> impl Iterator<Item = &'a MemberNode> + '_ {
        std::iter::once(self.member)
            .chain(self.interfaces.iter().copied())
            .chain(self.bases.iter().copied())
    }

    /// The first explicit rename in search order.
    pub fn rename(&self) -> Option<&'a str> {
        self.iter().find_map(|m| m.attrs.rename())
    }

    /// Whether any link carries an ignore marker. An explicit type override
    /// on the member itself keeps it.
    pub fn is_ignored(&self, custom_ignore: Option<&str>) -> bool {
        if self.member.attrs.replace_type().is_some() {
            return false;
        }
        self.iter().any(|m| {
            m.attrs.contains(&Attribute::DataIgnore)
                || m.attrs.contains(&Attribute::Ignore)
                || custom_ignore.is_some_and(|path| m.attrs.has_path(path))
        })
    }

    /// The first doc comment in search order.
    pub fn doc_comment(&self, graph: &TypeGraph) -> Option<Vec<String>> {
        self.iter().find_map(|m| graph.member_doc_comment(m))
    }

    /// Optional on the member itself or on an interface counterpart.
    pub fn is_optional(&self) -> bool {
        std::iter::once(self.member)
            .chain(self.interfaces.iter().copied())
            .any(|m| m.attrs.contains(&Attribute::Optional))
    }
}

/// Builds [`TsInterfaceMember`]s for one resolver snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MemberBuilder<'a> {
    resolver: TypeResolver<'a>,
}

impl<'a> MemberBuilder<'a> {
    pub fn new(resolver: TypeResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Build `member` as declared on (or folded into) `owner`. `None` when
    /// the member is ignored.
    ///
    /// Eligibility is the caller's concern.
    pub fn build(
        &self,
        owner: &'a TypeNode,
        member: &'a MemberNode,
        ctx: ResolveContext<'_>,
    ) -> Option<TsInterfaceMember> {
        let graph = self.resolver.graph();
        let config = self.resolver.config();
        let chain = LookupChain::new(graph, owner, member);

        if chain.is_ignored(config.custom_ignore_attribute.as_deref()) {
            return None;
        }

        let name = chain
            .rename()
            .map(str::to_string)
            .unwrap_or_else(|| camel_case(&member.name));

        let mut ty = match (&member.constant, member.attrs.replace_type()) {
            (Some(value), _) => TsTypeReference::primitive(literal_type(value)),
            (None, Some(TypeOverride::Literal(text))) => TsTypeReference::primitive(text.clone()),
            (None, Some(TypeOverride::Type(other))) => self.resolver.resolve(other, ctx),
            (None, None) => self.resolver.resolve(&member.ty, ctx),
        };

        if let Some(wrapper) = self.resolver.member_wrapper(owner) {
            let optional = ty.is_optional();
            ty = TsTypeReference::generic(
                TsTypeReference::named(wrapper),
                vec![ty.with_optional(false)],
            )
            .with_optional(optional);
        }

        let doc = DocBuilder::new(chain.doc_comment(graph))
            .deprecated(member.attrs.deprecated())
            .build();

        Some(TsInterfaceMember {
            name,
            ty,
            is_optional: chain.is_optional(),
            doc,
        })
    }
}

/// TypeScript literal type text for a constant value.
fn literal_type(value: &Literal) -> String {
    match value {
        Literal::Str(text) => quoted(text),
        Literal::Number(text) => text.clone(),
        Literal::Bool(value) => value.to_string(),
    }
}
