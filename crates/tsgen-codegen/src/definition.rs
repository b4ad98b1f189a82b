//! Type definition construction.
//!
//! [`DefinitionBuilder`] turns one [`TypeNode`] into a [`TsTypeDefinition`]:
//!
//! | Kind | `extends` | Discriminant |
//! |------|-----------|--------------|
//! | interface | every implemented interface | never |
//! | class, record | the base type | concrete types with the directive |
//! | struct | nothing | concrete types with the directive |
//! | enum | n/a | n/a |
//!
//! Types carrying the augment directive are merged into their parent's
//! declaration, and default-implemented interface members are folded into
//! implementers that do not redeclare them.

use std::collections::HashSet;

use crate::docs::DocBuilder;
use crate::graph::{Attribute, MemberNode, TypeKind, TypeNode, TypeRef};
use crate::member::MemberBuilder;
use crate::resolver::{ResolveContext, TypeResolver};
use crate::ts::{
    DerivedUnion, DocComment, EnumDefinition, InterfaceDefinition, TsInterfaceMember,
    TsTypeDefinition, TsTypeReference,
};

/// Builds definitions for one resolver snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionBuilder<'a> {
    resolver: TypeResolver<'a>,
    members: MemberBuilder<'a>,
}

impl<'a> DefinitionBuilder<'a> {
    pub fn new(resolver: TypeResolver<'a>) -> Self {
        Self {
            resolver,
            members: MemberBuilder::new(resolver),
        }
    }

    pub fn build(&self, node: &'a TypeNode) -> TsTypeDefinition {
        if node.is_enum() {
            return TsTypeDefinition::Enum(self.build_enum(node));
        }

        let mut visited = HashSet::new();
        TsTypeDefinition::Interface(self.build_interface(node, &mut visited))
    }

    fn build_enum(&self, node: &'a TypeNode) -> EnumDefinition {
        EnumDefinition {
            name: node.name.clone(),
            members: node.variants.clone(),
            is_const: node.attrs.contains(&Attribute::ConstEnum)
                || self.resolver.config().use_const_enums,
            doc: self.type_doc(node),
        }
    }

    fn build_interface(
        &self,
        node: &'a TypeNode,
        visited: &mut HashSet<&'a str>,
    ) -> InterfaceDefinition {
        visited.insert(node.id.as_str());
        let own = self.build_own(node);

        match self.resolver.augment_target(node) {
            Some(parent) if !parent.is_enum() && !visited.contains(parent.id.as_str()) => {
                let parent_def = self.build_interface(parent, visited);
                merge_augmented(parent_def, own)
            }
            _ => own,
        }
    }

    /// The definition of `node` on its own, before any augment merge.
    fn build_own(&self, node: &'a TypeNode) -> InterfaceDefinition {
        let graph = self.resolver.graph();
        let namespace = self.resolver.namespace_of(node);
        let ctx = ResolveContext::new(namespace);
        let augment_parent = self.resolver.augment_target(node).map(|p| p.id.as_str());

        let (subset_markers, must_be_subset_of) = self.subset_checks(node, ctx);

        let extends_refs: Vec<&TypeRef> = match node.kind {
            TypeKind::Interface => graph.interface_refs(node),
            TypeKind::Struct | TypeKind::Enum => Vec::new(),
            TypeKind::Class | TypeKind::Record => node.base.iter().collect(),
        };
        let extends = extends_refs
            .into_iter()
            .filter(|r| !subset_markers.contains(r))
            .filter(|r| augment_parent.is_none() || r.path_str() != augment_parent)
            .map(|r| self.resolver.resolve(r, ctx.bypass_union()))
            .collect();

        let mut members: Vec<TsInterfaceMember> = Vec::new();
        for member in node.members.iter().filter(|m| m.is_eligible()) {
            if let Some(built) = self.members.build(node, member, ctx) {
                push_member(&mut members, built);
            }
        }
        if !node.is_interface() {
            for member in self.default_interface_members(node) {
                if let Some(built) = self.members.build(node, member, ctx) {
                    push_member(&mut members, built);
                }
            }
        }

        let derived_union = self.resolver.union_name(node).map(|name| DerivedUnion {
            name,
            members: graph
                .find_assignable_concrete_types(node)
                .into_iter()
                .map(|t| self.resolver.resolve(&TypeRef::path(t.id.clone()), ctx.bypass_union()))
                .collect(),
        });

        InterfaceDefinition {
            name: node.name.clone(),
            type_params: node.type_params.clone(),
            extends,
            members,
            derived_union,
            discriminant: if node.is_interface() {
                None
            } else {
                self.resolver.type_member_name(node)
            },
            must_be_subset_of,
            doc: self.type_doc(node),
        }
    }

    /// Default-implemented members of interfaces that `node` implements
    /// itself (not through its base chain) and does not redeclare.
    fn default_interface_members(&self, node: &'a TypeNode) -> Vec<&'a MemberNode> {
        let graph = self.resolver.graph();
        let inherited: HashSet<&str> = graph
            .base_chain(node)
            .into_iter()
            .flat_map(|base| graph.interface_refs(base))
            .filter_map(|r| r.path_str())
            .collect();

        let mut found: Vec<&MemberNode> = Vec::new();
        for iface in graph.all_interfaces(node) {
            if inherited.contains(iface.id.as_str()) {
                continue;
            }
            for member in iface.members.iter().filter(|m| m.has_default && m.is_eligible()) {
                let redeclared = node.member(&member.name).is_some()
                    || found.iter().any(|f| f.name == member.name);
                if !redeclared {
                    found.push(member);
                }
            }
        }
        found
    }

    /// Structural-subset marker interfaces of `node`, and the resolved types
    /// it must be assignable to.
    fn subset_checks(
        &self,
        node: &'a TypeNode,
        ctx: ResolveContext<'_>,
    ) -> (Vec<&'a TypeRef>, Vec<TsTypeReference>) {
        let Some(marker) = self.resolver.config().structural_subset_of.as_deref() else {
            return (Vec::new(), Vec::new());
        };
        let graph = self.resolver.graph();
        let markers: Vec<&TypeRef> = graph
            .interface_refs(node)
            .into_iter()
            .filter(|r| {
                r.path_str()
                    .is_some_and(|p| p == marker || p.ends_with(&format!("::{marker}")))
            })
            .collect();
        let targets = markers
            .iter()
            .filter_map(|r| r.args().first())
            .map(|target| self.resolver.resolve(target, ctx.bypass_union()))
            .collect();
        (markers, targets)
    }

    fn type_doc(&self, node: &'a TypeNode) -> Option<DocComment> {
        let mut doc = DocBuilder::new(self.resolver.graph().doc_comment(node))
            .deprecated(node.attrs.deprecated());
        if self.resolver.type_names_doc(node) {
            doc = doc.source_type(&node.id);
            if let Some(canonical) = self.resolver.canonical_type(node) {
                doc = doc.canonical_type(&canonical.id);
            }
        }
        doc.build()
    }
}

/// Add a member, replacing an earlier one with the same output name.
fn push_member(members: &mut Vec<TsInterfaceMember>, member: TsInterfaceMember) {
    match members.iter_mut().find(|m| m.name == member.name) {
        Some(existing) => *existing = member,
        None => members.push(member),
    }
}

/// Fold an augmenting child's definition into its parent's.
fn merge_augmented(parent: InterfaceDefinition, child: InterfaceDefinition) -> InterfaceDefinition {
    let mut members = parent.members;
    for member in child.members {
        push_member(&mut members, member);
    }

    let mut extends = parent.extends;
    for reference in child.extends {
        if !extends.contains(&reference) {
            extends.push(reference);
        }
    }

    let mut must_be_subset_of = parent.must_be_subset_of;
    must_be_subset_of.extend(child.must_be_subset_of);

    InterfaceDefinition {
        name: parent.name,
        type_params: parent.type_params,
        extends,
        members,
        derived_union: child.derived_union.or(parent.derived_union),
        discriminant: child.discriminant.or(parent.discriminant),
        must_be_subset_of,
        doc: child.doc.or(parent.doc),
    }
}
