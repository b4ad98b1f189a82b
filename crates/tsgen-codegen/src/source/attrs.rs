//! Attribute parsing.
//!
//! Directives are read from `#[ts(...)]` (the derive helper) and
//! `#[typescript(...)]` (the attribute macro). Serde attributes contribute
//! renames and skips, and `#[deprecated]` and `///` docs are carried through.

use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, Lit, Meta, Token};

use crate::graph::{Attribute, Literal, TypeKind, TypeOverride};

use super::types::SourceContext;

/// Name of the marker derive.
const MARKER: &str = "TypeScript";

/// Attribute paths that are handled explicitly and not kept as
/// [`Attribute::Other`].
const KNOWN_ATTRS: &[&str] = &["doc", "ts", "typescript", "serde", "deprecated", "derive"];

/// One parsed directive. Type-valued directives are returned as written and
/// resolved by the caller.
#[derive(Debug)]
pub(crate) enum Directive {
    Attr(Attribute),
    Extends(syn::Type),
    ReplaceWith(syn::Type),
    Kind(TypeKind),
    Abstract,
}

/// Whether `attr` is `#[ts(..)]` or `#[typescript(..)]`, possibly qualified
/// as `#[tsgen_codegen::typescript(..)]`.
fn is_directive_attr(attr: &syn::Attribute) -> bool {
    let path = attr.path();
    path.is_ident("ts") || path.segments.last().is_some_and(|s| s.ident == "typescript")
}

/// Whether the item carries the `#[typescript]` attribute macro.
pub(crate) fn has_typescript_attr(attrs: &[syn::Attribute]) -> bool {
    attrs
        .iter()
        .any(|attr| attr.path().segments.last().is_some_and(|s| s.ident == "typescript"))
}

/// Check if an item has the `TypeScript` marker derive.
///
/// Recognizes:
/// - `#[derive(TypeScript)]`
/// - `#[derive(tsgen_codegen::TypeScript)]` or any qualified path ending in `::TypeScript`
/// - `#[derive(Ts)]` when `use tsgen_codegen::TypeScript as Ts` is in scope
pub(crate) fn has_marker_derive(attrs: &[syn::Attribute], ctx: &SourceContext) -> bool {
    for attr in attrs {
        if attr.path().is_ident("derive")
            && let Ok(nested) =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
        {
            for path in nested {
                if path.segments.len() == 1 {
                    // Unqualified: resolve via imports
                    let ident = path.segments[0].ident.to_string();
                    let resolved = ctx.import(&ident).unwrap_or(&ident);
                    if resolved == MARKER || resolved.ends_with("::TypeScript") {
                        return true;
                    }
                } else if path.segments.last().is_some_and(|s| s.ident == MARKER) {
                    return true;
                }
            }
        }
    }
    false
}

/// Parse every directive in `attrs`, in order.
pub(crate) fn directives(attrs: &[syn::Attribute]) -> syn::Result<Vec<Directive>> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| is_directive_attr(a)) {
        if let Meta::Path(_) = attr.meta {
            continue;
        }
        let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in &nested {
            out.push(directive(meta)?);
        }
    }
    Ok(out)
}

fn directive(meta: &Meta) -> syn::Result<Directive> {
    let key = path_string(meta.path());
    let attr = match (key.as_str(), meta) {
        ("namespace", Meta::NameValue(nv)) => Attribute::Namespace(string_value(&nv.value)?),
        ("generate", Meta::Path(_)) => Attribute::Generate(true),
        ("generate", Meta::NameValue(nv)) => Attribute::Generate(bool_value(&nv.value)?),
        ("extends", Meta::NameValue(nv)) => return Ok(Directive::Extends(type_value(&nv.value)?)),
        ("as", Meta::NameValue(nv)) => return Ok(Directive::ReplaceWith(type_value(&nv.value)?)),
        ("kind", Meta::NameValue(nv)) => {
            let kind = match string_value(&nv.value)?.as_str() {
                "class" => TypeKind::Class,
                "struct" => TypeKind::Struct,
                "record" => TypeKind::Record,
                other => {
                    return Err(syn::Error::new_spanned(
                        &nv.value,
                        format!(
                            "unknown kind `{other}`, expected \"class\", \"struct\" or \"record\""
                        ),
                    ));
                }
            };
            return Ok(Directive::Kind(kind));
        }
        ("abstract", Meta::Path(_)) => return Ok(Directive::Abstract),
        ("derived_union", Meta::Path(_)) => Attribute::DerivedUnion(None),
        ("derived_union", Meta::NameValue(nv)) => {
            Attribute::DerivedUnion(Some(string_value(&nv.value)?))
        }
        ("type_member", Meta::Path(_)) => Attribute::TypeMember(None),
        ("type_member", Meta::NameValue(nv)) => {
            Attribute::TypeMember(Some(string_value(&nv.value)?))
        }
        ("augment_parent", Meta::Path(_)) => Attribute::AugmentParent,
        ("type_names_doc", Meta::Path(_)) => Attribute::TypeNamesDoc,
        ("canonical", Meta::Path(_)) => Attribute::Canonical,
        ("const_enum", Meta::Path(_)) => Attribute::ConstEnum,
        ("wrap_members", Meta::NameValue(nv)) => Attribute::WrapMembers(string_value(&nv.value)?),
        ("type", Meta::NameValue(nv)) => {
            Attribute::ReplaceType(TypeOverride::Literal(string_value(&nv.value)?))
        }
        ("comment", Meta::NameValue(nv)) => Attribute::Comment(string_value(&nv.value)?),
        ("rename", Meta::NameValue(nv)) => Attribute::Rename(string_value(&nv.value)?),
        ("skip", Meta::Path(_)) => Attribute::Ignore,
        ("optional", Meta::Path(_)) => Attribute::Optional,
        // Bare words are kept for custom ignore markers.
        (_, Meta::Path(path)) => Attribute::Other(path_string(path)),
        _ => {
            return Err(syn::Error::new_spanned(
                meta,
                format!("unsupported typescript directive `{key}`"),
            ));
        }
    };
    Ok(Directive::Attr(attr))
}

/// Renames and skips from `#[serde(...)]`.
pub(crate) fn serde_attributes(attrs: &[syn::Attribute]) -> Vec<Attribute> {
    let mut out = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let Ok(nested) = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
        else {
            continue;
        };
        for meta in &nested {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                    if let Some(name) = lit_str(&nv.value) {
                        out.push(Attribute::Rename(name));
                    }
                }
                Meta::Path(p) if p.is_ident("skip") || p.is_ident("skip_serializing") => {
                    out.push(Attribute::DataIgnore);
                }
                _ => {}
            }
        }
    }
    out
}

/// `#[deprecated]`, `#[deprecated = "msg"]` or `#[deprecated(note = "msg")]`.
pub(crate) fn deprecation(attrs: &[syn::Attribute]) -> Option<Attribute> {
    let attr = attrs.iter().find(|a| a.path().is_ident("deprecated"))?;
    let message = match &attr.meta {
        Meta::Path(_) => None,
        Meta::NameValue(nv) => lit_str(&nv.value),
        Meta::List(_) => attr
            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .ok()
            .and_then(|nested| {
                nested.iter().find_map(|meta| match meta {
                    Meta::NameValue(nv) if nv.path.is_ident("note") => lit_str(&nv.value),
                    _ => None,
                })
            }),
    };
    Some(Attribute::Deprecated(message))
}

/// Raw `///` doc lines, leading spaces included.
pub(crate) fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => lit_str(&nv.value),
            _ => None,
        })
        .flat_map(|text| text.split('\n').map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Every attribute not handled elsewhere, by path.
pub(crate) fn other_attributes(attrs: &[syn::Attribute]) -> Vec<Attribute> {
    attrs
        .iter()
        .map(|a| path_string(a.path()))
        .filter(|path| !KNOWN_ATTRS.contains(&path.as_str()))
        .filter(|path| !path.ends_with("::typescript"))
        .map(Attribute::Other)
        .collect()
}

/// A compile-time literal, including negated numbers.
pub(crate) fn literal(expr: &Expr) -> Option<Literal> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Str(s) => Some(Literal::Str(s.value())),
            Lit::Char(c) => Some(Literal::Str(c.value().to_string())),
            Lit::Int(i) => Some(Literal::Number(i.base10_digits().to_string())),
            Lit::Float(f) => Some(Literal::Number(f.base10_digits().to_string())),
            Lit::Bool(b) => Some(Literal::Bool(b.value)),
            _ => None,
        },
        Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Neg(_)) => match literal(&unary.expr)? {
            Literal::Number(n) => Some(Literal::Number(format!("-{n}"))),
            _ => None,
        },
        Expr::Paren(p) => literal(&p.expr),
        Expr::Group(g) => literal(&g.expr),
        _ => None,
    }
}

fn path_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn lit_str(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    lit_str(expr).ok_or_else(|| syn::Error::new_spanned(expr, "expected a string literal"))
}

fn bool_value(expr: &Expr) -> syn::Result<bool> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(b), ..
        }) => Ok(b.value),
        _ => Err(syn::Error::new_spanned(expr, "expected `true` or `false`")),
    }
}

/// A type given either as a path (`as = crate::Money`) or as a string
/// (`extends = "Base<T>"`).
fn type_value(expr: &Expr) -> syn::Result<syn::Type> {
    match expr {
        Expr::Path(p) => Ok(syn::Type::Path(syn::TypePath {
            qself: None,
            path: p.path.clone(),
        })),
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => s.parse(),
        _ => Err(syn::Error::new_spanned(expr, "expected a type path or a string")),
    }
}
