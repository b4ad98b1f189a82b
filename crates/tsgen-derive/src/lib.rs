//! Marker macros for tsgen.
//!
//! Both macros are **no-op annotations** at compile time. They exist so that
//! annotated sources compile; the actual declaration files are produced by
//! `tsgen-codegen`, which reads the annotations from the source text.
//!
//! | Macro | Goes on | Effect |
//! |-------|---------|--------|
//! | `#[derive(TypeScript)]` | structs, enums | nothing; registers the `ts` helper attribute |
//! | `#[typescript(...)]` | traits, impls, aliases, items | re-emits the item without `#[ts]` |
//!
//! # Example
//!
//! ```rust,ignore
//! use tsgen_codegen::{TypeScript, typescript};
//!
//! #[typescript(namespace = "Api")]
//! pub trait Named {
//!     #[ts(rename = "displayName")]
//!     fn name(&self) -> String;
//! }
//!
//! #[derive(TypeScript)]
//! #[ts(namespace = "Api")]
//! pub struct User {
//!     #[ts(optional)]
//!     pub nickname: Option<String>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, ImplItem, Item, TraitItem};

/// Marker derive macro for TypeScript declaration generation.
///
/// This macro is a no-op - it doesn't generate any code at compile time.
#[proc_macro_derive(TypeScript, attributes(ts))]
pub fn derive_typescript(_input: TokenStream) -> TokenStream {
    TokenStream::new()
}

/// Marks a trait, impl block or type alias for TypeScript generation.
///
/// Directive arguments are read by the generator, not by this macro.
#[proc_macro_attribute]
pub fn typescript(args: TokenStream, input: TokenStream) -> TokenStream {
    expand(args.into(), input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(_args: TokenStream2, input: TokenStream2) -> syn::Result<TokenStream2> {
    let mut item: Item = syn::parse2(input)?;
    strip_item(&mut item);
    Ok(quote!(#item))
}

fn strip(attrs: &mut Vec<Attribute>) {
    attrs.retain(|attr| !attr.path().is_ident("ts"));
}

/// Remove `#[ts(...)]` from the item and everything nested in it.
fn strip_item(item: &mut Item) {
    match item {
        Item::Trait(t) => {
            strip(&mut t.attrs);
            for nested in &mut t.items {
                match nested {
                    TraitItem::Fn(f) => strip(&mut f.attrs),
                    TraitItem::Const(c) => strip(&mut c.attrs),
                    TraitItem::Type(ty) => strip(&mut ty.attrs),
                    _ => {}
                }
            }
        }
        Item::Impl(i) => {
            strip(&mut i.attrs);
            for nested in &mut i.items {
                match nested {
                    ImplItem::Fn(f) => strip(&mut f.attrs),
                    ImplItem::Const(c) => strip(&mut c.attrs),
                    ImplItem::Type(ty) => strip(&mut ty.attrs),
                    _ => {}
                }
            }
        }
        Item::Struct(s) => {
            strip(&mut s.attrs);
            for field in s.fields.iter_mut() {
                strip(&mut field.attrs);
            }
        }
        Item::Enum(e) => {
            strip(&mut e.attrs);
            for variant in &mut e.variants {
                strip(&mut variant.attrs);
                for field in variant.fields.iter_mut() {
                    strip(&mut field.attrs);
                }
            }
        }
        Item::Type(t) => strip(&mut t.attrs),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: &str) -> String {
        let input: TokenStream2 = input.parse().unwrap();
        expand(TokenStream2::new(), input).unwrap().to_string()
    }

    #[test]
    fn test_strips_nested_helpers() {
        let out = expand_str(
            r#"
            pub trait Named {
                #[ts(rename = "displayName")]
                #[doc = " The name."]
                fn name(&self) -> String;
            }
        "#,
        );
        assert!(!out.contains("ts"));
        assert!(out.contains("doc"));
        assert!(out.contains("fn name"));
    }

    #[test]
    fn test_strips_impl_constants() {
        let out = expand_str(
            r#"
            impl Circle {
                #[ts(comment = "Shape kind")]
                pub const KIND: &'static str = "circle";
            }
        "#,
        );
        assert!(!out.contains("comment"));
        assert!(out.contains("KIND"));
    }

    #[test]
    fn test_rejects_non_items() {
        let input: TokenStream2 = "let x = 1;".parse().unwrap();
        assert!(expand(TokenStream2::new(), input).is_err());
    }
}
