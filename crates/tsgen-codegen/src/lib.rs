//! # tsgen-codegen
//!
//! Keeps TypeScript declaration files in sync with Rust domain types.
//!
//! Types are collected into a [`TypeGraph`], mapped to TypeScript
//! declarations and written either into one `<Namespace>.d.ts` file per
//! namespace or into one `<Type>.type.ts` module file per type. Re-running
//! generation only touches files whose content changed and deletes generated
//! files that no type produces any more.
//!
//! ## Usage
//!
//! ### 1. Annotate your types
//!
//! ```rust,ignore
//! use tsgen_codegen::{TypeScript, typescript};
//!
//! #[typescript(namespace = "Api", derived_union)]
//! pub trait Shape {
//!     fn area(&self) -> f64;
//! }
//!
//! #[derive(TypeScript)]
//! #[ts(namespace = "Api")]
//! pub struct Circle {
//!     pub radius: f64,
//!     #[ts(optional)]
//!     pub label: Option<String>,
//! }
//!
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         std::f64::consts::PI * self.radius * self.radius
//!     }
//! }
//! ```
//!
//! ### 2. Generate, or verify in CI
//!
//! ```rust,ignore
//! use tsgen_codegen::{CodeGenerator, Config, SyncMode};
//!
//! fn main() -> tsgen_codegen::Result<()> {
//!     let mut generator = CodeGenerator::new(Config::from_file("tsgen.json")?);
//!     generator.add_source_dir("src/")?;
//!
//!     let report = generator.synchronize(SyncMode::Verify)?;
//!     for diagnostic in &report.diagnostics {
//!         eprintln!("{diagnostic}");
//!     }
//!     std::process::exit(if report.success() { 0 } else { 1 });
//! }
//! ```
//!
//! ### 3. Watch
//!
//! [`WatchEngine`] runs a full pass and then regenerates only the files
//! affected by each change pushed through its [`ChangeQueue`].

mod config;
mod definition;
mod docs;
mod error;
mod generator;
mod graph;
mod imports;
mod member;
mod naming;
mod registry;
mod render;
mod resolver;
pub mod source;
mod sync;
mod ts;
mod watch;

pub use config::Config;
pub use definition::DefinitionBuilder;
pub use error::{Diagnostic, Error, Result};
pub use generator::{CodeGenerator, GeneratedFile, GenerationPlan};
pub use graph::{
    Attribute, Attributes, Literal, MemberKind, MemberNode, TypeGraph, TypeKind, TypeNode,
    TypeOverride, TypeRef,
};
pub use imports::{ImportKey, ImportMapping, ImportPaths};
pub use member::{LookupChain, MemberBuilder};
pub use naming::camel_case;
pub use registry::{TypeMapping, TypeRegistry};
pub use render::{render_module_file, render_namespace_file};
pub use resolver::{ResolveContext, TypeResolver};
pub use source::{RustSource, SourceSet};
pub use sync::{SyncMode, SyncReport, find_generated_files, synchronize};
pub use ts::{
    DerivedUnion, DocComment, EnumDefinition, InterfaceDefinition, RenderContext,
    TsInterfaceMember, TsTypeDefinition, TsTypeReference,
};
pub use watch::{
    CancellationToken, ChangeEvent, ChangeKind, ChangeQueue, ChangeScope, Debouncer,
    TypeGraphSource, WatchEngine, WatchOutcome,
};

#[cfg(feature = "derive")]
pub use tsgen_derive::{TypeScript, typescript};
