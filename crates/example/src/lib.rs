//! Example crate demonstrating tsgen usage.
//!
//! The types here are ordinary Rust types. `#[derive(TypeScript)]` and
//! `#[typescript]` are no-op annotations at compile time; the declaration
//! files are produced by `CodeGenerator` reading this crate's sources (see
//! `src/bin/generate_types.rs`).
//!
//! - [`shapes`] lives in the `Geometry` namespace and gets one `Geometry.d.ts`
//! - [`orders`] has no namespace, so every type gets its own module file

pub mod orders;
pub mod shapes;
