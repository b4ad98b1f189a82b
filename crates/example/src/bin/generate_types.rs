//! Generates the TypeScript declarations for this crate's types.
//!
//! ```text
//! generate_types [--verify] [OUT_DIR]
//! ```
//!
//! `OUT_DIR` defaults to `types`. With `--verify` nothing is written and the
//! exit status reports whether the files are up to date.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tsgen_codegen::{CodeGenerator, Config, SyncMode};

fn main() -> tsgen_codegen::Result<ExitCode> {
    let mut mode = SyncMode::Apply;
    let mut out_dir = PathBuf::from("types");
    for arg in env::args().skip(1) {
        if arg == "--verify" {
            mode = SyncMode::Verify;
        } else {
            out_dir = PathBuf::from(arg);
        }
    }

    let mut generator = CodeGenerator::new(Config {
        output_path: out_dir,
        ..Config::default()
    });
    generator.add_source_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))?;

    let report = generator.synchronize(mode)?;
    for path in &report.created {
        println!("  created {}", path.display());
    }
    for path in &report.updated {
        println!("  updated {}", path.display());
    }
    for path in &report.deleted {
        println!("  deleted {}", path.display());
    }
    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }

    println!("{} files up to date", report.unchanged.len());
    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
