//! Error and diagnostic types.
//!
//! [`Error`] aborts the current pass (load failures, I/O failures while
//! writing). [`Diagnostic`] is a per-item finding that is collected and
//! reported without stopping the run.

use std::io;
use std::path::PathBuf;

/// Errors that abort a generation pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load type graph: {0}")]
    Load(String),

    #[error("failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A non-fatal finding reported by a generation or verify pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error(
        "generated file {0} does not match the source definition; \
         regenerate and commit all changes to generated types"
    )]
    Mismatch(PathBuf),

    #[error("file {0} does not exist")]
    Missing(PathBuf),

    #[error("file {0} is no longer generated from any type")]
    Orphan(PathBuf),

    #[error(
        "type {type_id} is marked to generate a TypeScript definition \
         but no namespace or output path could be found for it"
    )]
    MissingOutputLocation { type_id: String },

    #[error("error verifying generated file {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error("watch aborted: {0}")]
    WatchFailed(String),
}
