//! Output tree synchronization.
//!
//! [`synchronize`] brings the output tree in line with a set of planned
//! files. In [`SyncMode::Apply`] files are written only when their content
//! changed and stale generated files are deleted. In [`SyncMode::Verify`]
//! nothing is touched and every difference becomes a [`Diagnostic`].
//!
//! Comparison ignores line endings. Writes go through a temporary sibling
//! file that is renamed over the target, so a file is either fully rewritten
//! or left as it was.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use walkdir::WalkDir;

use crate::error::{Diagnostic, Error, Result};
use crate::generator::GeneratedFile;

/// File suffixes that mark a file as generated.
pub const GENERATED_SUFFIXES: &[&str] = &[".d.ts", ".type.ts"];

/// Directories never scanned for generated files.
const SKIPPED_DIRS: &[&str] = &[".git", ".hg", ".svn", "node_modules"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Write changed files and delete orphans.
    Apply,
    /// Report differences without touching the tree.
    Verify,
}

/// Outcome of one synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    /// Whether the run found nothing to report.
    pub fn success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Whether any file was written or deleted.
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.deleted.extend(other.deleted);
        self.unchanged.extend(other.unchanged);
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Synchronize the whole output tree with `files`.
///
/// Every generated file under `output_dir` that is not in `files` is an
/// orphan. Apply mode deletes orphans; verify mode reports them.
pub fn synchronize(
    files: &[GeneratedFile],
    output_dir: &Path,
    mode: SyncMode,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for file in files {
        sync_file(file, mode, &mut report)?;
    }

    let targets: BTreeSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    for orphan in find_generated_files(output_dir)? {
        if targets.contains(orphan.as_path()) {
            continue;
        }
        match mode {
            SyncMode::Apply => delete_file(&orphan, &mut report)?,
            SyncMode::Verify => {
                error!(path = %orphan.display(), "orphaned generated file");
                report.diagnostics.push(Diagnostic::Orphan(orphan));
            }
        }
    }
    Ok(report)
}

/// Write `files` and delete `deletions`, leaving the rest of the tree alone.
pub fn apply_incremental(files: &[GeneratedFile], deletions: &[PathBuf]) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for file in files {
        sync_file(file, SyncMode::Apply, &mut report)?;
    }
    for path in deletions {
        if path.is_file() {
            delete_file(path, &mut report)?;
        }
    }
    Ok(report)
}

/// Every file under `output_dir` with a generated-file suffix, sorted.
///
/// A missing output directory has no generated files.
pub fn find_generated_files(output_dir: &Path) -> Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(output_dir).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry.depth() > 0
            && SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d))
    });
    for entry in walker {
        let entry = entry.map_err(|source| Error::Walk {
            path: output_dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_generated_file(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

pub fn is_generated_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| GENERATED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

fn sync_file(file: &GeneratedFile, mode: SyncMode, report: &mut SyncReport) -> Result<()> {
    let existing = match fs::read_to_string(&file.path) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(source) => match mode {
            SyncMode::Apply => {
                return Err(Error::Read {
                    path: file.path.clone(),
                    source,
                });
            }
            SyncMode::Verify => {
                error!(path = %file.path.display(), %source, "cannot read generated file");
                report.diagnostics.push(Diagnostic::ReadFailed {
                    path: file.path.clone(),
                    message: source.to_string(),
                });
                return Ok(());
            }
        },
    };

    let matches = existing
        .as_deref()
        .is_some_and(|text| normalize(text) == normalize(&file.content));
    if matches {
        report.unchanged.push(file.path.clone());
        return Ok(());
    }

    match (mode, existing) {
        (SyncMode::Apply, None) => {
            write_atomic(&file.path, &file.content)?;
            info!(path = %file.path.display(), "Created");
            report.created.push(file.path.clone());
        }
        (SyncMode::Apply, Some(_)) => {
            write_atomic(&file.path, &file.content)?;
            info!(path = %file.path.display(), "Updated");
            report.updated.push(file.path.clone());
        }
        (SyncMode::Verify, None) => {
            error!(path = %file.path.display(), "generated file does not exist");
            report.diagnostics.push(Diagnostic::Missing(file.path.clone()));
        }
        (SyncMode::Verify, Some(_)) => {
            error!(path = %file.path.display(), "generated file is out of date");
            report.diagnostics.push(Diagnostic::Mismatch(file.path.clone()));
        }
    }
    Ok(())
}

fn delete_file(path: &Path, report: &mut SyncReport) -> Result<()> {
    fs::remove_file(path).map_err(|source| Error::Delete {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Deleted");
    report.deleted.push(path.to_path_buf());
    Ok(())
}

/// Write `content` to a temporary sibling and rename it over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&temp, content).map_err(|source| Error::Write {
        path: temp.clone(),
        source,
    })?;
    fs::rename(&temp, path).map_err(|source| {
        let _ = fs::remove_file(&temp);
        Error::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: PathBuf, content: &str) -> GeneratedFile {
        GeneratedFile {
            path,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_apply_creates_then_leaves_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![file(dir.path().join("nested/Api.d.ts"), "declare namespace Api {\n}\n")];

        let first = synchronize(&files, dir.path(), SyncMode::Apply).unwrap();
        assert_eq!(first.created, vec![dir.path().join("nested/Api.d.ts")]);
        assert!(first.success());

        let second = synchronize(&files, dir.path(), SyncMode::Apply).unwrap();
        assert!(!second.has_changes());
        assert_eq!(second.unchanged.len(), 1);
    }

    #[test]
    fn test_apply_updates_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.type.ts");
        fs::write(&path, "old\n").unwrap();

        let report =
            synchronize(&[file(path.clone(), "new\n")], dir.path(), SyncMode::Apply).unwrap();
        assert_eq!(report.updated, vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(!dir.path().join(".A.type.ts.tmp").exists());
    }

    #[test]
    fn test_line_endings_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.type.ts");
        fs::write(&path, "a\r\nb\r\n").unwrap();

        let report = synchronize(&[file(path, "a\nb\n")], dir.path(), SyncMode::Verify).unwrap();
        assert!(report.success());
        assert_eq!(report.unchanged.len(), 1);
    }

    #[test]
    fn test_apply_deletes_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join("Old.type.ts");
        let unrelated = dir.path().join("index.ts");
        fs::write(&orphan, "x").unwrap();
        fs::write(&unrelated, "x").unwrap();

        let report = synchronize(&[], dir.path(), SyncMode::Apply).unwrap();
        assert_eq!(report.deleted, vec![orphan.clone()]);
        assert!(!orphan.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_verify_reports_everything() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("Stale.d.ts");
        let orphan = dir.path().join("Orphan.type.ts");
        fs::write(&stale, "old\n").unwrap();
        fs::write(&orphan, "x").unwrap();
        let missing = dir.path().join("Missing.d.ts");

        let files = vec![file(stale.clone(), "new\n"), file(missing.clone(), "x\n")];
        let report = synchronize(&files, dir.path(), SyncMode::Verify).unwrap();

        assert!(!report.success());
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::Mismatch(stale.clone()),
                Diagnostic::Missing(missing.clone()),
                Diagnostic::Orphan(orphan.clone()),
            ]
        );
        assert_eq!(fs::read_to_string(&stale).unwrap(), "old\n");
        assert!(!missing.exists());
        assert!(orphan.exists());
    }

    #[test]
    fn test_scan_skips_vendor_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.d.ts"), "").unwrap();
        fs::write(dir.path().join(".git/x.d.ts"), "").unwrap();
        fs::write(dir.path().join("models/User.type.ts"), "").unwrap();

        let found = find_generated_files(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("models/User.type.ts")]);
    }

    #[test]
    fn test_missing_output_dir_has_no_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_generated_files(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_incremental_touches_only_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("Keep.type.ts");
        let gone = dir.path().join("Gone.type.ts");
        fs::write(&keep, "x").unwrap();
        fs::write(&gone, "x").unwrap();

        let report = apply_incremental(
            &[file(dir.path().join("New.d.ts"), "n\n")],
            &[gone.clone(), dir.path().join("NeverExisted.d.ts")],
        )
        .unwrap();
        assert_eq!(report.created, vec![dir.path().join("New.d.ts")]);
        assert_eq!(report.deleted, vec![gone.clone()]);
        assert!(keep.exists());
        assert!(!gone.exists());
    }

    #[test]
    fn test_is_generated_file() {
        assert!(is_generated_file(Path::new("a/Api.d.ts")));
        assert!(is_generated_file(Path::new("User.type.ts")));
        assert!(!is_generated_file(Path::new("index.ts")));
    }
}
