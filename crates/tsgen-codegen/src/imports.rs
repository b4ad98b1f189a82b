//! Cross-file imports.
//!
//! Every generated file owns one [`ImportMapping`]. As each definition in the
//! file is rendered, its `Imported` references are registered and receive a
//! local alias that no other import in the file uses. Module files turn the
//! mapping into `import` statements; namespace files turn it into a nested
//! `namespace __ImportedModules { type X = import('...').Y; }` block.

use std::cmp::Ordering;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::config::Config;
use crate::ts::{TsTypeDefinition, TsTypeReference};

/// One imported symbol: a default import when `import_name` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportKey {
    pub source_file: PathBuf,
    pub import_name: Option<String>,
}

impl ImportKey {
    pub fn new(source_file: &Path, import_name: Option<&str>) -> Self {
        Self {
            source_file: source_file.to_path_buf(),
            import_name: import_name.map(str::to_string),
        }
    }
}

/// Local aliases for the imports of one generated file, in assignment order.
#[derive(Debug, Clone, Default)]
pub struct ImportMapping {
    aliases: IndexMap<ImportKey, String>,
}

struct Request<'a> {
    key: ImportKey,
    desired: &'a str,
}

impl ImportMapping {
    /// Mapping for a module file, with the file itself registered under its
    /// own type name so self-references stay bare and foreign imports of the
    /// same name get suffixed.
    pub fn for_module(own_path: &Path, own_name: &str) -> Self {
        let mut mapping = Self::default();
        mapping
            .aliases
            .insert(ImportKey::new(own_path, None), own_name.to_string());
        mapping
    }

    pub fn alias(&self, key: &ImportKey) -> Option<&str> {
        self.aliases.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Entries in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&ImportKey, &str)> {
        self.aliases.iter().map(|(k, v)| (k, v.as_str()))
    }

    fn is_taken(&self, alias: &str) -> bool {
        self.aliases.values().any(|a| a == alias)
    }

    /// Register every import a definition needs.
    pub fn assign(&mut self, definition: &TsTypeDefinition) {
        self.assign_all(definition.references());
    }

    /// Register the `Imported` references reachable from `references`.
    ///
    /// Requests are deduplicated by `(source file, imported name)` and ordered
    /// by imported name, desired alias and source file (case-insensitive).
    /// The first request for a name gets it bare; later ones get `Name1`,
    /// `Name2`, and so on.
    pub fn assign_all<'a>(&mut self, references: impl IntoIterator<Item = &'a TsTypeReference>) {
        let mut requests: Vec<Request<'a>> = Vec::new();
        for reference in references {
            for imported in reference.imports() {
                if let TsTypeReference::Imported {
                    name,
                    source_file,
                    default_import,
                    ..
                } = imported
                {
                    let key =
                        ImportKey::new(source_file, (!default_import).then_some(name.as_str()));
                    if !requests.iter().any(|r| r.key == key) {
                        requests.push(Request {
                            key,
                            desired: name.as_str(),
                        });
                    }
                }
            }
        }

        requests.sort_by(compare_requests);

        for request in requests {
            if self.aliases.contains_key(&request.key) {
                continue;
            }
            let alias = if self.is_taken(request.desired) {
                (1..)
                    .map(|i| format!("{}{i}", request.desired))
                    .find(|candidate| !self.is_taken(candidate))
                    .unwrap_or_else(|| request.desired.to_string())
            } else {
                request.desired.to_string()
            };
            self.aliases.insert(request.key, alias);
        }
    }
}

fn compare_requests(a: &Request<'_>, b: &Request<'_>) -> Ordering {
    let name = |r: &Request<'_>| r.key.import_name.as_deref().map(str::to_lowercase);
    let file = |r: &Request<'_>| path_string(&r.key.source_file).to_lowercase();
    name(a)
        .cmp(&name(b))
        .then_with(|| a.desired.to_lowercase().cmp(&b.desired.to_lowercase()))
        .then_with(|| file(a).cmp(&file(b)))
}

/// How import paths are written.
#[derive(Debug, Clone, Default)]
pub struct ImportPaths {
    /// `(alias, target directory)`, checked in order.
    pub aliases: Vec<(String, PathBuf)>,
    pub root: Option<PathBuf>,
}

impl ImportPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            aliases: config.resolved_path_aliases(),
            root: config.resolved_root_path(),
        }
    }

    /// The specifier used to import `target` from `from_file`, without the
    /// `.ts` extension.
    ///
    /// Paths are relative to the importing file. When the relative path has
    /// to climb up and then back down (`../../a/b`), an alias or the root
    /// path is preferred if one covers the target.
    pub fn specifier(&self, from_file: &Path, target: &Path) -> String {
        let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
        let relative = relative_path(from_dir, target);

        let ups = relative.iter().filter(|p| p.as_str() == "..").count();
        let downs = relative.len() - ups;
        if ups > 0 && downs >= 2 {
            let target_str = path_string(target);
            for (alias, alias_target) in &self.aliases {
                if let Some(rest) =
                    strip_prefix_ignore_case(&target_str, &path_string(alias_target))
                {
                    let rest = rest.trim_start_matches('/');
                    return remove_ts_extension(&format!("{alias}/{rest}"));
                }
            }
            if let Some(root) = &self.root
                && let Some(rest) = strip_prefix_ignore_case(&target_str, &path_string(root))
            {
                return remove_ts_extension(rest.trim_start_matches('/'));
            }
        }

        let mut specifier = relative.join("/");
        if !specifier.starts_with('.') {
            specifier = format!("./{specifier}");
        }
        remove_ts_extension(&specifier)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn remove_ts_extension(path: &str) -> String {
    if path.len() >= 3 && path.as_bytes()[path.len() - 3..].eq_ignore_ascii_case(b".ts") {
        // The suffix is ASCII, so this is a char boundary.
        path[..path.len() - 3].to_string()
    } else {
        path.to_string()
    }
}

fn normal_components(path: &Path) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".to_string());
                }
            }
            Component::RootDir | Component::Prefix(_) => parts.clear(),
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    parts
}

/// Path segments leading from directory `from_dir` to `target`.
fn relative_path(from_dir: &Path, target: &Path) -> Vec<String> {
    let from = normal_components(from_dir);
    let to = normal_components(target);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut segments: Vec<String> = vec!["..".to_string(); from.len() - common];
    segments.extend(to[common..].iter().cloned());
    segments
}

/// Import statements for a module file, one per external import.
pub fn module_import_lines(
    mapping: &ImportMapping,
    own_path: &Path,
    paths: &ImportPaths,
) -> Vec<String> {
    mapping
        .iter()
        .filter(|(key, _)| key.source_file != own_path)
        .map(|(key, alias)| {
            let specifier = paths.specifier(own_path, &key.source_file);
            match &key.import_name {
                Some(name) if name == alias => format!("import {{ {alias} }} from '{specifier}';"),
                Some(name) => format!("import {{ {name} as {alias} }} from '{specifier}';"),
                None => format!("import {alias} from '{specifier}';"),
            }
        })
        .collect()
}

/// Type aliases for the `__ImportedModules` block of a namespace file.
pub fn namespace_import_lines(
    mapping: &ImportMapping,
    own_path: &Path,
    paths: &ImportPaths,
) -> Vec<String> {
    mapping
        .iter()
        .map(|(key, alias)| {
            let specifier = paths.specifier(own_path, &key.source_file);
            let member = key.import_name.as_deref().unwrap_or("default");
            format!("type {alias} = import('{specifier}').{member};")
        })
        .collect()
}
