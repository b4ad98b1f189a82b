//! Generation planning.
//!
//! [`CodeGenerator`] owns one [`TypeGraph`] snapshot together with the
//! configuration and type registry, and turns the snapshot into the set of
//! [`GeneratedFile`]s that should exist on disk:
//!
//! | Type | File |
//! |------|------|
//! | with a namespace | `<outputPath>/<namespace>.d.ts`, shared by the namespace |
//! | without a namespace | its declared module path under `<outputPath>` |
//! | without either | skipped with [`Diagnostic::MissingOutputLocation`] |

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::Config;
use crate::definition::DefinitionBuilder;
use crate::error::{Diagnostic, Result};
use crate::graph::{TypeGraph, TypeNode};
use crate::registry::TypeRegistry;
use crate::render::{render_module_file, render_namespace_file};
use crate::resolver::TypeResolver;
use crate::source::SourceSet;
use crate::sync::{self, SyncMode, SyncReport};
use crate::ts::TsTypeDefinition;

/// One file the generator wants on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Every file of one generation pass, plus per-type findings.
#[derive(Debug, Clone, Default)]
pub struct GenerationPlan {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationPlan {
    pub fn file(&self, path: &Path) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Where one generated type is written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Target {
    Namespace(String),
    Module(PathBuf),
}

/// Code generator over one type graph snapshot.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    config: Config,
    registry: TypeRegistry,
    graph: TypeGraph,
    sources: SourceSet,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl CodeGenerator {
    /// Create a generator with the built-in type mappings and an empty graph.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: TypeRegistry::with_builtins(),
            graph: TypeGraph::new(),
            sources: SourceSet::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Replace the type graph snapshot.
    ///
    /// Sources added with the `add_source_*` methods are discarded.
    pub fn set_graph(&mut self, graph: TypeGraph) -> &mut Self {
        self.sources = SourceSet::new();
        self.graph = graph;
        self
    }

    /// Replace the base type registry. Graph and config mappings are still
    /// layered on top of it.
    pub fn set_registry(&mut self, registry: TypeRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    /// Parse one Rust source file and add its declarations to the graph.
    ///
    /// The file's module path and module-file output directory are derived
    /// from its location relative to its parent directory.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> tsgen_codegen::Result<()> {
    /// use tsgen_codegen::{CodeGenerator, Config, SyncMode};
    ///
    /// let mut generator = CodeGenerator::new(Config::from_file("tsgen.json")?);
    /// generator.add_source_file("src/models.rs")?;
    /// generator.synchronize(SyncMode::Apply)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_source_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        self.sources.add_file(root, path)?;
        self.graph = self.sources.build_graph();
        Ok(self)
    }

    /// Parse Rust source text as if it were the file at `rel_path` under the
    /// source root, e.g. `"models/user.rs"`.
    pub fn add_source_str(
        &mut self,
        rel_path: impl AsRef<Path>,
        source: &str,
    ) -> Result<&mut Self> {
        self.sources.add_str(rel_path.as_ref(), source)?;
        self.graph = self.sources.build_graph();
        Ok(self)
    }

    /// Recursively scan a directory for `.rs` files and add their declarations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> tsgen_codegen::Result<()> {
    /// use tsgen_codegen::{CodeGenerator, Config, SyncMode};
    ///
    /// let mut generator = CodeGenerator::new(Config::default());
    /// generator.add_source_dir("src/")?;
    /// let report = generator.synchronize(SyncMode::Verify)?;
    /// assert!(report.success());
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_source_dir(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.sources.add_dir(path.as_ref())?;
        self.graph = self.sources.build_graph();
        Ok(self)
    }

    /// The registry used for resolution: built-ins, then mappings declared
    /// alongside the sources, then config mappings.
    pub fn effective_registry(&self) -> TypeRegistry {
        let mut registry = self.registry.clone();
        registry.extend_inline(self.graph.external_mappings());
        registry.extend(&self.config.type_mappings);
        registry
    }

    /// Render every generated file for the current snapshot.
    pub fn plan(&self) -> GenerationPlan {
        let registry = self.effective_registry();
        let resolver = TypeResolver::new(&self.graph, &self.config, &registry);
        let builder = DefinitionBuilder::new(resolver);

        let mut plan = GenerationPlan::default();
        let mut namespaces: BTreeMap<String, Vec<(&TypeNode, TsTypeDefinition)>> = BTreeMap::new();
        let mut modules: Vec<(PathBuf, TsTypeDefinition)> = Vec::new();

        let augmented = augmented_parents(&resolver);
        for node in self.graph.types() {
            if !resolver.should_generate(node) || augmented.contains(node.id.as_str()) {
                continue;
            }
            match target_of(&resolver, node) {
                Some(Target::Namespace(ns)) => {
                    namespaces.entry(ns).or_default().push((node, builder.build(node)));
                }
                Some(Target::Module(path)) => modules.push((path, builder.build(node))),
                None => {
                    warn!(type_id = %node.id, "no namespace or output path, skipping");
                    plan.diagnostics.push(Diagnostic::MissingOutputLocation {
                        type_id: node.id.clone(),
                    });
                }
            }
        }

        for (namespace, mut entries) in namespaces {
            entries.sort_by(|(a, da), (b, db)| {
                da.name().cmp(db.name()).then_with(|| a.id.cmp(&b.id))
            });
            let definitions: Vec<TsTypeDefinition> =
                entries.into_iter().map(|(_, definition)| definition).collect();
            let path = resolver.namespace_file(&namespace);
            let content = render_namespace_file(&namespace, &definitions, &path, &self.config);
            plan.files.push(GeneratedFile { path, content });
        }

        for (path, definition) in modules {
            let content = render_module_file(&definition, &path, &self.config);
            plan.files.push(GeneratedFile { path, content });
        }

        plan.files.sort_by(|a, b| a.path.cmp(&b.path));
        plan
    }

    /// Files that the types declared in `source_file` contribute to, under
    /// the current snapshot.
    pub fn targets_declared_in(&self, source_file: &Path) -> BTreeSet<PathBuf> {
        let registry = self.effective_registry();
        let resolver = TypeResolver::new(&self.graph, &self.config, &registry);
        self.graph
            .types_in_file(source_file)
            .filter(|node| resolver.should_generate(node))
            .filter_map(|node| match target_of(&resolver, node)? {
                Target::Namespace(ns) => Some(resolver.namespace_file(&ns)),
                Target::Module(path) => Some(path),
            })
            .collect()
    }

    /// Plan and synchronize the whole output tree.
    pub fn synchronize(&self, mode: SyncMode) -> Result<SyncReport> {
        let plan = self.plan();
        let mut report = sync::synchronize(&plan.files, &self.config.output_dir(), mode)?;
        report.diagnostics.splice(0..0, plan.diagnostics);
        Ok(report)
    }
}

fn target_of(resolver: &TypeResolver<'_>, node: &TypeNode) -> Option<Target> {
    if let Some(ns) = resolver.namespace_of(node) {
        return Some(Target::Namespace(ns.to_string()));
    }
    resolver.module_file(node).map(Target::Module)
}

/// Ids of parents whose declaration is emitted by a generated augmenting type.
fn augmented_parents<'a>(resolver: &TypeResolver<'a>) -> HashSet<&'a str> {
    resolver
        .graph()
        .types()
        .filter(|node| resolver.should_generate(node))
        .filter_map(|node| resolver.augment_target(node))
        .map(|parent| parent.id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attribute, MemberNode, TypeKind, TypeRef};

    fn config() -> Config {
        Config {
            output_path: PathBuf::from("/out"),
            ..Config::default()
        }
    }

    fn generated(id: &str, ns: &str) -> TypeNode {
        TypeNode::new(id, TypeKind::Class).with_attr(Attribute::Namespace(ns.into()))
    }

    fn generator(graph: TypeGraph) -> CodeGenerator {
        let mut generator = CodeGenerator::new(config());
        generator.set_graph(graph);
        generator
    }

    #[test]
    fn test_namespace_file_sorted_by_name() {
        let graph = TypeGraph::new()
            .with_type(generated("crate::b::Zebra", "Api"))
            .with_type(generated("crate::a::Apple", "Api"))
            .with_type(generated("crate::Other", "Other"));
        let plan = generator(graph).plan();

        assert_eq!(plan.files.len(), 2);
        let api = plan.file(Path::new("/out/Api.d.ts")).unwrap();
        let apple = api.content.find("interface Apple").unwrap();
        let zebra = api.content.find("interface Zebra").unwrap();
        assert!(apple < zebra);
        assert!(plan.file(Path::new("/out/Other.d.ts")).is_some());
    }

    #[test]
    fn test_module_file_per_type() {
        let graph = TypeGraph::new().with_type(
            TypeNode::new("crate::models::User", TypeKind::Class)
                .with_attr(Attribute::Generate(true))
                .with_output_path("models/User.type.ts")
                .with_member(MemberNode::field("name", TypeRef::path("String"))),
        );
        let plan = generator(graph).plan();

        let file = plan.file(Path::new("/out/models/User.type.ts")).unwrap();
        assert!(file.content.contains("interface User {"));
        assert!(file.content.contains("  name: string;"));
        assert!(file.content.ends_with("export default User;\n"));
    }

    #[test]
    fn test_missing_output_location() {
        let graph = TypeGraph::new()
            .with_type(
                TypeNode::new("crate::Lost", TypeKind::Class).with_attr(Attribute::Generate(true)),
            )
            .with_type(generated("crate::Found", "Api"));
        let plan = generator(graph).plan();

        assert_eq!(plan.files.len(), 1);
        assert_eq!(
            plan.diagnostics,
            vec![Diagnostic::MissingOutputLocation {
                type_id: "crate::Lost".into()
            }]
        );
    }

    #[test]
    fn test_ungenerated_types_are_skipped() {
        let graph = TypeGraph::new().with_type(TypeNode::new("crate::Plain", TypeKind::Class));
        let plan = generator(graph).plan();
        assert!(plan.files.is_empty());
        assert!(plan.diagnostics.is_empty());
    }

    #[test]
    fn test_augmented_parent_emitted_once() {
        let graph = TypeGraph::new()
            .with_type(
                TypeNode::new("crate::Shape", TypeKind::Interface)
                    .with_attr(Attribute::Namespace("Api".into()))
                    .with_member(MemberNode::property("area", TypeRef::path("f64"))),
            )
            .with_type(
                generated("crate::ShapeImpl", "Api")
                    .with_interface(TypeRef::path("crate::Shape"))
                    .with_attr(Attribute::AugmentParent)
                    .with_member(MemberNode::field("sides", TypeRef::path("u32"))),
            );
        let plan = generator(graph).plan();

        let api = &plan.files[0].content;
        assert_eq!(api.matches("interface Shape").count(), 1);
        assert!(api.contains("area: number;"));
        assert!(api.contains("sides: number;"));
    }

    #[test]
    fn test_targets_declared_in() {
        let graph = TypeGraph::new()
            .with_type(generated("crate::A", "Api").declared_in("/src/a.rs"))
            .with_type(
                TypeNode::new("crate::B", TypeKind::Class)
                    .with_attr(Attribute::Generate(true))
                    .with_output_path("B.type.ts")
                    .declared_in("/src/a.rs"),
            )
            .with_type(generated("crate::C", "Other").declared_in("/src/c.rs"));
        let targets = generator(graph).targets_declared_in(Path::new("/src/a.rs"));

        let expected: BTreeSet<PathBuf> =
            [PathBuf::from("/out/Api.d.ts"), PathBuf::from("/out/B.type.ts")].into();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_config_mapping_wins_over_graph_mapping() {
        let mut graph = TypeGraph::new();
        graph.add_external_mapping("crate::Stamp", "number");
        let mut generator = generator(graph);
        let mut config = config();
        config
            .type_mappings
            .insert("crate::Stamp".into(), crate::registry::TypeMapping::inline("string"));
        generator.set_config(config);

        let registry = generator.effective_registry();
        assert_eq!(
            registry.get("crate::Stamp"),
            Some(&crate::registry::TypeMapping::inline("string"))
        );
    }
}
