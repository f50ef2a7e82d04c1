//! Target graph construction.
//!
//! Expands the build model into the typed target DAG: one object target per
//! compiled source, an archive (or shared library) per package library, and
//! an executable per program unit, with compile/link edges, composed flag
//! strings, and bottom-up expected digests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::model::BuildModel;
use crate::core::package::Package;
use crate::core::source::{Scope, UnitKind};
use crate::core::target::{DepKind, SourceId, Target, TargetGraph, TargetId, TargetKind};
use crate::util::diagnostic::BuildError;
use crate::util::fs::relative_path;
use crate::util::hash::{self, DigestBuilder};

/// Build the target DAG from a model.
pub fn build_target_graph(model: &BuildModel) -> Result<TargetGraph> {
    let mut builder = GraphBuilder::new(model);
    builder.add_objects()?;
    builder.add_libraries();
    builder.add_executables()?;
    builder.compute_digests()?;
    Ok(builder.graph)
}

/// Per-package bookkeeping while the graph is assembled.
struct PackageEntry {
    /// Object targets of Lib-scope sources.
    lib_objects: Vec<TargetId>,
    /// Module name -> providing object, this package only.
    modules: BTreeMap<String, TargetId>,
    /// The package's archive or shared library, once created.
    library: Option<TargetId>,
}

struct GraphBuilder<'a> {
    model: &'a BuildModel,
    graph: TargetGraph,
    /// Indexed parallel to `model.packages`.
    entries: Vec<PackageEntry>,
    /// (package index, source id, target id) for every object target.
    objects: Vec<(usize, SourceId, TargetId)>,
}

impl<'a> GraphBuilder<'a> {
    fn new(model: &'a BuildModel) -> Self {
        let entries = model
            .packages
            .iter()
            .map(|_| PackageEntry {
                lib_objects: Vec::new(),
                modules: BTreeMap::new(),
                library: None,
            })
            .collect();

        GraphBuilder {
            model,
            graph: TargetGraph::default(),
            entries,
            objects: Vec::new(),
        }
    }

    /// Create one object target per buildable source, then wire module and
    /// include dependencies.
    fn add_objects(&mut self) -> Result<()> {
        for (pkg_index, package) in self.model.packages.iter().enumerate() {
            for source in &package.sources {
                let source_id = self.graph.push_source(source.clone());

                if source.scope == Scope::Dep || !source.unit_kind.is_compiled() {
                    continue;
                }
                if !self.model.include_tests && source.scope == Scope::Test {
                    continue;
                }

                let kind = match source.unit_kind {
                    UnitKind::CSource => TargetKind::CObject,
                    UnitKind::CppSource => TargetKind::CppObject,
                    _ => TargetKind::FortranObject,
                };

                let output = self.object_output(package, &source.path);
                let mut target = Target::new(kind, output, &package.name);
                target.source = Some(source_id);
                self.compose_object_flags(&mut target, pkg_index, kind);

                let id = self.graph.push_target(target);
                self.objects.push((pkg_index, source_id, id));

                let entry = &mut self.entries[pkg_index];
                if source.scope == Scope::Lib {
                    entry.lib_objects.push(id);
                }
                for module in &source.provided_modules {
                    entry.modules.entry(module.clone()).or_insert(id);
                }
            }
        }

        self.wire_module_edges()?;
        self.wire_include_digests();
        Ok(())
    }

    /// Derive `build_prefix/<package>/<relpath>/<stem>.o`.
    fn object_output(&self, package: &Package, source_path: &Path) -> PathBuf {
        let rel = relative_path(&package.root, source_path);
        let rel = if rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            source_path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| rel.clone())
        } else {
            rel
        };
        self.model
            .package_dir(&package.name)
            .join(rel.with_extension("o"))
    }

    /// Deterministic flag composition: global language flags, package
    /// feature flags, macro defs, include flags, module output flag.
    fn compose_object_flags(&self, target: &mut Target, pkg_index: usize, kind: TargetKind) {
        let package = &self.model.packages[pkg_index];
        let compiler = &self.model.compiler;
        let flag_set = compiler.flag_set();

        match kind {
            TargetKind::FortranObject => {
                target.compile_flags.extend(self.model.fortran_flags.iter().cloned());
                target
                    .compile_flags
                    .extend(compiler.feature_flags(&package.features));
            }
            TargetKind::CObject => {
                target.compile_flags.extend(self.model.c_flags.iter().cloned());
            }
            TargetKind::CppObject => {
                target.compile_flags.extend(self.model.cxx_flags.iter().cloned());
            }
            _ => {}
        }

        if let Some(pp) = package.preprocess() {
            for macro_def in &pp.macros {
                target.preprocess_defs.push(format!("-D{macro_def}"));
            }
        }

        for dir in self.include_search_dirs(pkg_index) {
            target.include_flags.extend(flag_set.include_flag(&dir));
        }

        // Module search paths: own package first, then dependencies, so
        // `.mod` files resolve across package boundaries.
        if kind == TargetKind::FortranObject {
            for dir in self.module_search_dirs(pkg_index) {
                target.include_flags.extend(flag_set.include_flag(&dir));
            }
            target.include_flags.extend(
                flag_set.module_output_flag(&self.model.package_dir(&package.name)),
            );
        }
    }

    fn include_search_dirs(&self, pkg_index: usize) -> Vec<PathBuf> {
        let mut dirs = self.model.packages[pkg_index].include_dirs();
        dirs.extend(self.model.include_dirs.iter().cloned());
        dirs
    }

    fn module_search_dirs(&self, pkg_index: usize) -> Vec<PathBuf> {
        let own = &self.model.packages[pkg_index].name;
        let mut dirs = vec![self.model.package_dir(own)];
        for package in &self.model.packages {
            if package.name != *own {
                dirs.push(self.model.package_dir(&package.name));
            }
        }
        dirs
    }

    /// Resolve every used module to its providing object target.
    fn wire_module_edges(&mut self) -> Result<()> {
        let mut edges: Vec<(TargetId, TargetId)> = Vec::new();

        for &(pkg_index, source_id, target_id) in &self.objects {
            let source = self.graph.source(source_id);

            for module in source.module_dependencies() {
                if self.model.external_modules.contains(module) {
                    continue;
                }

                let provider = self.resolve_module(pkg_index, module);
                match provider {
                    Some(provider) if provider != target_id => {
                        edges.push((target_id, provider));
                    }
                    Some(_) => {} // defined and used in the same file
                    None => {
                        return Err(BuildError::MissingModule {
                            module: module.clone(),
                            consumer: source.path.clone(),
                        }
                        .into())
                    }
                }
            }
        }

        for (from, to) in edges {
            self.graph.target_mut(from).depend(to, DepKind::Compile);
        }
        Ok(())
    }

    /// Search order: same package first, then the model's package order.
    fn resolve_module(&self, pkg_index: usize, module: &str) -> Option<TargetId> {
        if let Some(&id) = self.entries[pkg_index].modules.get(module) {
            return Some(id);
        }
        self.entries
            .iter()
            .find_map(|entry| entry.modules.get(module).copied())
    }

    /// Locate quoted includes and fold their digests into the object.
    fn wire_include_digests(&mut self) {
        for &(pkg_index, source_id, target_id) in &self.objects {
            let source = self.graph.source(source_id);
            if source.include_deps.is_empty() {
                continue;
            }

            let mut search = Vec::new();
            if let Some(parent) = source.path.parent() {
                search.push(parent.to_path_buf());
            }
            search.extend(self.include_search_dirs(pkg_index));

            let mut digests = Vec::new();
            for include in &source.include_deps {
                let located = search.iter().map(|d| d.join(include)).find(|p| p.is_file());
                match located {
                    Some(path) => match hash::digest_file(&path) {
                        Ok(digest) => digests.push(digest),
                        Err(e) => tracing::warn!("failed to digest include {include}: {e}"),
                    },
                    None => {
                        tracing::debug!(
                            "include `{}` of {} not found in configured directories; \
                             assuming a system header",
                            include,
                            source.path.display()
                        );
                    }
                }
            }

            self.graph.target_mut(target_id).include_digests = digests;
        }
    }

    /// Create one archive (or shared library) per package with lib objects.
    fn add_libraries(&mut self) {
        for (pkg_index, package) in self.model.packages.iter().enumerate() {
            let lib_objects = self.entries[pkg_index].lib_objects.clone();
            if lib_objects.is_empty() {
                continue;
            }

            let (kind, file_name) = if package.shared_library() {
                (TargetKind::SharedLib, shared_lib_name(&package.name))
            } else {
                (TargetKind::Archive, format!("lib{}.a", package.name))
            };

            let output = self.model.package_dir(&package.name).join(file_name);
            let mut target = Target::new(kind, output, &package.name);

            for &object in &lib_objects {
                target.depend(object, DepKind::Link);
                target
                    .link_objects
                    .push(self.graph.target(object).output_file.clone());
            }

            if kind == TargetKind::SharedLib {
                target.link_flags.extend(self.model.link_flags.iter().cloned());
            }

            let id = self.graph.push_target(target);
            self.entries[pkg_index].library = Some(id);
        }
    }

    /// Create one executable per program unit of the root package.
    fn add_executables(&mut self) -> Result<()> {
        let objects = self.objects.clone();

        for &(pkg_index, source_id, object_id) in &objects {
            let source = self.graph.source(source_id).clone();

            let scope_dir = match source.scope {
                Scope::App => "app",
                Scope::Test => "test",
                Scope::Example => "example",
                _ => continue,
            };

            let is_program = source.unit_kind == UnitKind::Program || source.exe_name.is_some();
            if !is_program {
                continue;
            }

            let package = &self.model.packages[pkg_index];
            let exe_name = source
                .exe_name
                .clone()
                .unwrap_or_else(|| stem_of(&source.path));

            let output = self
                .model
                .build_prefix
                .join(scope_dir)
                .join(&package.name)
                .join(exe_file_name(&exe_name));

            let mut target = Target::new(TargetKind::Executable, output, &package.name);
            target.depend(object_id, DepKind::Compile);
            target
                .link_objects
                .push(self.graph.target(object_id).output_file.clone());

            // Helper objects: same-scope module providers reached from the
            // program, transitively. Library objects arrive via the archive.
            for helper in self.helper_closure(object_id) {
                target.depend(helper, DepKind::Link);
                target
                    .link_objects
                    .push(self.graph.target(helper).output_file.clone());
            }

            // Package libraries in link order.
            for lib_pkg_index in self.package_link_order(pkg_index) {
                if let Some(library) = self.entries[lib_pkg_index].library {
                    target.depend(library, DepKind::Link);
                    target
                        .link_objects
                        .push(self.graph.target(library).output_file.clone());
                }
            }

            // Native libraries, then global link flags.
            for lib in source.link_libraries.iter().chain(self.model.link_libraries.iter()) {
                target.link_flags.push(format!("-l{lib}"));
            }
            target.link_flags.extend(self.model.link_flags.iter().cloned());

            // A C/C++ main linked by the Fortran driver needs the vendor's
            // no-main flags.
            let program_kind = self.graph.target(object_id).kind;
            if matches!(program_kind, TargetKind::CObject | TargetKind::CppObject) {
                target
                    .link_flags
                    .extend(self.model.compiler.flag_set().nonlanguage_main_flags());
            }

            self.graph.push_target(target);
        }

        Ok(())
    }

    /// Transitive compile-edge closure of an executable's program object,
    /// restricted to non-library objects (those are already in the archive).
    fn helper_closure(&self, program: TargetId) -> Vec<TargetId> {
        let mut stack = vec![program];
        let mut visited = vec![program];
        let mut helpers = Vec::new();

        while let Some(id) = stack.pop() {
            for dep in &self.graph.target(id).dependencies {
                if dep.kind != DepKind::Compile || visited.contains(&dep.target) {
                    continue;
                }
                visited.push(dep.target);

                let dep_target = self.graph.target(dep.target);
                if !dep_target.kind.is_object() {
                    continue;
                }
                let is_lib = dep_target
                    .source
                    .map(|sid| self.graph.source(sid).scope == Scope::Lib)
                    .unwrap_or(false);
                if is_lib {
                    // Library objects still gate recompilation, so keep
                    // walking through them without linking them directly.
                    stack.push(dep.target);
                    continue;
                }

                helpers.push(dep.target);
                stack.push(dep.target);
            }
        }

        helpers.sort();
        helpers
    }

    /// Reverse post-order flattening of the package dependency graph from
    /// `root`: the root's library first, deepest dependencies last.
    fn package_link_order(&self, root: usize) -> Vec<usize> {
        let index_of: BTreeMap<&str, usize> = self
            .model
            .packages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();

        let mut post_order = Vec::new();
        let mut visited = vec![false; self.model.packages.len()];

        fn visit(
            index: usize,
            packages: &[Package],
            index_of: &BTreeMap<&str, usize>,
            visited: &mut [bool],
            post_order: &mut Vec<usize>,
        ) {
            if visited[index] {
                return;
            }
            visited[index] = true;
            for dep_name in packages[index].dependency_names() {
                if let Some(&dep_index) = index_of.get(dep_name.as_str()) {
                    visit(dep_index, packages, index_of, visited, post_order);
                }
            }
            post_order.push(index);
        }

        visit(
            root,
            &self.model.packages,
            &index_of,
            &mut visited,
            &mut post_order,
        );

        post_order.reverse();
        post_order
    }

    /// Bottom-up expected digests over the DAG.
    fn compute_digests(&mut self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks = vec![Mark::White; self.graph.len()];
        let mut stack: Vec<TargetId> = Vec::new();

        fn visit(
            id: TargetId,
            graph: &mut TargetGraph,
            marks: &mut [Mark],
            stack: &mut Vec<TargetId>,
        ) -> Result<u64> {
            match marks[id.0] {
                Mark::Black => return Ok(graph.target(id).digest_expected),
                Mark::Grey => {
                    // Report the cycle from its first participant around to
                    // the repeated node.
                    let from = stack.iter().position(|s| *s == id).unwrap_or(0);
                    let mut names: Vec<String> = stack[from..]
                        .iter()
                        .map(|s| graph.target(*s).output_file.display().to_string())
                        .collect();
                    names.push(graph.target(id).output_file.display().to_string());
                    return Err(BuildError::Cycle { names }.into());
                }
                Mark::White => {}
            }
            marks[id.0] = Mark::Grey;
            stack.push(id);

            let mut deps: Vec<TargetId> = graph
                .target(id)
                .dependencies
                .iter()
                .map(|d| d.target)
                .collect();
            deps.sort_by(|a, b| {
                graph
                    .target(*a)
                    .output_file
                    .cmp(&graph.target(*b).output_file)
            });

            let mut dep_digests = Vec::with_capacity(deps.len());
            for dep in deps {
                dep_digests.push(visit(dep, graph, marks, stack)?);
            }

            let target = graph.target(id);
            let mut builder = DigestBuilder::new();
            if let Some(source) = target.source {
                builder.update_u64(graph.source(source).digest);
            }
            for include_digest in &target.include_digests {
                builder.update_u64(*include_digest);
            }
            for dep_digest in dep_digests {
                builder.update_u64(dep_digest);
            }
            builder.update_str(&target.flag_string());
            let digest = builder.finish();

            graph.target_mut(id).digest_expected = digest;
            marks[id.0] = Mark::Black;
            stack.pop();
            Ok(digest)
        }

        for id in (0..self.graph.len()).map(TargetId) {
            visit(id, &mut self.graph, &mut marks, &mut stack)?;
        }
        Ok(())
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

fn exe_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn shared_lib_name(package: &str) -> String {
    if cfg!(windows) {
        // The import-library sibling `<name>.dll.a` is produced alongside.
        format!("{package}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{package}.dylib")
    } else {
        format!("lib{package}.so")
    }
}
