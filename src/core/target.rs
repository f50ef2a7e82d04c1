//! Target definitions - the nodes of the build DAG.
//!
//! Targets and sources live in flat vectors owned by [`TargetGraph`]; every
//! cross-reference is a stable integer handle into those vectors, so the DAG
//! needs no ambient pointer graph and serializes naturally.

use std::path::{Path, PathBuf};

use crate::core::source::SourceFile;

/// Stable handle to a target within a [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub usize);

/// Stable handle to a source within a [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub usize);

/// The kind of artifact a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Object compiled from a Fortran source.
    FortranObject,
    /// Object compiled from a C source.
    CObject,
    /// Object compiled from a C++ source.
    CppObject,
    /// Static library aggregating one package's objects.
    Archive,
    /// Linked executable.
    Executable,
    /// Shared library.
    SharedLib,
}

impl TargetKind {
    /// Get the target kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::FortranObject => "fortran-object",
            TargetKind::CObject => "c-object",
            TargetKind::CppObject => "c++-object",
            TargetKind::Archive => "archive",
            TargetKind::Executable => "executable",
            TargetKind::SharedLib => "shared-lib",
        }
    }

    /// Whether this is an object-file target.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            TargetKind::FortranObject | TargetKind::CObject | TargetKind::CppObject
        )
    }
}

/// The kind of edge between two targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    /// The dependency must be compiled before this target compiles
    /// (module or include relationship).
    Compile,
    /// The dependency's output is an input to this target's link/archive.
    Link,
}

/// A dependency edge.
#[derive(Debug, Clone, Copy)]
pub struct TargetDep {
    pub target: TargetId,
    pub kind: DepKind,
}

/// One node in the build DAG.
#[derive(Debug, Clone)]
pub struct Target {
    /// Artifact kind.
    pub kind: TargetKind,

    /// Absolute output path.
    pub output_file: PathBuf,

    /// Owning package name.
    pub package: String,

    /// Back-reference to the producing source, for object kinds.
    pub source: Option<SourceId>,

    /// Dependency edges.
    pub dependencies: Vec<TargetDep>,

    /// Compile flags (language + package + feature + macro flags).
    pub compile_flags: Vec<String>,

    /// Link flags, including `-l` entries for native libraries.
    pub link_flags: Vec<String>,

    /// Include and module-directory flags.
    pub include_flags: Vec<String>,

    /// Macro definitions already rendered as flags (`-DNAME[=VAL]`).
    pub preprocess_defs: Vec<String>,

    /// Inputs to an archive or link step, in link order.
    pub link_objects: Vec<PathBuf>,

    /// Digests of located include files folded into `digest_expected`.
    pub include_digests: Vec<u64>,

    /// Expected digest: source, then dependency digests, then flags.
    pub digest_expected: u64,

    /// Digest read back from the sibling `.digest` file, if any.
    pub digest_cached: Option<u64>,

    /// Whether this target is up to date and can be skipped.
    pub skip: bool,

    /// Region index assigned by the scheduler.
    pub schedule_region: usize,

    /// DFS mark: fully visited.
    pub sorted: bool,

    /// DFS mark: on the current visit stack.
    pub visiting: bool,
}

impl Target {
    /// Create an empty target of the given kind.
    pub fn new(kind: TargetKind, output_file: PathBuf, package: impl Into<String>) -> Self {
        Target {
            kind,
            output_file,
            package: package.into(),
            source: None,
            dependencies: Vec::new(),
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            include_flags: Vec::new(),
            preprocess_defs: Vec::new(),
            link_objects: Vec::new(),
            include_digests: Vec::new(),
            digest_expected: 0,
            digest_cached: None,
            skip: false,
            schedule_region: 0,
            sorted: false,
            visiting: false,
        }
    }

    /// Add a dependency edge.
    pub fn depend(&mut self, target: TargetId, kind: DepKind) {
        // Duplicate edges are harmless but noisy; drop them here.
        if !self.dependencies.iter().any(|d| d.target == target) {
            self.dependencies.push(TargetDep { target, kind });
        }
    }

    /// The flag string hashed into the expected digest.
    pub fn flag_string(&self) -> String {
        let mut parts = Vec::new();
        parts.extend(self.compile_flags.iter().cloned());
        parts.extend(self.preprocess_defs.iter().cloned());
        parts.extend(self.include_flags.iter().cloned());
        parts.extend(self.link_flags.iter().cloned());
        parts.join(" ")
    }

    /// Sibling path of the digest cache file.
    pub fn digest_file(&self) -> PathBuf {
        sibling(&self.output_file, "digest")
    }

    /// Sibling path of the captured log file.
    pub fn log_file(&self) -> PathBuf {
        sibling(&self.output_file, "log")
    }

    /// A short `<pkg>.<basename>` label for progress output.
    pub fn label(&self) -> String {
        let base = self
            .output_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_file.display().to_string());
        format!("{}.{}", self.package, base)
    }
}

fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(ext);
    path.with_file_name(name)
}

/// The build DAG: flat vectors of targets and sources with handle edges.
#[derive(Debug, Default)]
pub struct TargetGraph {
    pub targets: Vec<Target>,
    pub sources: Vec<SourceFile>,
}

impl TargetGraph {
    /// Add a target, returning its handle.
    pub fn push_target(&mut self, target: Target) -> TargetId {
        let id = TargetId(self.targets.len());
        self.targets.push(target);
        id
    }

    /// Add a source, returning its handle.
    pub fn push_source(&mut self, source: SourceFile) -> SourceId {
        let id = SourceId(self.sources.len());
        self.sources.push(source);
        id
    }

    /// Borrow a target by handle.
    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }

    /// Mutably borrow a target by handle.
    pub fn target_mut(&mut self, id: TargetId) -> &mut Target {
        &mut self.targets[id.0]
    }

    /// Borrow a source by handle.
    pub fn source(&self, id: SourceId) -> &SourceFile {
        &self.sources[id.0]
    }

    /// The source backing a target, if it is an object target.
    pub fn source_of(&self, id: TargetId) -> Option<&SourceFile> {
        self.target(id).source.map(|sid| self.source(sid))
    }

    /// All target handles.
    pub fn ids(&self) -> impl Iterator<Item = TargetId> {
        (0..self.targets.len()).map(TargetId)
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
