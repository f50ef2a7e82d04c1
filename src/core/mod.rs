//! Core data model: manifests, packages, sources, targets.

pub mod manifest;
pub mod model;
pub mod package;
pub mod source;
pub mod target;

pub use manifest::Manifest;
pub use model::{BuildModel, Profile};
pub use package::Package;
pub use source::{Scope, SourceFile, UnitKind};
pub use target::{DepKind, Target, TargetGraph, TargetId, TargetKind};
