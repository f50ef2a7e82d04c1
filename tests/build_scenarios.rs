//! End-to-end build scenarios against a stub toolchain.
//!
//! A fake compiler/archiver pair (shell scripts that honor `-o` and fail on
//! sources containing "bad") stands in for gfortran/ar, so these tests
//! exercise the full pipeline: assembly, graph construction, scheduling,
//! parallel execution, digest caching, and compile_commands emission.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fathom::core::model::Profile;
use fathom::ops::build::{build, BuildOptions};
use tempfile::TempDir;

/// Install the stub toolchain once and point FC/CC/CXX/AR at it.
fn stub_toolchain() -> &'static Path {
    static STUBS: OnceLock<PathBuf> = OnceLock::new();
    STUBS.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("fathom-stub-tools-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let fc = dir.join("fake-fc");
        std::fs::write(
            &fc,
            r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "GNU Fortran (fake) 13.0.0"
  exit 0
fi
out=""
prev=""
for a in "$@"; do
  case "$a" in
    *bad*) echo "fake-fc: error in $a" >&2; exit 1 ;;
  esac
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
if [ -n "$out" ]; then
  echo "built" > "$out"
fi
exit 0
"#,
        )
        .unwrap();
        std::fs::set_permissions(&fc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ar = dir.join("fake-ar");
        std::fs::write(
            &ar,
            r#"#!/bin/sh
# fake-ar rcs <out> <objects...>
out="$2"
echo "archive" > "$out"
exit 0
"#,
        )
        .unwrap();
        std::fs::set_permissions(&ar, std::fs::Permissions::from_mode(0o755)).unwrap();

        std::env::set_var("FC", &fc);
        std::env::set_var("CC", &fc);
        std::env::set_var("CXX", &fc);
        std::env::set_var("AR", &ar);

        dir
    })
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project(name: &str) -> (TempDir, PathBuf) {
    stub_toolchain();
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "fathom.toml",
        &format!("name = \"{name}\"\nversion = \"0.1.0\"\n\n[library]\n"),
    );
    let manifest = tmp.path().join("fathom.toml");
    (tmp, manifest)
}

fn quiet_options() -> BuildOptions {
    BuildOptions {
        profile: Profile::Debug,
        jobs: Some(2),
        verbose: true,
        ..Default::default()
    }
}

#[test]
fn single_module_builds_once() {
    let (tmp, manifest) = project("single");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");

    // First build: one compile, one archive.
    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 2);
    assert_eq!(outcome.skipped, 0);

    let obj = tmp.path().join("build/debug/single/m.o");
    assert!(obj.exists());
    assert!(tmp.path().join("build/debug/single/m.o.digest").exists());
    assert!(tmp.path().join("build/debug/single/libsingle.a").exists());

    // Second build without changes: zero commands.
    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 0);
    assert_eq!(outcome.skipped, 2);
}

#[test]
fn module_chain_schedules_in_order() {
    let (tmp, manifest) = project("chain");
    write(tmp.path(), "src/a.f90", "module a\nend module a\n");
    write(tmp.path(), "src/b.f90", "module b\nuse a\nend module b\n");
    write(
        tmp.path(),
        "app/main.f90",
        "program main\nuse b\nend program main\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    // a.o, b.o, main.o, libchain.a, main
    assert_eq!(outcome.executed, 5);
    assert!(tmp.path().join("build/debug/app/chain/main").exists());

    // Touching a.f90 rebuilds the full chain.
    write(
        tmp.path(),
        "src/a.f90",
        "module a\ninteger :: x\nend module a\n",
    );
    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 5);
    assert_eq!(outcome.skipped, 0);
}

#[test]
fn intrinsic_modules_need_no_provider() {
    let (tmp, manifest) = project("intrinsics");
    write(
        tmp.path(),
        "src/x.f90",
        "module x\nuse iso_fortran_env\nuse, intrinsic :: iso_c_binding\nend module x\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
}

#[test]
fn module_cycle_is_fatal_before_any_command() {
    let (tmp, manifest) = project("cyclic");
    write(tmp.path(), "src/a.f90", "module a\nuse b\nend module a\n");
    write(tmp.path(), "src/b.f90", "module b\nuse a\nend module b\n");

    let err = build(&manifest, &quiet_options()).unwrap_err();
    let text = err.to_string();
    assert!(text.contains("cycle"), "unexpected error: {text}");
    assert!(text.contains("a.o"));
    assert!(text.contains("b.o"));

    // No compile command was issued.
    assert!(!tmp.path().join("build/debug/cyclic/a.o").exists());
    assert!(!tmp.path().join("build/debug/cyclic/b.o").exists());
}

#[test]
fn header_change_rebuilds_only_the_including_object() {
    let (tmp, manifest) = project("mixed");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");
    write(
        tmp.path(),
        "src/impl.c",
        "#include \"defs.h\"\nint f(void) { return X; }\n",
    );
    write(tmp.path(), "src/defs.h", "#define X 1\n");

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    // m.o, impl.o, libmixed.a (the header itself is not a target)
    assert_eq!(outcome.executed, 3);

    write(tmp.path(), "src/defs.h", "#define X 2\n");
    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    // impl.o and the archive rebuild; the Fortran object is untouched.
    assert_eq!(outcome.executed, 2);
    assert_eq!(outcome.skipped, 1);
}

#[test]
fn independent_modules_share_a_region() {
    let (tmp, manifest) = project("wide");
    for i in 0..4 {
        write(
            tmp.path(),
            &format!("src/m{i}.f90"),
            &format!("module m{i}\nend module m{i}\n"),
        );
    }
    write(
        tmp.path(),
        "app/main.f90",
        "program main\nuse m0\nuse m1\nuse m2\nuse m3\nend program main\n",
    );

    let mut opts = quiet_options();
    opts.jobs = Some(4);
    let outcome = build(&manifest, &opts).unwrap();
    assert!(outcome.success);
    // 4 modules + main.o + archive + exe
    assert_eq!(outcome.executed, 7);
    assert!(tmp.path().join("build/debug/app/wide/main").exists());
}

#[test]
fn touching_one_source_rebuilds_exactly_its_cone() {
    let (tmp, manifest) = project("cone");
    write(tmp.path(), "src/a.f90", "module a\nend module a\n");
    write(tmp.path(), "src/b.f90", "module b\nuse a\nend module b\n");
    write(tmp.path(), "src/z.f90", "module z\nend module z\n");
    write(
        tmp.path(),
        "app/main.f90",
        "program main\nuse b\nend program main\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 6);

    // Touch b.f90: rebuilds b.o, main.o, the archive, and the executable.
    // a.o and z.o stay fresh.
    write(
        tmp.path(),
        "src/b.f90",
        "module b\nuse a\ninteger :: y\nend module b\n",
    );
    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 4);
    assert_eq!(outcome.skipped, 2);
}

#[test]
fn failure_stops_later_regions_but_finishes_the_region() {
    let (tmp, manifest) = project("failing");
    write(tmp.path(), "src/good.f90", "module good\nend module good\n");
    write(
        tmp.path(),
        "src/bad_unit.f90",
        "module bad_unit\nend module bad_unit\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0]
        .output_file
        .to_string_lossy()
        .contains("bad_unit"));

    // The sibling in the same region completed; the archive region never ran.
    assert!(tmp.path().join("build/debug/failing/good.o").exists());
    assert!(!tmp
        .path()
        .join("build/debug/failing/libfailing.a")
        .exists());

    // The captured log holds the compiler output.
    let log = tmp.path().join("build/debug/failing/bad_unit.o.log");
    let content = std::fs::read_to_string(log).unwrap();
    assert!(content.contains("fake-fc: error"));
}

#[test]
fn dependency_packages_build_and_link() {
    let (tmp, manifest) = project("top");
    write(
        tmp.path(),
        "fathom.toml",
        "name = \"top\"\nversion = \"0.1.0\"\n\n[library]\n\n[dependencies]\nleaf = { path = \"leaf\" }\n",
    );
    write(
        tmp.path(),
        "src/top.f90",
        "module top\nuse leaf\nend module top\n",
    );
    write(
        tmp.path(),
        "app/main.f90",
        "program main\nuse top\nend program main\n",
    );
    write(
        tmp.path(),
        "leaf/fathom.toml",
        "name = \"leaf\"\nversion = \"0.1.0\"\n\n[library]\n",
    );
    write(tmp.path(), "leaf/src/leaf.f90", "module leaf\nend module leaf\n");

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert!(tmp.path().join("build/debug/leaf/libleaf.a").exists());
    assert!(tmp.path().join("build/debug/top/libtop.a").exists());
    assert!(tmp.path().join("build/debug/app/top/main").exists());
}

#[test]
fn compile_commands_round_trip() {
    let (tmp, manifest) = project("cmds");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");
    write(
        tmp.path(),
        "app/main.f90",
        "program main\nuse m\nend program main\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);

    let path = tmp.path().join("build/debug/compile_commands.json");
    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();

    let entries = parsed.as_array().unwrap();
    // Two compiles were recorded: m.o and main.o. Links are not compiles.
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert!(entry.get("directory").is_some());
        assert!(entry.get("file").is_some());
        let arguments = entry.get("arguments").unwrap().as_array().unwrap();
        assert!(arguments[0].as_str().unwrap().contains("fake-fc"));
    }

    // Round trip: parse and re-emit is identical modulo formatting.
    let reemitted = serde_json::to_value(parsed.clone()).unwrap();
    assert_eq!(parsed, reemitted);
}

#[test]
fn dry_run_records_but_touches_nothing() {
    let (tmp, manifest) = project("dry");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");

    let mut opts = quiet_options();
    opts.dry_run = true;
    let outcome = build(&manifest, &opts).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 2);

    // Commands were recorded for the would-be compiles.
    assert!(tmp
        .path()
        .join("build/debug/compile_commands.json")
        .exists());
    // But no object, digest, or archive was produced.
    assert!(!tmp.path().join("build/debug/dry/m.o").exists());
    assert!(!tmp.path().join("build/debug/dry/m.o.digest").exists());
    assert!(!tmp.path().join("build/debug/dry/libdry.a").exists());
}

#[test]
fn test_scope_builds_only_on_request() {
    let (tmp, manifest) = project("tested");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");
    write(
        tmp.path(),
        "test/check.f90",
        "program check\nuse m\nend program check\n",
    );

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert!(!tmp.path().join("build/debug/test/tested/check").exists());

    let mut opts = quiet_options();
    opts.include_tests = true;
    let outcome = build(&manifest, &opts).unwrap();
    assert!(outcome.success);
    assert!(tmp.path().join("build/debug/test/tested/check").exists());
}

#[test]
fn flag_change_invalidates_objects() {
    let (tmp, manifest) = project("flags");
    write(tmp.path(), "src/m.f90", "module m\nend module m\n");

    let outcome = build(&manifest, &quiet_options()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 2);

    // A different flag set produces a different expected digest.
    let mut opts = quiet_options();
    opts.fortran_flags = vec!["-ffast-math".to_string()];
    let outcome = build(&manifest, &opts).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.executed, 2);
    assert_eq!(outcome.skipped, 0);
}
