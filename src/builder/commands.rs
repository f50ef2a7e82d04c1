//! The compile command record table.
//!
//! Accumulates `{directory, file, arguments}` entries for every compile and
//! serializes them to `<build_prefix>/compile_commands.json` at build end.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::util::fs::write_string;

/// One entry of compile_commands.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompileCommand {
    /// Absolute build root.
    pub directory: String,
    /// The source file.
    pub file: String,
    /// Flat token list beginning with the compiler executable.
    pub arguments: Vec<String>,
}

/// Append-only table of compile commands, safe for concurrent workers.
#[derive(Debug, Default)]
pub struct CommandTable {
    entries: Mutex<Vec<CompileCommand>>,
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        CommandTable::default()
    }

    /// Record one compile command.
    pub fn register(&self, directory: &Path, file: &Path, arguments: Vec<String>) {
        let entry = CompileCommand {
            directory: directory.display().to_string(),
            file: file.display().to_string(),
            arguments,
        };
        self.entries
            .lock()
            .expect("command table lock poisoned")
            .push(entry);
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("command table lock poisoned").len()
    }

    /// Whether no command was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the entries, sorted by file for a stable artifact.
    pub fn entries(&self) -> Vec<CompileCommand> {
        let mut entries = self
            .entries
            .lock()
            .expect("command table lock poisoned")
            .clone();
        entries.sort_by(|a, b| a.file.cmp(&b.file));
        entries
    }

    /// Write `compile_commands.json` under `build_prefix`.
    ///
    /// Nothing is written when the table is empty.
    pub fn write(&self, build_prefix: &Path) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }

        let path = build_prefix.join("compile_commands.json");
        let json = serde_json::to_string_pretty(&self.entries())?;
        write_string(&path, &json)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_and_write() {
        let tmp = TempDir::new().unwrap();
        let table = CommandTable::new();

        table.register(
            tmp.path(),
            Path::new("src/m.f90"),
            vec![
                "gfortran".to_string(),
                "-c".to_string(),
                "src/m.f90".to_string(),
            ],
        );

        let path = table.write(tmp.path()).unwrap().unwrap();
        assert!(path.ends_with("compile_commands.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<CompileCommand> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].file, "src/m.f90");
        assert_eq!(parsed[0].arguments[0], "gfortran");
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let table = CommandTable::new();

        assert!(table.write(tmp.path()).unwrap().is_none());
        assert!(!tmp.path().join("compile_commands.json").exists());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let table = CommandTable::new();
        table.register(
            Path::new("/build"),
            Path::new("b.f90"),
            vec!["fc".to_string(), "b.f90".to_string()],
        );
        table.register(
            Path::new("/build"),
            Path::new("a.f90"),
            vec!["fc".to_string(), "a.f90".to_string()],
        );

        let entries = table.entries();
        let json = serde_json::to_string(&entries).unwrap();
        let parsed: Vec<CompileCommand> = serde_json::from_str(&json).unwrap();
        let rejson = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, rejson);

        // Sorted by file regardless of registration order.
        assert_eq!(entries[0].file, "a.f90");
        assert_eq!(entries[1].file, "b.f90");
    }

    #[test]
    fn test_concurrent_registration() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(CommandTable::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = table.clone();
                thread::spawn(move || {
                    for j in 0..16 {
                        table.register(
                            Path::new("/build"),
                            Path::new(&format!("f{i}_{j}.f90")),
                            vec!["fc".to_string()],
                        );
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(table.len(), 128);
    }
}
