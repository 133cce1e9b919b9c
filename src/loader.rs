//! This module provides the `MachineLoader` struct, responsible for loading machine
//! descriptions from files, directories and strings, in either the JSON or the `.mt` format.

use crate::description::Machine;
use crate::parser::parse;
use crate::types::{MachinationError, MAX_DESCRIPTION_SIZE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The persisted syntaxes a description can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Text,
}

impl Format {
    /// Picks the format from a file extension: `json` or `mt`.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "mt" => Some(Format::Text),
            _ => None,
        }
    }

    /// Guesses the format of raw content: JSON descriptions are objects.
    pub fn detect(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            Format::Json
        } else {
            Format::Text
        }
    }
}

/// `MachineLoader` is a utility struct for loading machine descriptions.
pub struct MachineLoader;

impl MachineLoader {
    /// Loads a single machine from the specified file path.
    ///
    /// The format is chosen by extension and falls back to content detection.
    ///
    /// # Returns
    ///
    /// * `Ok(Machine)` if the file is successfully read and parsed.
    /// * `Err(MachinationError::FileError)` if the file cannot be read or is too large.
    /// * Any parse error of the chosen format.
    pub fn load_machine(path: &Path) -> Result<Machine, MachinationError> {
        let content = fs::read_to_string(path).map_err(|e| {
            MachinationError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let format = Format::from_path(path).unwrap_or_else(|| Format::detect(&content));
        debug!(path = %path.display(), ?format, "loading machine");

        Self::load_machine_as(&content, format)
    }

    /// Loads a machine from string content, detecting its format.
    pub fn load_machine_from_string(content: &str) -> Result<Machine, MachinationError> {
        Self::load_machine_as(content, Format::detect(content))
    }

    /// Loads a machine from string content in a known format.
    pub fn load_machine_as(content: &str, format: Format) -> Result<Machine, MachinationError> {
        if content.len() > MAX_DESCRIPTION_SIZE {
            return Err(MachinationError::FileError(format!(
                "Description is {} bytes, the limit is {}",
                content.len(),
                MAX_DESCRIPTION_SIZE
            )));
        }

        match format {
            Format::Json => Machine::from_json(content),
            Format::Text => parse(content),
        }
    }

    /// Loads every `.json` and `.mt` file of a directory.
    ///
    /// Directories and other files are skipped. Each file yields one result.
    pub fn load_machines(directory: &Path) -> Vec<Result<(PathBuf, Machine), MachinationError>> {
        if !directory.exists() {
            return vec![Err(MachinationError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachinationError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(MachinationError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();
                if path.is_dir() || Format::from_path(&path).is_none() {
                    return None;
                }

                match Self::load_machine(&path) {
                    Ok(machine) => Some(Ok((path, machine))),
                    Err(e) => Some(Err(MachinationError::FileError(format!(
                        "Failed to load machine from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        // read_dir order is platform dependent
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const TEXT: &str = "name: Text\nalphabet: a\nstates:\n  start:\n    a -> a, right, SAME";
    const JSON: &str = r#"{"name": "Json", "alphabet": "a", "states": {"start": {"a": ["a", 1, "SAME"]}}}"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_text_machine() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "flip.mt", TEXT);

        let machine = MachineLoader::load_machine(&path).unwrap();
        assert_eq!(machine.display_name(), "Text");
        assert!(machine.description.get("start").is_some());
    }

    #[test]
    fn test_load_json_machine() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "flip.json", JSON);

        let machine = MachineLoader::load_machine(&path).unwrap();
        assert_eq!(machine.display_name(), "Json");
    }

    #[test]
    fn test_load_unknown_extension_detects_format() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "flip.txt", JSON);

        let machine = MachineLoader::load_machine(&path).unwrap();
        assert_eq!(machine.display_name(), "Json");
    }

    #[test]
    fn test_load_missing_file() {
        let result = MachineLoader::load_machine(Path::new("/nonexistent/machine.mt"));
        assert!(matches!(result, Err(MachinationError::FileError(_))));
    }

    #[test]
    fn test_load_from_string() {
        assert_eq!(
            MachineLoader::load_machine_from_string(TEXT).unwrap().display_name(),
            "Text"
        );
        assert_eq!(
            MachineLoader::load_machine_from_string(JSON).unwrap().display_name(),
            "Json"
        );
    }

    #[test]
    fn test_oversized_description() {
        let content = "#".repeat(MAX_DESCRIPTION_SIZE + 1);
        let result = MachineLoader::load_machine_as(&content, Format::Text);
        assert!(matches!(result, Err(MachinationError::FileError(_))));
    }

    #[test]
    fn test_load_machines_from_directory() {
        let dir = tempdir().unwrap();

        write(dir.path(), "valid.mt", TEXT);
        write(dir.path(), "valid.json", JSON);
        write(dir.path(), "invalid.mt", "This is not a valid machine");
        write(dir.path(), "ignored.txt", "This file should be ignored");

        let results = MachineLoader::load_machines(dir.path());

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert!(results[2].is_err());
    }

    #[test]
    fn test_load_machines_missing_directory() {
        let results = MachineLoader::load_machines(Path::new("/nonexistent/dir"));
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }
}
