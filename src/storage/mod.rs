//! Storage: data loading and workspace snapshots.
//!
//! Loaders turn files into named relations for the environment; the
//! workspace module snapshots a whole environment to JSON and back.
//! The contract with the core: every loaded relation has a well-defined
//! schema and no nulls anywhere - absent fields belong in a separate
//! relation, not in a placeholder value.

mod csv;
mod error;
mod json;
pub mod workspace;

pub use csv::{load_csv, load_delimited, load_tsv, save_csv, CsvOptions};
pub use error::{StorageError, StorageResult};
pub use json::load_json;
pub use workspace::{load_workspace, save_workspace};

use std::path::Path;

use crate::value::Relation;

/// Load a relation, picking the loader from the file extension
pub fn load_relation<P: AsRef<Path>>(path: P) -> StorageResult<Relation> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => load_csv(path),
        "tsv" => load_tsv(path),
        "json" => load_json(path),
        other => Err(StorageError::UnsupportedFormat(other.to_string())),
    }
}

/// Derive a relation name from a file path: the stem, with anything
/// outside `[A-Za-z0-9_]` squashed to underscores
pub fn relation_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("relation");
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relation_name_for() {
        assert_eq!(relation_name_for(&PathBuf::from("data/emp.csv")), "emp");
        assert_eq!(
            relation_name_for(&PathBuf::from("2024-phones.tsv")),
            "_2024_phones"
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_relation("data.parquet").expect_err("must fail");
        assert!(matches!(err, StorageError::UnsupportedFormat(ext) if ext == "parquet"));
    }
}
