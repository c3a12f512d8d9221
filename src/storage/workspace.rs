//! Workspace snapshots.
//!
//! A workspace is the whole environment serialized as one JSON document
//! keyed by relation name. Snapshots are the only persistence the system
//! has; relations themselves are plain values, so serde does the work.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::environment::Environment;
use crate::storage::error::StorageResult;

/// Save the environment to a JSON workspace file
pub fn save_workspace<P: AsRef<Path>>(path: P, env: &Environment) -> StorageResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, env)?;
    Ok(())
}

/// Load an environment from a JSON workspace file.
/// Every relation is validated against its schema.
pub fn load_workspace<P: AsRef<Path>>(path: P) -> StorageResult<Environment> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let env: Environment = serde_json::from_reader(reader)?;
    for (_, rel) in env.iter() {
        rel.validate()?;
    }
    Ok(env)
}
