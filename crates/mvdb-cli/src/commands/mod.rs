//! Subcommands
//!
//! Each subcommand opens the store file named by `--db` and runs one or more
//! read operations against it; only `clear` writes.

use std::path::Path;

use mvdb_engine::{DbKind, ModelVersionDb};

pub mod clear;
pub mod links;
pub mod objects;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Connect to an existing store file
pub fn open(path: &str) -> Result<ModelVersionDb, Box<dyn std::error::Error>> {
    if !Path::new(path).is_file() {
        return Err(format!("store file not found: {}", path).into());
    }
    let mut db = ModelVersionDb::new();
    db.connect(DbKind::SqliteFile, "", 0, path, None, None)?;
    Ok(db)
}
