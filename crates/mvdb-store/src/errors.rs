//! Store-side constructors for [`ExError`]

use std::fmt::Display;

use mvdb_core::errors::{ExError, ExErrorKind};

pub type Result<T> = std::result::Result<T, ExError>;

/// Any driver failure surfaces as a persistence error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migrate")
        .with_message(format!("{}: {}", migration_id, reason))
}

/// The SQL of an applied migration no longer matches what was recorded
pub fn checksum_mismatch(migration_id: &str, recorded: &str, embedded: &str) -> ExError {
    migration_error(
        migration_id,
        &format!("recorded checksum {} differs from {}", recorded, embedded),
    )
}

/// A row the model cannot be rebuilt from
pub fn corrupt_row(table: &str, reason: impl Display) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("decode_row")
        .with_message(format!("bad row in {}: {}", table, reason))
}
