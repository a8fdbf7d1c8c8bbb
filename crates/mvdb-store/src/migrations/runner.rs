//! Applies embedded migrations and records them in `schema_version`

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{get_migrations, Migration};

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    migration_id TEXT NOT NULL UNIQUE,
    applied_at INTEGER NOT NULL,
    checksum TEXT
)";

/// Where one embedded migration stands against the database
#[derive(Debug, PartialEq, Eq)]
enum Status {
    Pending,
    Applied,
    Tampered { recorded: String },
}

/// Bring the schema up to date
///
/// A migration that was applied earlier is skipped once its recorded checksum
/// matches the embedded SQL; a mismatch aborts with a migration error.
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(VERSION_TABLE).map_err(from_rusqlite)?;

    for migration in get_migrations() {
        let checksum = compute_checksum(migration.sql);
        match status(conn, migration.id, &checksum)? {
            Status::Applied => {}
            Status::Pending => run(conn, &migration, &checksum)?,
            Status::Tampered { recorded } => {
                return Err(checksum_mismatch(migration.id, &recorded, &checksum));
            }
        }
    }
    Ok(())
}

/// Migration ids in the order they were applied
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?;
    rows.map(|row| row.map_err(from_rusqlite)).collect()
}

fn status(conn: &Connection, id: &str, checksum: &str) -> Result<Status> {
    let recorded = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    Ok(match recorded {
        None => Status::Pending,
        // rows written without a checksum are trusted
        Some(None) => Status::Applied,
        Some(Some(sum)) if sum == checksum => Status::Applied,
        Some(Some(sum)) => Status::Tampered { recorded: sum },
    })
}

fn run(conn: &mut Connection, migration: &Migration, checksum: &str) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        params![migration.id, chrono::Utc::now().timestamp(), checksum],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(migration_id = migration.id, "migration applied");
    Ok(())
}
