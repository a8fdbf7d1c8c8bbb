//! Database connection management
//!
//! Opening a store always configures the session and applies migrations, so
//! callers never see a connection without the schema.

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;

/// Open (or create) a file-backed store
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let mut conn = Connection::open(path).map_err(from_rusqlite)?;
    configure(&conn)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

/// Open a private in-memory store
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    configure(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

/// Session settings applied to every connection
pub fn configure(conn: &Connection) -> Result<()> {
    // Cascading deletes of revisions and values rely on this
    conn.execute_batch("PRAGMA foreign_keys = ON")
        .map_err(from_rusqlite)?;
    Ok(())
}

/// Remove every entity, value, schema record and link-type flag
pub fn clear(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM entities;
         DELETE FROM attribute_schema;
         DELETE FROM link_type_flags;",
    )
    .map_err(from_rusqlite)
}
