//! Revision ledger

use mvdb_core::{ExistsRev, ModelError, ReadRev, WriteRev};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::errors::{from_rusqlite, Result};

/// Repository for the `revisions` table
pub struct LedgerRepo;

impl LedgerRepo {
    /// Record revision `rev` of `id`; links also record their endpoint revisions
    pub fn insert(
        conn: &Connection,
        id: Uuid,
        rev: u32,
        endpoints: Option<(u32, u32)>,
    ) -> Result<()> {
        let (src_rev, dest_rev) = match endpoints {
            Some((s, d)) => (Some(s), Some(d)),
            None => (None, None),
        };
        conn.execute(
            "INSERT INTO revisions (entity_id, rev, src_rev, dest_rev) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.to_string(), rev, src_rev, dest_rev],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// All revision numbers of `id`, ascending
    pub fn rev_numbers(conn: &Connection, id: Uuid) -> Result<Vec<u32>> {
        let mut stmt = conn
            .prepare("SELECT rev FROM revisions WHERE entity_id = ?1 ORDER BY rev")
            .map_err(from_rusqlite)?;
        let revs = stmt
            .query_map([id.to_string()], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<u32>, _>>()
            .map_err(from_rusqlite)?;
        Ok(revs)
    }

    /// Highest revision number of `id`, if it has any
    pub fn last_rev(conn: &Connection, id: Uuid) -> Result<Option<u32>> {
        conn.query_row(
            "SELECT MAX(rev) FROM revisions WHERE entity_id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)
    }

    pub fn exists(conn: &Connection, id: Uuid, rev: u32) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM revisions WHERE entity_id = ?1 AND rev = ?2",
                rusqlite::params![id.to_string(), rev],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    /// Resolve a read selector to an existing revision
    pub fn resolve_read(conn: &Connection, id: Uuid, sel: ReadRev) -> Result<u32> {
        match sel {
            ReadRev::Exact(rev) => {
                if Self::exists(conn, id, rev)? {
                    Ok(rev)
                } else {
                    Err(ModelError::RevisionNotFound { id, rev }.into())
                }
            }
            ReadRev::Last => Self::last_rev(conn, id)?
                .ok_or_else(|| ModelError::RevisionNotFound { id, rev: 0 }.into()),
        }
    }

    /// Resolve a read selector, `None` when the revision does not exist
    pub fn try_resolve_read(conn: &Connection, id: Uuid, sel: ReadRev) -> Result<Option<u32>> {
        match sel {
            ReadRev::Exact(rev) => Ok(Self::exists(conn, id, rev)?.then_some(rev)),
            ReadRev::Last => Self::last_rev(conn, id),
        }
    }

    /// Resolve a write selector to the revisions it targets
    pub fn resolve_write(conn: &Connection, id: Uuid, sel: WriteRev) -> Result<Vec<u32>> {
        match sel {
            WriteRev::Exact(rev) => Ok(vec![Self::resolve_read(conn, id, ReadRev::Exact(rev))?]),
            WriteRev::Last => Ok(vec![Self::resolve_read(conn, id, ReadRev::Last)?]),
            WriteRev::All => Self::rev_numbers(conn, id),
        }
    }

    /// Whether the selected revision exists; unknown ids are simply absent
    pub fn exists_selected(conn: &Connection, id: Uuid, sel: ExistsRev) -> Result<bool> {
        match sel {
            ExistsRev::Exact(rev) => Self::exists(conn, id, rev),
            ExistsRev::Last | ExistsRev::Any => Ok(Self::last_rev(conn, id)?.is_some()),
        }
    }
}
