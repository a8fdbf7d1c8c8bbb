//! Links: fixed endpoints plus per-revision endpoint revisions
//!
//! A link revision records which revision of its source and destination it
//! connects. Whether that recorded revision matters when looking a link up
//! from an endpoint depends on the link type's endpoint flags: for a
//! version-specific endpoint only matching revisions are visible, otherwise
//! every revision of the link is visible from every revision of the endpoint.

use std::collections::BTreeMap;

use mvdb_core::Revision;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::errors::{from_rusqlite, Result};
use crate::repo::codec::parse_id;

/// Fixed part of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: Uuid,
    pub type_id: Uuid,
    pub src_id: Uuid,
    pub dest_id: Uuid,
}

/// One link revision joined with its endpoints' types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRevisionRow {
    pub link: LinkRecord,
    pub rev: u32,
    pub src_type: Uuid,
    pub src_rev: u32,
    pub dest_type: Uuid,
    pub dest_rev: u32,
}

impl LinkRevisionRow {
    /// The link revision itself
    pub fn revision(&self) -> Revision {
        Revision::new(self.link.id, self.link.type_id, self.rev)
    }

    /// The source object revision it connects
    pub fn src_revision(&self) -> Revision {
        Revision::new(self.link.src_id, self.src_type, self.src_rev)
    }

    /// The destination object revision it connects
    pub fn dest_revision(&self) -> Revision {
        Revision::new(self.link.dest_id, self.dest_type, self.dest_rev)
    }
}

/// Endpoint version-specificity of a link type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTypeFlags {
    pub src_version_specific: bool,
    pub dest_version_specific: bool,
}

impl Default for LinkTypeFlags {
    fn default() -> Self {
        Self {
            src_version_specific: true,
            dest_version_specific: true,
        }
    }
}

/// Endpoint revision a scan looks from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRev {
    /// Every revision of the endpoint
    All,
    /// One existing revision of the endpoint
    At(u32),
}

#[derive(Clone, Copy)]
enum Side {
    Src,
    Dest,
}

const LINK_REVISION_SELECT: &str = "SELECT l.id, e.type_id, l.src_id, l.dest_id, r.rev,
        s.type_id, r.src_rev, d.type_id, r.dest_rev
     FROM links l
     JOIN entities e ON e.id = l.id
     JOIN entities s ON s.id = l.src_id
     JOIN entities d ON d.id = l.dest_id
     JOIN revisions r ON r.entity_id = l.id";

/// Repository for `links` and `link_type_flags`
pub struct LinkRepo;

impl LinkRepo {
    /// Record the endpoints of a link whose entity row already exists
    pub fn insert(conn: &Connection, id: Uuid, src_id: Uuid, dest_id: Uuid) -> Result<()> {
        conn.execute(
            "INSERT INTO links (id, src_id, dest_id) VALUES (?1, ?2, ?3)",
            rusqlite::params![id.to_string(), src_id.to_string(), dest_id.to_string()],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn find(conn: &Connection, id: Uuid) -> Result<Option<LinkRecord>> {
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT e.type_id, l.src_id, l.dest_id
                 FROM links l JOIN entities e ON e.id = l.id
                 WHERE l.id = ?1",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        row.map(|(type_id, src_id, dest_id)| -> Result<LinkRecord> {
            Ok(LinkRecord {
                id,
                type_id: parse_id("links", &type_id)?,
                src_id: parse_id("links", &src_id)?,
                dest_id: parse_id("links", &dest_id)?,
            })
        })
        .transpose()
    }

    /// Ids of every link with `object_id` as source or destination
    pub fn ids_touching(conn: &Connection, object_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = conn
            .prepare("SELECT id FROM links WHERE src_id = ?1 OR dest_id = ?1")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([object_id.to_string()], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.iter().map(|id| parse_id("links", id)).collect()
    }

    /// Every link revision whose source revision is exactly `(src_id, src_rev)`
    pub fn revisions_from_source_rev(
        conn: &Connection,
        src_id: Uuid,
        src_rev: u32,
    ) -> Result<Vec<LinkRevisionRow>> {
        Self::query(
            conn,
            &format!(
                "{} WHERE l.src_id = ?1 AND r.src_rev = ?2 ORDER BY e.rowid, r.rev",
                LINK_REVISION_SELECT
            ),
            rusqlite::params![src_id.to_string(), src_rev],
        )
    }

    /// Link revisions leaving `src_id` as seen from `at`
    ///
    /// `type_id = None` scans every link type.
    pub fn outgoing(
        conn: &Connection,
        type_id: Option<Uuid>,
        src_id: Uuid,
        at: EndpointRev,
    ) -> Result<Vec<LinkRevisionRow>> {
        let rows = Self::query(
            conn,
            &format!(
                "{} WHERE l.src_id = ?1 AND (?2 IS NULL OR e.type_id = ?2) ORDER BY e.rowid, r.rev",
                LINK_REVISION_SELECT
            ),
            rusqlite::params![src_id.to_string(), type_id.map(|t| t.to_string())],
        )?;
        Self::visible(conn, rows, at, Side::Src)
    }

    /// Link revisions arriving at `dest_id` as seen from `at`
    pub fn incoming(
        conn: &Connection,
        type_id: Uuid,
        dest_id: Uuid,
        at: EndpointRev,
    ) -> Result<Vec<LinkRevisionRow>> {
        let rows = Self::query(
            conn,
            &format!(
                "{} WHERE l.dest_id = ?1 AND e.type_id = ?2 ORDER BY e.rowid, r.rev",
                LINK_REVISION_SELECT
            ),
            rusqlite::params![dest_id.to_string(), type_id.to_string()],
        )?;
        Self::visible(conn, rows, at, Side::Dest)
    }

    /// Keep the rows visible from one endpoint revision
    ///
    /// For a non-version-specific endpoint the rows are deduplicated by link
    /// and opposite-endpoint revision, preferring the row recorded at `rev`
    /// and then the newest link revision.
    fn visible(
        conn: &Connection,
        rows: Vec<LinkRevisionRow>,
        at: EndpointRev,
        side: Side,
    ) -> Result<Vec<LinkRevisionRow>> {
        let EndpointRev::At(rev) = at else {
            return Ok(rows);
        };

        let mut flags: BTreeMap<Uuid, LinkTypeFlags> = BTreeMap::new();
        let mut kept: Vec<LinkRevisionRow> = Vec::new();
        // (link id, opposite endpoint revision) -> index into `kept`
        let mut shared: BTreeMap<(Uuid, u32), usize> = BTreeMap::new();

        for row in rows {
            let type_flags = match flags.get(&row.link.type_id) {
                Some(f) => *f,
                None => {
                    let f = Self::flags(conn, row.link.type_id)?;
                    flags.insert(row.link.type_id, f);
                    f
                }
            };
            let (version_specific, own_rev, other_rev) = match side {
                Side::Src => (type_flags.src_version_specific, row.src_rev, row.dest_rev),
                Side::Dest => (type_flags.dest_version_specific, row.dest_rev, row.src_rev),
            };

            if version_specific {
                if own_rev == rev {
                    kept.push(row);
                }
                continue;
            }

            match shared.get(&(row.link.id, other_rev)) {
                None => {
                    shared.insert((row.link.id, other_rev), kept.len());
                    kept.push(row);
                }
                Some(&idx) => {
                    let current = kept[idx];
                    let current_own = match side {
                        Side::Src => current.src_rev,
                        Side::Dest => current.dest_rev,
                    };
                    // rows arrive in ascending link revision order
                    if current_own != rev {
                        kept[idx] = row;
                    }
                }
            }
        }
        Ok(kept)
    }

    fn query(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<LinkRevisionRow>> {
        let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
        let raw = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, u32>(8)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        raw.into_iter()
            .map(
                |(id, type_id, src_id, dest_id, rev, src_type, src_rev, dest_type, dest_rev)|
                 -> Result<LinkRevisionRow> {
                    Ok(LinkRevisionRow {
                        link: LinkRecord {
                            id: parse_id("links", &id)?,
                            type_id: parse_id("links", &type_id)?,
                            src_id: parse_id("links", &src_id)?,
                            dest_id: parse_id("links", &dest_id)?,
                        },
                        rev,
                        src_type: parse_id("links", &src_type)?,
                        src_rev,
                        dest_type: parse_id("links", &dest_type)?,
                        dest_rev,
                    })
                },
            )
            .collect()
    }

    /// Endpoint flags of a link type (defaults when never set)
    pub fn flags(conn: &Connection, type_id: Uuid) -> Result<LinkTypeFlags> {
        let row: Option<(bool, bool)> = conn
            .query_row(
                "SELECT src_version_specific, dest_version_specific
                 FROM link_type_flags WHERE type_id = ?1",
                [type_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        Ok(row
            .map(|(src, dest)| LinkTypeFlags {
                src_version_specific: src,
                dest_version_specific: dest,
            })
            .unwrap_or_default())
    }

    pub fn set_flags(conn: &Connection, type_id: Uuid, flags: LinkTypeFlags) -> Result<()> {
        conn.execute(
            "INSERT INTO link_type_flags (type_id, src_version_specific, dest_version_specific)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(type_id) DO UPDATE SET
                src_version_specific = excluded.src_version_specific,
                dest_version_specific = excluded.dest_version_specific",
            rusqlite::params![
                type_id.to_string(),
                flags.src_version_specific,
                flags.dest_version_specific
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }
}
