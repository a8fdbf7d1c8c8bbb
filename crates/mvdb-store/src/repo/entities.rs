//! Entity arena: one row per live object or link

use std::collections::BTreeSet;

use mvdb_core::ModelError;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::repo::codec::parse_id;

/// Role tag of an arena entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRole {
    Object,
    Link,
}

impl EntityRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityRole::Object => "object",
            EntityRole::Link => "link",
        }
    }

    fn from_column(s: &str) -> Result<Self> {
        match s {
            "object" => Ok(EntityRole::Object),
            "link" => Ok(EntityRole::Link),
            other => Err(corrupt_row("entities", format!("role {}", other))),
        }
    }
}

/// One row of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: Uuid,
    pub role: EntityRole,
    pub type_id: Uuid,
    pub is_type: bool,
}

/// Repository for the `entities` table
pub struct EntityRepo;

impl EntityRepo {
    /// Claim `id` for a new entity
    ///
    /// Fails with `AlreadyExists` if any live object or link holds the id.
    pub fn insert(
        conn: &Connection,
        id: Uuid,
        role: EntityRole,
        type_id: Uuid,
        is_type: bool,
    ) -> Result<EntityRecord> {
        if Self::find(conn, id)?.is_some() {
            return Err(ModelError::AlreadyExists { id }.into());
        }

        conn.execute(
            "INSERT INTO entities (id, role, type_id, is_type) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.to_string(), role.as_str(), type_id.to_string(), is_type],
        )
        .map_err(from_rusqlite)?;

        Ok(EntityRecord {
            id,
            role,
            type_id,
            is_type,
        })
    }

    /// Look up an entity of either role
    pub fn find(conn: &Connection, id: Uuid) -> Result<Option<EntityRecord>> {
        let row: Option<(String, String, bool)> = conn
            .query_row(
                "SELECT role, type_id, is_type FROM entities WHERE id = ?1",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        row.map(|(role, type_id, is_type)| -> Result<EntityRecord> {
            Ok(EntityRecord {
                id,
                role: EntityRole::from_column(&role)?,
                type_id: parse_id("entities", &type_id)?,
                is_type,
            })
        })
        .transpose()
    }

    /// Look up an entity with the given role
    pub fn find_as(conn: &Connection, id: Uuid, role: EntityRole) -> Result<Option<EntityRecord>> {
        Ok(Self::find(conn, id)?.filter(|e| e.role == role))
    }

    /// The object `id`, or `ObjectNotFound`
    pub fn require_object(conn: &Connection, id: Uuid) -> Result<EntityRecord> {
        Self::find_as(conn, id, EntityRole::Object)?
            .ok_or_else(|| ModelError::ObjectNotFound { id }.into())
    }

    /// The link `id`, or `LinkNotFound`
    pub fn require_link(conn: &Connection, id: Uuid) -> Result<EntityRecord> {
        Self::find_as(conn, id, EntityRole::Link)?
            .ok_or_else(|| ModelError::LinkNotFound { id }.into())
    }

    /// Every live id with the given role
    pub fn ids(conn: &Connection, role: EntityRole) -> Result<BTreeSet<Uuid>> {
        let mut stmt = conn
            .prepare("SELECT id FROM entities WHERE role = ?1")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([role.as_str()], |row| row.get::<_, String>(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.iter().map(|id| parse_id("entities", id)).collect()
    }

    /// Ids of one role and type, in creation order
    pub fn ids_of_type(conn: &Connection, role: EntityRole, type_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = conn
            .prepare("SELECT id FROM entities WHERE role = ?1 AND type_id = ?2 ORDER BY rowid")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(rusqlite::params![role.as_str(), type_id.to_string()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.iter().map(|id| parse_id("entities", id)).collect()
    }

    /// Remove an entity; revisions, values and link endpoints cascade
    pub fn delete(conn: &Connection, id: Uuid) -> Result<bool> {
        let removed = conn
            .execute("DELETE FROM entities WHERE id = ?1", [id.to_string()])
            .map_err(from_rusqlite)?;
        Ok(removed > 0)
    }
}
