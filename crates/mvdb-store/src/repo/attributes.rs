//! Attribute schema records and typed values
//!
//! Version-specific attributes live in `revision_values`, one cell per
//! revision. The others live in `shared_values`, one cell per entity. Toggling
//! the flag moves the cells between the two tables.

use mvdb_core::{decide_write, AttributeSchema, ModelError, State, Value, WriteDecision};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::errors::{from_rusqlite, Result};
use crate::repo::codec::{decode, encode, parse_id};
use crate::repo::entities::{EntityRecord, EntityRole};

/// Repository for attribute schema and value tables
pub struct AttributeRepo;

impl AttributeRepo {
    /// Schema record of `(type_id, name)`, if one was ever created
    pub fn schema(conn: &Connection, type_id: Uuid, name: &str) -> Result<Option<AttributeSchema>> {
        let row: Option<(Option<String>, u32, bool)> = conn
            .query_row(
                "SELECT kind, width, version_specific FROM attribute_schema
                 WHERE type_id = ?1 AND name = ?2",
                rusqlite::params![type_id.to_string(), name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        Ok(row.map(|(kind, width, version_specific)| AttributeSchema {
            kind: kind.as_deref().and_then(mvdb_core::ValueKind::from_tag),
            width,
            version_specific,
        }))
    }

    fn save_schema(
        conn: &Connection,
        type_id: Uuid,
        name: &str,
        schema: &AttributeSchema,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO attribute_schema (type_id, name, kind, width, version_specific)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(type_id, name) DO UPDATE SET
                kind = excluded.kind,
                width = excluded.width,
                version_specific = excluded.version_specific",
            rusqlite::params![
                type_id.to_string(),
                name,
                schema.kind.map(|k| k.as_str()),
                schema.width,
                schema.version_specific,
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Whether any entity of `type_id` holds a non-null value for `name`
    pub fn column_has_values(conn: &Connection, type_id: Uuid, name: &str) -> Result<bool> {
        conn.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM revision_values v JOIN entities e ON e.id = v.entity_id
                WHERE e.type_id = ?1 AND v.name = ?2 AND v.kind IS NOT NULL
             ) OR EXISTS (
                SELECT 1 FROM shared_values s JOIN entities e ON e.id = s.entity_id
                WHERE e.type_id = ?1 AND s.name = ?2 AND s.kind IS NOT NULL
             )",
            rusqlite::params![type_id.to_string(), name],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)
    }

    /// Run the kind decision table for a write and persist the new schema
    ///
    /// Returns the schema in force for the write.
    pub fn admit(
        conn: &Connection,
        type_id: Uuid,
        name: &str,
        value: &Value,
    ) -> Result<AttributeSchema> {
        if name.is_empty() {
            return Err(ModelError::EmptyAttributeName.into());
        }

        let existing = Self::schema(conn, type_id, name)?;
        let current = existing.unwrap_or_default();
        let has_values = current.kind.is_some() && Self::column_has_values(conn, type_id, name)?;
        let decision = decide_write(&current, has_values, value).check(type_id, name)?;

        let next = decision.apply(&current, value.width());
        if existing.is_none() || decision != WriteDecision::Accept {
            if let WriteDecision::Migrate(kind) = decision {
                tracing::debug!(%type_id, attribute = name, %kind, "attribute kind migrated");
            }
            Self::save_schema(conn, type_id, name, &next)?;
        }
        Ok(next)
    }

    /// Write one attribute of `entity` at the given revisions
    pub fn write_value(
        conn: &Connection,
        entity: &EntityRecord,
        revs: &[u32],
        name: &str,
        value: &Value,
    ) -> Result<()> {
        let schema = Self::admit(conn, entity.type_id, name, value)?;
        let (tag, cell) = encode(value);

        if schema.version_specific {
            for rev in revs {
                conn.execute(
                    "INSERT INTO revision_values (entity_id, rev, name, kind, value)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(entity_id, rev, name) DO UPDATE SET
                        kind = excluded.kind,
                        value = excluded.value",
                    rusqlite::params![entity.id.to_string(), rev, name, tag, cell],
                )
                .map_err(from_rusqlite)?;
            }
        } else {
            conn.execute(
                "INSERT INTO shared_values (entity_id, name, kind, value)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(entity_id, name) DO UPDATE SET
                    kind = excluded.kind,
                    value = excluded.value",
                rusqlite::params![entity.id.to_string(), name, tag, cell],
            )
            .map_err(from_rusqlite)?;
        }
        Ok(())
    }

    /// Merge every entry of `state` into the given revisions
    pub fn write_state(
        conn: &Connection,
        entity: &EntityRecord,
        revs: &[u32],
        state: &State,
    ) -> Result<()> {
        for (name, value) in state {
            Self::write_value(conn, entity, revs, name, value)?;
        }
        Ok(())
    }

    /// Full state of one revision: its own cells plus the entity's shared cells
    pub fn read_state(conn: &Connection, id: Uuid, rev: u32) -> Result<State> {
        let mut state = State::new();
        let mut stmt = conn
            .prepare(
                "SELECT name, kind, value FROM revision_values WHERE entity_id = ?1 AND rev = ?2
                 UNION ALL
                 SELECT name, kind, value FROM shared_values WHERE entity_id = ?1",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(rusqlite::params![id.to_string(), rev], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, SqlValue>(2)?,
                ))
            })
            .map_err(from_rusqlite)?;

        for row in rows {
            let (name, tag, cell) = row.map_err(from_rusqlite)?;
            state.insert(name, decode("values", tag.as_deref(), cell)?);
        }
        Ok(state)
    }

    /// One attribute of one revision, `None` when never set
    pub fn read_value(conn: &Connection, id: Uuid, rev: u32, name: &str) -> Result<Option<Value>> {
        let row: Option<(Option<String>, SqlValue)> = conn
            .query_row(
                "SELECT kind, value FROM revision_values
                 WHERE entity_id = ?1 AND rev = ?2 AND name = ?3
                 UNION ALL
                 SELECT kind, value FROM shared_values WHERE entity_id = ?1 AND name = ?3
                 LIMIT 1",
                rusqlite::params![id.to_string(), rev, name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        row.map(|(tag, cell)| decode("values", tag.as_deref(), cell))
            .transpose()
    }

    /// Copy the per-revision cells of `from` onto a freshly created `to`
    pub fn copy_revision(conn: &Connection, id: Uuid, from: u32, to: u32) -> Result<()> {
        conn.execute(
            "INSERT INTO revision_values (entity_id, rev, name, kind, value)
             SELECT entity_id, ?3, name, kind, value FROM revision_values
             WHERE entity_id = ?1 AND rev = ?2",
            rusqlite::params![id.to_string(), from, to],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Version-specificity of `(type_id, name)`; true unless switched off
    pub fn is_version_specific(conn: &Connection, type_id: Uuid, name: &str) -> Result<bool> {
        Ok(Self::schema(conn, type_id, name)?
            .map(|s| s.version_specific)
            .unwrap_or(true))
    }

    /// Switch version-specificity and move existing cells accordingly
    ///
    /// Going shared keeps, per entity, the value of its highest revision that
    /// carries the attribute. Going per-revision copies the shared value into
    /// every revision of its entity.
    pub fn set_version_specific(
        conn: &Connection,
        type_id: Uuid,
        name: &str,
        flag: bool,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(ModelError::EmptyAttributeName.into());
        }

        let existing = Self::schema(conn, type_id, name)?;
        let current = existing.unwrap_or_default();
        if current.version_specific == flag {
            return Ok(());
        }

        let type_key = type_id.to_string();
        let params = rusqlite::params![type_key, name];
        if flag {
            conn.execute(
                "INSERT INTO revision_values (entity_id, rev, name, kind, value)
                 SELECT s.entity_id, r.rev, s.name, s.kind, s.value
                 FROM shared_values s
                 JOIN entities e ON e.id = s.entity_id
                 JOIN revisions r ON r.entity_id = s.entity_id
                 WHERE e.type_id = ?1 AND s.name = ?2",
                params,
            )
            .map_err(from_rusqlite)?;
            conn.execute(
                "DELETE FROM shared_values WHERE name = ?2
                 AND entity_id IN (SELECT id FROM entities WHERE type_id = ?1)",
                params,
            )
            .map_err(from_rusqlite)?;
        } else {
            conn.execute(
                "INSERT INTO shared_values (entity_id, name, kind, value)
                 SELECT v.entity_id, v.name, v.kind, v.value
                 FROM revision_values v
                 JOIN entities e ON e.id = v.entity_id
                 WHERE e.type_id = ?1 AND v.name = ?2
                   AND v.rev = (SELECT MAX(m.rev) FROM revision_values m
                                WHERE m.entity_id = v.entity_id AND m.name = v.name)",
                params,
            )
            .map_err(from_rusqlite)?;
            conn.execute(
                "DELETE FROM revision_values WHERE name = ?2
                 AND entity_id IN (SELECT id FROM entities WHERE type_id = ?1)",
                params,
            )
            .map_err(from_rusqlite)?;
        }

        tracing::debug!(%type_id, attribute = name, version_specific = flag, "attribute storage switched");
        Self::save_schema(
            conn,
            type_id,
            name,
            &AttributeSchema {
                version_specific: flag,
                ..current
            },
        )
    }

    /// Revisions of `role` entities of `type_id` whose state contains `filter`
    ///
    /// Sorted by entity id then revision. An attribute without a schema record
    /// matches nothing; a value whose kind can never be stored in the column
    /// is a `KindConflict`.
    pub fn find_revisions(
        conn: &Connection,
        role: EntityRole,
        type_id: Uuid,
        filter: &State,
    ) -> Result<Vec<(Uuid, u32)>> {
        let mut sql = String::from(
            "SELECT r.entity_id, r.rev FROM revisions r
             JOIN entities e ON e.id = r.entity_id
             WHERE e.role = ? AND e.type_id = ?",
        );
        let mut params: Vec<SqlValue> = vec![
            SqlValue::Text(role.as_str().to_string()),
            SqlValue::Text(type_id.to_string()),
        ];

        let mut unknown_attribute = false;
        for (name, value) in filter {
            let Some(schema) = Self::schema(conn, type_id, name)? else {
                unknown_attribute = true;
                continue;
            };
            let has_values = schema.kind.is_some() && Self::column_has_values(conn, type_id, name)?;
            decide_write(&schema, has_values, value).check(type_id, name)?;

            let (tag, cell) = encode(value);
            let tag = tag.map_or(SqlValue::Null, |t| SqlValue::Text(t.to_string()));
            sql.push_str(
                " AND (EXISTS (SELECT 1 FROM revision_values v
                        WHERE v.entity_id = r.entity_id AND v.rev = r.rev
                          AND v.name = ? AND v.kind IS ? AND v.value IS ?)
                   OR EXISTS (SELECT 1 FROM shared_values s
                        WHERE s.entity_id = r.entity_id
                          AND s.name = ? AND s.kind IS ? AND s.value IS ?))",
            );
            for _ in 0..2 {
                params.push(SqlValue::Text(name.clone()));
                params.push(tag.clone());
                params.push(cell.clone());
            }
        }

        // every known entry is kind-checked before an unknown one empties the result
        if unknown_attribute {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut found = rows
            .iter()
            .map(|(id, rev)| parse_id("revisions", id).map(|id| (id, *rev)))
            .collect::<Result<Vec<_>>>()?;
        found.sort();
        Ok(found)
    }
}
