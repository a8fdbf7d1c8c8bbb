//! `ModelVersionDb`: the operation surface of the store
//!
//! Every public operation is bracketed by the logging macros and runs
//! against the current session. Mutating operations run inside a savepoint,
//! so a failure part-way (a conflicting attribute in a state merge, a
//! cascading delete) leaves nothing behind, whether or not an explicit
//! transaction is open.

use std::collections::BTreeSet;
use std::time::Instant;

use mvdb_core::{
    log_op_end, log_op_error, log_op_start, ExistsRev, ModelError, ReadRev, RevSelector, Revision,
    ScanRev, State, Value, FIRST_REVISION,
};
use mvdb_core_types::SessionId;
use mvdb_store::errors::from_rusqlite;
use mvdb_store::repo::{EndpointRev, LinkRecord, LinkRevisionRow};
use mvdb_store::{db, AttributeRepo, EntityRepo, EntityRole, LedgerRepo, LinkRepo, Result};
use rusqlite::Connection;
use uuid::Uuid;

use crate::connection::{ConnectionConfig, ConnectionManager, DbKind};
use crate::transaction::TransactionCoordinator;

/// Versioned object/link store bound to a set of SQLite sessions
///
/// # Example
///
/// ```
/// use mvdb_engine::{ModelVersionDb, RevSelector, Value};
/// use uuid::Uuid;
///
/// let mut db = ModelVersionDb::new();
/// db.set_connection_url("mvdb:sqlite:mem:doc").unwrap();
///
/// let (id, ty) = (Uuid::new_v4(), Uuid::new_v4());
/// db.create_object(id, ty, None, false).unwrap();
/// db.set_object_value(id, RevSelector::Last, "name", Value::from("root")).unwrap();
/// let rev = db.create_new_object_revision(id, RevSelector::Last).unwrap();
///
/// assert_eq!(rev, 2);
/// assert_eq!(
///     db.get_object_value(id, RevSelector::Exact(2), "name").unwrap(),
///     Value::from("root")
/// );
/// ```
pub struct ModelVersionDb {
    session_id: SessionId,
    connections: ConnectionManager,
    transaction: TransactionCoordinator,
}

impl Default for ModelVersionDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelVersionDb {
    /// A store with no connection yet
    pub fn new() -> Self {
        Self {
            session_id: SessionId::new(),
            connections: ConnectionManager::new(),
            transaction: TransactionCoordinator::new(),
        }
    }

    /// Correlation id carried by every log event of this instance
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    // ========== Operation plumbing ==========

    fn op_start(&self, op: &'static str, entity: Option<Uuid>) -> Instant {
        match entity {
            Some(id) => {
                log_op_start!(op, session_id = %self.session_id, entity_id = %id);
            }
            None => {
                log_op_start!(op, session_id = %self.session_id);
            }
        }
        Instant::now()
    }

    fn op_finish<T>(&self, op: &'static str, start: Instant, result: Result<T>) -> Result<T> {
        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                log_op_end!(op, duration_ms = duration_ms, session_id = %self.session_id);
                Ok(value)
            }
            Err(err) => {
                let err = if err.op().is_none() {
                    err.with_op(op)
                } else {
                    err
                };
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    session_id = %self.session_id
                );
                Err(err)
            }
        }
    }

    /// Run a read-only operation against the current session
    fn read<T>(
        &self,
        op: &'static str,
        entity: Option<Uuid>,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = self.op_start(op, entity);
        let result = self.connections.current().and_then(|s| f(&s.conn));
        self.op_finish(op, start, result)
    }

    /// Run a mutating operation inside a savepoint of the current session
    fn write<T>(
        &mut self,
        op: &'static str,
        entity: Option<Uuid>,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = self.op_start(op, entity);
        let result = self.connections.current_mut().and_then(|session| {
            let savepoint = session.conn.savepoint().map_err(from_rusqlite)?;
            let value = f(&*savepoint)?;
            savepoint.commit().map_err(from_rusqlite)?;
            Ok(value)
        });
        self.op_finish(op, start, result)
    }

    /// Run a session-management operation
    fn manage<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let start = self.op_start(op, None);
        let result = f(self);
        self.op_finish(op, start, result)
    }

    // ========== Connections ==========

    /// Connect to `url` without credentials
    pub fn set_connection_url(&mut self, url: &str) -> Result<()> {
        self.set_connection_url_with_login(url, None, None)
    }

    /// Connect to `url`, making it the current session
    ///
    /// A session already open for the URL is reused. While a transaction is
    /// active the new current session is enlisted in it.
    ///
    /// # Errors
    ///
    /// InvalidArgument when exactly one of `login` and `password` is given
    /// or the URL is not understood; the store is then disconnected.
    pub fn set_connection_url_with_login(
        &mut self,
        url: &str,
        login: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        self.manage("connect", |db| {
            let config = match ConnectionConfig::new(url, login, password) {
                Ok(config) => config,
                Err(err) => {
                    db.connections.detach();
                    return Err(err.into());
                }
            };
            db.connections.connect(config)?;
            db.transaction.enlist_current(&mut db.connections)
        })
    }

    /// Connect to a database described by kind and name
    ///
    /// # Errors
    ///
    /// Same as [`ModelVersionDb::set_connection_url_with_login`].
    pub fn connect(
        &mut self,
        kind: DbKind,
        host: &str,
        port: u16,
        db_name: &str,
        login: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        let url = kind.url(host, port, db_name);
        self.set_connection_url_with_login(&url, login, password)
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_connected()
    }

    /// URL of the current session
    pub fn connection_url(&self) -> Option<&str> {
        self.connections.current_url()
    }

    /// Login recorded for the current session
    pub fn login(&self) -> Option<&str> {
        self.connections
            .current()
            .ok()
            .and_then(|s| s.config.login.as_deref())
    }

    /// Close the current session, rolling back its journal if enlisted
    pub fn disconnect(&mut self) -> Result<()> {
        self.manage("disconnect", |db| {
            db.transaction.release_current(&mut db.connections)?;
            db.connections.close_current();
            Ok(())
        })
    }

    /// Remove every object, link, value and schema record of the current store
    pub fn clear(&mut self) -> Result<()> {
        self.write("clear", None, db::clear)
    }

    // ========== Transactions ==========

    /// # Errors
    ///
    /// `TransactionState` when a transaction is already active.
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.manage("begin_transaction", |db| {
            db.transaction.begin(&mut db.connections)
        })
    }

    /// # Errors
    ///
    /// `TransactionState` when no transaction is active.
    pub fn commit_transaction(&mut self) -> Result<()> {
        self.manage("commit_transaction", |db| {
            db.transaction.commit(&mut db.connections)
        })
    }

    /// # Errors
    ///
    /// `TransactionState` when no transaction is active.
    pub fn rollback_transaction(&mut self) -> Result<()> {
        self.manage("rollback_transaction", |db| {
            db.transaction.rollback(&mut db.connections)
        })
    }

    /// True while a transaction is active, whichever session is current
    pub fn has_transaction(&self) -> bool {
        self.transaction.is_active()
    }

    // ========== Objects ==========

    /// Create an object at revision 1
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when `id` is a live object or link.
    pub fn create_object(
        &mut self,
        id: Uuid,
        type_id: Uuid,
        state: Option<&State>,
        is_type: bool,
    ) -> Result<u32> {
        self.write("create_object", Some(id), |conn| {
            let entity = EntityRepo::insert(conn, id, EntityRole::Object, type_id, is_type)?;
            LedgerRepo::insert(conn, id, FIRST_REVISION, None)?;
            if let Some(state) = state {
                AttributeRepo::write_state(conn, &entity, &[FIRST_REVISION], state)?;
            }
            Ok(FIRST_REVISION)
        })
    }

    /// Branch a new revision from `from`
    ///
    /// The new revision copies the per-revision values of `from`. Every link
    /// revision leaving `(id, from)` gets a new revision on the same link,
    /// pointing from the new object revision to the same destination revision.
    pub fn create_new_object_revision(&mut self, id: Uuid, from: RevSelector) -> Result<u32> {
        const OP: &str = "create_new_object_revision";
        self.write(OP, Some(id), |conn| {
            let from = from.for_read(OP)?;
            EntityRepo::require_object(conn, id)?;
            let from = LedgerRepo::resolve_read(conn, id, from)?;
            let new_rev = next_rev(conn, id)?;

            LedgerRepo::insert(conn, id, new_rev, None)?;
            AttributeRepo::copy_revision(conn, id, from, new_rev)?;

            for row in LinkRepo::revisions_from_source_rev(conn, id, from)? {
                let link_rev = next_rev(conn, row.link.id)?;
                LedgerRepo::insert(conn, row.link.id, link_rev, Some((new_rev, row.dest_rev)))?;
                AttributeRepo::copy_revision(conn, row.link.id, row.rev, link_rev)?;
            }
            Ok(new_rev)
        })
    }

    /// Delete an object with all its revisions and every link touching it
    pub fn delete_object(&mut self, id: Uuid) -> Result<()> {
        self.write("delete_object", Some(id), |conn| {
            EntityRepo::require_object(conn, id)?;
            for link_id in LinkRepo::ids_touching(conn, id)? {
                EntityRepo::delete(conn, link_id)?;
            }
            EntityRepo::delete(conn, id)?;
            Ok(())
        })
    }

    pub fn get_object_state(&self, id: Uuid, sel: RevSelector) -> Result<State> {
        const OP: &str = "get_object_state";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_read(OP)?;
            EntityRepo::require_object(conn, id)?;
            let rev = LedgerRepo::resolve_read(conn, id, sel)?;
            AttributeRepo::read_state(conn, id, rev)
        })
    }

    /// # Errors
    ///
    /// `AttributeNotFound` when the attribute was never set on that revision.
    pub fn get_object_value(&self, id: Uuid, sel: RevSelector, attribute: &str) -> Result<Value> {
        const OP: &str = "get_object_value";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_read(OP)?;
            EntityRepo::require_object(conn, id)?;
            read_value(conn, id, sel, attribute)
        })
    }

    /// Merge `state` into the selected revisions; unlisted attributes keep
    /// their values
    pub fn set_object_state(&mut self, id: Uuid, sel: RevSelector, state: &State) -> Result<()> {
        const OP: &str = "set_object_state";
        self.write(OP, Some(id), |conn| {
            if state.is_empty() {
                return Err(ModelError::EmptyState.into());
            }
            let sel = sel.for_write(OP)?;
            let entity = EntityRepo::require_object(conn, id)?;
            let revs = LedgerRepo::resolve_write(conn, id, sel)?;
            AttributeRepo::write_state(conn, &entity, &revs, state)
        })
    }

    pub fn set_object_value(
        &mut self,
        id: Uuid,
        sel: RevSelector,
        attribute: &str,
        value: Value,
    ) -> Result<()> {
        const OP: &str = "set_object_value";
        self.write(OP, Some(id), |conn| {
            let sel = sel.for_write(OP)?;
            let entity = EntityRepo::require_object(conn, id)?;
            let revs = LedgerRepo::resolve_write(conn, id, sel)?;
            AttributeRepo::write_value(conn, &entity, &revs, attribute, &value)
        })
    }

    pub fn get_object_type(&self, id: Uuid) -> Result<Uuid> {
        self.read("get_object_type", Some(id), |conn| {
            Ok(EntityRepo::require_object(conn, id)?.type_id)
        })
    }

    /// Whether the object was created as a type
    pub fn is_type(&self, id: Uuid) -> Result<bool> {
        self.read("is_type", Some(id), |conn| {
            Ok(EntityRepo::require_object(conn, id)?.is_type)
        })
    }

    pub fn get_object_rev_nbs(&self, id: Uuid) -> Result<Vec<u32>> {
        self.read("get_object_rev_nbs", Some(id), |conn| {
            EntityRepo::require_object(conn, id)?;
            LedgerRepo::rev_numbers(conn, id)
        })
    }

    pub fn get_last_object_rev_nb(&self, id: Uuid) -> Result<u32> {
        self.read("get_last_object_rev_nb", Some(id), |conn| {
            EntityRepo::require_object(conn, id)?;
            LedgerRepo::resolve_read(conn, id, ReadRev::Last)
        })
    }

    /// Never fails for an unknown id
    pub fn obj_exists(&self, id: Uuid) -> Result<bool> {
        self.read("obj_exists", Some(id), |conn| {
            Ok(EntityRepo::find_as(conn, id, EntityRole::Object)?.is_some())
        })
    }

    pub fn obj_exists_rev(&self, id: Uuid, sel: RevSelector) -> Result<bool> {
        const OP: &str = "obj_exists_rev";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_exists(OP)?;
            if EntityRepo::find_as(conn, id, EntityRole::Object)?.is_none() {
                return Ok(false);
            }
            LedgerRepo::exists_selected(conn, id, sel)
        })
    }

    pub fn get_objects(&self) -> Result<BTreeSet<Uuid>> {
        self.read("get_objects", None, |conn| {
            EntityRepo::ids(conn, EntityRole::Object)
        })
    }

    pub fn get_objects_of_type(&self, type_id: Uuid) -> Result<BTreeSet<Uuid>> {
        self.read("get_objects_of_type", Some(type_id), |conn| {
            Ok(EntityRepo::ids_of_type(conn, EntityRole::Object, type_id)?
                .into_iter()
                .collect())
        })
    }

    /// Object revisions of `type_id` whose state contains every entry of
    /// `filter`
    ///
    /// Sorted by object id then revision. With `last_only`, each object
    /// contributes only its highest matching revision.
    ///
    /// # Errors
    ///
    /// `KindConflict` when a filter value can never match the committed kind
    /// of its attribute.
    pub fn get_object_revs(
        &self,
        type_id: Uuid,
        filter: &State,
        last_only: bool,
    ) -> Result<Vec<Revision>> {
        self.read("get_object_revs", Some(type_id), |conn| {
            find_object_revs(conn, type_id, filter, last_only)
        })
    }

    /// Single-attribute form of [`ModelVersionDb::get_object_revs`]
    pub fn get_object_revs_by_value(
        &self,
        type_id: Uuid,
        attribute: &str,
        value: Value,
        last_only: bool,
    ) -> Result<Vec<Revision>> {
        self.read("get_object_revs_by_value", Some(type_id), |conn| {
            if attribute.is_empty() {
                return Err(ModelError::EmptyAttributeName.into());
            }
            let mut filter = State::new();
            filter.insert(attribute.to_string(), value);
            find_object_revs(conn, type_id, &filter, last_only)
        })
    }

    /// Switch whether `attribute` of `type_id` is stored per revision
    pub fn set_object_att_version_specific(
        &mut self,
        type_id: Uuid,
        attribute: &str,
        flag: bool,
    ) -> Result<()> {
        self.write("set_object_att_version_specific", Some(type_id), |conn| {
            AttributeRepo::set_version_specific(conn, type_id, attribute, flag)
        })
    }

    pub fn is_object_att_version_specific(&self, type_id: Uuid, attribute: &str) -> Result<bool> {
        self.read("is_object_att_version_specific", Some(type_id), |conn| {
            if attribute.is_empty() {
                return Err(ModelError::EmptyAttributeName.into());
            }
            AttributeRepo::is_version_specific(conn, type_id, attribute)
        })
    }

    // ========== Links ==========

    /// Create a link with a fresh id between two existing object revisions
    pub fn add_link(
        &mut self,
        type_id: Uuid,
        src: Uuid,
        src_rev: RevSelector,
        dest: Uuid,
        dest_rev: RevSelector,
        state: Option<&State>,
    ) -> Result<Revision> {
        const OP: &str = "add_link";
        let id = Uuid::new_v4();
        self.write(OP, Some(id), |conn| {
            insert_link(conn, OP, id, type_id, (src, src_rev), (dest, dest_rev), state)
        })
    }

    /// Create a link with a caller-chosen id
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when `id` is a live object or link; `NotFound` or
    /// `RevisionNotFound` when an endpoint revision does not exist.
    #[allow(clippy::too_many_arguments)]
    pub fn create_link(
        &mut self,
        id: Uuid,
        type_id: Uuid,
        src: Uuid,
        src_rev: RevSelector,
        dest: Uuid,
        dest_rev: RevSelector,
        state: Option<&State>,
    ) -> Result<Revision> {
        const OP: &str = "create_link";
        self.write(OP, Some(id), |conn| {
            insert_link(conn, OP, id, type_id, (src, src_rev), (dest, dest_rev), state)
        })
    }

    pub fn delete_link(&mut self, id: Uuid) -> Result<()> {
        self.write("delete_link", Some(id), |conn| {
            EntityRepo::require_link(conn, id)?;
            EntityRepo::delete(conn, id)?;
            Ok(())
        })
    }

    /// Never fails for an unknown id
    pub fn link_exists(&self, id: Uuid) -> Result<bool> {
        self.read("link_exists", Some(id), |conn| {
            Ok(EntityRepo::find_as(conn, id, EntityRole::Link)?.is_some())
        })
    }

    pub fn link_exists_rev(&self, id: Uuid, sel: RevSelector) -> Result<bool> {
        const OP: &str = "link_exists_rev";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_exists(OP)?;
            if EntityRepo::find_as(conn, id, EntityRole::Link)?.is_none() {
                return Ok(false);
            }
            LedgerRepo::exists_selected(conn, id, sel)
        })
    }

    /// Whether a link of `type_id` connects the selected endpoint revisions
    pub fn link_exists_between(
        &self,
        type_id: Uuid,
        src: Uuid,
        src_sel: RevSelector,
        dest: Uuid,
        dest_sel: RevSelector,
    ) -> Result<bool> {
        const OP: &str = "link_exists_between";
        self.read(OP, Some(src), |conn| {
            let src_sel = src_sel.for_exists(OP)?;
            let dest_sel = dest_sel.for_exists(OP)?;

            let at = match src_sel {
                ExistsRev::Any => EndpointRev::All,
                ExistsRev::Exact(rev) if LedgerRepo::exists(conn, src, rev)? => EndpointRev::At(rev),
                ExistsRev::Exact(_) => return Ok(false),
                ExistsRev::Last => match LedgerRepo::last_rev(conn, src)? {
                    Some(rev) => EndpointRev::At(rev),
                    None => return Ok(false),
                },
            };
            let dest_rev = match dest_sel {
                ExistsRev::Any => None,
                ExistsRev::Exact(rev) => Some(rev),
                ExistsRev::Last => match LedgerRepo::last_rev(conn, dest)? {
                    Some(rev) => Some(rev),
                    None => return Ok(false),
                },
            };

            Ok(LinkRepo::outgoing(conn, Some(type_id), src, at)?
                .iter()
                .any(|row| {
                    row.link.dest_id == dest && dest_rev.map_or(true, |rev| row.dest_rev == rev)
                }))
        })
    }

    pub fn get_link_type(&self, id: Uuid) -> Result<Uuid> {
        self.read("get_link_type", Some(id), |conn| {
            Ok(EntityRepo::require_link(conn, id)?.type_id)
        })
    }

    pub fn get_link_src(&self, id: Uuid) -> Result<Uuid> {
        self.read("get_link_src", Some(id), |conn| {
            Ok(require_link_record(conn, id)?.src_id)
        })
    }

    pub fn get_link_dest(&self, id: Uuid) -> Result<Uuid> {
        self.read("get_link_dest", Some(id), |conn| {
            Ok(require_link_record(conn, id)?.dest_id)
        })
    }

    pub fn get_link_rev_nbs(&self, id: Uuid) -> Result<Vec<u32>> {
        self.read("get_link_rev_nbs", Some(id), |conn| {
            EntityRepo::require_link(conn, id)?;
            LedgerRepo::rev_numbers(conn, id)
        })
    }

    pub fn get_last_link_rev_nb(&self, id: Uuid) -> Result<u32> {
        self.read("get_last_link_rev_nb", Some(id), |conn| {
            EntityRepo::require_link(conn, id)?;
            LedgerRepo::resolve_read(conn, id, ReadRev::Last)
        })
    }

    pub fn get_link_state(&self, id: Uuid, sel: RevSelector) -> Result<State> {
        const OP: &str = "get_link_state";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_read(OP)?;
            EntityRepo::require_link(conn, id)?;
            let rev = LedgerRepo::resolve_read(conn, id, sel)?;
            AttributeRepo::read_state(conn, id, rev)
        })
    }

    pub fn get_link_value(&self, id: Uuid, sel: RevSelector, attribute: &str) -> Result<Value> {
        const OP: &str = "get_link_value";
        self.read(OP, Some(id), |conn| {
            let sel = sel.for_read(OP)?;
            EntityRepo::require_link(conn, id)?;
            read_value(conn, id, sel, attribute)
        })
    }

    pub fn set_link_state(&mut self, id: Uuid, sel: RevSelector, state: &State) -> Result<()> {
        const OP: &str = "set_link_state";
        self.write(OP, Some(id), |conn| {
            if state.is_empty() {
                return Err(ModelError::EmptyState.into());
            }
            let sel = sel.for_write(OP)?;
            let entity = EntityRepo::require_link(conn, id)?;
            let revs = LedgerRepo::resolve_write(conn, id, sel)?;
            AttributeRepo::write_state(conn, &entity, &revs, state)
        })
    }

    pub fn set_link_value(
        &mut self,
        id: Uuid,
        sel: RevSelector,
        attribute: &str,
        value: Value,
    ) -> Result<()> {
        const OP: &str = "set_link_value";
        self.write(OP, Some(id), |conn| {
            let sel = sel.for_write(OP)?;
            let entity = EntityRepo::require_link(conn, id)?;
            let revs = LedgerRepo::resolve_write(conn, id, sel)?;
            AttributeRepo::write_value(conn, &entity, &revs, attribute, &value)
        })
    }

    pub fn get_links(&self) -> Result<BTreeSet<Uuid>> {
        self.read("get_links", None, |conn| EntityRepo::ids(conn, EntityRole::Link))
    }

    /// Link ids of one type in creation order
    pub fn get_links_of_type(&self, type_id: Uuid) -> Result<Vec<Uuid>> {
        self.read("get_links_of_type", Some(type_id), |conn| {
            EntityRepo::ids_of_type(conn, EntityRole::Link, type_id)
        })
    }

    /// Link revisions of `type_id` leaving the selected revision of `src`
    ///
    /// `All` returns every revision of every such link.
    pub fn get_outgoing_links(
        &self,
        type_id: Uuid,
        src: Uuid,
        sel: RevSelector,
    ) -> Result<Vec<Revision>> {
        const OP: &str = "get_outgoing_links";
        self.read(OP, Some(src), |conn| {
            let Some(at) = scan_at(conn, src, sel.for_scan(OP)?)? else {
                return Ok(Vec::new());
            };
            Ok(LinkRepo::outgoing(conn, Some(type_id), src, at)?
                .iter()
                .map(LinkRevisionRow::revision)
                .collect())
        })
    }

    /// Link revisions of any type from the selected revision of `src` to `dest`
    pub fn get_outgoing_links_to(
        &self,
        src: Uuid,
        sel: RevSelector,
        dest: Uuid,
    ) -> Result<Vec<Revision>> {
        const OP: &str = "get_outgoing_links_to";
        self.read(OP, Some(src), |conn| {
            let Some(at) = scan_at(conn, src, sel.for_scan(OP)?)? else {
                return Ok(Vec::new());
            };
            Ok(LinkRepo::outgoing(conn, None, src, at)?
                .iter()
                .filter(|row| row.link.dest_id == dest)
                .map(LinkRevisionRow::revision)
                .collect())
        })
    }

    /// Destination object revisions reached from the selected revision of `src`
    pub fn get_link_dest_revs(
        &self,
        type_id: Uuid,
        src: Uuid,
        sel: RevSelector,
    ) -> Result<Vec<Revision>> {
        const OP: &str = "get_link_dest_revs";
        self.read(OP, Some(src), |conn| {
            dest_revs(conn, type_id, src, sel.for_read(OP)?)
        })
    }

    /// Source object revisions whose links reach the selected revision of `dest`
    pub fn get_link_src_revs(
        &self,
        type_id: Uuid,
        dest: Uuid,
        sel: RevSelector,
    ) -> Result<Vec<Revision>> {
        const OP: &str = "get_link_src_revs";
        self.read(OP, Some(dest), |conn| {
            let Some(rev) = LedgerRepo::try_resolve_read(conn, dest, sel.for_read(OP)?)? else {
                return Ok(Vec::new());
            };
            let mut revs: Vec<Revision> =
                LinkRepo::incoming(conn, type_id, dest, EndpointRev::At(rev))?
                    .iter()
                    .map(LinkRevisionRow::src_revision)
                    .collect();
            revs.sort();
            revs.dedup();
            Ok(revs)
        })
    }

    /// Number of destination revisions reached from the selected revision of `src`
    pub fn get_link_number(&self, type_id: Uuid, src: Uuid, sel: RevSelector) -> Result<usize> {
        const OP: &str = "get_link_number";
        self.read(OP, Some(src), |conn| {
            Ok(dest_revs(conn, type_id, src, sel.for_read(OP)?)?.len())
        })
    }

    /// Id of the link of `type_id` from the selected revision of `src` to `dest`
    pub fn get_link_id(
        &self,
        type_id: Uuid,
        src: Uuid,
        sel: RevSelector,
        dest: Uuid,
    ) -> Result<Option<Uuid>> {
        const OP: &str = "get_link_id";
        self.read(OP, Some(src), |conn| {
            let Some(rev) = LedgerRepo::try_resolve_read(conn, src, sel.for_read(OP)?)? else {
                return Ok(None);
            };
            Ok(LinkRepo::outgoing(conn, Some(type_id), src, EndpointRev::At(rev))?
                .iter()
                .find(|row| row.link.dest_id == dest)
                .map(|row| row.link.id))
        })
    }

    /// The link revision of `type_id` connecting two object revisions
    pub fn get_link_rev(
        &self,
        type_id: Uuid,
        src: Uuid,
        src_sel: RevSelector,
        dest: Uuid,
        dest_sel: RevSelector,
    ) -> Result<Option<Revision>> {
        const OP: &str = "get_link_rev";
        self.read(OP, Some(src), |conn| {
            let src_sel = src_sel.for_read(OP)?;
            let dest_sel = dest_sel.for_read(OP)?;
            let Some(src_rev) = LedgerRepo::try_resolve_read(conn, src, src_sel)? else {
                return Ok(None);
            };
            let Some(dest_rev) = LedgerRepo::try_resolve_read(conn, dest, dest_sel)? else {
                return Ok(None);
            };
            Ok(
                LinkRepo::outgoing(conn, Some(type_id), src, EndpointRev::At(src_rev))?
                    .iter()
                    .filter(|row| row.link.dest_id == dest && row.dest_rev == dest_rev)
                    .map(LinkRevisionRow::revision)
                    .max_by_key(|rev| rev.rev),
            )
        })
    }

    /// Switch whether links of `type_id` are bound to one source revision
    pub fn set_link_src_version_specific(&mut self, type_id: Uuid, flag: bool) -> Result<()> {
        self.write("set_link_src_version_specific", Some(type_id), |conn| {
            let mut flags = LinkRepo::flags(conn, type_id)?;
            flags.src_version_specific = flag;
            LinkRepo::set_flags(conn, type_id, flags)
        })
    }

    /// Switch whether links of `type_id` are bound to one destination revision
    pub fn set_link_dest_version_specific(&mut self, type_id: Uuid, flag: bool) -> Result<()> {
        self.write("set_link_dest_version_specific", Some(type_id), |conn| {
            let mut flags = LinkRepo::flags(conn, type_id)?;
            flags.dest_version_specific = flag;
            LinkRepo::set_flags(conn, type_id, flags)
        })
    }

    pub fn is_link_src_version_specific(&self, type_id: Uuid) -> Result<bool> {
        self.read("is_link_src_version_specific", Some(type_id), |conn| {
            Ok(LinkRepo::flags(conn, type_id)?.src_version_specific)
        })
    }

    pub fn is_link_dest_version_specific(&self, type_id: Uuid) -> Result<bool> {
        self.read("is_link_dest_version_specific", Some(type_id), |conn| {
            Ok(LinkRepo::flags(conn, type_id)?.dest_version_specific)
        })
    }
}

// ========== Helpers shared by several operations ==========

fn next_rev(conn: &Connection, id: Uuid) -> Result<u32> {
    Ok(LedgerRepo::last_rev(conn, id)?.unwrap_or(0) + 1)
}

fn read_value(conn: &Connection, id: Uuid, sel: ReadRev, attribute: &str) -> Result<Value> {
    if attribute.is_empty() {
        return Err(ModelError::EmptyAttributeName.into());
    }
    let rev = LedgerRepo::resolve_read(conn, id, sel)?;
    AttributeRepo::read_value(conn, id, rev, attribute)?.ok_or_else(|| {
        ModelError::AttributeNotFound {
            id,
            rev,
            attribute: attribute.to_string(),
        }
        .into()
    })
}

fn require_link_record(conn: &Connection, id: Uuid) -> Result<LinkRecord> {
    LinkRepo::find(conn, id)?.ok_or_else(|| ModelError::LinkNotFound { id }.into())
}

fn insert_link(
    conn: &Connection,
    op: &str,
    id: Uuid,
    type_id: Uuid,
    (src, src_sel): (Uuid, RevSelector),
    (dest, dest_sel): (Uuid, RevSelector),
    state: Option<&State>,
) -> Result<Revision> {
    let src_sel = src_sel.for_read(op)?;
    let dest_sel = dest_sel.for_read(op)?;
    EntityRepo::require_object(conn, src)?;
    EntityRepo::require_object(conn, dest)?;
    let src_rev = LedgerRepo::resolve_read(conn, src, src_sel)?;
    let dest_rev = LedgerRepo::resolve_read(conn, dest, dest_sel)?;

    let entity = EntityRepo::insert(conn, id, EntityRole::Link, type_id, false)?;
    LinkRepo::insert(conn, id, src, dest)?;
    LedgerRepo::insert(conn, id, FIRST_REVISION, Some((src_rev, dest_rev)))?;
    if let Some(state) = state {
        AttributeRepo::write_state(conn, &entity, &[FIRST_REVISION], state)?;
    }
    Ok(Revision::new(id, type_id, FIRST_REVISION))
}

/// Endpoint revision a scan starts from; `None` when it does not exist
fn scan_at(conn: &Connection, id: Uuid, sel: ScanRev) -> Result<Option<EndpointRev>> {
    let read = match sel {
        ScanRev::All => return Ok(Some(EndpointRev::All)),
        ScanRev::Exact(rev) => ReadRev::Exact(rev),
        ScanRev::Last => ReadRev::Last,
    };
    Ok(LedgerRepo::try_resolve_read(conn, id, read)?.map(EndpointRev::At))
}

fn dest_revs(conn: &Connection, type_id: Uuid, src: Uuid, sel: ReadRev) -> Result<Vec<Revision>> {
    let Some(rev) = LedgerRepo::try_resolve_read(conn, src, sel)? else {
        return Ok(Vec::new());
    };
    let mut revs: Vec<Revision> = LinkRepo::outgoing(conn, Some(type_id), src, EndpointRev::At(rev))?
        .iter()
        .map(LinkRevisionRow::dest_revision)
        .collect();
    revs.sort();
    revs.dedup();
    Ok(revs)
}

fn find_object_revs(
    conn: &Connection,
    type_id: Uuid,
    filter: &State,
    last_only: bool,
) -> Result<Vec<Revision>> {
    let found = AttributeRepo::find_revisions(conn, EntityRole::Object, type_id, filter)?;
    let mut revs: Vec<Revision> = Vec::with_capacity(found.len());
    for (id, rev) in found {
        let revision = Revision::new(id, type_id, rev);
        // ascending (id, rev): a later match of the same object replaces the earlier one
        match revs.last_mut() {
            Some(last) if last_only && last.id == id => *last = revision,
            _ => revs.push(revision),
        }
    }
    Ok(revs)
}

impl std::fmt::Debug for ModelVersionDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelVersionDb")
            .field("session_id", &self.session_id)
            .field("connection_url", &self.connection_url())
            .field("transaction", &self.transaction.state())
            .finish()
    }
}
