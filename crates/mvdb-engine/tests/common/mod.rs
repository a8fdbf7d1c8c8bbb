#![allow(dead_code)]

use mvdb_engine::{ModelVersionDb, State, Value};
use uuid::Uuid;

/// A store connected to its own in-memory database
pub fn connected() -> ModelVersionDb {
    let mut db = ModelVersionDb::new();
    db.set_connection_url("mvdb:sqlite:mem:test").unwrap();
    db
}

/// Build a state map from name/value pairs
pub fn state<const N: usize>(entries: [(&str, Value); N]) -> State {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Create an object of `type_id` with `revs` revisions and return its id
pub fn object_with_revs(db: &mut ModelVersionDb, type_id: Uuid, revs: u32) -> Uuid {
    let id = Uuid::new_v4();
    db.create_object(id, type_id, None, false).unwrap();
    for _ in 1..revs {
        db.create_new_object_revision(id, mvdb_engine::RevSelector::Last)
            .unwrap();
    }
    id
}
