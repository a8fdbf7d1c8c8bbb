// Integration tests for connection management and the cross-connection
// transaction.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{connected, object_with_revs};
use mvdb_engine::{DbKind, ErrorClass, ExErrorKind, ModelVersionDb, RevSelector, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// connections
// ---------------------------------------------------------------------------

#[test]
fn test_operations_require_a_connection() {
    let mut db = ModelVersionDb::new();

    assert!(!db.is_connected());
    assert_eq!(db.connection_url(), None);
    let err = db
        .create_object(Uuid::new_v4(), Uuid::new_v4(), None, false)
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotConnected);
    assert_eq!(err.class(), ErrorClass::Domain);
    assert_eq!(
        db.get_objects().unwrap_err().kind(),
        ExErrorKind::NotConnected
    );
}

#[test]
fn test_connect_by_kind() {
    let mut db = ModelVersionDb::new();

    db.connect(DbKind::SqliteMemory, "localhost", 5432, "models", Some("sa"), Some("secret"))
        .unwrap();

    assert!(db.is_connected());
    assert_eq!(db.connection_url(), Some("mvdb:sqlite:mem:models"));
    assert_eq!(db.login(), Some("sa"));
    assert!(!format!("{:?}", db).contains("secret"));
}

#[test]
fn test_half_given_credentials_disconnect() {
    let mut db = connected();

    let err = db
        .set_connection_url_with_login("mvdb:sqlite:mem:other", Some("sa"), None)
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert_eq!(err.op(), Some("connect"));
    assert!(!db.is_connected());
}

#[test]
fn test_unknown_url_is_rejected() {
    let mut db = ModelVersionDb::new();
    let err = db
        .set_connection_url("postgres://localhost/models")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert!(!db.is_connected());
}

#[test]
fn test_switching_between_stores() {
    let mut db = ModelVersionDb::new();
    let ty = Uuid::new_v4();
    db.set_connection_url("mvdb:sqlite:mem:left").unwrap();
    let left = object_with_revs(&mut db, ty, 1);

    db.set_connection_url("mvdb:sqlite:mem:right").unwrap();
    assert!(!db.obj_exists(left).unwrap());
    let right = object_with_revs(&mut db, ty, 1);

    db.set_connection_url("mvdb:sqlite:mem:left").unwrap();
    assert!(db.obj_exists(left).unwrap());
    assert!(!db.obj_exists(right).unwrap());
}

#[test]
fn test_disconnect_closes_the_store() {
    let mut db = ModelVersionDb::new();
    db.set_connection_url("mvdb:sqlite:mem:gone").unwrap();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);

    db.disconnect().unwrap();
    assert!(!db.is_connected());

    db.set_connection_url("mvdb:sqlite:mem:gone").unwrap();
    assert!(!db.obj_exists(id).unwrap());
}

// ---------------------------------------------------------------------------
// transactions
// ---------------------------------------------------------------------------

#[test]
fn test_transaction_state_errors() {
    let mut db = connected();

    assert!(!db.has_transaction());
    let err = db.commit_transaction().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::TransactionState);
    assert_eq!(err.class(), ErrorClass::TransactionState);
    assert_eq!(
        db.rollback_transaction().unwrap_err().kind(),
        ExErrorKind::TransactionState
    );

    db.begin_transaction().unwrap();
    assert!(db.has_transaction());
    assert_eq!(
        db.begin_transaction().unwrap_err().kind(),
        ExErrorKind::TransactionState
    );
    db.commit_transaction().unwrap();
    assert!(!db.has_transaction());
}

#[test]
fn test_rollback_discards_writes() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let kept = object_with_revs(&mut db, ty, 1);

    db.begin_transaction().unwrap();
    let dropped = object_with_revs(&mut db, ty, 2);
    db.set_object_value(kept, RevSelector::Last, "x", Value::Int(1))
        .unwrap();
    assert!(db.obj_exists(dropped).unwrap());
    db.rollback_transaction().unwrap();

    assert!(db.obj_exists(kept).unwrap());
    assert!(!db.obj_exists(dropped).unwrap());
    assert_eq!(
        db.get_object_value(kept, RevSelector::Last, "x")
            .unwrap_err()
            .kind(),
        ExErrorKind::AttributeNotFound
    );
}

#[test]
fn test_commit_keeps_writes() {
    let mut db = connected();
    let ty = Uuid::new_v4();

    db.begin_transaction().unwrap();
    let id = object_with_revs(&mut db, ty, 1);
    db.commit_transaction().unwrap();

    assert!(db.obj_exists(id).unwrap());
}

#[test]
fn test_failed_call_inside_transaction_keeps_earlier_writes() {
    let mut db = connected();
    let ty = Uuid::new_v4();

    db.begin_transaction().unwrap();
    let id = object_with_revs(&mut db, ty, 1);
    assert!(db.create_object(id, ty, None, false).is_err());
    assert!(db.has_transaction());
    db.commit_transaction().unwrap();

    assert!(db.obj_exists(id).unwrap());
}

#[test]
fn test_transaction_spans_connections() {
    let mut db = ModelVersionDb::new();
    let ty = Uuid::new_v4();
    db.set_connection_url("mvdb:sqlite:mem:one").unwrap();

    db.begin_transaction().unwrap();
    let first = object_with_revs(&mut db, ty, 1);
    db.set_connection_url("mvdb:sqlite:mem:two").unwrap();
    let second = object_with_revs(&mut db, ty, 1);
    db.rollback_transaction().unwrap();

    assert!(!db.obj_exists(second).unwrap());
    db.set_connection_url("mvdb:sqlite:mem:one").unwrap();
    assert!(!db.obj_exists(first).unwrap());
}

#[test]
fn test_commit_spans_connections() {
    let mut db = ModelVersionDb::new();
    let ty = Uuid::new_v4();
    db.set_connection_url("mvdb:sqlite:mem:one").unwrap();

    db.begin_transaction().unwrap();
    let first = object_with_revs(&mut db, ty, 1);
    db.set_connection_url("mvdb:sqlite:mem:two").unwrap();
    let second = object_with_revs(&mut db, ty, 1);
    db.commit_transaction().unwrap();

    assert!(db.obj_exists(second).unwrap());
    db.set_connection_url("mvdb:sqlite:mem:one").unwrap();
    assert!(db.obj_exists(first).unwrap());
}

#[test]
fn test_begin_before_connecting() {
    let mut db = ModelVersionDb::new();
    db.begin_transaction().unwrap();

    db.set_connection_url("mvdb:sqlite:mem:late").unwrap();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);
    db.rollback_transaction().unwrap();

    assert!(!db.obj_exists(id).unwrap());
}

#[test]
fn test_disconnect_inside_transaction() {
    let mut db = ModelVersionDb::new();
    db.set_connection_url("mvdb:sqlite:mem:a").unwrap();
    db.begin_transaction().unwrap();
    object_with_revs(&mut db, Uuid::new_v4(), 1);

    db.disconnect().unwrap();

    assert!(db.has_transaction());
    db.commit_transaction().unwrap();
}
