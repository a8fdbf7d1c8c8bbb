// Integration tests for attribute values, kind commitment, value queries and
// per-revision versus shared storage.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{TimeZone, Utc};
use common::{connected, object_with_revs, state};
use mvdb_engine::{ExErrorKind, RevSelector, Revision, State, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// get / set values
// ---------------------------------------------------------------------------

#[test]
fn test_every_kind_round_trips_through_the_store() {
    let mut db = connected();
    let (id, ty) = (Uuid::new_v4(), Uuid::new_v4());
    let stamp = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 5).unwrap();
    let reference = Uuid::new_v4();
    let values = state([
        ("s", Value::from("text")),
        ("i", Value::Int(-3)),
        ("l", Value::Long(1 << 40)),
        ("t", Value::Timestamp(stamp)),
        ("b", Value::Bool(true)),
        ("bytes", Value::Blob(vec![0, 1, 2, 255])),
        ("u", Value::Uuid(reference)),
        ("nothing", Value::Null),
    ]);

    db.create_object(id, ty, Some(&values), false).unwrap();

    assert_eq!(db.get_object_state(id, RevSelector::Last).unwrap(), values);
    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(1), "t").unwrap(),
        Value::Timestamp(stamp)
    );
}

#[test]
fn test_set_state_merges() {
    let mut db = connected();
    let (id, ty) = (Uuid::new_v4(), Uuid::new_v4());
    db.create_object(
        id,
        ty,
        Some(&state([("a", Value::Int(1)), ("b", Value::Int(2))])),
        false,
    )
    .unwrap();

    db.set_object_state(id, RevSelector::Last, &state([("b", Value::Int(20))]))
        .unwrap();

    assert_eq!(
        db.get_object_state(id, RevSelector::Last).unwrap(),
        state([("a", Value::Int(1)), ("b", Value::Int(20))])
    );
}

#[test]
fn test_set_state_rejects_empty_map() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);

    let err = db
        .set_object_state(id, RevSelector::Last, &State::new())
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert_eq!(err.op(), Some("set_object_state"));
}

#[test]
fn test_set_value_on_all_revisions() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 3);

    db.set_object_value(id, RevSelector::All, "flag", Value::Bool(false))
        .unwrap();

    for rev in 1..=3 {
        assert_eq!(
            db.get_object_value(id, RevSelector::Exact(rev), "flag").unwrap(),
            Value::Bool(false)
        );
    }
}

#[test]
fn test_missing_attribute_is_reported() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);

    let err = db
        .get_object_value(id, RevSelector::Last, "absent")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::AttributeNotFound);
    assert_eq!(err.attribute(), Some("absent"));

    let err = db.get_object_value(id, RevSelector::Last, "").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
}

#[test]
fn test_null_is_a_stored_value() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);

    db.set_object_value(id, RevSelector::Last, "x", Value::Null)
        .unwrap();

    assert_eq!(
        db.get_object_value(id, RevSelector::Last, "x").unwrap(),
        Value::Null
    );
}

#[test]
fn test_write_selectors() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);

    let err = db
        .set_object_value(id, RevSelector::Any, "x", Value::Int(1))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SentinelNotAllowed);

    let err = db
        .set_object_value(id, RevSelector::Exact(2), "x", Value::Int(1))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::RevisionNotFound);

    let err = db
        .get_object_state(id, RevSelector::All)
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SentinelNotAllowed);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Geometry {
    points: Vec<(i32, i32)>,
    label: String,
}

#[test]
fn test_blob_helpers_through_the_store() {
    let mut db = connected();
    let id = object_with_revs(&mut db, Uuid::new_v4(), 1);
    let geometry = Geometry {
        points: vec![(0, 0), (3, 4)],
        label: "edge".to_string(),
    };

    db.set_object_value(id, RevSelector::Last, "geometry", Value::blob_of(&geometry).unwrap())
        .unwrap();
    let stored = db
        .get_object_value(id, RevSelector::Last, "geometry")
        .unwrap();

    assert_eq!(stored.blob_as::<Geometry>().unwrap(), geometry);
}

// ---------------------------------------------------------------------------
// kind commitment
// ---------------------------------------------------------------------------

#[test]
fn test_kind_conflict_across_objects_of_a_type() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = object_with_revs(&mut db, ty, 1);
    let b = object_with_revs(&mut db, ty, 1);
    db.set_object_value(a, RevSelector::Last, "size", Value::Int(4))
        .unwrap();

    let err = db
        .set_object_value(b, RevSelector::Last, "size", Value::from("four"))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::KindConflict);
    assert!(err.message().starts_with("Found persist type"));
    assert_eq!(err.attribute(), Some("size"));
}

#[test]
fn test_rejected_write_keeps_previous_value() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 1);
    db.set_object_value(id, RevSelector::Last, "label", Value::from("v3"))
        .unwrap();

    let err = db
        .set_object_value(id, RevSelector::Last, "label", Value::Int(3))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::KindConflict);
    assert!(err.message().contains("incompatible with Int"));
    assert_eq!(
        db.get_object_value(id, RevSelector::Last, "label").unwrap(),
        Value::from("v3")
    );
}

#[test]
fn test_longer_string_widens_column() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 2);
    db.set_object_value(id, RevSelector::Exact(1), "text", Value::from("v1"))
        .unwrap();
    let long = "x".repeat(10_000);

    db.set_object_value(id, RevSelector::Exact(2), "text", Value::from(long.as_str()))
        .unwrap();

    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(1), "text").unwrap(),
        Value::from("v1")
    );
    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(2), "text").unwrap(),
        Value::from(long.as_str())
    );
}

#[test]
fn test_int_and_long_are_distinct_kinds() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = object_with_revs(&mut db, ty, 1);
    db.set_object_value(a, RevSelector::Last, "n", Value::Int(4))
        .unwrap();

    let err = db
        .set_object_value(a, RevSelector::Last, "n", Value::Long(4))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::KindConflict);
}

#[test]
fn test_kind_migrates_when_column_holds_only_nulls() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = object_with_revs(&mut db, ty, 1);
    db.set_object_value(a, RevSelector::Last, "v", Value::Int(1))
        .unwrap();
    db.set_object_value(a, RevSelector::Last, "v", Value::Null)
        .unwrap();

    db.set_object_value(a, RevSelector::Last, "v", Value::from("now text"))
        .unwrap();

    assert_eq!(
        db.get_object_value(a, RevSelector::Last, "v").unwrap(),
        Value::from("now text")
    );
}

#[test]
fn test_kinds_are_scoped_per_type() {
    let mut db = connected();
    let a = object_with_revs(&mut db, Uuid::new_v4(), 1);
    let b = object_with_revs(&mut db, Uuid::new_v4(), 1);

    db.set_object_value(a, RevSelector::Last, "x", Value::Int(1))
        .unwrap();
    db.set_object_value(b, RevSelector::Last, "x", Value::from("one"))
        .unwrap();
}

// ---------------------------------------------------------------------------
// value queries
// ---------------------------------------------------------------------------

#[test]
fn test_query_by_value() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = object_with_revs(&mut db, ty, 1);
    let b = object_with_revs(&mut db, ty, 1);
    db.set_object_value(a, RevSelector::Last, "color", Value::from("red"))
        .unwrap();
    db.set_object_value(b, RevSelector::Last, "color", Value::from("blue"))
        .unwrap();

    let found = db
        .get_object_revs_by_value(ty, "color", Value::from("red"), false)
        .unwrap();

    assert_eq!(found, vec![Revision::new(a, ty, 1)]);
}

#[test]
fn test_query_last_only_keeps_highest_match() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = Uuid::new_v4();
    db.create_object(id, ty, Some(&state([("k", Value::Int(1))])), false)
        .unwrap();
    db.create_new_object_revision(id, RevSelector::Last).unwrap();
    db.create_new_object_revision(id, RevSelector::Last).unwrap();
    db.set_object_value(id, RevSelector::Exact(3), "k", Value::Int(2))
        .unwrap();

    let all = db
        .get_object_revs_by_value(ty, "k", Value::Int(1), false)
        .unwrap();
    let last = db
        .get_object_revs_by_value(ty, "k", Value::Int(1), true)
        .unwrap();

    assert_eq!(all, vec![Revision::new(id, ty, 1), Revision::new(id, ty, 2)]);
    assert_eq!(last, vec![Revision::new(id, ty, 2)]);
}

#[test]
fn test_query_with_several_attributes() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    db.create_object(
        a,
        ty,
        Some(&state([("x", Value::Int(1)), ("y", Value::Bool(true))])),
        false,
    )
    .unwrap();
    db.create_object(
        b,
        ty,
        Some(&state([("x", Value::Int(1)), ("y", Value::Bool(false))])),
        false,
    )
    .unwrap();

    let found = db
        .get_object_revs(
            ty,
            &state([("x", Value::Int(1)), ("y", Value::Bool(false))]),
            false,
        )
        .unwrap();

    assert_eq!(found, vec![Revision::new(b, ty, 1)]);
}

#[test]
fn test_query_unknown_attribute_and_wrong_kind() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 1);
    db.set_object_value(id, RevSelector::Last, "n", Value::Int(3))
        .unwrap();

    assert!(db
        .get_object_revs_by_value(ty, "unknown", Value::Int(3), false)
        .unwrap()
        .is_empty());

    let err = db
        .get_object_revs_by_value(ty, "n", Value::from("3"), false)
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::KindConflict);
}

#[test]
fn test_query_conflict_is_reported_beside_unknown_attribute() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 1);
    db.set_object_state(
        id,
        RevSelector::Last,
        &state([("aaa", Value::from("a")), ("zzz", Value::from("z"))]),
    )
    .unwrap();

    // the unknown name sorts after the conflicting one, then before it
    for filter in [
        state([("aaa", Value::Int(1)), ("bbb", Value::Int(1))]),
        state([("bbb", Value::Int(1)), ("zzz", Value::Int(1))]),
    ] {
        let err = db.get_object_revs(ty, &filter, false).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::KindConflict);
    }

    let unknown_only = state([("bbb", Value::from("a")), ("zzz", Value::from("z"))]);
    assert!(db.get_object_revs(ty, &unknown_only, false).unwrap().is_empty());
}

#[test]
fn test_query_for_null() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let a = object_with_revs(&mut db, ty, 1);
    let b = object_with_revs(&mut db, ty, 1);
    db.set_object_value(a, RevSelector::Last, "opt", Value::Null)
        .unwrap();
    db.set_object_value(b, RevSelector::Last, "opt", Value::from("set"))
        .unwrap();

    let found = db
        .get_object_revs_by_value(ty, "opt", Value::Null, false)
        .unwrap();

    assert_eq!(found, vec![Revision::new(a, ty, 1)]);
}

// ---------------------------------------------------------------------------
// version specificity
// ---------------------------------------------------------------------------

#[test]
fn test_attributes_are_version_specific_by_default() {
    let db = connected();
    assert!(db
        .is_object_att_version_specific(Uuid::new_v4(), "anything")
        .unwrap());
}

#[test]
fn test_shared_attribute_is_seen_by_every_revision() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    db.set_object_att_version_specific(ty, "owner", false)
        .unwrap();
    let id = object_with_revs(&mut db, ty, 3);

    db.set_object_value(id, RevSelector::Exact(1), "owner", Value::from("ops"))
        .unwrap();

    assert!(!db.is_object_att_version_specific(ty, "owner").unwrap());
    for rev in 1..=3 {
        assert_eq!(
            db.get_object_value(id, RevSelector::Exact(rev), "owner")
                .unwrap(),
            Value::from("ops")
        );
    }
    let new_rev = db.create_new_object_revision(id, RevSelector::Last).unwrap();
    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(new_rev), "owner")
            .unwrap(),
        Value::from("ops")
    );
}

#[test]
fn test_going_shared_keeps_newest_revision_value() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 3);
    db.set_object_value(id, RevSelector::Exact(1), "v", Value::Int(1))
        .unwrap();
    db.set_object_value(id, RevSelector::Exact(2), "v", Value::Int(2))
        .unwrap();

    db.set_object_att_version_specific(ty, "v", false).unwrap();

    for rev in 1..=3 {
        assert_eq!(
            db.get_object_value(id, RevSelector::Exact(rev), "v").unwrap(),
            Value::Int(2)
        );
    }
}

#[test]
fn test_shared_switch_then_write_through_later_revision() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    let id = object_with_revs(&mut db, ty, 1);
    db.set_object_value(id, RevSelector::Exact(1), "name", Value::from("v1"))
        .unwrap();
    let second = db.create_new_object_revision(id, RevSelector::Last).unwrap();
    db.set_object_value(id, RevSelector::Exact(second), "name", Value::from("v2"))
        .unwrap();
    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(1), "name").unwrap(),
        Value::from("v1")
    );

    db.set_object_att_version_specific(ty, "name", false).unwrap();
    db.set_object_value(id, RevSelector::Exact(second), "name", Value::from("v3"))
        .unwrap();

    for rev in [1, second] {
        assert_eq!(
            db.get_object_value(id, RevSelector::Exact(rev), "name").unwrap(),
            Value::from("v3")
        );
    }
}

#[test]
fn test_going_per_revision_copies_shared_value() {
    let mut db = connected();
    let ty = Uuid::new_v4();
    db.set_object_att_version_specific(ty, "v", false).unwrap();
    let id = object_with_revs(&mut db, ty, 2);
    db.set_object_value(id, RevSelector::Last, "v", Value::from("same"))
        .unwrap();

    db.set_object_att_version_specific(ty, "v", true).unwrap();
    db.set_object_value(id, RevSelector::Exact(2), "v", Value::from("changed"))
        .unwrap();

    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(1), "v").unwrap(),
        Value::from("same")
    );
    assert_eq!(
        db.get_object_value(id, RevSelector::Exact(2), "v").unwrap(),
        Value::from("changed")
    );
}

#[test]
fn test_version_specific_flag_requires_a_name() {
    let mut db = connected();
    let err = db
        .set_object_att_version_specific(Uuid::new_v4(), "", false)
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
}
