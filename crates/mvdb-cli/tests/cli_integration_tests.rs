//! CLI integration tests
//!
//! Seed a store file through the engine, then run the binary against it.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use mvdb_engine::{DbKind, ModelVersionDb, RevSelector, Value};
use tempfile::TempDir;
use uuid::Uuid;

struct Seeded {
    _temp_dir: TempDir,
    db_path: PathBuf,
    ty: Uuid,
    link_ty: Uuid,
    src: Uuid,
    dest: Uuid,
    link: Uuid,
}

fn seed() -> Seeded {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("store.db");
    let (ty, link_ty) = (Uuid::new_v4(), Uuid::new_v4());
    let (src, dest) = (Uuid::new_v4(), Uuid::new_v4());

    let mut db = ModelVersionDb::new();
    db.connect(DbKind::SqliteFile, "", 0, db_path.to_str().unwrap(), None, None)
        .unwrap();
    db.create_object(src, ty, None, false).unwrap();
    db.create_object(dest, ty, None, false).unwrap();
    db.set_object_value(src, RevSelector::Last, "name", Value::from("source"))
        .unwrap();
    let link = db
        .add_link(link_ty, src, RevSelector::Last, dest, RevSelector::Last, None)
        .unwrap();
    db.create_new_object_revision(src, RevSelector::Last).unwrap();
    db.disconnect().unwrap();

    Seeded {
        _temp_dir: temp_dir,
        db_path,
        ty,
        link_ty,
        src,
        dest,
        link: link.id,
    }
}

fn run(db_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mvdb-cli"))
        .arg("--db")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_objects_lists_every_object() {
    let s = seed();

    let out = stdout(&run(&s.db_path, &["objects"]));
    assert!(out.contains(&s.src.to_string()));
    assert!(out.contains(&s.dest.to_string()));

    let out = stdout(&run(&s.db_path, &["objects", "--type", &Uuid::new_v4().to_string()]));
    assert!(out.is_empty());
    let out = stdout(&run(&s.db_path, &["objects", "--type", &s.ty.to_string()]));
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn test_state_and_revs() {
    let s = seed();

    let out = stdout(&run(&s.db_path, &["state", &s.src.to_string(), "--rev", "2"]));
    assert_eq!(out.trim(), "name = \"source\"");

    let out = stdout(&run(&s.db_path, &["revs", &s.src.to_string()]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec![format!("type: {}", s.ty).as_str(), "1", "2"]);
}

#[test]
fn test_links_and_outgoing() {
    let s = seed();

    let out = stdout(&run(&s.db_path, &["links"]));
    assert_eq!(out.trim(), format!("{} {} -> {}", s.link, s.src, s.dest));

    let out = stdout(&run(
        &s.db_path,
        &["outgoing", &s.link_ty.to_string(), &s.src.to_string(), "--rev", "all"],
    ));
    assert_eq!(out.lines().count(), 2);
    assert!(out.contains(&format!("{}@2 -> {}", s.link, s.dest)));
}

#[test]
fn test_clear() {
    let s = seed();

    let out = stdout(&run(&s.db_path, &["clear"]));
    assert_eq!(out.trim(), "removed 2 objects and 1 links");
    let out = stdout(&run(&s.db_path, &["objects"]));
    assert!(out.is_empty());
}

#[test]
fn test_errors_exit_non_zero() {
    let s = seed();

    let output = run(&s.db_path, &["state", &Uuid::new_v4().to_string()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_NOT_FOUND"));

    let missing = s.db_path.with_file_name("missing.db");
    let output = run(&missing, &["objects"]);
    assert!(!output.status.success());
    assert!(!missing.exists());

    let output = run(&s.db_path, &["state", &s.src.to_string(), "--rev", "any"]);
    assert!(!output.status.success());
}
