//! mvdb Core - value model and revision algebra
//!
//! This crate holds everything about the versioned object/link store that does
//! not need a database:
//! - `Value` / `ValueKind` / `State` and the blob helpers
//! - `Revision` identifiers and `RevSelector` with per-operation narrowing
//! - the attribute kind decision table (`decide_write`)
//! - the `ExError` facility and the `ModelError` domain enum
//! - the structured logging facility shared by the store and engine crates

pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod schema_rules;

// Log field names, re-exported so the logging macros resolve from any crate
pub use mvdb_core_types::schema;

pub use errors::{ErrorClass, ExError, ExErrorKind, ModelError, Result};
pub use model::{
    ExistsRev, ReadRev, RevSelector, Revision, ScanRev, State, Value, ValueKind, WriteRev,
    FIRST_REVISION,
};
pub use schema_rules::{decide_write, AttributeSchema, WriteDecision};
