//! mvdb Store - SQLite persistence for the object/link graph
//!
//! Provides:
//! - the relational schema and its migration runner
//! - the value codec between `Value` and SQLite cells
//! - repositories for the entity arena, the revision ledger, attribute
//!   schema and values, and links
//!
//! Every repository function takes a plain `&Connection`; atomicity is the
//! caller's business (the engine wraps each call in a savepoint).

#![allow(clippy::result_large_err)]

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::{AttributeRepo, EntityRepo, EntityRole, LedgerRepo, LinkRepo};
