//! Repository layer
//!
//! Unit structs grouping the SQL for one concern each. All functions take a
//! `&Connection` so they run unchanged inside a savepoint or a transaction.

pub mod attributes;
pub mod codec;
pub mod entities;
pub mod ledger;
pub mod links;

pub use attributes::AttributeRepo;
pub use entities::{EntityRecord, EntityRepo, EntityRole};
pub use ledger::LedgerRepo;
pub use links::{EndpointRev, LinkRecord, LinkRepo, LinkRevisionRow, LinkTypeFlags};
