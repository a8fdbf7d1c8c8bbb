//! mvdb Engine - the public face of the versioned object/link store
//!
//! [`ModelVersionDb`] is an explicit context object bundling:
//! - a [`ConnectionManager`] holding one open SQLite session per URL and a
//!   pointer to the current one
//! - a [`TransactionCoordinator`] owning the optional cross-connection
//!   transaction
//! - the operation surface over objects, links, attributes and revisions
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging: every public operation emits
//! `log_op_start!` and then either `log_op_end!` or `log_op_error!`. Lower
//! layers only use `tracing::debug!()` for internal details.

#![allow(clippy::result_large_err)]

pub mod connection;
pub mod service;
pub mod transaction;

pub use connection::{ConnectionConfig, ConnectionManager, DbKind, Session};
pub use service::ModelVersionDb;
pub use transaction::{TransactionCoordinator, TransactionState};

pub use mvdb_core::{
    ErrorClass, ExError, ExErrorKind, RevSelector, Revision, State, Value, ValueKind,
    FIRST_REVISION,
};
