//! Migration framework
//!
//! - SQL embedded at compile time
//! - SHA-256 checksum recorded per applied migration and verified on reopen
//! - idempotent application, one transaction per migration

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::{applied_migrations, apply_migrations};
