//! Structured logging facility for mvdb
//!
//! - `init(profile)` installs the subscriber once per process
//! - `log_op_start!`, `log_op_end!` and `log_op_error!` bracket every public
//!   store operation with canonical fields
//! - `init_test_capture()` records events in memory for assertions
//!
//! # Usage
//!
//! ```rust
//! use mvdb_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
