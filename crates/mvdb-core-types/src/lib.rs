//! Types shared by the mvdb error and logging facilities
//!
//! [`SessionId`] tags the events of one store context, [`Sensitive`] keeps
//! connection passwords out of formatted output and [`schema`] names the
//! canonical log fields.

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::SessionId;
pub use sensitive::Sensitive;
