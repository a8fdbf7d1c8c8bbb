pub mod revision;
pub mod selector;
pub mod value;

pub use revision::{Revision, FIRST_REVISION};
pub use selector::{ExistsRev, ReadRev, RevSelector, ScanRev, WriteRev};
pub use value::{State, Value, ValueKind};
