//! Field names and event values shared by every mvdb log line
//!
//! The logging macros emit these names as identifiers; log consumers and test
//! assertions look fields up through the constants.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

/// Correlates the events of one `ModelVersionDb` context
pub const FIELD_SESSION_ID: &str = "session_id";
/// Object, link or type id an operation is about
pub const FIELD_ENTITY_ID: &str = "entity_id";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
