//! Session ids
//!
//! Each `ModelVersionDb` owns one id and stamps it on every event it logs,
//! so output from contexts driven side by side can be separated.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered (UUIDv7) identifier of one store context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
