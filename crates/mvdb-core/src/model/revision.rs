use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number given to the first revision of every entity lifetime
pub const FIRST_REVISION: u32 = 1;

/// One revision of an object or link
///
/// Ordering is by entity id, then revision number (the type never changes for
/// a given id, so it does not affect the order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision {
    /// Entity id (object or link)
    pub id: Uuid,

    /// Type the entity was created with
    pub type_id: Uuid,

    /// Revision number, starting at [`FIRST_REVISION`]
    pub rev: u32,
}

impl Revision {
    pub fn new(id: Uuid, type_id: Uuid, rev: u32) -> Self {
        Self { id, type_id, rev }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.rev)
    }
}
