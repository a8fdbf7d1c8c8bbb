//! Attribute kind decision table
//!
//! Each (type, attribute) pair owns one schema record. The first non-null
//! value written commits the column to a kind. Later writes of the same kind
//! may widen the column; writes of another kind are only accepted while the
//! column holds no non-null value, in which case the column migrates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::model::{Value, ValueKind};

/// Schema record of one (type, attribute) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSchema {
    /// Committed kind, `None` until a non-null value is written
    pub kind: Option<ValueKind>,
    /// Largest byte length seen for sized kinds
    pub width: u32,
    /// Whether each revision carries its own value
    pub version_specific: bool,
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self {
            kind: None,
            width: 0,
            version_specific: true,
        }
    }
}

/// Outcome of [`decide_write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Write as-is, schema unchanged
    Accept,
    /// First non-null value: commit the column to this kind
    Commit(ValueKind),
    /// Same kind, larger than the recorded width
    Widen(u32),
    /// Empty column switching to another kind
    Migrate(ValueKind),
    /// Incompatible with the committed kind
    Reject {
        committed: ValueKind,
        offered: ValueKind,
    },
}

/// Decide how a write of `new` interacts with the column schema
///
/// `column_has_values` reports whether any entity of the type currently holds
/// a non-null value for the attribute, including the cell about to be
/// overwritten.
pub fn decide_write(
    schema: &AttributeSchema,
    column_has_values: bool,
    new: &Value,
) -> WriteDecision {
    let Some(offered) = new.kind() else {
        return WriteDecision::Accept;
    };
    match schema.kind {
        None => WriteDecision::Commit(offered),
        Some(committed) if committed == offered => {
            let width = new.width();
            if offered.is_sized() && width > schema.width {
                WriteDecision::Widen(width)
            } else {
                WriteDecision::Accept
            }
        }
        Some(_) if !column_has_values => WriteDecision::Migrate(offered),
        Some(committed) => WriteDecision::Reject { committed, offered },
    }
}

impl WriteDecision {
    /// Turn a rejection into the conflict error for `attribute` of `type_id`
    ///
    /// # Errors
    ///
    /// `KindConflict` when the decision is `Reject`.
    pub fn check(self, type_id: Uuid, attribute: &str) -> Result<Self, ModelError> {
        match self {
            WriteDecision::Reject { committed, offered } => Err(ModelError::KindConflict {
                type_id,
                attribute: attribute.to_string(),
                committed,
                offered,
            }),
            other => Ok(other),
        }
    }

    /// Schema after applying this decision for a value of `width`
    pub fn apply(self, schema: &AttributeSchema, width: u32) -> AttributeSchema {
        match self {
            WriteDecision::Accept | WriteDecision::Reject { .. } => *schema,
            WriteDecision::Commit(kind) | WriteDecision::Migrate(kind) => AttributeSchema {
                kind: Some(kind),
                width,
                ..*schema
            },
            WriteDecision::Widen(width) => AttributeSchema { width, ..*schema },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(kind: ValueKind, width: u32) -> AttributeSchema {
        AttributeSchema {
            kind: Some(kind),
            width,
            version_specific: true,
        }
    }

    #[test]
    fn test_uncommitted_column() {
        let schema = AttributeSchema::default();
        assert_eq!(
            decide_write(&schema, false, &Value::Null),
            WriteDecision::Accept
        );
        assert_eq!(
            decide_write(&schema, false, &Value::Int(1)),
            WriteDecision::Commit(ValueKind::Int)
        );
    }

    #[test]
    fn test_null_always_accepted() {
        let schema = committed(ValueKind::String, 4);
        assert_eq!(
            decide_write(&schema, true, &Value::Null),
            WriteDecision::Accept
        );
    }

    #[test]
    fn test_same_kind_widens_only_when_larger() {
        let schema = committed(ValueKind::String, 4);
        assert_eq!(
            decide_write(&schema, true, &Value::from("abc")),
            WriteDecision::Accept
        );
        assert_eq!(
            decide_write(&schema, true, &Value::from("abcdefgh")),
            WriteDecision::Widen(8)
        );
        let widened = WriteDecision::Widen(8).apply(&schema, 8);
        assert_eq!(
            decide_write(&widened, true, &Value::from("abcdefgh")),
            WriteDecision::Accept
        );
    }

    #[test]
    fn test_other_kind_migrates_empty_column() {
        let schema = committed(ValueKind::Int, 0);
        assert_eq!(
            decide_write(&schema, false, &Value::from("x")),
            WriteDecision::Migrate(ValueKind::String)
        );
    }

    #[test]
    fn test_other_kind_rejected_on_populated_column() {
        let schema = committed(ValueKind::Int, 0);
        let decision = decide_write(&schema, true, &Value::Long(5));
        assert_eq!(
            decision,
            WriteDecision::Reject {
                committed: ValueKind::Int,
                offered: ValueKind::Long
            }
        );
        let err = decision.check(Uuid::nil(), "count").unwrap_err();
        assert!(err.to_string().starts_with("Found persist type Int"));
    }
}
