use thiserror::Error;
use uuid::Uuid;

use crate::model::ValueKind;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Classification of every failure returned by the store
///
/// A kind fixes both the `ERR_*` code and the [`ErrorClass`] a caller sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Caller errors
    InvalidArgument,
    SentinelNotAllowed,
    NotFound,
    RevisionNotFound,
    AttributeNotFound,
    AlreadyExists,

    // Domain errors
    KindConflict,
    NotConnected,

    // Integration/IO
    Persistence,
    Serialization,
    Migration,

    // Transactions
    TransactionState,

    // Internal
    Internal,
}

/// Caller-facing error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The arguments can never succeed (unknown id, bad revision, misused selector)
    InvalidArgument,
    /// The arguments were well formed but the store refused or failed
    Domain,
    /// Transaction begin/commit/rollback called in the wrong state
    TransactionState,
}

impl ExErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidArgument => "ERR_INVALID_ARGUMENT",
            ExErrorKind::SentinelNotAllowed => "ERR_SENTINEL_NOT_ALLOWED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::RevisionNotFound => "ERR_REVISION_NOT_FOUND",
            ExErrorKind::AttributeNotFound => "ERR_ATTRIBUTE_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::KindConflict => "ERR_KIND_CONFLICT",
            ExErrorKind::NotConnected => "ERR_NOT_CONNECTED",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Migration => "ERR_MIGRATION",
            ExErrorKind::TransactionState => "ERR_TRANSACTION_STATE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Which of the three caller-facing classes this kind belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            ExErrorKind::InvalidArgument
            | ExErrorKind::SentinelNotAllowed
            | ExErrorKind::NotFound
            | ExErrorKind::RevisionNotFound
            | ExErrorKind::AttributeNotFound
            | ExErrorKind::AlreadyExists => ErrorClass::InvalidArgument,
            ExErrorKind::TransactionState => ErrorClass::TransactionState,
            ExErrorKind::KindConflict
            | ExErrorKind::NotConnected
            | ExErrorKind::Persistence
            | ExErrorKind::Serialization
            | ExErrorKind::Migration
            | ExErrorKind::Internal => ErrorClass::Domain,
        }
    }
}

/// Error returned by every public store operation
///
/// Layers fill in the context they know as the error travels up.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    attribute: Option<String>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            attribute: None,
            message: String::new(),
        }
    }

    /// Public operation that failed
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Object or link the failure concerns
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// `ERR_*` code, stable across releases
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the failure is the caller's fault
    pub fn is_invalid_argument(&self) -> bool {
        self.class() == ErrorClass::InvalidArgument
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())?;
        if let Some(op) = self.op() {
            write!(f, " [{}]", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        let context = [("entity", self.entity_id()), ("attribute", self.attribute())];
        for (label, value) in context {
            if let Some(value) = value {
                write!(f, " {}={}", label, value)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

/// Domain failures raised below the connection layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // arguments
    /// Revision numbers start at 1
    #[error("Invalid revision number {rev}: revisions start at 1")]
    InvalidRevision { rev: u32 },

    /// Selector sentinel not legal for this operation
    #[error("Selector {selector} is not allowed in operation {op}")]
    SentinelNotAllowed { op: String, selector: String },

    /// Attribute names must be non-empty
    #[error("Attribute name must not be empty")]
    EmptyAttributeName,

    /// State maps passed to setters must be non-empty
    #[error("State must contain at least one attribute")]
    EmptyState,

    /// Exactly one of login and password was supplied
    #[error("Login and password must be given together")]
    IncompleteCredentials,

    /// Connection URL could not be parsed
    #[error("Unsupported connection url: {url}")]
    InvalidUrl { url: String },

    // lookups
    /// No object with this id
    #[error("Object not found: {id}")]
    ObjectNotFound { id: Uuid },

    /// No link with this id
    #[error("Link not found: {id}")]
    LinkNotFound { id: Uuid },

    /// Entity exists but not at this revision
    #[error("Revision {rev} of entity {id} does not exist")]
    RevisionNotFound { id: Uuid, rev: u32 },

    /// Attribute absent from the revision's state
    #[error("Attribute {attribute} is not set on revision {rev} of entity {id}")]
    AttributeNotFound {
        id: Uuid,
        rev: u32,
        attribute: String,
    },

    /// Id already used by an object or link
    #[error("Entity already exists: {id}")]
    AlreadyExists { id: Uuid },

    // schema
    /// Attribute column already committed to another kind
    #[error("Found persist type {committed} for attribute {attribute} of type {type_id}, incompatible with {offered}")]
    KindConflict {
        type_id: Uuid,
        attribute: String,
        committed: ValueKind,
        offered: ValueKind,
    },

    /// Blob payload could not be encoded or decoded
    #[error("Blob serialization failed: {reason}")]
    BlobEncoding { reason: String },

    // session
    /// No current connection
    #[error("Not connected to any database")]
    NotConnected,

    /// begin while a transaction is active
    #[error("A transaction is already active")]
    TransactionAlreadyActive,

    /// commit or rollback without an active transaction
    #[error("No active transaction")]
    NoActiveTransaction,
}

impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::InvalidRevision { .. }
            | ModelError::EmptyAttributeName
            | ModelError::EmptyState
            | ModelError::IncompleteCredentials
            | ModelError::InvalidUrl { .. } => {
                ExError::new(ExErrorKind::InvalidArgument).with_message(message)
            }

            ModelError::SentinelNotAllowed { op, .. } => {
                ExError::new(ExErrorKind::SentinelNotAllowed)
                    .with_op(op)
                    .with_message(message)
            }

            ModelError::ObjectNotFound { id } | ModelError::LinkNotFound { id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(id.to_string())
                    .with_message(message)
            }

            ModelError::RevisionNotFound { id, .. } => ExError::new(ExErrorKind::RevisionNotFound)
                .with_entity_id(id.to_string())
                .with_message(message),

            ModelError::AttributeNotFound { id, attribute, .. } => {
                ExError::new(ExErrorKind::AttributeNotFound)
                    .with_entity_id(id.to_string())
                    .with_attribute(attribute)
                    .with_message(message)
            }

            ModelError::AlreadyExists { id } => ExError::new(ExErrorKind::AlreadyExists)
                .with_entity_id(id.to_string())
                .with_message(message),

            ModelError::KindConflict {
                type_id, attribute, ..
            } => ExError::new(ExErrorKind::KindConflict)
                .with_entity_id(type_id.to_string())
                .with_attribute(attribute)
                .with_message(message),

            ModelError::BlobEncoding { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            ModelError::NotConnected => {
                ExError::new(ExErrorKind::NotConnected).with_message(message)
            }

            ModelError::TransactionAlreadyActive | ModelError::NoActiveTransaction => {
                ExError::new(ExErrorKind::TransactionState).with_message(message)
            }
        }
    }
}
