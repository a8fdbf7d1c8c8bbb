//! Revision selectors
//!
//! Callers address revisions with a [`RevSelector`]: an exact number or one of
//! three sentinels. Each operation narrows the selector into the enum of the
//! forms it actually supports, so the store code matches exhaustively on what
//! is legal and never sees a sentinel it cannot handle.
//!
//! | narrowing | accepts |
//! |---|---|
//! | [`RevSelector::for_read`] | `Exact`, `Last` |
//! | [`RevSelector::for_write`] | `Exact`, `Last`, `All` |
//! | [`RevSelector::for_exists`] | `Exact`, `Last`, `Any` |
//! | [`RevSelector::for_scan`] | `Exact`, `Last`, `All` |

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};
use crate::model::revision::FIRST_REVISION;

/// Revision argument accepted by the public API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RevSelector {
    /// A concrete revision number (1-based)
    Exact(u32),
    /// The highest revision recorded at call time
    Last,
    /// Every revision (broadcast writes, full scans)
    All,
    /// At least one revision (existence checks)
    Any,
}

/// Selector forms legal for reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRev {
    Exact(u32),
    Last,
}

/// Selector forms legal for writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRev {
    Exact(u32),
    Last,
    All,
}

/// Selector forms legal for existence checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsRev {
    Exact(u32),
    Last,
    Any,
}

/// Selector forms legal for link scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRev {
    Exact(u32),
    Last,
    All,
}

impl RevSelector {
    /// Narrow for a single-revision read
    ///
    /// # Errors
    ///
    /// `SentinelNotAllowed` for `All`/`Any`, `InvalidRevision` for `Exact(0)`.
    pub fn for_read(self, op: &str) -> Result<ReadRev> {
        match self {
            RevSelector::Exact(rev) => Ok(ReadRev::Exact(check_exact(rev)?)),
            RevSelector::Last => Ok(ReadRev::Last),
            RevSelector::All | RevSelector::Any => Err(self.rejected(op)),
        }
    }

    /// Narrow for a write
    ///
    /// # Errors
    ///
    /// `SentinelNotAllowed` for `Any`, `InvalidRevision` for `Exact(0)`.
    pub fn for_write(self, op: &str) -> Result<WriteRev> {
        match self {
            RevSelector::Exact(rev) => Ok(WriteRev::Exact(check_exact(rev)?)),
            RevSelector::Last => Ok(WriteRev::Last),
            RevSelector::All => Ok(WriteRev::All),
            RevSelector::Any => Err(self.rejected(op)),
        }
    }

    /// Narrow for an existence check
    ///
    /// # Errors
    ///
    /// `SentinelNotAllowed` for `All`, `InvalidRevision` for `Exact(0)`.
    pub fn for_exists(self, op: &str) -> Result<ExistsRev> {
        match self {
            RevSelector::Exact(rev) => Ok(ExistsRev::Exact(check_exact(rev)?)),
            RevSelector::Last => Ok(ExistsRev::Last),
            RevSelector::Any => Ok(ExistsRev::Any),
            RevSelector::All => Err(self.rejected(op)),
        }
    }

    /// Narrow for an outgoing-link scan
    ///
    /// # Errors
    ///
    /// `SentinelNotAllowed` for `Any`, `InvalidRevision` for `Exact(0)`.
    pub fn for_scan(self, op: &str) -> Result<ScanRev> {
        match self {
            RevSelector::Exact(rev) => Ok(ScanRev::Exact(check_exact(rev)?)),
            RevSelector::Last => Ok(ScanRev::Last),
            RevSelector::All => Ok(ScanRev::All),
            RevSelector::Any => Err(self.rejected(op)),
        }
    }

    fn rejected(self, op: &str) -> ModelError {
        ModelError::SentinelNotAllowed {
            op: op.to_string(),
            selector: self.to_string(),
        }
    }
}

fn check_exact(rev: u32) -> Result<u32> {
    if rev < FIRST_REVISION {
        return Err(ModelError::InvalidRevision { rev });
    }
    Ok(rev)
}

impl From<u32> for RevSelector {
    fn from(rev: u32) -> Self {
        RevSelector::Exact(rev)
    }
}

impl std::fmt::Display for RevSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevSelector::Exact(rev) => write!(f, "{}", rev),
            RevSelector::Last => write!(f, "LAST"),
            RevSelector::All => write!(f, "ALL"),
            RevSelector::Any => write!(f, "ANY"),
        }
    }
}

impl std::str::FromStr for RevSelector {
    type Err = ModelError;

    /// Parse `last`, `all`, `any` (case-insensitive) or a revision number
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "last" => Ok(RevSelector::Last),
            "all" => Ok(RevSelector::All),
            "any" => Ok(RevSelector::Any),
            other => other
                .parse::<u32>()
                .map(RevSelector::Exact)
                .map_err(|_| ModelError::SentinelNotAllowed {
                    op: "parse_selector".to_string(),
                    selector: s.to_string(),
                }),
        }
    }
}
