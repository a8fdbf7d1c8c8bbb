//! Cross-connection transaction coordinator
//!
//! A transaction is owned by the coordinator, not by a connection. Every
//! session that becomes current while the transaction is active is enlisted
//! with its own SQLite journal (`BEGIN`). Commit and rollback finish each
//! enlisted journal independently; there is no two-phase commit.

use std::collections::BTreeSet;

use mvdb_core::{ExError, ModelError};
use mvdb_store::errors::from_rusqlite;
use mvdb_store::Result;

use crate::connection::ConnectionManager;

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction; every call commits on its own
    Idle,
    /// A transaction is open; enlisted journals hold all writes
    Active,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

impl Outcome {
    fn sql(self) -> &'static str {
        match self {
            Outcome::Commit => "COMMIT",
            Outcome::Rollback => "ROLLBACK",
        }
    }
}

/// Owner of the optional transaction spanning several sessions
#[derive(Debug)]
pub struct TransactionCoordinator {
    state: TransactionState,
    enlisted: BTreeSet<String>,
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self {
            state: TransactionState::Idle,
            enlisted: BTreeSet::new(),
        }
    }
}

impl TransactionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// URLs of the sessions holding an open journal
    pub fn enlisted(&self) -> impl Iterator<Item = &str> {
        self.enlisted.iter().map(String::as_str)
    }

    /// Open a transaction and enlist the current session, if any
    ///
    /// # Errors
    ///
    /// `TransactionState` when a transaction is already active.
    pub fn begin(&mut self, connections: &mut ConnectionManager) -> Result<()> {
        if self.is_active() {
            return Err(ModelError::TransactionAlreadyActive.into());
        }
        self.state = TransactionState::Active;
        if let Err(err) = self.enlist_current(connections) {
            self.state = TransactionState::Idle;
            return Err(err);
        }
        Ok(())
    }

    /// Start a journal on the current session if a transaction is active
    /// and the session is not enlisted yet
    pub fn enlist_current(&mut self, connections: &mut ConnectionManager) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let Some(url) = connections.current_url().map(str::to_string) else {
            return Ok(());
        };
        if self.enlisted.contains(&url) {
            return Ok(());
        }
        let session = connections.current_mut()?;
        session.conn.execute_batch("BEGIN").map_err(from_rusqlite)?;
        tracing::debug!(url = %url, "session enlisted");
        self.enlisted.insert(url);
        Ok(())
    }

    /// Commit every enlisted journal
    ///
    /// # Errors
    ///
    /// `TransactionState` when idle; otherwise the first journal failure,
    /// reported after every journal was attempted.
    pub fn commit(&mut self, connections: &mut ConnectionManager) -> Result<()> {
        self.finish(connections, Outcome::Commit)
    }

    /// Roll back every enlisted journal
    ///
    /// # Errors
    ///
    /// Same as [`TransactionCoordinator::commit`].
    pub fn rollback(&mut self, connections: &mut ConnectionManager) -> Result<()> {
        self.finish(connections, Outcome::Rollback)
    }

    /// Roll back and forget the current session's journal before it closes
    pub fn release_current(&mut self, connections: &mut ConnectionManager) -> Result<()> {
        let Some(url) = connections.current_url().map(str::to_string) else {
            return Ok(());
        };
        if !self.enlisted.remove(&url) {
            return Ok(());
        }
        let session = connections.current_mut()?;
        session
            .conn
            .execute_batch(Outcome::Rollback.sql())
            .map_err(from_rusqlite)
    }

    fn finish(&mut self, connections: &mut ConnectionManager, outcome: Outcome) -> Result<()> {
        if !self.is_active() {
            return Err(ModelError::NoActiveTransaction.into());
        }
        self.state = TransactionState::Idle;

        let mut first_error: Option<ExError> = None;
        for url in std::mem::take(&mut self.enlisted) {
            let Some(session) = connections.session_mut(&url) else {
                continue;
            };
            if let Err(err) = session.conn.execute_batch(outcome.sql()) {
                tracing::debug!(url = %url, error = %err, "journal did not finish");
                // a failed COMMIT leaves the journal open
                if !session.conn.is_autocommit() {
                    if let Err(cleanup) = session.conn.execute_batch("ROLLBACK") {
                        tracing::debug!(url = %url, error = %cleanup, "journal left open");
                    }
                }
                first_error.get_or_insert(from_rusqlite(err));
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
