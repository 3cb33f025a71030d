//! Transaction guard.

use tracing::{debug, warn};

use crate::error::Result;
use crate::repo::Repo;

/// A running transaction.
///
/// The guard holds a [`Repo`] bound to the transaction's adapter. It must be
/// finished with [`commit`](Self::commit) or [`rollback`](Self::rollback);
/// a guard dropped while still open, for example while unwinding from a
/// panic, rolls the transaction back.
///
/// # Example
///
/// ```ignore
/// let tx = Transaction::begin(&repo)?;
/// tx.repo().insert(&Query::from("users"), None, &[changeset])?;
/// tx.commit()?;
/// ```
#[derive(Debug)]
pub struct Transaction {
    repo: Repo,
    done: bool,
}

impl Transaction {
    /// Starts a transaction on the repository's adapter.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when the transaction cannot be started.
    pub fn begin(repo: &Repo) -> Result<Self> {
        debug!("Beginning transaction");
        let adapter = repo.adapter().begin()?;
        Ok(Self {
            repo: repo.with_adapter(adapter),
            done: false,
        })
    }

    /// Repository bound to this transaction.
    #[must_use]
    pub const fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Commits the transaction.
    ///
    /// A failed commit leaves the guard open, so the transaction is rolled
    /// back when it is dropped on return.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when the commit fails.
    pub fn commit(mut self) -> Result<()> {
        debug!("Committing transaction");
        self.repo.adapter().commit()?;
        self.done = true;
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when the rollback fails.
    pub fn rollback(mut self) -> Result<()> {
        self.done = true;
        debug!("Rolling back transaction");
        self.repo.adapter().rollback()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        warn!("Transaction not committed, rolling back");
        if let Err(err) = self.repo.adapter().rollback() {
            warn!(error = %err, "Rollback failed");
        }
    }
}
