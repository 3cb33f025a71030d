//! Storage adapter capability.
//!
//! An [`Adapter`] translates a [`Query`] into whatever its backend speaks and
//! runs it. The repository never builds statements itself: it only decides
//! which adapter operation to dispatch and with which change maps.

use std::sync::Arc;

use oxide_changeset::{Destination, Map, Value};

use crate::error::{BoxError, OrmError, Result};
use crate::query::Query;

/// A pluggable storage backend.
///
/// Implementations must be shareable across threads. Transactions are
/// modelled as a second adapter returned by [`Adapter::begin`] that runs every
/// operation inside the transaction until it is committed or rolled back.
pub trait Adapter: Send + Sync {
    /// Loads the rows matching `query` into `dest` and returns how many were
    /// found.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn query(&self, query: &Query, dest: &mut dyn Destination) -> Result<usize>;

    /// Inserts one record and returns its generated primary key.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn insert(&self, query: &Query, changes: &Map) -> Result<Value>;

    /// Inserts several records at once and returns their primary keys in
    /// input order.
    ///
    /// `fields` is the sorted union of the keys of every change map; a map
    /// missing one of them inserts the backend's default for that column.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn insert_all(&self, query: &Query, fields: &[String], changes: &[Map]) -> Result<Vec<Value>>;

    /// Updates every record matching `query` with `changes`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn update(&self, query: &Query, changes: &Map) -> Result<()>;

    /// Deletes every record matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn delete(&self, query: &Query) -> Result<()>;

    /// Counts the records matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn count(&self, query: &Query) -> Result<usize>;

    /// Starts a transaction and returns the adapter bound to it.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn begin(&self) -> Result<Arc<dyn Adapter>>;

    /// Commits the transaction this adapter is bound to.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn commit(&self) -> Result<()>;

    /// Rolls back the transaction this adapter is bound to.
    ///
    /// # Errors
    ///
    /// Returns the adapter's translated error when the backend fails.
    fn rollback(&self) -> Result<()>;

    /// Translates a raw driver error into an [`OrmError`].
    ///
    /// The default wraps every error as [`OrmError::Unexpected`]; adapters
    /// override it to recognise constraint violations.
    fn error(&self, raw: BoxError) -> OrmError {
        OrmError::from_source(raw)
    }
}
