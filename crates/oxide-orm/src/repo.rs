//! Execution engine.
//!
//! [`Repo`] turns a [`Query`] plus changesets into adapter operations: it
//! merges change maps, fills in timestamps, picks single or batch inserts,
//! and reloads the written rows into a [`Destination`].

use std::collections::BTreeSet;
use std::fmt;
use std::slice;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oxide_changeset::record::{find_field, primary_key};
use oxide_changeset::{Change, Changeset, Destination, Field, Map, Value};
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::config::RepoConfig;
use crate::error::{OrmError, Result};
use crate::query::{Condition, Query};
use crate::transaction::Transaction;

/// How [`Repo::save`] writes a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    /// A single record that has not been stored yet.
    SingleNew,
    /// A single record that already exists.
    SingleExisting,
    /// A sequence of records that have not been stored yet.
    BatchNew,
    /// A sequence of records that already exist.
    BatchExisting,
}

impl SaveTarget {
    /// Classifies a destination.
    ///
    /// A target is existing when the query already carries a condition, or
    /// when the shape declares `primary_key` and every held record has a
    /// non-null, non-zero key.
    #[must_use]
    pub fn classify(query: &Query, dest: &dyn Destination, primary_key: &str) -> Self {
        let existing = !query.condition.is_empty()
            || (find_field(dest.fields(), primary_key).is_some()
                && dest
                    .rows()
                    .iter()
                    .all(|row| row.get(primary_key).is_some_and(|key| !key.is_zero())));

        match (dest.is_many(), existing) {
            (false, false) => Self::SingleNew,
            (false, true) => Self::SingleExisting,
            (true, false) => Self::BatchNew,
            (true, true) => Self::BatchExisting,
        }
    }

    /// Returns whether the target is inserted rather than updated.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::SingleNew | Self::BatchNew)
    }

    /// Returns whether the target holds a sequence of records.
    #[must_use]
    pub const fn is_batch(self) -> bool {
        matches!(self, Self::BatchNew | Self::BatchExisting)
    }
}

/// Entry point for running queries against an [`Adapter`].
///
/// A `Repo` is cheap to clone: clones share the same adapter.
///
/// # Example
///
/// ```ignore
/// use oxide_orm::{Query, Repo};
///
/// let repo = Repo::new(adapter);
/// let mut user = User::default();
/// repo.one(&Query::from("users").find(1).limit(1), &mut user)?;
///
/// let ch = Changeset::cast(&user, &params, &["name"]);
/// repo.update(&Query::from("users").find(user.id), Some(&mut user), &[ch])?;
/// ```
#[derive(Clone)]
pub struct Repo {
    adapter: Arc<dyn Adapter>,
    config: RepoConfig,
}

impl fmt::Debug for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repo")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Repo {
    /// Creates a repository with the default configuration.
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            config: RepoConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RepoConfig) -> Self {
        self.config = config;
        self
    }

    /// The adapter queries are dispatched to.
    #[must_use]
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// The repository configuration.
    #[must_use]
    pub const fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Same configuration, different adapter.
    pub(crate) fn with_adapter(&self, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            config: self.config.clone(),
        }
    }

    /// Loads the first matching record into `dest`.
    ///
    /// The query is passed through unchanged; add `limit(1)` when only one
    /// row is wanted from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::NotFound`] when nothing matched, or the adapter's
    /// error.
    pub fn one(&self, query: &Query, dest: &mut dyn Destination) -> Result<()> {
        debug!(collection = %query.collection, condition = %query.condition, "Querying one record");
        let count = self.adapter.query(query, dest)?;
        if count == 0 {
            return Err(OrmError::not_found("no result found"));
        }
        Ok(())
    }

    /// Loads every matching record into `dest`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error.
    pub fn all(&self, query: &Query, dest: &mut dyn Destination) -> Result<()> {
        debug!(collection = %query.collection, condition = %query.condition, "Querying records");
        let count = self.adapter.query(query, dest)?;
        debug!(collection = %query.collection, count = count, "Loaded records");
        Ok(())
    }

    /// Counts matching records.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error.
    pub fn count(&self, query: &Query) -> Result<usize> {
        debug!(collection = %query.collection, condition = %query.condition, "Counting records");
        self.adapter.count(query)
    }

    /// Inserts the changes of each changeset, plus the query's `set` fields.
    ///
    /// With no changesets, only the `set` fields are inserted; if there are
    /// none either, nothing happens. One changeset into a single (or absent)
    /// destination is a single insert; anything else is one batch insert.
    /// When `dest` is given, the inserted rows are loaded back into it.
    ///
    /// Association changes are never written here; see
    /// [`insert_assoc`](Self::insert_assoc).
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] before touching the adapter when a
    /// changeset is invalid, or the adapter's error.
    pub fn insert(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        changesets: &[Changeset],
    ) -> Result<()> {
        ensure_valid(changesets)?;
        let now = self.config.now();

        if changesets.is_empty() {
            if query.changes.is_empty() {
                debug!(collection = %query.collection, "Nothing to insert");
                return Ok(());
            }
            let mut changes = query.changes.clone();
            if let Some(dest) = dest.as_deref() {
                self.stamp_insert(&mut changes, dest.fields(), now);
            }
            return self.insert_one(query, dest, &changes);
        }

        let mut maps: Vec<Map> = changesets
            .iter()
            .map(|ch| {
                let mut changes = ch.change_map();
                changes.extend(query.changes.clone());
                self.stamp_insert(&mut changes, ch.types(), now);
                changes
            })
            .collect();

        let many = dest.as_deref().is_some_and(|dest| dest.is_many());
        if maps.len() == 1 && !many {
            let changes = maps.remove(0);
            return self.insert_one(query, dest, &changes);
        }
        self.insert_many(query, dest, &maps)
    }

    /// Inserts the association changes a parent changeset carries for
    /// `field`, against the child collection's `query`.
    ///
    /// A single association is a single insert; a many association is one
    /// batch insert. Fields without an association change are a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn insert_assoc(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        parent: &Changeset,
        field: &str,
    ) -> Result<()> {
        match parent.get_change(field) {
            Some(Change::One(child)) => self.insert(query, dest, slice::from_ref(child.as_ref())),
            Some(Change::Many(children)) => self.insert(query, dest, children),
            _ => {
                debug!(collection = %query.collection, field = field, "No association changes to insert");
                Ok(())
            }
        }
    }

    /// Updates every record matching `query` with the merged changes of each
    /// changeset, plus the query's `set` fields.
    ///
    /// Nothing is sent when there are no changes. When `dest` is given, it is
    /// reloaded with the same query.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Validation`] before touching the adapter when a
    /// changeset is invalid, or the adapter's error.
    pub fn update(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        changesets: &[Changeset],
    ) -> Result<()> {
        ensure_valid(changesets)?;

        let mut changes = Map::new();
        for ch in changesets {
            changes.extend(ch.change_map());
        }
        changes.extend(query.changes.clone());
        if changes.is_empty() {
            debug!(collection = %query.collection, "Nothing to update");
            return Ok(());
        }

        let now = self.config.now();
        let updated_at = self.config.updated_at.as_str();
        let declared = changesets
            .iter()
            .any(|ch| self.is_stamped(ch.types(), updated_at))
            || dest
                .as_deref()
                .is_some_and(|dest| self.is_stamped(dest.fields(), updated_at));
        if declared {
            changes
                .entry(updated_at.to_string())
                .or_insert(Value::Timestamp(now));
        }

        debug!(
            collection = %query.collection,
            condition = %query.condition,
            fields = changes.len(),
            "Updating records"
        );
        self.adapter.update(query, &changes)?;

        match dest {
            Some(dest) => self.all(query, dest),
            None => Ok(()),
        }
    }

    /// Deletes every record matching `query`.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error.
    pub fn delete(&self, query: &Query) -> Result<()> {
        debug!(collection = %query.collection, condition = %query.condition, "Deleting records");
        self.adapter.delete(query)
    }

    /// Inserts or updates the records held by `dest`, then reloads them.
    ///
    /// The write is chosen by [`SaveTarget::classify`]. An empty sequence is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error.
    pub fn save(&self, query: &Query, dest: &mut dyn Destination) -> Result<()> {
        let primary_key = self.primary_key_of(dest.fields());
        let target = SaveTarget::classify(query, dest, primary_key);
        self.save_as(query, dest, target)
    }

    /// Like [`save`](Self::save), with the write chosen by the caller.
    ///
    /// New records are inserted without their primary key. Existing records
    /// are updated with the query's condition when it has one, otherwise one
    /// update per record scoped by its primary key.
    ///
    /// # Errors
    ///
    /// Returns [`OrmError::Unexpected`] when an unscoped existing record has
    /// no primary key, or the adapter's error.
    pub fn save_as(&self, query: &Query, dest: &mut dyn Destination, target: SaveTarget) -> Result<()> {
        let rows = dest.rows();
        if rows.is_empty() {
            debug!(collection = %query.collection, "Nothing to save");
            return Ok(());
        }

        let fields = dest.fields();
        let primary_key = self.primary_key_of(fields);
        let now = self.config.now();
        debug!(collection = %query.collection, target = ?target, records = rows.len(), "Saving records");

        let records: Vec<Map> = rows
            .iter()
            .map(|row| self.record_changes(row, fields, primary_key, &query.changes))
            .collect();

        if target.is_new() {
            let maps: Vec<Map> = records
                .into_iter()
                .map(|mut changes| {
                    self.stamp_insert(&mut changes, fields, now);
                    changes
                })
                .collect();
            return match (target.is_batch(), maps.as_slice()) {
                (false, [changes, ..]) => self.insert_one(query, Some(dest), changes),
                _ => self.insert_many(query, Some(dest), &maps),
            };
        }

        let stamp_update = |mut changes: Map| {
            if self.is_stamped(fields, &self.config.updated_at) {
                changes
                    .entry(self.config.updated_at.clone())
                    .or_insert(Value::Timestamp(now));
            }
            changes
        };

        if !query.condition.is_empty() {
            let Some(first) = records.into_iter().next() else {
                return Ok(());
            };
            self.adapter.update(query, &stamp_update(first))?;
            return self.all(query, dest);
        }

        let mut keys = Vec::with_capacity(rows.len());
        for (row, changes) in rows.iter().zip(records) {
            let key = row
                .get(primary_key)
                .filter(|key| !key.is_null())
                .cloned()
                .ok_or_else(|| {
                    OrmError::unexpected(format!("cannot update a record without {primary_key}"))
                })?;
            let scoped = query.clone().find_by(primary_key, key.clone());
            self.adapter.update(&scoped, &stamp_update(changes))?;
            keys.push(key);
        }

        let reload = if target.is_batch() || keys.len() != 1 {
            query.clone().filter([Condition::in_list(primary_key, keys)])
        } else {
            query.clone().find_by(primary_key, keys.remove(0))
        };
        self.all(&reload, dest)
    }

    /// Runs `f` inside a transaction.
    ///
    /// The closure receives a repository bound to the transaction. The
    /// transaction is committed when `f` returns `Ok` and rolled back when it
    /// returns `Err` or panics.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the adapter's error when the
    /// transaction cannot be started or committed.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = Transaction::begin(self)?;
        match f(tx.repo()) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Panicking variant of [`one`](Self::one).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_one(&self, query: &Query, dest: &mut dyn Destination) {
        must(self.one(query, dest));
    }

    /// Panicking variant of [`all`](Self::all).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_all(&self, query: &Query, dest: &mut dyn Destination) {
        must(self.all(query, dest));
    }

    /// Panicking variant of [`count`](Self::count).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    #[must_use]
    pub fn must_count(&self, query: &Query) -> usize {
        must(self.count(query))
    }

    /// Panicking variant of [`insert`](Self::insert).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_insert(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        changesets: &[Changeset],
    ) {
        must(self.insert(query, dest, changesets));
    }

    /// Panicking variant of [`insert_assoc`](Self::insert_assoc).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_insert_assoc(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        parent: &Changeset,
        field: &str,
    ) {
        must(self.insert_assoc(query, dest, parent, field));
    }

    /// Panicking variant of [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_update(
        &self,
        query: &Query,
        dest: Option<&mut dyn Destination>,
        changesets: &[Changeset],
    ) {
        must(self.update(query, dest, changesets));
    }

    /// Panicking variant of [`delete`](Self::delete).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_delete(&self, query: &Query) {
        must(self.delete(query));
    }

    /// Panicking variant of [`save`](Self::save).
    ///
    /// # Panics
    ///
    /// Panics with the error message when the operation fails.
    pub fn must_save(&self, query: &Query, dest: &mut dyn Destination) {
        must(self.save(query, dest));
    }

    fn insert_one(&self, query: &Query, dest: Option<&mut dyn Destination>, changes: &Map) -> Result<()> {
        debug!(collection = %query.collection, fields = changes.len(), "Inserting record");
        let id = self.adapter.insert(query, changes)?;

        let Some(dest) = dest else {
            return Ok(());
        };
        let primary_key = self.primary_key_of(dest.fields());
        let reload = query.clone().find_by(primary_key, id).limit(1);
        self.all(&reload, dest)
    }

    fn insert_many(&self, query: &Query, dest: Option<&mut dyn Destination>, maps: &[Map]) -> Result<()> {
        let fields = get_fields(maps);
        debug!(collection = %query.collection, records = maps.len(), "Inserting records");
        let ids = self.adapter.insert_all(query, &fields, maps)?;

        let Some(dest) = dest else {
            return Ok(());
        };
        let primary_key = self.primary_key_of(dest.fields());
        let reload = query.clone().filter([Condition::in_list(primary_key, ids)]);
        self.all(&reload, dest)
    }

    /// Name of the shape's primary key, or the configured fallback.
    fn primary_key_of<'a>(&'a self, fields: &'static [Field]) -> &'a str {
        primary_key(fields).map_or(self.config.primary_key.as_str(), |field| field.name)
    }

    /// Whether `name` is a timestamp field the repository fills in.
    fn is_stamped(&self, fields: &[Field], name: &str) -> bool {
        self.config.timestamps && find_field(fields, name).is_some_and(Field::is_timestamp)
    }

    fn stamp_insert(&self, changes: &mut Map, fields: &[Field], now: DateTime<Utc>) {
        for name in [&self.config.created_at, &self.config.updated_at] {
            if self.is_stamped(fields, name) {
                changes
                    .entry(name.clone())
                    .or_insert(Value::Timestamp(now));
            }
        }
    }

    /// Scalar fields of a held record, minus its primary key and the
    /// timestamps the repository fills in, plus `set`.
    fn record_changes(&self, row: &Map, fields: &[Field], primary_key: &str, set: &Map) -> Map {
        let mut changes: Map = row
            .iter()
            .filter(|(name, _)| {
                name.as_str() != primary_key
                    && !(self.is_stamped(fields, name)
                        && (**name == self.config.created_at || **name == self.config.updated_at))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        changes.extend(set.clone());
        changes
    }
}

/// Sorted union of the keys of every change map.
#[must_use]
pub fn get_fields(maps: &[Map]) -> Vec<String> {
    maps.iter()
        .flat_map(Map::keys)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn ensure_valid(changesets: &[Changeset]) -> Result<()> {
    for ch in changesets {
        if !ch.is_valid() {
            return Err(OrmError::Validation(ch.errors().clone()));
        }
    }
    Ok(())
}

fn must<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_changeset::params;

    #[test]
    fn test_get_fields_sorted_union() {
        let maps = vec![
            params! { "name" => "a", "age" => 1 },
            params! { "name" => "b", "email" => "b@example.com" },
        ];
        assert_eq!(get_fields(&maps), ["age", "email", "name"]);
        assert!(get_fields(&[]).is_empty());
    }

    #[test]
    fn test_ensure_valid() {
        let mut ch = Changeset::default();
        assert!(ensure_valid(std::slice::from_ref(&ch)).is_ok());

        ch.add_error("name", "name is required");
        let err = ensure_valid(&[Changeset::default(), ch]).unwrap_err();
        assert_eq!(err.to_string(), "validation error: name is required");
    }

    #[test]
    #[should_panic(expected = "no result found")]
    fn test_must_panics_with_message() {
        must::<()>(Err(OrmError::not_found("no result found")));
    }

    #[test]
    fn test_save_target_flags() {
        assert!(SaveTarget::SingleNew.is_new());
        assert!(!SaveTarget::SingleNew.is_batch());
        assert!(SaveTarget::BatchExisting.is_batch());
        assert!(!SaveTarget::BatchExisting.is_new());
    }
}
