//! Changesets: validated, typed change sets cast from untyped input.
//!
//! A [`Changeset`] is built with [`Changeset::cast`] from a record and a map
//! of parameters. It remembers the declared field types, the record's current
//! values, the accepted changes and every validation error encountered, so
//! that callers can inspect or reject the whole set at once.

mod assoc;
mod cast;

use std::collections::BTreeMap;

use crate::error::{ValidationError, ValidationErrors};
use crate::record::{find_field, Field};
use crate::validation::Validator;
use crate::value::{Map, Value};

/// A single pending change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// New value of a scalar field.
    Value(Value),
    /// Changeset of a single association.
    One(Box<Changeset>),
    /// Changesets of a many association, in input order.
    Many(Vec<Changeset>),
}

impl Change {
    /// Returns the scalar value, if this is a [`Change::Value`].
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Typed, validated set of changes for a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    types: &'static [Field],
    values: Map,
    changes: BTreeMap<String, Change>,
    errors: ValidationErrors,
    params: Map,
}

impl Changeset {
    /// Declared fields of the record this changeset was cast from.
    #[must_use]
    pub const fn types(&self) -> &'static [Field] {
        self.types
    }

    /// Looks up the descriptor of a declared field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        find_field(self.types, name)
    }

    /// Whether the record declares a field with this name.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Current values of the record's scalar fields.
    #[must_use]
    pub const fn values(&self) -> &Map {
        &self.values
    }

    /// The input parameters the changeset was cast from.
    #[must_use]
    pub const fn params(&self) -> &Map {
        &self.params
    }

    /// Every accepted change.
    #[must_use]
    pub const fn changes(&self) -> &BTreeMap<String, Change> {
        &self.changes
    }

    /// Returns the pending change for a field.
    #[must_use]
    pub fn get_change(&self, field: &str) -> Option<&Change> {
        self.changes.get(field)
    }

    /// Returns the current value of a field.
    #[must_use]
    pub fn get_value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Scalar changes only, as a flat map.
    ///
    /// Association changes are never part of this map.
    #[must_use]
    pub fn change_map(&self) -> Map {
        self.changes
            .iter()
            .filter_map(|(field, change)| {
                change.as_value().map(|v| (field.clone(), v.clone()))
            })
            .collect()
    }

    /// Every validation error, in the order recorded.
    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// The first validation error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// Whether no validation error was recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Records a validation error against a field path.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Records a change directly, bypassing cast.
    ///
    /// Nothing is recorded when the value equals the current value.
    pub fn put_change(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if self.values.get(&field) == Some(&value) {
            self.changes.remove(&field);
        } else {
            self.changes.insert(field, Change::Value(value));
        }
    }

    /// Drops the pending change for a field.
    pub fn delete_change(&mut self, field: &str) -> Option<Change> {
        self.changes.remove(field)
    }

    /// Requires each field to have a non-blank change or current value.
    pub fn validate_required(&mut self, fields: &[&str]) {
        for &field in fields {
            let present = match self.changes.get(field) {
                Some(Change::Value(value)) => !value.is_blank(),
                Some(_) => true,
                None => self.values.get(field).is_some_and(|v| !v.is_blank()),
            };
            if !present {
                self.add_error(field, format!("{field} is required"));
            }
        }
    }

    /// Runs a validator against the pending change of a field.
    ///
    /// Fields without a scalar change pass.
    pub fn validate_with(&mut self, field: &str, validator: &dyn Validator) {
        let outcome = match self.changes.get(field) {
            Some(Change::Value(value)) => validator.validate(field, value),
            _ => Ok(()),
        };
        if let Err(message) = outcome {
            self.add_error(field, message);
        }
    }

    /// Returns the changeset if valid, or every recorded error.
    ///
    /// # Errors
    ///
    /// Returns the accumulated [`ValidationErrors`] when any were recorded.
    pub fn into_result(self) -> Result<Self, ValidationErrors> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}
