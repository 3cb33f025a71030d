//! Field descriptors for records.
//!
//! This module provides the traits that are implemented by the
//! `#[derive(Record)]` macro. A record exposes an explicit table of its
//! fields, plus dynamic getters and setters keyed by field name, which is all
//! the changeset engine and the repository need to know about a struct.

use crate::error::ValueError;
use crate::value::{Map, Value};

/// Declared type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Boolean field.
    Bool,
    /// Integer field.
    Int,
    /// Floating point field.
    Float,
    /// Text field.
    Text,
    /// Timestamp field.
    Timestamp,
    /// Association holding a single nested record.
    One,
    /// Association holding a sequence of nested records.
    Many,
}

impl FieldType {
    /// Returns whether this is an association type.
    #[must_use]
    pub const fn is_assoc(self) -> bool {
        matches!(self, Self::One | Self::Many)
    }
}

/// Descriptor of a single record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name, as used in params, changes and adapter rows.
    pub name: &'static str,
    /// Declared type.
    pub ty: FieldType,
    /// Whether the field accepts null.
    pub nullable: bool,
    /// Whether the field is the primary key.
    pub primary_key: bool,
    /// Inclusive range accepted by an integer field narrower than `i64`.
    pub bounds: Option<(i64, i64)>,
}

impl Field {
    /// Creates a non-nullable, non-key field.
    #[must_use]
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            primary_key: false,
            bounds: None,
        }
    }

    /// Marks the field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Restricts an integer field to `min..=max`.
    #[must_use]
    pub const fn bounded(mut self, min: i64, max: i64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Returns whether a value of the declared type fits this field.
    ///
    /// Integers must lie within the field's bounds and floats must be finite.
    #[must_use]
    pub fn fits(&self, value: &Value) -> bool {
        match (self.bounds, value) {
            (Some((min, max)), Value::Int(n)) => (min..=max).contains(n),
            (_, Value::Float(f)) => f.is_finite(),
            _ => true,
        }
    }

    /// Returns whether the field is an association.
    #[must_use]
    pub const fn is_assoc(&self) -> bool {
        self.ty.is_assoc()
    }

    /// Returns whether the field holds a timestamp.
    #[must_use]
    pub fn is_timestamp(&self) -> bool {
        self.ty == FieldType::Timestamp
    }
}

/// A struct with an explicit field table.
///
/// Usually implemented with `#[derive(Record)]`.
pub trait Record {
    /// Every enumerable field, in declaration order.
    const FIELDS: &'static [Field];

    /// Returns the current value of a scalar field.
    ///
    /// Returns `None` for association fields and unknown names.
    fn get(&self, field: &str) -> Option<Value>;

    /// Assigns a scalar field from a dynamic value.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::UnknownField`] for association fields and unknown
    /// names, or a conversion error when the value does not fit.
    fn set(&mut self, field: &str, value: Value) -> Result<(), ValueError>;
}

/// Something adapter rows can be loaded into: a single record or a sequence.
pub trait Destination {
    /// Field table of the record shape.
    fn fields(&self) -> &'static [Field];

    /// Whether this destination holds a sequence of records.
    fn is_many(&self) -> bool;

    /// Scalar fields of every record currently held.
    fn rows(&self) -> Vec<Map>;

    /// Replaces the held data with the given rows.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] when a row value does not fit its field.
    fn load(&mut self, rows: Vec<Map>) -> Result<(), ValueError>;
}

/// Returns the field declared as primary key, if any.
#[must_use]
pub fn primary_key(fields: &[Field]) -> Option<&Field> {
    fields.iter().find(|f| f.primary_key)
}

/// Looks up a field by name.
#[must_use]
pub fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.name == name)
}

/// Collects the scalar fields of a record into a row.
pub fn to_row<R: Record + ?Sized>(record: &R) -> Map {
    R::FIELDS
        .iter()
        .filter(|f| !f.is_assoc())
        .filter_map(|f| record.get(f.name).map(|v| (f.name.to_string(), v)))
        .collect()
}

/// Assigns the scalar columns of a row to a record.
///
/// Columns with no matching scalar field are ignored.
///
/// # Errors
///
/// Returns a [`ValueError`] when a column value does not fit its field.
pub fn apply_row<R: Record + ?Sized>(record: &mut R, row: Map) -> Result<(), ValueError> {
    for (column, value) in row {
        match find_field(R::FIELDS, &column) {
            Some(field) if !field.is_assoc() => record.set(field.name, value)?,
            _ => {}
        }
    }
    Ok(())
}

/// Loads the first row into a single record. No rows leaves it untouched.
///
/// # Errors
///
/// Returns a [`ValueError`] when a column value does not fit its field.
pub fn load_one<R: Record + ?Sized>(record: &mut R, rows: Vec<Map>) -> Result<(), ValueError> {
    match rows.into_iter().next() {
        Some(row) => apply_row(record, row),
        None => Ok(()),
    }
}

impl<T: Record + Default> Destination for Vec<T> {
    fn fields(&self) -> &'static [Field] {
        T::FIELDS
    }

    fn is_many(&self) -> bool {
        true
    }

    fn rows(&self) -> Vec<Map> {
        self.iter().map(to_row).collect()
    }

    fn load(&mut self, rows: Vec<Map>) -> Result<(), ValueError> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = T::default();
            apply_row(&mut record, row)?;
            records.push(record);
        }
        *self = records;
        Ok(())
    }
}
