use chrono::{DateTime, Utc};
use tracing::trace;

use super::{Change, Changeset};
use crate::record::{find_field, Field, FieldType, Record};
use crate::value::{Map, Value};

impl Changeset {
    /// Casts untyped parameters into a changeset for `record`.
    ///
    /// Only keys listed in `allowed` and declared by the record are read;
    /// anything else in `params` is ignored. Each accepted value is coerced
    /// to the field's declared type. A value that cannot be coerced records
    /// `"<field> is invalid"` and produces no change. A value equal to the
    /// record's current value produces no change either.
    pub fn cast<R: Record + ?Sized>(record: &R, params: &Map, allowed: &[&str]) -> Self {
        let values = R::FIELDS
            .iter()
            .filter(|f| !f.is_assoc())
            .filter_map(|f| record.get(f.name).map(|v| (f.name.to_string(), v)))
            .collect();

        let mut changeset = Self {
            types: R::FIELDS,
            values,
            params: params.clone(),
            ..Self::default()
        };

        for &name in allowed {
            let (Some(input), Some(field)) = (params.get(name), find_field(R::FIELDS, name)) else {
                continue;
            };

            match coerce(field, input) {
                Some(value) => {
                    if changeset.values.get(name) != Some(&value) {
                        changeset
                            .changes
                            .insert(name.to_string(), Change::Value(value));
                    }
                }
                None => {
                    trace!(field = name, input = %input, "cast failed");
                    changeset.add_error(name, format!("{name} is invalid"));
                }
            }
        }

        changeset
    }

    /// Like [`Changeset::cast`], but panics on the first validation error.
    ///
    /// # Panics
    ///
    /// Panics with the first error's message when any value fails to cast.
    pub fn must_cast<R: Record + ?Sized>(record: &R, params: &Map, allowed: &[&str]) -> Self {
        let changeset = Self::cast(record, params, allowed);
        if let Some(error) = changeset.error() {
            panic!("{error}");
        }
        changeset
    }
}

/// Converts an input value to the field's declared type.
pub(crate) fn coerce(field: &Field, input: &Value) -> Option<Value> {
    let value = match (field.ty, input) {
        (_, Value::Null) => field.nullable.then_some(Value::Null),
        (FieldType::Bool, Value::Bool(_))
        | (FieldType::Int, Value::Int(_))
        | (FieldType::Float, Value::Float(_))
        | (FieldType::Text, Value::Text(_))
        | (FieldType::Timestamp, Value::Timestamp(_)) => Some(input.clone()),
        #[allow(clippy::cast_precision_loss)]
        (FieldType::Float, Value::Int(n)) => Some(Value::Float(*n as f64)),
        (FieldType::Int, Value::Text(s)) => s.trim().parse().ok().map(Value::Int),
        (FieldType::Float, Value::Text(s)) => s.trim().parse().ok().map(Value::Float),
        (FieldType::Text, Value::Int(n)) => Some(Value::Text(n.to_string())),
        (FieldType::Text, Value::Float(n)) => Some(Value::Text(n.to_string())),
        (FieldType::Bool, Value::Text(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldType::Timestamp, Value::Text(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| Value::Timestamp(t.with_timezone(&Utc))),
        _ => None,
    };
    value.filter(|v| field.fits(v))
}
