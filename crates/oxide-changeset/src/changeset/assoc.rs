use tracing::trace;

use super::{Change, Changeset};
use crate::record::{FieldType, Record};
use crate::value::{Map, Value};

impl Changeset {
    /// Casts the nested input of an association field with `caster`.
    ///
    /// The arity comes from the field's declared type. A single association
    /// expects a map; a many association expects a list of maps. Malformed
    /// input records one `"<field> is invalid"` error and casts nothing.
    /// Child errors are re-addressed under `field.` (single) or `field[i].`
    /// (many). A many association is stored only when every element is valid,
    /// but the errors of every element are reported.
    ///
    /// Absent input is not an error.
    pub fn cast_assoc<C, F>(&mut self, field: &str, caster: F)
    where
        C: Record + Default,
        F: Fn(C, &Map) -> Self,
    {
        let Some(input) = self.params.get(field) else {
            return;
        };

        match (self.field(field).map(|f| f.ty), input) {
            (Some(FieldType::One), Value::Map(params)) => {
                let child = caster(C::default(), params);
                if child.is_valid() {
                    self.changes
                        .insert(field.to_string(), Change::One(Box::new(child)));
                } else {
                    for error in child.errors() {
                        self.errors.0.push(error.nested(field));
                    }
                }
            }
            (Some(FieldType::Many), Value::List(items)) => {
                let Some(maps) = items.iter().map(Value::as_map).collect::<Option<Vec<_>>>() else {
                    trace!(field = field, "association element is not a map");
                    self.add_error(field, format!("{field} is invalid"));
                    return;
                };

                let mut children = Vec::with_capacity(maps.len());
                let mut valid = true;
                for (i, params) in maps.into_iter().enumerate() {
                    let child = caster(C::default(), params);
                    if !child.is_valid() {
                        valid = false;
                        let prefix = format!("{field}[{i}]");
                        for error in child.errors() {
                            self.errors.0.push(error.nested(&prefix));
                        }
                    }
                    children.push(child);
                }

                if valid {
                    self.changes.insert(field.to_string(), Change::Many(children));
                }
            }
            _ => {
                trace!(field = field, "association input has the wrong shape");
                self.add_error(field, format!("{field} is invalid"));
            }
        }
    }

    /// The changeset of a single association, if one was cast.
    #[must_use]
    pub fn assoc_one(&self, field: &str) -> Option<&Self> {
        match self.changes.get(field) {
            Some(Change::One(child)) => Some(child),
            _ => None,
        }
    }

    /// The changesets of a many association, if they were cast.
    #[must_use]
    pub fn assoc_many(&self, field: &str) -> Option<&[Self]> {
        match self.changes.get(field) {
            Some(Change::Many(children)) => Some(children),
            _ => None,
        }
    }
}
