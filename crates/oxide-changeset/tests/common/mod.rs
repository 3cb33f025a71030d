#![allow(dead_code)]

use oxide_changeset::{Changeset, Map};
use oxide_changeset_derive::Record;

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Inner {
    pub field4: i64,
    pub field5: String,
}

#[derive(Debug, Clone, Default, Record)]
pub struct EntityOne {
    pub field1: i64,
    pub field2: String,
    pub field3: Inner,
}

#[derive(Debug, Clone, Default, Record)]
pub struct EntityOnePointer {
    pub field1: i64,
    pub field2: String,
    pub field3: Option<Box<Inner>>,
}

#[derive(Debug, Clone, Default, Record)]
pub struct EntityMany {
    pub field1: i64,
    pub field2: String,
    pub field3: Vec<Inner>,
}

/// Casts the scalar fields of [`Inner`].
pub fn change_inner(entity: Inner, params: &Map) -> Changeset {
    Changeset::cast(&entity, params, &["field4", "field5"])
}

/// Field paths of every error, in order.
pub fn error_fields(ch: &Changeset) -> Vec<String> {
    ch.errors().iter().map(|e| e.field.clone()).collect()
}
