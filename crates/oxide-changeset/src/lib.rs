//! # oxide-changeset
//!
//! Cast untyped input into validated, typed changesets.
//!
//! This crate provides:
//! - A dynamic [`Value`] type for input parameters and adapter rows
//! - Field descriptors ([`Record`], [`Field`], [`Destination`]) implemented by
//!   `#[derive(Record)]` from `oxide-changeset-derive`
//! - [`Changeset`] casting with type coercion and nested association casting
//! - Validators and per-field validation errors
//!
//! ## Quick Start
//!
//! ```rust
//! use oxide_changeset::{params, Changeset, Change, Field, FieldType, Record, Value, ValueError};
//!
//! #[derive(Default)]
//! struct User {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Record for User {
//!     const FIELDS: &'static [Field] = &[
//!         Field::new("name", FieldType::Text),
//!         Field::new("age", FieldType::Int),
//!     ];
//!
//!     fn get(&self, field: &str) -> Option<Value> {
//!         match field {
//!             "name" => Some(Value::Text(self.name.clone())),
//!             "age" => Some(Value::Int(self.age)),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set(&mut self, field: &str, _value: Value) -> Result<(), ValueError> {
//!         Err(ValueError::UnknownField(field.to_string()))
//!     }
//! }
//!
//! let params = params! { "name" => "alice", "age" => "18", "admin" => true };
//! let ch = Changeset::cast(&User::default(), &params, &["name", "age"]);
//!
//! assert!(ch.is_valid());
//! assert_eq!(ch.get_change("age"), Some(&Change::Value(Value::Int(18))));
//! assert!(ch.get_change("admin").is_none());
//! ```
//!
//! ## Validation
//!
//! ```rust
//! use oxide_changeset::validation::MinLength;
//! use oxide_changeset::{params, Changeset};
//! # use oxide_changeset::{Field, FieldType, Record, Value, ValueError};
//! # #[derive(Default)]
//! # struct User { name: String }
//! # impl Record for User {
//! #     const FIELDS: &'static [Field] = &[Field::new("name", FieldType::Text)];
//! #     fn get(&self, _: &str) -> Option<Value> { Some(Value::Text(self.name.clone())) }
//! #     fn set(&mut self, f: &str, _: Value) -> Result<(), ValueError> {
//! #         Err(ValueError::UnknownField(f.to_string()))
//! #     }
//! # }
//!
//! let mut ch = Changeset::cast(&User::default(), &params! { "name" => "al" }, &["name"]);
//! ch.validate_required(&["name"]);
//! ch.validate_with("name", &MinLength::new(3));
//!
//! let errors = ch.into_result().unwrap_err();
//! assert_eq!(errors.first().unwrap().message, "name must be at least 3 characters");
//! ```

// Lets `#[derive(Record)]` output (which names `::oxide_changeset`) compile
// inside this crate's own tests.
extern crate self as oxide_changeset;

pub mod changeset;
mod error;
pub mod record;
pub mod validation;
pub mod value;

pub use changeset::{Change, Changeset};
pub use error::{ValidationError, ValidationErrors, ValueError};
pub use record::{Destination, Field, FieldType, Record};
pub use value::{FromValue, IntoValue, Map, Value};
