//! Changeset validators.
//!
//! Validators check a single pending change. They are run through
//! [`Changeset::validate_with`](crate::Changeset::validate_with), which only
//! calls them when the field has a change, so absent input always passes.

use regex::Regex;

use crate::value::Value;

/// Trait for change validators.
pub trait Validator: Send + Sync {
    /// Validates the value of `field` and returns an error message if invalid.
    ///
    /// # Errors
    ///
    /// Returns the message to record against `field`.
    fn validate(&self, field: &str, value: &Value) -> Result<(), String>;
}

fn render(custom: Option<&String>, default: impl FnOnce() -> String) -> String {
    custom.cloned().unwrap_or_else(default)
}

/// Length of a text (in characters) or a list (in elements).
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Text(s) => Some(s.chars().count()),
        Value::List(items) => Some(items.len()),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

/// Validator that enforces a minimum length.
#[derive(Debug, Clone)]
pub struct MinLength {
    min: usize,
    message: Option<String>,
}

impl MinLength {
    /// Creates a new `MinLength` validator.
    #[must_use]
    pub const fn new(min: usize) -> Self {
        Self { min, message: None }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for MinLength {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        match length_of(value) {
            Some(len) if len < self.min => Err(render(self.message.as_ref(), || {
                format!("{field} must be at least {} characters", self.min)
            })),
            _ => Ok(()),
        }
    }
}

/// Validator that enforces a maximum length.
#[derive(Debug, Clone)]
pub struct MaxLength {
    max: usize,
    message: Option<String>,
}

impl MaxLength {
    /// Creates a new `MaxLength` validator.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self { max, message: None }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for MaxLength {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        match length_of(value) {
            Some(len) if len > self.max => Err(render(self.message.as_ref(), || {
                format!("{field} must be at most {} characters", self.max)
            })),
            _ => Ok(()),
        }
    }
}

/// Validator for numeric bounds (inclusive).
#[derive(Debug, Clone)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
    message: Option<String>,
}

impl Range {
    /// Requires `min <= value <= max`.
    #[must_use]
    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            message: None,
        }
    }

    /// Requires `value >= min`.
    #[must_use]
    pub const fn min(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
            message: None,
        }
    }

    /// Requires `value <= max`.
    #[must_use]
    pub const fn max(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
            message: None,
        }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn default_message(&self, field: &str) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{field} must be between {min} and {max}"),
            (Some(min), None) => format!("{field} must be more than {min}"),
            (None, Some(max)) => format!("{field} must be less than {max}"),
            (None, None) => format!("{field} is invalid"),
        }
    }
}

impl Validator for Range {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        let Some(n) = number_of(value) else {
            return Ok(());
        };
        let below = self.min.is_some_and(|min| n < min);
        let above = self.max.is_some_and(|max| n > max);
        if below || above {
            Err(render(self.message.as_ref(), || self.default_message(field)))
        } else {
            Ok(())
        }
    }
}

/// Validator that matches text against a regex.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    message: Option<String>,
}

impl Pattern {
    /// Creates a new `Pattern` validator.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            message: None,
        })
    }

    /// Creates a validator from an already compiled regex.
    #[must_use]
    pub fn from_regex(regex: Regex) -> Self {
        Self {
            regex,
            message: None,
        }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for Pattern {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        match value {
            Value::Text(s) if !self.regex.is_match(s) => Err(render(self.message.as_ref(), || {
                format!("{field}'s format is invalid")
            })),
            _ => Ok(()),
        }
    }
}

fn list_of(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(" "))
}

/// Validator that requires the value to be one of a fixed set.
#[derive(Debug, Clone)]
pub struct Inclusion {
    values: Vec<Value>,
    message: Option<String>,
}

impl Inclusion {
    /// Creates a new `Inclusion` validator.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: crate::IntoValue,
    {
        Self {
            values: values.into_iter().map(V::into_value).collect(),
            message: None,
        }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for Inclusion {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        if self.values.contains(value) {
            Ok(())
        } else {
            Err(render(self.message.as_ref(), || {
                format!("{field} must be one of {}", list_of(&self.values))
            }))
        }
    }
}

/// Validator that rejects a fixed set of values.
#[derive(Debug, Clone)]
pub struct Exclusion {
    values: Vec<Value>,
    message: Option<String>,
}

impl Exclusion {
    /// Creates a new `Exclusion` validator.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: crate::IntoValue,
    {
        Self {
            values: values.into_iter().map(V::into_value).collect(),
            message: None,
        }
    }

    /// Overrides the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for Exclusion {
    fn validate(&self, field: &str, value: &Value) -> Result<(), String> {
        if self.values.contains(value) {
            Err(render(self.message.as_ref(), || {
                format!("{field} must not be any of {}", list_of(&self.values))
            }))
        } else {
            Ok(())
        }
    }
}
