//! Condition trees for query filtering.
//!
//! Conditions are combined with [`Condition::and`] and [`Condition::or`],
//! which normalize as they build: empty operands are dropped, a single
//! operand is returned unchanged, and operands of the same kind are flattened
//! into their parent. This keeps chained `filter`/`or_filter` calls on a
//! [`Query`](super::Query) structurally predictable.

use std::fmt;

use chrono::{DateTime, Utc};
use oxide_changeset::{IntoValue, Value};

/// Right-hand side of a comparison: another field or a literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Reference to a field, e.g. `transactions.id`.
    Field(String),
    /// Literal value.
    Value(Value),
}

/// Creates a field reference operand.
///
/// ```rust
/// use oxide_orm::query::{field, Condition};
///
/// let join = Condition::eq("users.transaction_id", field("transactions.id"));
/// ```
pub fn field(name: impl Into<String>) -> Operand {
    Operand::Field(name.into())
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::Value(value) => write!(f, "{value}"),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! impl_operand_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into_value())
                }
            }
        )*
    };
}

impl_operand_from!(
    bool,
    i64,
    i32,
    i16,
    i8,
    u32,
    u16,
    u8,
    f64,
    f32,
    String,
    &str,
    DateTime<Utc>
);

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Every operand holds. An empty `And` is the no-op condition.
    And(Vec<Condition>),
    /// At least one operand holds.
    Or(Vec<Condition>),
    /// Negation.
    Not(Box<Condition>),
    /// Binary comparison: `field op value`.
    Compare {
        /// Comparison operator.
        op: CompareOp,
        /// Left-hand field.
        field: String,
        /// Right-hand field or value.
        value: Operand,
    },
    /// `field IS NULL`
    Nil(String),
    /// `field IS NOT NULL`
    NotNil(String),
    /// `field IN (values)`
    In {
        /// Field to test.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// `field NOT IN (values)`
    Nin {
        /// Field to test.
        field: String,
        /// Rejected values.
        values: Vec<Value>,
    },
    /// Raw expression passed through to the adapter (use with caution).
    Fragment {
        /// Expression text.
        expr: String,
        /// Bound values.
        values: Vec<Value>,
    },
}

impl Default for Condition {
    fn default() -> Self {
        Self::And(Vec::new())
    }
}

impl Condition {
    fn compare(op: CompareOp, field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::Compare {
            op,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an equality condition (field = value).
    pub fn eq(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Eq, field, value)
    }

    /// Creates an inequality condition (field != value).
    pub fn ne(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Ne, field, value)
    }

    /// Creates a greater-than condition (field > value).
    pub fn gt(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Gt, field, value)
    }

    /// Creates a greater-than-or-equal condition (field >= value).
    pub fn gte(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Gte, field, value)
    }

    /// Creates a less-than condition (field < value).
    pub fn lt(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Lt, field, value)
    }

    /// Creates a less-than-or-equal condition (field <= value).
    pub fn lte(field: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::compare(CompareOp::Lte, field, value)
    }

    /// Creates an IS NULL condition.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::Nil(field.into())
    }

    /// Creates an IS NOT NULL condition.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::NotNil(field.into())
    }

    /// Creates an IN list condition.
    pub fn in_list<V: IntoValue>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(IntoValue::into_value).collect(),
        }
    }

    /// Creates a NOT IN list condition.
    pub fn not_in_list<V: IntoValue>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Nin {
            field: field.into(),
            values: values.into_iter().map(IntoValue::into_value).collect(),
        }
    }

    /// Creates a raw expression condition.
    pub fn fragment(expr: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Fragment {
            expr: expr.into(),
            values,
        }
    }

    /// Negates a condition.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Combines operands with AND.
    pub fn and(operands: impl IntoIterator<Item = Self>) -> Self {
        Self::combine(operands, true)
    }

    /// Combines operands with OR.
    pub fn or(operands: impl IntoIterator<Item = Self>) -> Self {
        Self::combine(operands, false)
    }

    fn combine(operands: impl IntoIterator<Item = Self>, conjunction: bool) -> Self {
        let mut flat = Vec::new();
        for operand in operands {
            match operand {
                c if c.is_empty() => {}
                Self::And(inner) if conjunction => flat.extend(inner),
                Self::Or(inner) if !conjunction => flat.extend(inner),
                other => flat.push(other),
            }
        }

        if flat.len() == 1 {
            return flat.remove(0);
        }
        if flat.is_empty() || conjunction {
            Self::And(flat)
        } else {
            Self::Or(flat)
        }
    }

    /// Appends `operands` (grouped with AND) to this condition with AND.
    #[must_use]
    pub fn and_with(self, operands: impl IntoIterator<Item = Self>) -> Self {
        Self::and([self, Self::and(operands)])
    }

    /// Appends `operands` (grouped with AND) to this condition with OR.
    #[must_use]
    pub fn or_with(self, operands: impl IntoIterator<Item = Self>) -> Self {
        Self::or([self, Self::and(operands)])
    }

    /// Whether this is the empty, no-op condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::And(inner) if inner.is_empty())
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(inner) | Self::Or(inner) if inner.len() > 1 => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(inner) | Self::Or(inner) => {
                let sep = if matches!(self, Self::And(_)) { " AND " } else { " OR " };
                for (i, operand) in inner.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    operand.fmt_operand(f)?;
                }
                Ok(())
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::Compare { op, field, value } => write!(f, "{field} {op} {value}"),
            Self::Nil(field) => write!(f, "{field} IS NULL"),
            Self::NotNil(field) => write!(f, "{field} IS NOT NULL"),
            Self::In { field, values } => {
                write!(f, "{field} IN (")?;
                write_values(f, values)?;
                write!(f, ")")
            }
            Self::Nin { field, values } => {
                write!(f, "{field} NOT IN (")?;
                write_values(f, values)?;
                write!(f, ")")
            }
            Self::Fragment { expr, values } => {
                write!(f, "{expr}")?;
                if !values.is_empty() {
                    write!(f, " [")?;
                    write_values(f, values)?;
                    write!(f, "]")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_eq_1() -> Condition {
        Condition::eq("id", 1)
    }

    fn deleted_nil() -> Condition {
        Condition::is_null("deleted_at")
    }

    #[test]
    fn test_compare_constructors() {
        assert_eq!(
            Condition::gte("score", 80),
            Condition::Compare {
                op: CompareOp::Gte,
                field: "score".to_string(),
                value: Operand::Value(Value::Int(80)),
            }
        );
        assert_eq!(
            Condition::eq("users.transaction_id", field("transactions.id")),
            Condition::Compare {
                op: CompareOp::Eq,
                field: "users.transaction_id".to_string(),
                value: Operand::Field("transactions.id".to_string()),
            }
        );
    }

    #[test]
    fn test_and_empty_is_noop() {
        let c = Condition::and(Vec::new());
        assert!(c.is_empty());
        assert_eq!(c, Condition::default());
        assert!(Condition::or(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_operand_returned_unchanged() {
        assert_eq!(Condition::and([id_eq_1()]), id_eq_1());
        assert_eq!(Condition::or([deleted_nil()]), deleted_nil());
    }

    #[test]
    fn test_and_flattens_nested_and() {
        let c = Condition::and([
            Condition::and([id_eq_1(), deleted_nil()]),
            Condition::ne("active", false),
        ]);
        assert_eq!(
            c,
            Condition::And(vec![id_eq_1(), deleted_nil(), Condition::ne("active", false)])
        );
    }

    #[test]
    fn test_or_keeps_nested_and_grouped() {
        let c = Condition::or([
            Condition::and([id_eq_1(), deleted_nil()]),
            Condition::ne("active", false),
        ]);
        assert_eq!(
            c,
            Condition::Or(vec![
                Condition::And(vec![id_eq_1(), deleted_nil()]),
                Condition::ne("active", false),
            ])
        );
    }

    #[test]
    fn test_empty_operands_dropped() {
        let c = Condition::and([Condition::default(), id_eq_1(), Condition::default()]);
        assert_eq!(c, id_eq_1());
    }

    #[test]
    fn test_and_with_or_with() {
        let c = Condition::default()
            .and_with([id_eq_1()])
            .or_with([deleted_nil()])
            .and_with([Condition::lt("price", 10000)]);
        assert_eq!(
            c,
            Condition::And(vec![
                Condition::Or(vec![id_eq_1(), deleted_nil()]),
                Condition::lt("price", 10000),
            ])
        );
    }

    #[test]
    fn test_display() {
        let c = Condition::and([
            Condition::or([id_eq_1(), Condition::eq("name", "bob")]),
            deleted_nil(),
            Condition::in_list("role", ["a", "b"]),
            Condition::not(Condition::is_not_null("banned_at")),
        ]);
        assert_eq!(
            c.to_string(),
            "(id = 1 OR name = \"bob\") AND deleted_at IS NULL AND role IN (\"a\", \"b\") AND NOT (banned_at IS NOT NULL)"
        );
        assert_eq!(
            Condition::fragment("age > ?", vec![Value::Int(3)]).to_string(),
            "age > ? [3]"
        );
    }
}
