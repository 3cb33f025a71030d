//! Immutable, composable query descriptions.
//!
//! A [`Query`] describes a collection, a field selection, joins, filter and
//! having conditions, grouping, ordering, pagination and a set of literal
//! field assignments. Every builder method consumes the query and returns a
//! new one, so a query can be cloned and extended along different branches
//! without either branch observing the other.

mod condition;

use std::fmt;

use oxide_changeset::{IntoValue, Map};

pub use condition::{field, CompareOp, Condition, Operand};

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    #[default]
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to order by
    pub field: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses a Django-style order specification.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-created_at"` for descending, `"name"` for ascending.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            OrderDirection::Asc => write!(f, "{} ASC", self.field),
            OrderDirection::Desc => write!(f, "{} DESC", self.field),
        }
    }
}

/// Join flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Inner join.
    #[default]
    Inner,
    /// Left outer join.
    Left,
    /// Right outer join.
    Right,
    /// Full outer join.
    Full,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "JOIN"),
            Self::Left => write!(f, "LEFT JOIN"),
            Self::Right => write!(f, "RIGHT JOIN"),
            Self::Full => write!(f, "FULL JOIN"),
        }
    }
}

/// A join against another collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join flavor.
    pub mode: JoinMode,
    /// Joined collection.
    pub collection: String,
    /// Join condition.
    pub condition: Condition,
}

/// An immutable query description.
///
/// # Example
///
/// ```rust
/// use oxide_orm::query::{Condition, Query};
///
/// let query = Query::from("users")
///     .filter([Condition::eq("active", true), Condition::is_null("deleted_at")])
///     .or_filter([Condition::eq("role", "admin")])
///     .order_by("-created_at")
///     .limit(10);
///
/// assert_eq!(
///     query.condition.to_string(),
///     "(active = true AND deleted_at IS NULL) OR role = \"admin\""
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Source collection.
    pub collection: String,
    /// Selected fields, `["*"]` unless narrowed.
    pub fields: Vec<String>,
    /// Whether duplicate rows are collapsed.
    pub distinct: bool,
    /// Joins, in the order added.
    pub joins: Vec<Join>,
    /// Filter condition.
    pub condition: Condition,
    /// Grouping fields.
    pub group_fields: Vec<String>,
    /// Condition applied after grouping.
    pub having: Condition,
    /// Ordering, in the order added.
    pub orders: Vec<OrderBy>,
    /// Number of rows to skip.
    pub offset: Option<i64>,
    /// Maximum number of rows.
    pub limit: Option<i64>,
    /// Literal field assignments merged into inserts and updates.
    pub changes: Map,
}

impl Query {
    /// Creates a query over `collection`.
    #[allow(clippy::should_implement_trait)]
    pub fn from(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            fields: vec!["*".to_string()],
            distinct: false,
            joins: Vec::new(),
            condition: Condition::default(),
            group_fields: Vec::new(),
            having: Condition::default(),
            orders: Vec::new(),
            offset: None,
            limit: None,
            changes: Map::new(),
        }
    }

    /// Selects specific fields.
    #[must_use]
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Makes the query return distinct rows.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Inner-joins `collection` on the conventional foreign key.
    ///
    /// The condition is `<from>.<singular>_id = <collection>.id`, where
    /// `singular` is `collection` with one trailing `s` removed.
    #[must_use]
    pub fn join(self, collection: &str) -> Self {
        let singular = collection.strip_suffix('s').unwrap_or(collection);
        let condition = Condition::eq(
            format!("{}.{singular}_id", self.collection),
            field(format!("{collection}.id")),
        );
        self.join_with(JoinMode::Inner, collection, condition)
    }

    /// Inner-joins `collection` on an explicit condition.
    #[must_use]
    pub fn join_on(self, collection: &str, condition: Condition) -> Self {
        self.join_with(JoinMode::Inner, collection, condition)
    }

    /// Joins `collection` with the given mode and condition.
    #[must_use]
    pub fn join_with(mut self, mode: JoinMode, collection: &str, condition: Condition) -> Self {
        self.joins.push(Join {
            mode,
            collection: collection.to_string(),
            condition: Condition::and([condition]),
        });
        self
    }

    /// Adds conditions (grouped with AND) to the filter with AND.
    #[must_use]
    pub fn filter(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.condition = std::mem::take(&mut self.condition).and_with(conditions);
        self
    }

    /// Adds conditions (grouped with AND) to the filter with OR.
    #[must_use]
    pub fn or_filter(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.condition = std::mem::take(&mut self.condition).or_with(conditions);
        self
    }

    /// Excludes rows matching all of `conditions`.
    #[must_use]
    pub fn exclude(self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        let excluded = Condition::and(conditions);
        if excluded.is_empty() {
            return self;
        }
        self.filter([Condition::not(excluded)])
    }

    /// Groups rows by the given fields.
    #[must_use]
    pub fn group(mut self, fields: &[&str]) -> Self {
        self.group_fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Adds conditions (grouped with AND) to the having clause with AND.
    #[must_use]
    pub fn having(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.having = std::mem::take(&mut self.having).and_with(conditions);
        self
    }

    /// Adds conditions (grouped with AND) to the having clause with OR.
    #[must_use]
    pub fn or_having(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.having = std::mem::take(&mut self.having).or_with(conditions);
        self
    }

    /// Appends an ordering.
    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.orders.push(order);
        self
    }

    /// Appends a Django-style ordering (`-` prefix for descending).
    #[must_use]
    pub fn order_by(self, spec: &str) -> Self {
        self.order(OrderBy::parse(spec))
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Limits the number of results.
    #[must_use]
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Filters on `<collection>.id = id`.
    #[must_use]
    pub fn find(self, id: impl IntoValue) -> Self {
        self.find_by("id", id)
    }

    /// Filters on `<collection>.<key> = id`.
    #[must_use]
    pub fn find_by(self, key: &str, id: impl IntoValue) -> Self {
        let column = format!("{}.{key}", self.collection);
        self.filter([Condition::eq(column, id.into_value())])
    }

    /// Assigns a literal value to a field for inserts and updates.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl IntoValue) -> Self {
        self.changes.insert(field.into(), value.into_value());
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.collection)?;
        for join in &self.joins {
            write!(f, " {} {} ON {}", join.mode, join.collection, join.condition)?;
        }
        if !self.condition.is_empty() {
            write!(f, " WHERE {}", self.condition)?;
        }
        if !self.group_fields.is_empty() {
            write!(f, " GROUP BY {}", self.group_fields.join(", "))?;
        }
        if !self.having.is_empty() {
            write!(f, " HAVING {}", self.having)?;
        }
        if !self.orders.is_empty() {
            let orders: Vec<String> = self.orders.iter().map(ToString::to_string).collect();
            write!(f, " ORDER BY {}", orders.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}
