//! # oxide-orm
//!
//! Composable queries and a repository that runs them against a pluggable
//! storage adapter.
//!
//! This crate provides:
//! - [`Condition`] trees built with `eq`, `is_null`, `in_list`, `and`, `or`, ...
//! - An immutable [`Query`] builder (`filter`, `join`, `order_by`, `set`, ...)
//! - The [`Adapter`] trait a storage backend implements
//! - [`Repo`], which turns queries and changesets into inserts, updates,
//!   deletes and reloads, with timestamps filled in automatically
//! - [`Transaction`] guards that roll back unless committed
//!
//! ## Building Queries
//!
//! Every builder method consumes the query and returns a new one, so a base
//! query can be cloned and refined freely:
//!
//! ```
//! use oxide_orm::{field, Condition, Query};
//!
//! let active = Query::from("users").filter([Condition::eq("active", true)]);
//!
//! let admins = active
//!     .clone()
//!     .or_filter([Condition::eq("role", "admin")])
//!     .order_by("-id")
//!     .limit(10);
//!
//! assert_eq!(
//!     admins.condition.to_string(),
//!     "active = true OR role = \"admin\""
//! );
//! assert!(active.limit.is_none());
//!
//! let joined = Query::from("users").join_on(
//!     "transactions",
//!     Condition::eq("users.id", field("transactions.user_id")),
//! );
//! assert_eq!(joined.joins.len(), 1);
//! ```
//!
//! ## Writing Records
//!
//! ```ignore
//! use oxide_orm::{Query, Repo};
//!
//! let repo = Repo::new(Arc::new(adapter));
//! let users = Query::from("users");
//!
//! // Insert a cast changeset and load the stored row back
//! let ch = Changeset::cast(&User::default(), &params, &["name", "email"]);
//! let mut user = User::default();
//! repo.insert(&users, Some(&mut user), &[ch])?;
//!
//! // Insert or update whatever `user` holds
//! repo.save(&users, &mut user)?;
//!
//! // Run several writes atomically
//! repo.transaction(|tx| {
//!     tx.delete(&users.clone().find(user.id))?;
//!     tx.insert(&Query::from("audit").set("action", "delete"), None, &[])
//! })?;
//! ```

pub mod adapter;
mod config;
mod error;
pub mod query;
mod repo;
mod transaction;

pub use adapter::Adapter;
pub use config::{Clock, RepoConfig};
pub use error::{BoxError, OrmError, Result};
pub use query::{field, CompareOp, Condition, Join, JoinMode, Operand, OrderBy, OrderDirection, Query};
pub use repo::{get_fields, Repo, SaveTarget};
pub use transaction::Transaction;

// Re-export the changeset types the repository consumes
pub use oxide_changeset::{Changeset, Destination, Map, Value};
