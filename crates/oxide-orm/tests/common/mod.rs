#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use oxide_changeset::{Changeset, Destination, Map, Value};
use oxide_changeset_derive::Record;
use oxide_orm::{Adapter, Clock, OrmError, Query, Repo, RepoConfig, Result};

/// One adapter operation, as received.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(Query),
    Insert(Query, Map),
    InsertAll(Query, Vec<String>, Vec<Map>),
    Update(Query, Map),
    Delete(Query),
    Count(Query),
    Begin,
    Commit,
    Rollback,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    rows: VecDeque<Vec<Map>>,
    ids: VecDeque<Value>,
    next_id: i64,
    count: usize,
    failing: BTreeSet<&'static str>,
}

/// Adapter that records every call and answers from a script.
///
/// Queries load the next scripted result set (none: zero rows). Inserts
/// return the next scripted id, or ids counting up from 1. Operations named
/// in [`failing`](Self::failing) are recorded, then fail with
/// `Unexpected("error")`.
#[derive(Clone, Default)]
pub struct TestAdapter {
    state: Arc<Mutex<State>>,
}

impl TestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, rows: Vec<Map>) -> Self {
        self.state().rows.push_back(rows);
        self
    }

    pub fn with_ids(self, ids: impl IntoIterator<Item = Value>) -> Self {
        self.state().ids.extend(ids);
        self
    }

    pub fn with_count(self, count: usize) -> Self {
        self.state().count = count;
        self
    }

    pub fn failing(self, operation: &'static str) -> Self {
        self.state().failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<()> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failing.contains(operation) {
            return Err(OrmError::unexpected("error"));
        }
        Ok(())
    }

    fn next_id(&self) -> Value {
        let mut state = self.state();
        if let Some(id) = state.ids.pop_front() {
            return id;
        }
        state.next_id += 1;
        Value::Int(state.next_id)
    }
}

impl Adapter for TestAdapter {
    fn query(&self, query: &Query, dest: &mut dyn Destination) -> Result<usize> {
        self.record("query", Call::Query(query.clone()))?;
        let rows = self.state().rows.pop_front().unwrap_or_default();
        let count = rows.len();
        dest.load(rows)?;
        Ok(count)
    }

    fn insert(&self, query: &Query, changes: &Map) -> Result<Value> {
        self.record("insert", Call::Insert(query.clone(), changes.clone()))?;
        Ok(self.next_id())
    }

    fn insert_all(&self, query: &Query, fields: &[String], changes: &[Map]) -> Result<Vec<Value>> {
        self.record(
            "insert_all",
            Call::InsertAll(query.clone(), fields.to_vec(), changes.to_vec()),
        )?;
        Ok(changes.iter().map(|_| self.next_id()).collect())
    }

    fn update(&self, query: &Query, changes: &Map) -> Result<()> {
        self.record("update", Call::Update(query.clone(), changes.clone()))
    }

    fn delete(&self, query: &Query) -> Result<()> {
        self.record("delete", Call::Delete(query.clone()))
    }

    fn count(&self, query: &Query) -> Result<usize> {
        self.record("count", Call::Count(query.clone()))?;
        Ok(self.state().count)
    }

    fn begin(&self) -> Result<Arc<dyn Adapter>> {
        self.record("begin", Call::Begin)?;
        Ok(Arc::new(self.clone()))
    }

    fn commit(&self) -> Result<()> {
        self.record("commit", Call::Commit)
    }

    fn rollback(&self) -> Result<()> {
        self.record("rollback", Call::Rollback)
    }
}

/// Fixed instant the test clock returns.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Repository over `adapter` with a pinned clock.
pub fn repo(adapter: &TestAdapter) -> Repo {
    Repo::new(Arc::new(adapter.clone()))
        .with_config(RepoConfig::default().with_clock(Clock::fixed(now())))
}

// =============================================================================
// Record fixtures
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct User {
    pub name: String,
    pub age: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Record)]
pub struct Card {
    pub id: i64,
    pub user: User,
}

#[derive(Debug, Clone, Default, Record)]
pub struct Group {
    pub name: String,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Account {
    #[field(primary_key)]
    pub id: i64,
    pub name: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Casts `name` into a [`User`].
pub fn user_changeset(user: User, params: &Map) -> Changeset {
    Changeset::cast(&user, params, &["name"])
}

/// A valid changeset setting a user's name to `"name"`.
pub fn create_changeset() -> Changeset {
    let ch = user_changeset(User::default(), &oxide_changeset::params! { "name" => "name" });
    assert!(ch.is_valid());
    ch
}
