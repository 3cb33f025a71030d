//! Tests for transactions: commit, rollback on error and rollback on panic.

mod common;

use std::panic::{self, AssertUnwindSafe};

use common::{create_changeset, now, repo, Call, TestAdapter};
use oxide_changeset::params;
use oxide_orm::{OrmError, Query, Result, Transaction};

fn users() -> Query {
    Query::from("users")
}

#[test]
fn test_transaction_commits_on_ok() {
    let adapter = TestAdapter::new();

    let value = repo(&adapter)
        .transaction(|tx| {
            tx.insert(&users(), None, &[create_changeset()])?;
            tx.delete(&users().find(1))?;
            Ok(42)
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(
        adapter.calls(),
        [
            Call::Begin,
            Call::Insert(
                users(),
                params! { "name" => "name", "created_at" => now(), "updated_at" => now() }
            ),
            Call::Delete(users().find(1)),
            Call::Commit,
        ]
    );
}

#[test]
fn test_transaction_rolls_back_on_error() {
    let adapter = TestAdapter::new();

    let err = repo(&adapter)
        .transaction(|tx| -> Result<()> {
            tx.delete(&users())?;
            Err(OrmError::unexpected("boom"))
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(
        adapter.calls(),
        [Call::Begin, Call::Delete(users()), Call::Rollback]
    );
}

#[test]
fn test_transaction_rolls_back_on_adapter_error() {
    let adapter = TestAdapter::new().failing("delete");

    let err = repo(&adapter)
        .transaction(|tx| tx.delete(&users()))
        .unwrap_err();

    assert_eq!(err.to_string(), "error");
    assert_eq!(adapter.calls().last(), Some(&Call::Rollback));
}

#[test]
fn test_transaction_keeps_error_when_rollback_fails() {
    let adapter = TestAdapter::new().failing("rollback");

    let err = repo(&adapter)
        .transaction(|_| -> Result<()> { Err(OrmError::not_found("missing")) })
        .unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn test_transaction_rolls_back_on_panic() {
    let adapter = TestAdapter::new();
    let repo = repo(&adapter);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        repo.transaction(|tx| -> Result<()> {
            tx.delete(&users())?;
            panic!("boom");
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(
        adapter.calls(),
        [Call::Begin, Call::Delete(users()), Call::Rollback]
    );
}

#[test]
fn test_transaction_begin_error() {
    let adapter = TestAdapter::new().failing("begin");

    let result = repo(&adapter).transaction(|tx| tx.delete(&users()));

    assert!(result.is_err());
    assert_eq!(adapter.calls(), [Call::Begin]);
}

#[test]
fn test_transaction_commit_error() {
    let adapter = TestAdapter::new().failing("commit");

    let result = repo(&adapter).transaction(|tx| tx.delete(&users()));

    assert!(result.is_err());
    assert_eq!(
        adapter.calls(),
        [Call::Begin, Call::Delete(users()), Call::Commit, Call::Rollback]
    );
}

#[test]
fn test_dropped_guard_rolls_back() {
    let adapter = TestAdapter::new();
    let repo = repo(&adapter);

    let tx = Transaction::begin(&repo).unwrap();
    tx.repo().delete(&users()).unwrap();
    drop(tx);

    assert_eq!(
        adapter.calls(),
        [Call::Begin, Call::Delete(users()), Call::Rollback]
    );
}

#[test]
fn test_guard_commit_does_not_roll_back() {
    let adapter = TestAdapter::new();
    let repo = repo(&adapter);

    let tx = Transaction::begin(&repo).unwrap();
    tx.commit().unwrap();

    assert_eq!(adapter.calls(), [Call::Begin, Call::Commit]);
}

#[test]
fn test_guard_rolls_back_when_commit_fails() {
    let adapter = TestAdapter::new().failing("commit");
    let repo = repo(&adapter);

    let tx = Transaction::begin(&repo).unwrap();
    let err = tx.commit().unwrap_err();

    assert_eq!(err.to_string(), "error");
    assert_eq!(adapter.calls(), [Call::Begin, Call::Commit, Call::Rollback]);
}

#[test]
fn test_transaction_repo_keeps_config() {
    let adapter = TestAdapter::new();
    let repo = repo(&adapter);

    let tx = Transaction::begin(&repo).unwrap();
    assert_eq!(tx.repo().config().now(), now());
    tx.rollback().unwrap();
}
