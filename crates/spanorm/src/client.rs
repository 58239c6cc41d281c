//! Store capability traits.
//!
//! The mapping layer never talks to a concrete database. It is written
//! against a handful of small traits, each independently implementable, so
//! a test can stub exactly the capability it needs:
//!
//! - [`SnapshotReader`]: point reads, key-set scans and parameterized queries
//! - [`ReadWriteTransaction`]: a reader that can also execute DML
//! - [`Applier`]: atomic multi-mutation writes
//! - [`Store`]: hands out single-use readers and runs transactions

use crate::error::OrmResult;
use crate::mutation::Mutation;
use crate::row::Row;
use crate::statement::Statement;
use crate::value::{Key, KeySet};
use chrono::{DateTime, Utc};
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;

/// Timestamp assigned by the store to a committed write.
pub type CommitTimestamp = DateTime<Utc>;

/// A stream of result rows.
///
/// Errors raised while starting the read surface as the first item. Dropping
/// the stream releases whatever the store holds for it, so consumers may stop
/// early on any path.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = OrmResult<Row>> + Send + 'a>>;

/// Read capability over a consistent view of the store.
pub trait SnapshotReader: Send + Sync {
    /// Read one row by key. Returns [`OrmError::NotFound`](crate::OrmError::NotFound)
    /// when the key does not exist.
    fn read_row(
        &self,
        table: &str,
        key: &Key,
        columns: &[&str],
    ) -> impl Future<Output = OrmResult<Row>> + Send;

    /// Scan the rows of `keys`, in key order.
    fn read<'a>(&'a self, table: &str, keys: &KeySet, columns: &[&str]) -> RowStream<'a>;

    /// Execute a parameterized query.
    fn query<'a>(&'a self, stmt: &Statement) -> RowStream<'a>;
}

/// Read-write capability inside a store transaction.
pub trait ReadWriteTransaction: SnapshotReader {
    /// Execute a DML statement and return the number of affected rows.
    fn execute(&self, stmt: &Statement) -> impl Future<Output = OrmResult<u64>> + Send;
}

/// Atomic multi-mutation write.
pub trait Applier: Send + Sync {
    /// Apply every mutation or none of them.
    fn apply(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = OrmResult<CommitTimestamp>> + Send;
}

/// A store that can open readers and run transactions.
pub trait Store: Applier {
    /// Auto-committing single-use reader.
    type Single<'a>: SnapshotReader + 'a
    where
        Self: 'a;

    /// Reader bound to one consistent snapshot.
    type ReadOnly<'a>: SnapshotReader + 'a
    where
        Self: 'a;

    /// Transaction handle passed to read-write callbacks.
    type Transaction: ReadWriteTransaction;

    fn single(&self) -> Self::Single<'_>;

    fn read_only_transaction(&self) -> Self::ReadOnly<'_>;

    /// Run `f` inside a read-write transaction.
    ///
    /// Commits when `f` returns `Ok`, discards its writes when it returns
    /// `Err`. The store may call `f` again when the commit conflicts with a
    /// concurrent one.
    ///
    /// Unlike the other store futures this one is not required to be
    /// `Send`: the future an `AsyncFnMut` callback returns cannot be bounded
    /// on stable Rust. Await it on the task that owns the callback, or spawn
    /// such tasks with `tokio::task::spawn_local` on a `LocalSet`.
    fn read_write_transaction<T, F>(
        &self,
        f: F,
    ) -> impl Future<Output = OrmResult<(T, CommitTimestamp)>>
    where
        F: AsyncFnMut(&Self::Transaction) -> OrmResult<T>;
}

impl<R: SnapshotReader> SnapshotReader for &R {
    fn read_row(
        &self,
        table: &str,
        key: &Key,
        columns: &[&str],
    ) -> impl Future<Output = OrmResult<Row>> + Send {
        (**self).read_row(table, key, columns)
    }

    fn read<'a>(&'a self, table: &str, keys: &KeySet, columns: &[&str]) -> RowStream<'a> {
        (**self).read(table, keys, columns)
    }

    fn query<'a>(&'a self, stmt: &Statement) -> RowStream<'a> {
        (**self).query(stmt)
    }
}

impl<T: ReadWriteTransaction> ReadWriteTransaction for &T {
    fn execute(&self, stmt: &Statement) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(stmt)
    }
}

impl<A: Applier> Applier for &A {
    fn apply(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = OrmResult<CommitTimestamp>> + Send {
        (**self).apply(mutations)
    }
}

impl<A: Applier> Applier for std::sync::Arc<A> {
    fn apply(
        &self,
        mutations: Vec<Mutation>,
    ) -> impl Future<Output = OrmResult<CommitTimestamp>> + Send {
        (**self).apply(mutations)
    }
}
