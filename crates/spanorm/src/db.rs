//! The database facade.

use crate::client::{CommitTimestamp, Store};
use crate::config::DbConfig;
use crate::error::OrmResult;
use crate::instrument::ExecOptions;
use crate::model::Model;
use crate::mutation::Mutator;
use crate::relation::Relation;
use crate::transaction::{ReadWriter, Reader};

/// Entry point: wraps a [`Store`] and hands out readers, read-writers,
/// relations and mutators configured from one [`DbConfig`].
///
/// # Example
///
/// ```ignore
/// use spanorm::{Db, DbConfig, MemoryStore};
///
/// let db = Db::with_config(store, DbConfig::new().log_level(LogLevel::Info));
///
/// // Auto-committing single-use read.
/// let adults = db.relation::<User>().filter_eq("Age", 20).all().await?;
///
/// // Read-write transaction; the store may re-run the closure on conflict.
/// db.read_write_transaction(async |tx| {
///     let mut user = tx.get::<User>(&key!["u1"]).await?;
///     user.age += 1;
///     tx.update(&user).await
/// })
/// .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Db<S> {
    store: S,
    config: DbConfig,
}

impl<S: Store> Db<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, DbConfig::default())
    }

    pub fn with_config(store: S, config: DbConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn opts(&self) -> ExecOptions {
        self.config.into()
    }

    /// A reader over one consistent snapshot.
    pub fn read_only_transaction(&self) -> Reader<S::ReadOnly<'_>> {
        Reader::with_options(self.store.read_only_transaction(), self.opts())
    }

    /// Run `f` in a read-write transaction and return its value.
    ///
    /// Writes commit when `f` returns `Ok` and are discarded when it returns
    /// `Err`. On a commit conflict the store may call `f` again, so `f`
    /// should not have side effects outside the transaction.
    ///
    /// The returned future is not `Send` (see
    /// [`Store::read_write_transaction`]); tasks sharing one `Db` run
    /// transactions through `spawn_local`.
    pub async fn read_write_transaction<T, F>(&self, f: F) -> OrmResult<T>
    where
        F: AsyncFnMut(&ReadWriter<&S::Transaction>) -> OrmResult<T>,
    {
        let (value, _) = self.read_write_transaction_with_timestamp(f).await?;
        Ok(value)
    }

    /// Like [`Db::read_write_transaction`], also returning the commit
    /// timestamp.
    pub async fn read_write_transaction_with_timestamp<T, F>(
        &self,
        mut f: F,
    ) -> OrmResult<(T, CommitTimestamp)>
    where
        F: AsyncFnMut(&ReadWriter<&S::Transaction>) -> OrmResult<T>,
    {
        let opts = self.opts();
        self.store
            .read_write_transaction(async |tx: &S::Transaction| {
                let rw = ReadWriter::with_options(tx, opts);
                f(&rw).await
            })
            .await
    }

    /// An auto-committing single-use reader.
    pub fn reader(&self) -> Reader<S::Single<'_>> {
        Reader::with_options(self.store.single(), self.opts())
    }

    /// Query `M`'s table with a single-use reader.
    pub fn relation<M: Model>(&self) -> Relation<M, S::Single<'_>> {
        Relation::with_options(self.store.single(), self.opts())
    }

    /// Reload `model` by key with a single-use reader.
    pub async fn find<M: Model>(&self, model: &mut M) -> OrmResult<()> {
        self.reader().find(model).await
    }

    /// A fresh batch of mutations applied through this store.
    pub fn mutator(&self) -> Mutator<&S> {
        Mutator::with_options(&self.store, self.opts())
    }
}
