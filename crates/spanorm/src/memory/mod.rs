//! In-process store.
//!
//! `MemoryStore` implements every store capability trait over plain
//! in-memory tables. It executes the statement dialect the builders emit,
//! applies mutation batches atomically and runs read-write transactions
//! optimistically: each attempt works on a private copy and commits only if
//! no other commit happened since it started, otherwise the callback is
//! re-run.
//!
//! ```ignore
//! let store = MemoryStore::new();
//! store.create_table(
//!     TableDef::new("users")
//!         .columns(["UserId", "Name", "Age"])
//!         .key(["UserId"]),
//! )?;
//! let db = Db::new(store);
//! ```

mod exec;
mod sql;
mod table;

pub use table::TableDef;

use crate::client::{
    Applier, CommitTimestamp, ReadWriteTransaction, RowStream, SnapshotReader, Store,
};
use crate::error::{OrmError, OrmResult};
use crate::mutation::Mutation;
use crate::row::Row;
use crate::statement::Statement;
use crate::value::{Key, KeySet};
use chrono::{TimeDelta, Utc};
use exec::Tables;
use futures_util::stream;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use table::Table;

/// Settings for [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// How many times a conflicting read-write transaction is attempted
    /// before failing with [`OrmError::Aborted`].
    pub max_commit_attempts: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 8,
        }
    }
}

impl MemoryStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_commit_attempts(mut self, attempts: usize) -> Self {
        self.max_commit_attempts = attempts;
        self
    }
}

#[derive(Default)]
struct State {
    tables: Arc<Tables>,
    version: u64,
    last_commit: Option<CommitTimestamp>,
}

impl State {
    /// Install `tables` as the latest committed state.
    fn publish(&mut self, tables: Arc<Tables>) -> CommitTimestamp {
        self.tables = tables;
        self.version += 1;
        let now = Utc::now();
        let ts = match self.last_commit {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_commit = Some(ts);
        ts
    }
}

#[derive(Default)]
struct Shared {
    state: RwLock<State>,
    config: MemoryStoreConfig,
}

/// In-process implementation of [`Store`].
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("MemoryStore")
            .field("tables", &state.tables.keys().collect::<Vec<_>>())
            .field("version", &state.version)
            .field("config", &self.shared.config)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::default(),
                config,
            }),
        }
    }

    // Table contents are replaced wholesale under the lock, so a poisoned
    // lock still guards a consistent state.
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.shared.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.shared.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot(&self) -> (Arc<Tables>, u64) {
        let state = self.read_state();
        (state.tables.clone(), state.version)
    }

    /// Run `f` on a copy of the latest tables and publish the copy if `f`
    /// succeeds. Nothing is published on error.
    fn commit_with<F>(&self, f: F) -> OrmResult<CommitTimestamp>
    where
        F: FnOnce(&mut Tables) -> OrmResult<()>,
    {
        let mut state = self.write_state();
        let mut tables = (*state.tables).clone();
        f(&mut tables)?;
        Ok(state.publish(Arc::new(tables)))
    }

    /// Create an empty table.
    ///
    /// Fails with [`OrmError::InvalidStatement`] if the table exists or the
    /// definition is inconsistent (no columns, no key, unknown key column).
    pub fn create_table(&self, def: TableDef) -> OrmResult<()> {
        let table = Table::new(def)?;
        self.commit_with(|tables| {
            if tables.contains_key(table.name()) {
                return Err(OrmError::invalid_statement(format!(
                    "table {} already exists",
                    table.name()
                )));
            }
            tables.insert(table.name().to_string(), table);
            Ok(())
        })?;
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        self.read_state().tables.keys().cloned().collect()
    }

    /// Number of committed rows in `table`.
    pub fn row_count(&self, table: &str) -> OrmResult<usize> {
        let state = self.read_state();
        state
            .tables
            .get(table)
            .map(Table::len)
            .ok_or_else(|| OrmError::invalid_statement(format!("table {table} does not exist")))
    }

    /// Timestamp of the latest commit, if any.
    pub fn last_commit_timestamp(&self) -> Option<CommitTimestamp> {
        self.read_state().last_commit
    }
}

fn into_stream<'a>(rows: OrmResult<Vec<Row>>) -> RowStream<'a> {
    match rows {
        Ok(rows) => Box::pin(stream::iter(rows.into_iter().map(Ok))),
        Err(e) => Box::pin(stream::iter([Err(e)])),
    }
}

/// Auto-committing reader: every call reads the latest committed state.
#[derive(Debug, Clone, Copy)]
pub struct SingleUse<'a> {
    store: &'a MemoryStore,
}

impl SingleUse<'_> {
    fn view(&self) -> Arc<Tables> {
        self.store.snapshot().0
    }
}

/// Reader over the state committed when it was opened.
#[derive(Clone)]
pub struct Snapshot {
    tables: Arc<Tables>,
}

impl Snapshot {
    fn view(&self) -> Arc<Tables> {
        self.tables.clone()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot").finish_non_exhaustive()
    }
}

/// Handle passed to read-write transaction callbacks.
///
/// Reads observe the transaction's own DML. Each DML statement applies to a
/// private copy of the tables, so a failing statement leaves no trace.
pub struct MemoryTransaction {
    tables: Mutex<Arc<Tables>>,
}

impl MemoryTransaction {
    fn new(tables: Arc<Tables>) -> Self {
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Tables>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn view(&self) -> Arc<Tables> {
        self.lock().clone()
    }

    fn into_tables(self) -> Arc<Tables> {
        self.tables.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction").finish_non_exhaustive()
    }
}

macro_rules! impl_snapshot_reader {
    ($($ty:ty),* $(,)?) => {$(
        impl SnapshotReader for $ty {
            async fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> OrmResult<Row> {
                exec::read_row(&self.view(), table, key, columns)
            }

            fn read<'a>(&'a self, table: &str, keys: &KeySet, columns: &[&str]) -> RowStream<'a> {
                into_stream(exec::read(&self.view(), table, keys, columns))
            }

            fn query<'a>(&'a self, stmt: &Statement) -> RowStream<'a> {
                into_stream(exec::query(&self.view(), stmt))
            }
        }
    )*};
}

impl_snapshot_reader!(SingleUse<'_>, Snapshot, MemoryTransaction);

impl ReadWriteTransaction for MemoryTransaction {
    async fn execute(&self, stmt: &Statement) -> OrmResult<u64> {
        let mut guard = self.lock();
        let mut work = (**guard).clone();
        let affected = exec::execute(&mut work, stmt)?;
        *guard = Arc::new(work);
        Ok(affected)
    }
}

impl Applier for MemoryStore {
    async fn apply(&self, mutations: Vec<Mutation>) -> OrmResult<CommitTimestamp> {
        self.commit_with(|tables| exec::apply(tables, mutations))
    }
}

impl Store for MemoryStore {
    type Single<'a> = SingleUse<'a>;
    type ReadOnly<'a> = Snapshot;
    type Transaction = MemoryTransaction;

    fn single(&self) -> SingleUse<'_> {
        SingleUse { store: self }
    }

    fn read_only_transaction(&self) -> Snapshot {
        Snapshot {
            tables: self.snapshot().0,
        }
    }

    async fn read_write_transaction<T, F>(&self, mut f: F) -> OrmResult<(T, CommitTimestamp)>
    where
        F: AsyncFnMut(&MemoryTransaction) -> OrmResult<T>,
    {
        let attempts = self.shared.config.max_commit_attempts.max(1);
        for attempt in 1..=attempts {
            let (base, version) = self.snapshot();
            let tx = MemoryTransaction::new(base);
            match f(&tx).await {
                Ok(value) => {
                    let committed = {
                        let mut state = self.write_state();
                        (state.version == version).then(|| state.publish(tx.into_tables()))
                    };
                    if let Some(ts) = committed {
                        return Ok((value, ts));
                    }
                }
                // An abort raised inside the callback is retried like a
                // commit conflict.
                Err(e) if e.is_aborted() => {}
                Err(e) => return Err(e),
            }

            #[cfg(feature = "tracing")]
            tracing::warn!(
                target: "spanorm.memory",
                attempt,
                attempts,
                "read-write transaction conflicted with a concurrent commit, retrying"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = attempt;
        }
        Err(OrmError::Aborted(format!(
            "read-write transaction conflicted {attempts} times"
        )))
    }
}

#[cfg(test)]
mod tests;
