//! Capability-typed transaction wrappers.
//!
//! [`Reader`] wraps anything that can read a snapshot; [`ReadWriter`] wraps a
//! read-write transaction and adds DML. Neither owns commit or rollback:
//! that stays with the store's transaction runner.

use crate::client::{ReadWriteTransaction, SnapshotReader};
use crate::error::{OrmError, OrmResult};
use crate::instrument::{ExecOptions, OpContext};
use crate::model::Model;
use crate::relation::Relation;
use crate::row::Row;
use crate::statement::{Statement, StatementBuilder};
use crate::value::{Key, KeySet};
use futures_util::TryStreamExt;

/// Read operations over one snapshot.
#[derive(Debug, Clone)]
pub struct Reader<R> {
    tx: R,
    opts: ExecOptions,
}

impl<R: SnapshotReader> Reader<R> {
    pub fn new(tx: R) -> Self {
        Self::with_options(tx, ExecOptions::default())
    }

    pub fn with_options(tx: R, opts: ExecOptions) -> Self {
        Self { tx, opts }
    }

    /// The wrapped store reader.
    pub fn inner(&self) -> &R {
        &self.tx
    }

    /// Start a query over `M`'s table.
    pub fn relation<M: Model>(&self) -> Relation<M, &R> {
        Relation::with_options(&self.tx, self.opts)
    }

    /// Reload `model` by its key, replacing it in place.
    ///
    /// The columns read are the ones `model.params()` names. Returns
    /// [`OrmError::NotFound`] when the row does not exist; `model` is left
    /// untouched on any error.
    pub async fn find<M: Model>(&self, model: &mut M) -> OrmResult<()> {
        let params = model.params();
        let columns: Vec<&str> = params.columns().collect();
        let row = self.read_row(M::TABLE, &model.store_key(), &columns).await?;
        *model = M::from_row(&row)?;
        Ok(())
    }

    /// Read a fresh `M` by key.
    pub async fn get<M: Model>(&self, key: &Key) -> OrmResult<M> {
        let row = self.read_row(M::TABLE, key, M::COLUMNS).await?;
        M::from_row(&row)
    }

    /// Read every existing row of `keys`, in key order. Missing keys are
    /// skipped.
    pub async fn scan<M: Model>(&self, keys: &KeySet) -> OrmResult<Vec<M>> {
        let ctx = OpContext {
            op: "scan",
            table: M::TABLE,
            sql: None,
            params: match keys {
                KeySet::All => 0,
                KeySet::Keys(keys) => keys.len(),
            },
        };
        let rows: Vec<Row> = self
            .opts
            .run(ctx, self.tx.read(M::TABLE, keys, M::COLUMNS).try_collect())
            .await?;
        rows.iter().map(M::from_row).collect()
    }

    async fn read_row(&self, table: &str, key: &Key, columns: &[&str]) -> OrmResult<Row> {
        let ctx = OpContext {
            op: "read_row",
            table,
            sql: None,
            params: key.len(),
        };
        self.opts
            .run(ctx, self.tx.read_row(table, key, columns))
            .await
    }
}

/// Read and DML operations inside a read-write transaction.
#[derive(Debug, Clone)]
pub struct ReadWriter<T> {
    reader: Reader<T>,
    builder: StatementBuilder,
}

impl<T: ReadWriteTransaction> ReadWriter<T> {
    pub fn new(tx: T) -> Self {
        Self::with_options(tx, ExecOptions::default())
    }

    pub fn with_options(tx: T, opts: ExecOptions) -> Self {
        Self {
            reader: Reader::with_options(tx, opts),
            builder: StatementBuilder::new(),
        }
    }

    /// Read-only view of this transaction. Reads observe this
    /// transaction's own writes.
    pub fn reader(&self) -> &Reader<T> {
        &self.reader
    }

    pub fn relation<M: Model>(&self) -> Relation<M, &T> {
        self.reader.relation()
    }

    /// See [`Reader::find`].
    pub async fn find<M: Model>(&self, model: &mut M) -> OrmResult<()> {
        self.reader.find(model).await
    }

    /// See [`Reader::get`].
    pub async fn get<M: Model>(&self, key: &Key) -> OrmResult<M> {
        self.reader.get(key).await
    }

    /// Insert `model` with DML.
    ///
    /// An existing key surfaces as the store's unique-violation error.
    pub async fn insert<M: Model>(&self, model: &M) -> OrmResult<()> {
        let stmt = self.builder.insert(model);
        self.execute_expect_rows("insert", model.table(), &stmt).await
    }

    /// Update every non-key column of `model`.
    ///
    /// Returns [`OrmError::NoRowsAffected`] when no row has `model`'s key.
    pub async fn update<M: Model>(&self, model: &M) -> OrmResult<()> {
        let stmt = self.builder.update(model);
        self.execute_expect_rows("update", model.table(), &stmt).await
    }

    /// Delete the row with `model`'s key.
    ///
    /// Returns [`OrmError::NoRowsAffected`] when no row has `model`'s key.
    pub async fn delete<M: Model>(&self, model: &M) -> OrmResult<()> {
        let stmt = self.builder.delete(model);
        self.execute_expect_rows("delete", model.table(), &stmt).await
    }

    /// Execute arbitrary DML and return the affected-row count.
    pub async fn execute(&self, stmt: &Statement) -> OrmResult<u64> {
        self.execute_op("execute", "", stmt).await
    }

    async fn execute_op(&self, op: &'static str, table: &str, stmt: &Statement) -> OrmResult<u64> {
        let ctx = OpContext {
            op,
            table,
            sql: Some(&stmt.sql),
            params: stmt.params.len(),
        };
        self.reader
            .opts
            .run(ctx, self.reader.tx.execute(stmt))
            .await
    }

    async fn execute_expect_rows(
        &self,
        op: &'static str,
        table: &str,
        stmt: &Statement,
    ) -> OrmResult<()> {
        match self.execute_op(op, table, stmt).await? {
            0 => Err(OrmError::no_rows_affected(op, table)),
            _ => Ok(()),
        }
    }
}
