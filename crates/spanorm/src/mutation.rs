//! Store mutations and the batching [`Mutator`].
//!
//! A [`Mutator`] accumulates writes in memory and submits them as a single
//! atomic batch on [`Mutator::apply`], outside of any read-write transaction
//! callback.
//!
//! # Example
//!
//! ```ignore
//! let m = db.mutator();
//! m.insert(&alice);
//! m.insert(&bob);
//! m.apply().await?; // both rows or neither
//! ```

use crate::client::{Applier, CommitTimestamp};
use crate::error::OrmResult;
use crate::instrument::{ExecOptions, OpContext};
use crate::model::Model;
use crate::value::{KeySet, Value};
use std::sync::Mutex;

/// Kind of a row write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    /// Fails if the row exists.
    Insert,
    /// Fails if the row does not exist; untouched columns keep their values.
    Update,
    /// Inserts, or updates the given columns of an existing row.
    InsertOrUpdate,
    /// Inserts, or overwrites the whole row (unlisted columns become NULL).
    Replace,
}

impl WriteOp {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteOp::Insert => "insert",
            WriteOp::Update => "update",
            WriteOp::InsertOrUpdate => "insert_or_update",
            WriteOp::Replace => "replace",
        }
    }
}

/// One fully materialized store write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Write {
        op: WriteOp,
        table: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Delete {
        table: String,
        keys: KeySet,
    },
}

impl Mutation {
    fn write<M: Model>(op: WriteOp, model: &M) -> Self {
        let (columns, values) = model.params().into_columns_values();
        Mutation::Write {
            op,
            table: model.table().to_string(),
            columns,
            values,
        }
    }

    pub fn insert<M: Model>(model: &M) -> Self {
        Self::write(WriteOp::Insert, model)
    }

    pub fn update<M: Model>(model: &M) -> Self {
        Self::write(WriteOp::Update, model)
    }

    pub fn insert_or_update<M: Model>(model: &M) -> Self {
        Self::write(WriteOp::InsertOrUpdate, model)
    }

    pub fn replace<M: Model>(model: &M) -> Self {
        Self::write(WriteOp::Replace, model)
    }

    pub fn delete<M: Model>(model: &M) -> Self {
        Self::delete_keys(model.table(), KeySet::single(model.store_key()))
    }

    pub fn delete_keys(table: impl Into<String>, keys: KeySet) -> Self {
        Mutation::Delete {
            table: table.into(),
            keys,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Mutation::Write { table, .. } | Mutation::Delete { table, .. } => table,
        }
    }
}

/// Concurrency-safe accumulate-then-apply write queue.
///
/// Queueing methods take `&self`, so one mutator can be shared (e.g. behind
/// an `Arc`) by several tasks. `apply` calls are serialized.
pub struct Mutator<A> {
    applier: A,
    pending: Mutex<Vec<Mutation>>,
    apply_lock: tokio::sync::Mutex<()>,
    opts: ExecOptions,
}

impl<A: Applier> Mutator<A> {
    pub fn new(applier: A) -> Self {
        Self::with_options(applier, ExecOptions::default())
    }

    pub fn with_options(applier: A, opts: ExecOptions) -> Self {
        Self {
            applier,
            pending: Mutex::new(Vec::new()),
            apply_lock: tokio::sync::Mutex::new(()),
            opts,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Mutation>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an arbitrary mutation.
    pub fn push(&self, mutation: Mutation) {
        self.lock().push(mutation);
    }

    pub fn insert<M: Model>(&self, model: &M) {
        self.push(Mutation::insert(model));
    }

    pub fn update<M: Model>(&self, model: &M) {
        self.push(Mutation::update(model));
    }

    pub fn insert_or_update<M: Model>(&self, model: &M) {
        self.push(Mutation::insert_or_update(model));
    }

    pub fn replace<M: Model>(&self, model: &M) {
        self.push(Mutation::replace(model));
    }

    pub fn delete<M: Model>(&self, model: &M) {
        self.push(Mutation::delete(model));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued batch.
    pub fn pending(&self) -> Vec<Mutation> {
        self.lock().clone()
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Submit the queued batch as one atomic write.
    ///
    /// The queue is emptied whatever the outcome: a failed batch is not kept
    /// for retry.
    pub async fn apply(&self) -> OrmResult<CommitTimestamp> {
        let _serial = self.apply_lock.lock().await;
        let batch = std::mem::take(&mut *self.lock());

        let table = batch.first().map_or("", Mutation::table).to_string();
        let ctx = OpContext {
            op: "apply",
            table: &table,
            sql: None,
            params: batch.len(),
        };
        self.opts.run(ctx, self.applier.apply(batch)).await
    }

    /// Run `f` to queue writes, then [`apply`](Self::apply) them.
    ///
    /// If `f` fails, nothing is applied and the queue is left as `f` left
    /// it.
    pub async fn run<F>(&self, f: F) -> OrmResult<CommitTimestamp>
    where
        F: AsyncFnOnce(&Self) -> OrmResult<()>,
    {
        f(self).await?;
        self.apply().await
    }
}

impl<A> std::fmt::Debug for Mutator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.pending.lock().map(|p| p.len()).unwrap_or_default();
        f.debug_struct("Mutator")
            .field("pending", &pending)
            .field("opts", &self.opts)
            .finish()
    }
}
