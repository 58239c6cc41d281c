//! Chainable single-table query context.
//!
//! A [`Relation`] combines a model type, a read capability and the three
//! clause builders. Chaining consumes and returns the relation; clone it to
//! keep a reusable template:
//!
//! ```ignore
//! let adults = reader.relation::<User>().filter_eq("Active", true);
//! let oldest = adults.clone().order_by("Age", Direction::Desc).find_one().await?;
//! let names = adults.select(["Name"]).all().await?;
//! ```

use crate::builder::{Direction, OrderBuilder, OrderParam, SelectBuilder, WhereBuilder};
use crate::client::SnapshotReader;
use crate::error::{OrmError, OrmResult};
use crate::instrument::{ExecOptions, OpContext};
use crate::model::{Model, Params, WhereParam};
use crate::row::Row;
use crate::statement::Statement;
use crate::value::Value;
use futures_util::TryStreamExt;
use std::marker::PhantomData;

/// Column alias used by [`Relation::count`].
const COUNT_ALIAS: &str = "count";

/// Query context for model `M` over reader `R`.
pub struct Relation<M, R> {
    tx: R,
    select: SelectBuilder,
    filter: WhereBuilder,
    order: OrderBuilder,
    index: Option<String>,
    limit: u64,
    opts: ExecOptions,
    _model: PhantomData<fn() -> M>,
}

impl<M, R: Clone> Clone for Relation<M, R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            select: self.select.clone(),
            filter: self.filter.clone(),
            order: self.order.clone(),
            index: self.index.clone(),
            limit: self.limit,
            opts: self.opts,
            _model: PhantomData,
        }
    }
}

impl<M, R> std::fmt::Debug for Relation<M, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("model", &std::any::type_name::<M>())
            .field("select", &self.select)
            .field("filter", &self.filter)
            .field("order", &self.order)
            .field("index", &self.index)
            .field("limit", &self.limit)
            .finish()
    }
}

impl<M: Model, R: SnapshotReader> Relation<M, R> {
    /// Start an unfiltered, unordered, unbounded query.
    pub fn new(tx: R) -> Self {
        Self::with_options(tx, ExecOptions::default())
    }

    pub fn with_options(tx: R, opts: ExecOptions) -> Self {
        Self {
            tx,
            select: SelectBuilder::new(),
            filter: WhereBuilder::new(),
            order: OrderBuilder::new(),
            index: None,
            limit: 0,
            opts,
            _model: PhantomData,
        }
    }

    // ==================== Chaining ====================

    /// Add columns to the projection (set union).
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = self.select.merge(columns);
        self
    }

    /// Merge equality filters (`WHERE`), last-write-wins per column.
    pub fn filter(mut self, param: impl Into<WhereParam>) -> Self {
        self.filter = self.filter.merge(&param.into());
        self
    }

    /// Add WHERE: column = value
    pub fn filter_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Params::new().with(column, value))
    }

    /// Merge sort keys, last-write-wins per column.
    pub fn order(mut self, param: impl Into<OrderParam>) -> Self {
        self.order = self.order.merge(&param.into());
        self
    }

    /// Add one sort key.
    pub fn order_by(self, column: impl Into<String>, dir: Direction) -> Self {
        self.order(OrderParam::new().with(column, dir))
    }

    /// Cap the number of rows; `0` means unbounded.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Force the store to use a secondary index.
    pub fn force_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    // ==================== Rendering ====================

    pub fn table(&self) -> &'static str {
        M::TABLE
    }

    fn from_clause(&self) -> String {
        match &self.index {
            Some(index) => format!("{}@{{FORCE_INDEX={}}}", M::TABLE, index),
            None => M::TABLE.to_string(),
        }
    }

    /// Render the SELECT statement.
    pub fn sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.select.build(), self.from_clause());
        for part in [self.filter.build(), self.order.build()] {
            if !part.is_empty() {
                sql.push(' ');
                sql.push_str(&part);
            }
        }
        if self.limit != 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }
        sql
    }

    /// Render the COUNT statement (projection, order and limit ignored).
    pub fn count_sql(&self) -> String {
        let mut sql = format!(
            "SELECT COUNT(*) AS {} FROM {}",
            COUNT_ALIAS,
            self.from_clause()
        );
        let filter = self.filter.build();
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(&filter);
        }
        sql
    }

    /// The SELECT statement with the filter parameters bound.
    pub fn statement(&self) -> Statement {
        Statement::with_params(self.sql(), self.filter.params())
    }

    // ==================== Execution ====================

    /// Every matching row. Zero rows is not an error.
    pub async fn all(&self) -> OrmResult<Vec<M>> {
        let rows = self.fetch_rows("select", &self.statement()).await?;
        rows.iter().map(M::from_row).collect()
    }

    /// The first matching row (`LIMIT 1` is forced).
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 or more rows: returns the first
    ///
    /// Use [`Relation::find_one_strict`] to error on multiple matches.
    pub async fn find_one(&self) -> OrmResult<M> {
        let q = self.clone_with_limit(1);
        let stmt = q.statement();
        let rows = q.fetch_rows("find_one", &stmt).await?;
        match rows.first() {
            Some(row) => M::from_row(row),
            None => Err(OrmError::not_found(format!("{}: {}", M::TABLE, stmt.sql))),
        }
    }

    /// Require exactly one matching row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns [`OrmError::TooManyRows`]
    pub async fn find_one_strict(&self) -> OrmResult<M> {
        let q = self.clone_with_limit(2);
        let stmt = q.statement();
        let rows = q.fetch_rows("find_one_strict", &stmt).await?;
        match rows.len() {
            0 => Err(OrmError::not_found(format!("{}: {}", M::TABLE, stmt.sql))),
            1 => M::from_row(&rows[0]),
            got => Err(OrmError::too_many_rows(1, got)),
        }
    }

    /// Number of matching rows.
    pub async fn count(&self) -> OrmResult<i64> {
        let stmt = Statement::with_params(self.count_sql(), self.filter.params());
        let rows = self.fetch_rows("count", &stmt).await?;
        let row = rows
            .first()
            .ok_or_else(|| OrmError::Other("COUNT returned no rows".to_string()))?;
        row.try_get(COUNT_ALIAS)
    }

    /// Run caller-supplied SQL with caller-supplied named parameters,
    /// bypassing the builders. Rows are still mapped into `M`.
    pub async fn query(&self, sql: &str, params: Params) -> OrmResult<Vec<M>> {
        let stmt = Statement::with_params(sql, params);
        let rows = self.fetch_rows("query", &stmt).await?;
        rows.iter().map(M::from_row).collect()
    }

    fn clone_with_limit(&self, limit: u64) -> Relation<M, &R> {
        Relation {
            tx: &self.tx,
            select: self.select.clone(),
            filter: self.filter.clone(),
            order: self.order.clone(),
            index: self.index.clone(),
            limit,
            opts: self.opts,
            _model: PhantomData,
        }
    }

    /// Drain the store's row stream. The stream is dropped on every exit
    /// path, including a mid-stream error.
    async fn fetch_rows(&self, op: &'static str, stmt: &Statement) -> OrmResult<Vec<Row>> {
        let ctx = OpContext {
            op,
            table: M::TABLE,
            sql: Some(&stmt.sql),
            params: stmt.params.len(),
        };
        self.opts
            .run(ctx, self.tx.query(stmt).try_collect::<Vec<Row>>())
            .await
    }
}
