//! # spanorm
//!
//! A lightweight data-mapping layer for transactional stores with
//! Spanner-style semantics: point reads by key, SQL queries with named
//! parameters, read-write transactions run by the store, and atomic
//! mutation batches.
//!
//! ## Features
//!
//! - **Models**: describe a table once (`#[derive(Model)]`) and get CRUD for free
//! - **Relations**: filtered, ordered, limited single-table queries without hand-written SQL
//! - **SQL still available**: forced indexes, explicit select lists and raw `query()`
//! - **Capability traits**: the store is a set of small traits, easy to stub in tests
//! - **Mutation batches**: accumulate writes from many tasks, apply them atomically
//! - **In-memory store**: `MemoryStore` runs the whole stack in process
//!
//! ## Example
//!
//! ```ignore
//! use spanorm::prelude::*;
//!
//! #[derive(Debug, Model)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id, column = "UserId")]
//!     user_id: String,
//!     #[orm(column = "Name")]
//!     name: String,
//!     #[orm(column = "Age")]
//!     age: i64,
//! }
//!
//! let db = Db::new(store);
//!
//! // Single-use query
//! let adults = db
//!     .relation::<User>()
//!     .filter_eq("Age", 20)
//!     .order_by("Name", Direction::Asc)
//!     .all()
//!     .await?;
//!
//! // Read-write transaction
//! db.read_write_transaction(async |tx| {
//!     tx.insert(&User { user_id: "u1".into(), name: "ann".into(), age: 20 }).await
//! })
//! .await?;
//!
//! // Mutation batch
//! let m = db.mutator();
//! m.insert_or_update(&alice);
//! m.delete(&bob);
//! m.apply().await?;
//! ```

// Lets the derive macros' `::spanorm::` paths resolve inside this crate.
extern crate self as spanorm;

pub mod builder;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod instrument;
pub mod memory;
pub mod model;
pub mod mutation;
pub mod prelude;
pub mod relation;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod value;

pub use builder::{Direction, OrderBuilder, OrderParam, SelectBuilder, WhereBuilder};
pub use client::{
    Applier, CommitTimestamp, ReadWriteTransaction, RowStream, SnapshotReader, Store,
};
pub use config::{DbConfig, LogLevel};
pub use db::Db;
pub use error::{OrmError, OrmResult, is_not_found};
pub use instrument::ExecOptions;
pub use memory::{MemoryStore, MemoryStoreConfig, TableDef};
pub use model::{Model, Params, WhereParam};
pub use mutation::{Mutation, Mutator, WriteOp};
pub use relation::Relation;
pub use row::{FromRow, Row};
pub use statement::{PK_PARAM_PREFIX, Statement, StatementBuilder};
pub use transaction::{ReadWriter, Reader};
pub use value::{FromValue, Key, KeySet, Value};

#[cfg(feature = "derive")]
pub use spanorm_derive::{FromRow, Model};
