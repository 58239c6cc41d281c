//! Convenient imports for typical `spanorm` usage.
//!
//! ```ignore
//! use spanorm::prelude::*;
//! ```

pub use crate::{
    Db, DbConfig, Direction, FromRow, Key, KeySet, Model, OrderParam, OrmError, OrmResult, Params,
    Mutator, ReadWriter, Reader, Relation, Row, Statement, Store, Value, WhereParam, key,
};

pub use crate::{MemoryStore, MemoryStoreConfig, TableDef};
