//! Table schemas and row storage.

use crate::error::{OrmError, OrmResult};
use crate::mutation::WriteOp;
use crate::row::Row;
use crate::value::{Key, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Schema of an in-memory table.
///
/// ```ignore
/// let users = TableDef::new("users")
///     .columns(["UserId", "Name", "Age"])
///     .key(["UserId"])
///     .index("UsersByAge");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<String>,
    key: Vec<String>,
    indexes: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(names.into_iter().map(Into::into));
        self
    }

    /// Primary-key columns in key order.
    pub fn key<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a secondary index name usable in `FORCE_INDEX` hints.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexes.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Rows of one table, keyed and ordered by primary key.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    def: Arc<TableDef>,
    key_idx: Vec<usize>,
    rows: BTreeMap<Key, Vec<Value>>,
}

impl Table {
    pub(crate) fn new(def: TableDef) -> OrmResult<Self> {
        let invalid = |msg: String| Err(OrmError::invalid_statement(msg));
        if def.columns.is_empty() {
            return invalid(format!("table {} has no columns", def.name));
        }
        for (i, c) in def.columns.iter().enumerate() {
            if def.columns[..i].contains(c) {
                return invalid(format!("table {} declares column {c} twice", def.name));
            }
        }
        if def.key.is_empty() {
            return invalid(format!("table {} has no primary key", def.name));
        }
        let mut key_idx = Vec::with_capacity(def.key.len());
        for k in &def.key {
            match def.columns.iter().position(|c| c == k) {
                Some(i) => key_idx.push(i),
                None => return invalid(format!("key column {k} is not a column of {}", def.name)),
            }
        }
        Ok(Self {
            def: Arc::new(def),
            key_idx,
            rows: BTreeMap::new(),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.def.name
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn has_index(&self, name: &str) -> bool {
        self.def.indexes.iter().any(|i| i == name)
    }

    pub(crate) fn is_key_column(&self, idx: usize) -> bool {
        self.key_idx.contains(&idx)
    }

    pub(crate) fn column_index(&self, column: &str) -> OrmResult<usize> {
        self.def
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                OrmError::invalid_statement(format!(
                    "table {} has no column {column}",
                    self.def.name
                ))
            })
    }

    pub(crate) fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> OrmResult<Vec<usize>> {
        columns.iter().map(|c| self.column_index(c.as_ref())).collect()
    }

    pub(crate) fn all_columns(&self) -> Vec<usize> {
        (0..self.def.columns.len()).collect()
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (&Key, &Vec<Value>)> {
        self.rows.iter()
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Vec<Value>> {
        self.rows.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &Key) -> Option<&mut Vec<Value>> {
        self.rows.get_mut(key)
    }

    pub(crate) fn remove(&mut self, key: &Key) -> bool {
        self.rows.remove(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    /// Projector for `columns` (indices from [`Table::resolve`]).
    pub(crate) fn projector(&self, columns: Vec<usize>) -> Projector {
        let names = columns
            .iter()
            .map(|&i| self.def.columns[i].clone())
            .collect();
        Projector { names, columns }
    }

    /// Apply one row write.
    pub(crate) fn write(&mut self, op: WriteOp, columns: &[String], values: Vec<Value>) -> OrmResult<()> {
        if columns.len() != values.len() {
            return Err(OrmError::invalid_statement(format!(
                "{} on {}: {} columns but {} values",
                op.as_str(),
                self.def.name,
                columns.len(),
                values.len()
            )));
        }
        let idx = self.resolve(columns)?;

        let mut parts = Vec::with_capacity(self.key_idx.len());
        for &k in &self.key_idx {
            let pos = idx.iter().position(|&i| i == k).ok_or_else(|| {
                OrmError::invalid_statement(format!(
                    "{} on {} is missing key column {}",
                    op.as_str(),
                    self.def.name,
                    self.def.columns[k]
                ))
            })?;
            parts.push(values[pos].clone());
        }
        let key = Key::new(parts);

        let width = self.def.columns.len();
        let existing = self.rows.get(&key);
        let mut row = match (op, existing) {
            (WriteOp::Insert, Some(_)) => {
                return Err(OrmError::UniqueViolation(format!(
                    "row {key} already exists in {}",
                    self.def.name
                )));
            }
            (WriteOp::Update, None) => {
                return Err(OrmError::not_found(format!("row {key} in {}", self.def.name)));
            }
            (WriteOp::Update | WriteOp::InsertOrUpdate, Some(row)) => row.clone(),
            _ => vec![Value::Null; width],
        };
        for (i, value) in idx.into_iter().zip(values) {
            row[i] = value;
        }
        self.rows.insert(key, row);
        Ok(())
    }
}

/// Turns stored rows into result rows for a fixed column list.
pub(crate) struct Projector {
    names: Arc<[String]>,
    columns: Vec<usize>,
}

impl Projector {
    pub(crate) fn row(&self, values: &[Value]) -> Row {
        Row::new(
            self.names.clone(),
            self.columns.iter().map(|&i| values[i].clone()).collect(),
        )
    }
}
