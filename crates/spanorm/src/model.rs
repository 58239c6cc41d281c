//! The record capability contract.

use crate::row::FromRow;
use crate::value::{Key, Value};

/// An ordered column → value mapping.
///
/// Inserting a column that is already present overwrites its value in place,
/// so the mapping never holds two entries for one column. Iteration follows
/// first-insertion order, which keeps generated SQL deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

/// Conjunctive equality filter: every entry becomes `column = @column`.
pub type WhereParam = Params;

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or overwrite a column's value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    /// Merge `other` into a copy of `self`; `other` wins on shared columns.
    pub fn merged(&self, other: &Params) -> Params {
        let mut out = self.clone();
        for (column, value) in &other.0 {
            out.insert(column.clone(), value.clone());
        }
        out
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    /// Split into parallel column and value lists.
    pub fn into_columns_values(self) -> (Vec<String>, Vec<Value>) {
        self.0.into_iter().unzip()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Params {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A record type stored in one table.
///
/// Implementations are usually generated by `#[derive(Model)]`. The layer
/// trusts the implementation: `primary_keys()` must be a subset of `params()`
/// and `store_key()` must carry the same values in the table's key order.
pub trait Model: FromRow {
    /// Table name.
    const TABLE: &'static str;

    /// Every column `params()` produces, in the same order. Used when reading
    /// by key without a record to project from.
    const COLUMNS: &'static [&'static str];

    /// Table name of this record.
    fn table(&self) -> &'static str {
        Self::TABLE
    }

    /// Full row projection (column → value).
    fn params(&self) -> Params;

    /// Primary-key projection (column → value).
    fn primary_keys(&self) -> Params;

    /// Primary key in the table's declared key order.
    fn store_key(&self) -> Key;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_in_place() {
        let mut p = Params::new().with("A", 1i64).with("B", 2i64);
        p.insert("A", 3i64);
        let cols: Vec<_> = p.columns().collect();
        assert_eq!(cols, ["A", "B"]);
        assert_eq!(p.get("A"), Some(&Value::from(3i64)));
    }

    #[test]
    fn merged_is_last_write_wins() {
        let a = Params::from([("A", 1i64)]);
        let b = Params::from([("A", 2i64)]).with("B", "x");
        let m = a.merged(&b);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("A"), Some(&Value::from(2i64)));
        // receiver untouched
        assert_eq!(a.get("A"), Some(&Value::from(1i64)));
    }
}
