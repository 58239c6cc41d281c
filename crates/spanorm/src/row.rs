//! Result rows and row mapping traits

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value, decode};
use std::sync::Arc;

/// A single result row: column names plus their values, positionally aligned.
///
/// Column names are shared between the rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `columns` and `values` must have the same length.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column, if the row carries it.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Try to get a column value, returning `OrmError::Decode` if the column is
    /// missing or has an incompatible type.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        match self.get(column) {
            Some(value) => decode(column, value),
            None => Err(OrmError::decode(column, "column not present in row")),
        }
    }

    /// Like [`Row::try_get`], but a missing column yields `Ok(None)`.
    ///
    /// Used by mappings that must tolerate a narrowed select list.
    pub fn try_get_opt<T: FromValue>(&self, column: &str) -> OrmResult<Option<T>> {
        self.get(column).map(|value| decode(column, value)).transpose()
    }
}

/// Trait for converting a result row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(Model)]` or
/// `#[derive(FromRow)]` from the `spanorm-derive` crate.
///
/// # Example
///
/// ```ignore
/// use spanorm::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     user_id: String,
///     name: String,
///     age: i64,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs([("Name", Value::from("alice")), ("Age", Value::from(20i64))])
    }

    #[test]
    fn try_get_decodes_by_name() {
        let row = row();
        assert_eq!(row.try_get::<String>("Name").unwrap(), "alice");
        assert_eq!(row.try_get::<i64>("Age").unwrap(), 20);
    }

    #[test]
    fn missing_column_is_decode_error_for_try_get() {
        let err = row().try_get::<String>("Email").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "Email"));
    }

    #[test]
    fn missing_column_is_none_for_try_get_opt() {
        assert_eq!(row().try_get_opt::<String>("Email").unwrap(), None);
        assert_eq!(row().try_get_opt::<i64>("Age").unwrap(), Some(20));
    }

    #[test]
    fn wrong_type_is_decode_error() {
        let err = row().try_get::<i64>("Name").unwrap_err();
        assert!(err.to_string().contains("expected INT64"));
    }
}
