//! ORDER BY clause builder.

use super::quote_ident;
use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Ordered column → direction mapping.
///
/// Sort priority is first-mention order. Re-specifying a column overwrites
/// its direction but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderParam(Vec<(String, Direction)>);

impl OrderParam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(self, column: impl Into<String>) -> Self {
        self.with(column, Direction::Asc)
    }

    pub fn desc(self, column: impl Into<String>) -> Self {
        self.with(column, Direction::Desc)
    }

    pub fn with(mut self, column: impl Into<String>, dir: Direction) -> Self {
        self.insert(column, dir);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, dir: Direction) {
        let column = column.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = dir,
            None => self.0.push((column, dir)),
        }
    }

    pub fn get(&self, column: &str) -> Option<Direction> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.0.iter().map(|(c, d)| (c.as_str(), *d))
    }
}

impl<K: Into<String>> FromIterator<(K, Direction)> for OrderParam {
    fn from_iter<I: IntoIterator<Item = (K, Direction)>>(iter: I) -> Self {
        let mut param = OrderParam::new();
        for (col, dir) in iter {
            param.insert(col, dir);
        }
        param
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Direction); N]> for OrderParam {
    fn from(pairs: [(K, Direction); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Accumulated sort keys, merged last-write-wins per column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBuilder {
    param: OrderParam,
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.param.is_empty()
    }

    pub fn merge(&self, other: &OrderParam) -> Self {
        let mut param = self.param.clone();
        for (col, dir) in other.iter() {
            param.insert(col, dir);
        }
        Self { param }
    }

    /// Render `ORDER BY `a` ASC, ...`, or `""` when empty.
    pub fn build(&self) -> String {
        if self.param.is_empty() {
            return String::new();
        }
        let keys: Vec<String> = self
            .param
            .iter()
            .map(|(col, dir)| format!("{} {}", quote_ident(col), dir))
            .collect();
        format!("ORDER BY {}", keys.join(", "))
    }
}
