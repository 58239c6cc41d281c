//! WHERE clause builder: conjunctive equality over named parameters.

use super::{ParamNames, placeholder, quote_ident};
use crate::model::{Params, WhereParam};
use crate::value::Value;

/// Accumulated equality filter.
///
/// Merging is last-write-wins per column: filtering the same column twice
/// replaces the earlier value instead of adding a second predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereBuilder {
    param: WhereParam,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.param.is_empty()
    }

    /// Current filter value for a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.param.get(column)
    }

    pub fn merge(&self, other: &WhereParam) -> Self {
        Self {
            param: self.param.merged(other),
        }
    }

    /// Render `WHERE `a`=@a AND ...`, or `""` when empty.
    pub fn build(&self) -> String {
        if self.param.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = self
            .bindings()
            .map(|(col, name, _)| format!("{}={}", quote_ident(col), placeholder(&name)))
            .collect();
        format!("WHERE {}", conditions.join(" AND "))
    }

    /// Statement parameters, keyed by the placeholder names `build` emits.
    pub fn params(&self) -> Params {
        self.bindings()
            .map(|(_, name, value)| (name, value.clone()))
            .collect()
    }

    /// (column, placeholder name, value) in filter order. Deterministic, so
    /// `build` and `params` always agree.
    fn bindings(&self) -> impl Iterator<Item = (&str, String, &Value)> {
        let mut names = ParamNames::new();
        self.param
            .iter()
            .map(move |(col, value)| (col, names.claim(col), value))
    }
}
