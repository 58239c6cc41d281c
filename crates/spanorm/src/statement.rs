//! Parameterized statements and the model-driven DML builder.

use crate::builder::{ParamNames, placeholder, quote_ident};
use crate::model::{Model, Params};

/// A SQL statement with named parameters (`@name`).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    /// A statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind one more named parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<crate::Value>) -> Self {
        self.params.insert(name, value);
        self
    }
}

/// Builds INSERT / UPDATE / DELETE statements from a record.
///
/// No validation happens here: a record with an empty projection produces
/// SQL the store rejects at execution time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementBuilder;

/// Prefix applied to primary-key parameters in WHERE clauses. A SET column
/// whose name already carries the prefix gets a suffixed placeholder instead.
pub const PK_PARAM_PREFIX: &str = "pk_";

impl StatementBuilder {
    pub fn new() -> Self {
        Self
    }

    /// `INSERT INTO t (`a`, `b`) VALUES (@a, @b)`
    pub fn insert<M: Model>(&self, target: &M) -> Statement {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        let mut params = Params::new();
        let mut names = ParamNames::new();

        for (col, val) in target.params() {
            let name = names.claim(&col);
            columns.push(quote_ident(&col));
            values.push(placeholder(&name));
            params.insert(name, val);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            target.table(),
            columns.join(", "),
            values.join(", ")
        );
        Statement::with_params(sql, params)
    }

    /// `UPDATE t SET `a`=@a WHERE `id`=@pk_id`; key columns are never SET.
    pub fn update<M: Model>(&self, target: &M) -> Statement {
        let keys = target.primary_keys();
        let mut names = ParamNames::new();
        let (where_clause, mut params) = self.build_where_pk(&keys, &mut names);

        let mut assignments = Vec::new();
        for (col, val) in target.params() {
            if keys.contains(&col) {
                continue;
            }
            let name = names.claim(&col);
            assignments.push(format!("{}={}", quote_ident(&col), placeholder(&name)));
            params.insert(name, val);
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            target.table(),
            assignments.join(", "),
            where_clause
        );
        Statement::with_params(sql, params)
    }

    /// `DELETE FROM t WHERE `id`=@pk_id`
    pub fn delete<M: Model>(&self, target: &M) -> Statement {
        let (where_clause, params) = self.build_where_pk(&target.primary_keys(), &mut ParamNames::new());
        let sql = format!("DELETE FROM {} WHERE {}", target.table(), where_clause);
        Statement::with_params(sql, params)
    }

    fn build_where_pk(&self, keys: &Params, names: &mut ParamNames) -> (String, Params) {
        let mut conditions = Vec::new();
        let mut params = Params::new();
        for (col, val) in keys.iter() {
            let name = names.claim_prefixed(PK_PARAM_PREFIX, col);
            conditions.push(format!("{}={}", quote_ident(col), placeholder(&name)));
            params.insert(name, val.clone());
        }
        (conditions.join(" AND "), params)
    }
}
