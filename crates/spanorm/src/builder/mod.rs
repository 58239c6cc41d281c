//! Clause builders for SELECT / WHERE / ORDER BY fragments.
//!
//! Every builder is an immutable value: `merge` returns a new builder and
//! leaves the receiver untouched, so a partially built query can serve as a
//! template for several requests.
//!
//! Identifiers are always backtick-quoted and values are never interpolated:
//! each filtered column binds as a named parameter (`@column`). Placeholder
//! names are unique within a statement even when two columns sanitize to the
//! same name.

mod order;
mod select;
mod where_builder;

pub use order::{Direction, OrderBuilder, OrderParam};
pub use select::SelectBuilder;
pub use where_builder::WhereBuilder;

use std::collections::HashSet;

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Parameter name for a column: invalid identifier characters become `_`.
pub fn param_name(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    for (i, c) in column.chars().enumerate() {
        let valid = c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit());
        out.push(if valid { c } else { '_' });
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Hands out placeholder names that are unique within one statement.
///
/// The first column to claim a sanitized name gets it as is; later claims
/// get a `_1`, `_2`, ... suffix.
#[derive(Debug, Clone, Default)]
pub struct ParamNames {
    used: HashSet<String>,
}

impl ParamNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a parameter name for `column`.
    pub fn claim(&mut self, column: &str) -> String {
        self.claim_prefixed("", column)
    }

    /// Claim `prefix` + the parameter name for `column`.
    pub fn claim_prefixed(&mut self, prefix: &str, column: &str) -> String {
        let base = format!("{prefix}{}", param_name(column));
        let mut name = base.clone();
        let mut n = 1;
        while self.used.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

/// Named placeholder for a parameter name (`@name`).
pub fn placeholder(name: &str) -> String {
    format!("@{name}")
}
