//! Statement, read and mutation execution against a set of tables.

use super::sql::{self, Binding, Parsed, Projection, Select};
use super::table::Table;
use crate::builder::Direction;
use crate::error::{OrmError, OrmResult};
use crate::model::Params;
use crate::mutation::{Mutation, WriteOp};
use crate::row::Row;
use crate::statement::Statement;
use crate::value::{Key, KeySet, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub(crate) type Tables = BTreeMap<String, Table>;

fn table<'t>(tables: &'t Tables, name: &str) -> OrmResult<&'t Table> {
    tables
        .get(name)
        .ok_or_else(|| OrmError::invalid_statement(format!("table {name} does not exist")))
}

fn table_mut<'t>(tables: &'t mut Tables, name: &str) -> OrmResult<&'t mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| OrmError::invalid_statement(format!("table {name} does not exist")))
}

fn bind(params: &Params, name: &str) -> OrmResult<Value> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| OrmError::invalid_statement(format!("missing parameter @{name}")))
}

/// Resolve `column = @param` pairs to (column index, bound value).
fn resolve_bindings(t: &Table, bindings: &[Binding], params: &Params) -> OrmResult<Vec<(usize, Value)>> {
    bindings
        .iter()
        .map(|b| Ok((t.column_index(&b.column)?, bind(params, &b.param)?)))
        .collect()
}

/// SQL equality: NULL never matches.
fn matches(row: &[Value], filter: &[(usize, Value)]) -> bool {
    filter
        .iter()
        .all(|(i, v)| !v.is_null() && !row[*i].is_null() && row[*i] == *v)
}

fn matching_keys(t: &Table, filter: &[(usize, Value)]) -> Vec<Key> {
    t.rows()
        .filter(|(_, row)| matches(row, filter))
        .map(|(k, _)| k.clone())
        .collect()
}

pub(crate) fn read_row(tables: &Tables, name: &str, key: &Key, columns: &[&str]) -> OrmResult<Row> {
    let t = table(tables, name)?;
    let projector = t.projector(t.resolve(columns)?);
    t.get(key)
        .map(|values| projector.row(values))
        .ok_or_else(|| OrmError::not_found(format!("row {key} in {name}")))
}

pub(crate) fn read(tables: &Tables, name: &str, keys: &KeySet, columns: &[&str]) -> OrmResult<Vec<Row>> {
    let t = table(tables, name)?;
    let projector = t.projector(t.resolve(columns)?);
    let rows = match keys {
        KeySet::All => t.rows().map(|(_, values)| projector.row(values)).collect(),
        KeySet::Keys(keys) => {
            let mut keys: Vec<&Key> = keys.iter().collect();
            keys.sort();
            keys.dedup();
            keys.into_iter()
                .filter_map(|k| t.get(k))
                .map(|values| projector.row(values))
                .collect()
        }
    };
    Ok(rows)
}

/// Run a SELECT.
pub(crate) fn query(tables: &Tables, stmt: &Statement) -> OrmResult<Vec<Row>> {
    match sql::parse(&stmt.sql)? {
        Parsed::Select(select) => run_select(tables, &select, &stmt.params),
        _ => Err(OrmError::invalid_statement(
            "DML cannot be queried; execute it in a read-write transaction",
        )),
    }
}

fn run_select(tables: &Tables, s: &Select, params: &Params) -> OrmResult<Vec<Row>> {
    let t = table(tables, &s.table)?;
    if let Some(index) = &s.index {
        if !t.has_index(index) {
            return Err(OrmError::invalid_statement(format!(
                "table {} has no index {index}",
                t.name()
            )));
        }
    }
    let filter = resolve_bindings(t, &s.filter, params)?;
    let order = s
        .order
        .iter()
        .map(|(c, d)| Ok((t.column_index(c)?, *d)))
        .collect::<OrmResult<Vec<_>>>()?;

    // Key order is the tie-breaker: the sort below is stable.
    let mut hits: Vec<&Vec<Value>> = t
        .rows()
        .map(|(_, row)| row)
        .filter(|row| matches(row, &filter))
        .collect();
    if !order.is_empty() {
        hits.sort_by(|a, b| {
            order
                .iter()
                .map(|&(i, dir)| match dir {
                    Direction::Asc => a[i].cmp(&b[i]),
                    Direction::Desc => b[i].cmp(&a[i]),
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let columns = match &s.projection {
        Projection::Count(alias) => {
            let count = i64::try_from(hits.len()).unwrap_or(i64::MAX);
            return Ok(vec![Row::from_pairs([(alias.clone(), Value::Int64(count))])]);
        }
        Projection::All => t.all_columns(),
        Projection::Columns(columns) => t.resolve(columns)?,
    };
    if let Some(limit) = s.limit {
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    let projector = t.projector(columns);
    Ok(hits.into_iter().map(|row| projector.row(row)).collect())
}

/// Run a DML statement, returning the affected-row count.
pub(crate) fn execute(tables: &mut Tables, stmt: &Statement) -> OrmResult<u64> {
    let params = &stmt.params;
    match sql::parse(&stmt.sql)? {
        Parsed::Select(_) => Err(OrmError::invalid_statement(
            "SELECT cannot be executed as DML",
        )),
        Parsed::Insert {
            table,
            columns,
            params: names,
        } => {
            let values = names
                .iter()
                .map(|n| bind(params, n))
                .collect::<OrmResult<Vec<_>>>()?;
            table_mut(tables, &table)?.write(WriteOp::Insert, &columns, values)?;
            Ok(1)
        }
        Parsed::Update {
            table,
            assignments,
            filter,
        } => {
            let t = table_mut(tables, &table)?;
            let updates = resolve_bindings(t, &assignments, params)?;
            let key_update = assignments
                .iter()
                .zip(&updates)
                .find(|(_, (i, _))| t.is_key_column(*i));
            if let Some((b, _)) = key_update {
                return Err(OrmError::invalid_statement(format!(
                    "cannot update key column {} of {table}",
                    b.column
                )));
            }
            let filter = resolve_bindings(t, &filter, params)?;
            let keys = matching_keys(t, &filter);
            for key in &keys {
                if let Some(row) = t.get_mut(key) {
                    for (i, value) in &updates {
                        row[*i] = value.clone();
                    }
                }
            }
            Ok(keys.len() as u64)
        }
        Parsed::Delete { table, filter } => {
            let t = table_mut(tables, &table)?;
            let filter = resolve_bindings(t, &filter, params)?;
            let keys = matching_keys(t, &filter);
            for key in &keys {
                t.remove(key);
            }
            Ok(keys.len() as u64)
        }
    }
}

/// Apply a batch in order. On error `tables` may hold a partial result;
/// callers apply to a copy and discard it.
pub(crate) fn apply(tables: &mut Tables, mutations: Vec<Mutation>) -> OrmResult<()> {
    for mutation in mutations {
        match mutation {
            Mutation::Write {
                op,
                table,
                columns,
                values,
            } => table_mut(tables, &table)?.write(op, &columns, values)?,
            Mutation::Delete { table, keys } => {
                let t = table_mut(tables, &table)?;
                match keys {
                    KeySet::All => t.clear(),
                    KeySet::Keys(keys) => {
                        for key in &keys {
                            t.remove(key);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
