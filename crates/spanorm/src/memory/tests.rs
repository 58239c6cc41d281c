use super::*;
use crate::key;
use crate::model::Params;
use crate::mutation::WriteOp;
use crate::value::Value;
use futures_util::TryStreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};

fn store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .create_table(
            TableDef::new("users")
                .columns(["UserId", "Name", "Age"])
                .key(["UserId"])
                .index("UsersByAge"),
        )
        .unwrap();
    store
}

fn write(op: WriteOp, id: &str, name: &str, age: i64) -> Mutation {
    Mutation::Write {
        op,
        table: "users".into(),
        columns: vec!["UserId".into(), "Name".into(), "Age".into()],
        values: vec![Value::from(id), Value::from(name), Value::from(age)],
    }
}

fn insert(id: &str, name: &str, age: i64) -> Mutation {
    write(WriteOp::Insert, id, name, age)
}

async fn query(reader: &impl SnapshotReader, sql: &str, params: Params) -> OrmResult<Vec<Row>> {
    reader
        .query(&Statement::with_params(sql, params))
        .try_collect()
        .await
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r.try_get("Name").unwrap()).collect()
}

async fn seeded() -> MemoryStore {
    let s = store();
    s.apply(vec![
        insert("u1", "ann", 20),
        insert("u2", "bob", 18),
        insert("u3", "cy", 20),
    ])
    .await
    .unwrap();
    s
}

// ==================== Schema ====================

#[test]
fn create_table_rejects_duplicates_and_bad_keys() {
    let s = store();
    let dup = s.create_table(TableDef::new("users").column("X").key(["X"]));
    assert!(matches!(dup, Err(OrmError::InvalidStatement(_))));

    let bad_key = s.create_table(TableDef::new("t").column("A").key(["B"]));
    assert!(matches!(bad_key, Err(OrmError::InvalidStatement(_))));

    let no_key = s.create_table(TableDef::new("t").column("A"));
    assert!(matches!(no_key, Err(OrmError::InvalidStatement(_))));

    assert_eq!(s.table_names(), ["users"]);
}

// ==================== Mutations ====================

#[tokio::test]
async fn insert_then_read_row() {
    let s = seeded().await;
    let row = s
        .single()
        .read_row("users", &key!["u1"], &["Name", "Age"])
        .await
        .unwrap();
    assert_eq!(row.columns(), ["Name", "Age"]);
    assert_eq!(row.try_get::<i64>("Age").unwrap(), 20);
}

#[tokio::test]
async fn missing_row_is_not_found() {
    let s = seeded().await;
    let err = s
        .single()
        .read_row("users", &key!["nope"], &["Name"])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn insert_existing_key_is_unique_violation() {
    let s = seeded().await;
    let err = s.apply(vec![insert("u1", "dup", 1)]).await.unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn update_missing_key_is_not_found() {
    let s = store();
    let err = s
        .apply(vec![write(WriteOp::Update, "ghost", "g", 1)])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn insert_or_update_merges_and_replace_overwrites() {
    let s = seeded().await;
    s.apply(vec![
        Mutation::Write {
            op: WriteOp::InsertOrUpdate,
            table: "users".into(),
            columns: vec!["UserId".into(), "Age".into()],
            values: vec![Value::from("u1"), Value::from(21i64)],
        },
        Mutation::Write {
            op: WriteOp::Replace,
            table: "users".into(),
            columns: vec!["UserId".into(), "Age".into()],
            values: vec![Value::from("u2"), Value::from(19i64)],
        },
    ])
    .await
    .unwrap();

    let reader = s.single();
    let u1 = reader.read_row("users", &key!["u1"], &["Name", "Age"]).await.unwrap();
    assert_eq!(u1.try_get::<String>("Name").unwrap(), "ann");
    assert_eq!(u1.try_get::<i64>("Age").unwrap(), 21);

    let u2 = reader.read_row("users", &key!["u2"], &["Name"]).await.unwrap();
    assert_eq!(u2.get("Name"), Some(&Value::Null));
}

#[tokio::test]
async fn failing_batch_applies_nothing() {
    let s = seeded().await;
    let err = s
        .apply(vec![insert("u4", "dee", 30), insert("u1", "dup", 1)])
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    assert_eq!(s.row_count("users").unwrap(), 3);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let s = seeded().await;
    let del = Mutation::delete_keys("users", KeySet::single(key!["u1"]));
    s.apply(vec![del.clone()]).await.unwrap();
    s.apply(vec![del]).await.unwrap();
    assert_eq!(s.row_count("users").unwrap(), 2);

    s.apply(vec![Mutation::delete_keys("users", KeySet::all())])
        .await
        .unwrap();
    assert_eq!(s.row_count("users").unwrap(), 0);
}

#[tokio::test]
async fn commit_timestamps_increase() {
    let s = store();
    let a = s.apply(vec![insert("a", "a", 1)]).await.unwrap();
    let b = s.apply(vec![]).await.unwrap();
    assert!(b > a);
    assert_eq!(s.last_commit_timestamp(), Some(b));
}

// ==================== Reads ====================

#[tokio::test]
async fn read_key_set_in_key_order_skipping_missing() {
    let s = seeded().await;
    let keys = KeySet::keys([key!["u3"], key!["zz"], key!["u1"], key!["u3"]]);
    let rows: Vec<Row> = s
        .single()
        .read("users", &keys, &["Name"])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(names(&rows), ["ann", "cy"]);
}

#[tokio::test]
async fn select_filters_orders_and_limits() {
    let s = seeded().await;
    let reader = s.single();

    let rows = query(
        &reader,
        "SELECT * FROM users WHERE `Age`=@Age ORDER BY `Name` DESC",
        Params::new().with("Age", 20i64),
    )
    .await
    .unwrap();
    assert_eq!(names(&rows), ["cy", "ann"]);
    assert_eq!(rows[0].len(), 3);

    let rows = query(
        &reader,
        "SELECT `Name` FROM users ORDER BY `Age` ASC LIMIT 2",
        Params::new(),
    )
    .await
    .unwrap();
    // ties keep key order
    assert_eq!(names(&rows), ["bob", "ann"]);
    assert_eq!(rows[0].columns(), ["Name"]);
}

#[tokio::test]
async fn count_ignores_limit() {
    let s = seeded().await;
    let rows = query(
        &s.single(),
        "SELECT COUNT(*) AS count FROM users WHERE `Age`=@Age",
        Params::new().with("Age", 20i64),
    )
    .await
    .unwrap();
    assert_eq!(rows[0].try_get::<i64>("count").unwrap(), 2);
}

#[tokio::test]
async fn null_never_matches_a_filter() {
    let s = seeded().await;
    let rows = query(
        &s.single(),
        "SELECT * FROM users WHERE `Age`=@Age",
        Params::new().with("Age", Value::Null),
    )
    .await
    .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn invalid_statements_are_rejected() {
    let s = seeded().await;
    let reader = s.single();
    for (sql, params) in [
        ("SELECT * FROM nope", Params::new()),
        ("SELECT `Nope` FROM users", Params::new()),
        ("SELECT * FROM users WHERE `Age`=@Age", Params::new()),
        ("SELECT * FROM users@{FORCE_INDEX=Missing}", Params::new()),
        ("DELETE FROM users WHERE `UserId`=@id", Params::new().with("id", "u1")),
    ] {
        let err = query(&reader, sql, params).await.unwrap_err();
        assert!(matches!(err, OrmError::InvalidStatement(_)), "{sql}: {err:?}");
    }

    let rows = query(&reader, "SELECT * FROM users@{FORCE_INDEX=UsersByAge}", Params::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
}

// ==================== Transactions ====================

#[tokio::test]
async fn read_only_transaction_sees_a_frozen_snapshot() {
    let s = seeded().await;
    let snap = s.read_only_transaction();
    s.apply(vec![insert("u4", "dee", 40)]).await.unwrap();

    let frozen = query(&snap, "SELECT * FROM users", Params::new()).await.unwrap();
    let latest = query(&s.single(), "SELECT * FROM users", Params::new()).await.unwrap();
    assert_eq!(frozen.len(), 3);
    assert_eq!(latest.len(), 4);
}

#[tokio::test]
async fn transaction_dml_is_visible_inside_and_committed_on_ok() {
    let s = seeded().await;
    let (seen, _) = s
        .read_write_transaction(async |tx| {
            let n = tx
                .execute(&Statement::with_params(
                    "UPDATE users SET `Age`=@Age WHERE `UserId`=@pk_UserId",
                    Params::new().with("Age", 99i64).with("pk_UserId", "u1"),
                ))
                .await?;
            assert_eq!(n, 1);
            let row = tx.read_row("users", &key!["u1"], &["Age"]).await?;
            row.try_get::<i64>("Age")
        })
        .await
        .unwrap();
    assert_eq!(seen, 99);

    let row = s.single().read_row("users", &key!["u1"], &["Age"]).await.unwrap();
    assert_eq!(row.try_get::<i64>("Age").unwrap(), 99);
}

#[tokio::test]
async fn transaction_error_discards_writes() {
    let s = seeded().await;
    let err = s
        .read_write_transaction(async |tx| {
            tx.execute(&Statement::with_params(
                "DELETE FROM users WHERE `UserId`=@pk_UserId",
                Params::new().with("pk_UserId", "u1"),
            ))
            .await?;
            Err::<(), _>(OrmError::Other("changed my mind".into()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
    assert_eq!(s.row_count("users").unwrap(), 3);
}

#[tokio::test]
async fn dml_cannot_change_key_columns() {
    let s = seeded().await;
    let err = s
        .read_write_transaction(async |tx| {
            tx.execute(&Statement::with_params(
                "UPDATE users SET `UserId`=@new WHERE `UserId`=@old",
                Params::new().with("new", "x").with("old", "u1"),
            ))
            .await
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::InvalidStatement(_)));
}

#[tokio::test]
async fn conflicting_transaction_is_retried() {
    let s = seeded().await;
    let calls = AtomicUsize::new(0);

    let (_, _) = s
        .read_write_transaction(async |tx| {
            // The first attempt races a concurrent commit.
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                s.apply(vec![insert("u9", "zed", 1)]).await?;
            }
            tx.execute(&Statement::with_params(
                "DELETE FROM users WHERE `UserId`=@pk_UserId",
                Params::new().with("pk_UserId", "u2"),
            ))
            .await
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // both the concurrent insert and the retried delete landed
    assert_eq!(s.row_count("users").unwrap(), 3);
}

#[tokio::test]
async fn persistent_conflict_aborts() {
    let s = MemoryStore::with_config(MemoryStoreConfig::new().max_commit_attempts(3));
    s.create_table(TableDef::new("t").columns(["K"]).key(["K"]))
        .unwrap();
    let calls = AtomicUsize::new(0);

    let err = s
        .read_write_transaction(async |_tx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
            s.apply(vec![Mutation::Write {
                op: WriteOp::Insert,
                table: "t".into(),
                columns: vec!["K".into()],
                values: vec![Value::from(n)],
            }])
            .await
        })
        .await
        .unwrap_err();

    assert!(err.is_aborted());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn aborted_callback_is_retried() {
    let s = seeded().await;
    let calls = AtomicUsize::new(0);

    let (n, _) = s
        .read_write_transaction(async |_tx| {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(OrmError::Aborted("lock wait".into())),
                n => Ok(n),
            }
        })
        .await
        .unwrap();
    assert_eq!(n, 1);

    let err = s
        .read_write_transaction(async |_tx| Err::<(), _>(OrmError::Other("boom".into())))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Other(_)));
}
