mod common;

use common::{User, db, seeded_db, user};
use spanorm::{KeySet, Model, OrmError, Statement, key};

#[test]
fn derive_generates_table_metadata() {
    assert_eq!(User::TABLE, "users");
    assert_eq!(
        User::COLUMNS,
        ["UserId", "Name", "Age", "CreatedAt", "UpdatedAt"]
    );

    let u = user("u1", "ann", 18);
    let keys = u.primary_keys();
    assert_eq!(keys.columns().collect::<Vec<_>>(), ["UserId"]);
    assert_eq!(u.store_key(), key!["u1"]);
    assert_eq!(u.params().len(), 5);
}

#[tokio::test]
async fn insert_then_find_round_trips() {
    let db = db();
    let now = chrono::Utc::now();
    let mut alice = user("u1", "alice", 30);
    alice.created_at = Some(now);

    db.read_write_transaction(async |tx| tx.insert(&alice).await)
        .await
        .unwrap();

    let mut found = user("u1", "", 0);
    db.find(&mut found).await.unwrap();
    assert_eq!(found, alice);
}

#[tokio::test]
async fn update_changes_only_non_key_columns() {
    let db = seeded_db().await;
    db.read_write_transaction(async |tx| {
        let mut bob: User = tx.get(&key!["u2"]).await?;
        bob.age = 21;
        bob.name = "robert".into();
        tx.update(&bob).await
    })
    .await
    .unwrap();

    let bob: User = db.reader().get(&key!["u2"]).await.unwrap();
    assert_eq!(bob.user_id, "u2");
    assert_eq!(bob.name, "robert");
    assert_eq!(bob.age, 21);
}

#[tokio::test]
async fn delete_then_find_is_not_found() {
    let db = seeded_db().await;
    db.read_write_transaction(async |tx| tx.delete(&user("u1", "ann", 18)).await)
        .await
        .unwrap();

    let mut ann = user("u1", "", 0);
    let err = db.find(&mut ann).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(spanorm::is_not_found(&db.find(&mut ann).await));
}

#[tokio::test]
async fn writes_to_absent_rows_affect_nothing() {
    let db = seeded_db().await;
    let ghost = user("ghost", "g", 1);

    let err = db
        .read_write_transaction(async |tx| tx.update(&ghost).await)
        .await
        .unwrap_err();
    assert!(err.is_no_rows_affected());

    let err = db
        .read_write_transaction(async |tx| tx.delete(&ghost).await)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::NoRowsAffected {
            operation: "delete",
            ..
        }
    ));
}

#[tokio::test]
async fn dml_insert_of_existing_key_is_unique_violation() {
    let db = seeded_db().await;
    let err = db
        .read_write_transaction(async |tx| tx.insert(&user("u1", "again", 1)).await)
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn scan_reads_by_key_set() {
    let db = seeded_db().await;
    let some: Vec<User> = db
        .reader()
        .scan(&KeySet::keys([key!["u3"], key!["u1"], key!["nobody"]]))
        .await
        .unwrap();
    let ids: Vec<_> = some.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(ids, ["u1", "u3"]);

    let all: Vec<User> = db.reader().scan(&KeySet::all()).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn raw_dml_reports_affected_rows() {
    let db = seeded_db().await;
    let n = db
        .read_write_transaction(async |tx| {
            tx.execute(
                &Statement::new("UPDATE users SET `Name`=@name WHERE `Age`=@age")
                    .bind("name", "twenty")
                    .bind("age", 20i64),
            )
            .await
        })
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn commit_timestamps_are_reported_and_increase() {
    let db = db();
    let (_, first) = db
        .read_write_transaction_with_timestamp(async |tx| tx.insert(&user("a", "a", 1)).await)
        .await
        .unwrap();
    let (_, second) = db
        .read_write_transaction_with_timestamp(async |tx| tx.insert(&user("b", "b", 2)).await)
        .await
        .unwrap();
    assert!(second > first);
}

#[derive(Debug, Clone, PartialEq, Model)]
#[orm(table = "awkward")]
struct Awkward {
    #[orm(id, column = "Id")]
    id: i64,
    #[orm(column = "a-b")]
    dash: i64,
    #[orm(column = "a_b")]
    under: i64,
    #[orm(column = "pk_Id")]
    shadow: i64,
}

fn awkward_db() -> spanorm::Db<spanorm::MemoryStore> {
    let store = spanorm::MemoryStore::new();
    store
        .create_table(
            spanorm::TableDef::new(Awkward::TABLE)
                .columns(Awkward::COLUMNS.iter().copied())
                .key(["Id"]),
        )
        .unwrap();
    spanorm::Db::new(store)
}

#[tokio::test]
async fn columns_with_clashing_parameter_names_round_trip() {
    let db = awkward_db();
    let row = Awkward {
        id: 1,
        dash: 10,
        under: 20,
        shadow: 5,
    };
    db.read_write_transaction(async |tx| tx.insert(&row).await)
        .await
        .unwrap();

    let mut found = Awkward {
        id: 1,
        dash: 0,
        under: 0,
        shadow: 0,
    };
    db.find(&mut found).await.unwrap();
    assert_eq!(found, row);

    let hits = db
        .relation::<Awkward>()
        .filter_eq("a-b", 10i64)
        .filter_eq("a_b", 20i64)
        .all()
        .await
        .unwrap();
    assert_eq!(hits, [row.clone()]);

    let updated = Awkward {
        dash: 11,
        shadow: 6,
        ..row.clone()
    };
    db.read_write_transaction(async |tx| tx.update(&updated).await)
        .await
        .unwrap();
    let got: Awkward = db.reader().get(&key![1i64]).await.unwrap();
    assert_eq!(got, updated);
}
