//! Shared fixtures: a `users` table in a fresh `MemoryStore`.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use spanorm::{Db, MemoryStore, Model, TableDef};

#[derive(Debug, Clone, PartialEq, Model)]
#[orm(table = "users", rename_all = "PascalCase")]
pub struct User {
    #[orm(id)]
    pub user_id: String,
    pub name: String,
    pub age: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub fn user(id: &str, name: &str, age: i64) -> User {
    User {
        user_id: id.to_string(),
        name: name.to_string(),
        age,
        created_at: None,
        updated_at: None,
    }
}

pub fn users_table() -> TableDef {
    TableDef::new(User::TABLE)
        .columns(User::COLUMNS.iter().copied())
        .key(["UserId"])
        .index("UsersByAge")
}

pub fn memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .create_table(users_table())
        .expect("create users table");
    store
}

pub fn db() -> Db<MemoryStore> {
    Db::new(memory_store())
}

/// A db holding ann (18), bob (20) and cy (20).
pub async fn seeded_db() -> Db<MemoryStore> {
    let db = db();
    let m = db.mutator();
    m.insert(&user("u1", "ann", 18));
    m.insert(&user("u2", "bob", 20));
    m.insert(&user("u3", "cy", 20));
    m.apply().await.expect("seed users");
    db
}
