mod common;

use common::{Comment, Post, User, seed_kwin_and_bob, setup};
use tablemap::prelude::*;
use tablemap::RowErrorKind;

#[test]
fn sqlite_plural_fetch_matches_only_kwin() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);

    let users: Vec<User> = db
        .query()
        .where_eq("name", "kwin")
        .get()
        .expect("fetch kwin");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 1);
    assert_eq!(users[0].name, "kwin");
    assert_eq!(users[0].status, 1);
    assert!(users[0].deleted_at.is_none());

    let with_deleted: Vec<User> = db
        .query()
        .with_deleted()
        .where_eq("name", "kwin")
        .get()
        .expect("fetch kwin with deleted");
    assert_eq!(with_deleted, users);
}

#[test]
fn sqlite_soft_deleted_rows_are_hidden_by_default() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);

    let live: Vec<User> = db.get().expect("fetch live users");
    assert_eq!(live.len(), 1);

    let all: Vec<User> = db
        .query()
        .with_deleted()
        .order_by("id", Order::Asc)
        .get()
        .expect("fetch all users");
    assert_eq!(all.len(), 2);
    let bob_deleted = all[1].deleted_at.expect("bob has a deletion time");
    assert_eq!(bob_deleted.to_string(), "2024-01-01 00:00:00");
}

#[test]
fn sqlite_empty_results_and_not_found() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);

    let none: Vec<User> = db
        .query()
        .where_eq("name", "nobody")
        .get()
        .expect("empty fetch is not an error");
    assert!(none.is_empty());

    let first = db.query().where_eq("name", "nobody").first::<User>();
    assert!(first.expect_err("first on empty").is_not_found());

    let bob = db.find::<User>(2_i64);
    assert!(bob.expect_err("bob is soft-deleted").is_not_found());

    let found: User = db.query().with_deleted().find(2_i64).expect("find bob");
    assert_eq!(found.name, "bob");
}

#[test]
fn sqlite_row_failures_are_accumulated() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);
    db.execute("INSERT INTO users (id, name, status) VALUES (3, NULL, 0)", &[])
        .expect("insert nameless user");
    db.execute("INSERT INTO users (id, name, status) VALUES (4, 'dora', 2)", &[])
        .expect("insert dora");

    let fetched = db
        .query()
        .order_by("id", Order::Asc)
        .fetch::<User>()
        .expect("fetch runs");
    let names: Vec<_> = fetched.records.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["kwin", "dora"]);
    assert_eq!(fetched.failures.len(), 1);
    assert_eq!(fetched.failures[0].index, 1);
    assert_eq!(fetched.failures[0].kind, RowErrorKind::Scan);
    assert_eq!(fetched.failures[0].column.as_deref(), Some("name"));

    let err = db
        .query()
        .order_by("id", Order::Asc)
        .get::<User>()
        .expect_err("get reports the row failure");
    assert!(matches!(err, Error::Row(_)));
}

#[test]
fn sqlite_pre_query_hook_aborts_before_io() {
    let (db, counter) = setup();
    let err = db
        .query()
        .limit(500)
        .get::<Post>()
        .expect_err("hook rejects large pages");
    assert!(matches!(err, Error::Hook(_)));
    assert_eq!(common::queries(&counter), 0);
}

#[test]
fn sqlite_post_row_hook_fails_only_that_row() {
    let (db, _) = setup();
    db.execute(
        "INSERT INTO comments (post_id, body) VALUES (1, 'first'), (1, ''), (1, 'third')",
        &[],
    )
    .expect("insert comments");

    let fetched = db.query().fetch::<Comment>().expect("fetch comments");
    assert_eq!(fetched.records.len(), 2);
    assert_eq!(fetched.failures.len(), 1);
    assert_eq!(fetched.failures[0].kind, RowErrorKind::Hook);
    assert!(fetched.failures[0].message.contains("empty comment"));
}

#[test]
fn sqlite_raw_query_skips_soft_delete_filter() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);

    let users: Vec<User> = db
        .raw(
            "SELECT id, name, status, deleted_at FROM users WHERE id = ?1",
            vec![Value::Int(2)],
        )
        .get()
        .expect("raw fetch");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "bob");
}

#[test]
fn sqlite_value_lookup() {
    let (db, _) = setup();
    seed_kwin_and_bob(&db);

    let count: i64 = db.table("users").value("COUNT(*)").expect("count users");
    assert_eq!(count, 2);

    let name: String = db
        .table("users")
        .where_eq("id", 1_i64)
        .value("name")
        .expect("kwin's name");
    assert_eq!(name, "kwin");

    let missing = db.table("users").where_eq("id", 9_i64).value::<String>("name");
    assert!(missing.expect_err("no such user").is_not_found());
}
