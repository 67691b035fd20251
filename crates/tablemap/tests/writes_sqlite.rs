mod common;

use common::{Post, PostMeta, User, setup};
use tablemap::prelude::*;

#[test]
fn sqlite_insert_then_find_round_trips() {
    let (db, _) = setup();

    let mut user = User {
        name: "kwin".to_string(),
        status: 1,
        ..User::default()
    };
    let id = db.insert(&mut user).expect("insert user");
    assert_eq!(user.id, id);

    let found: User = db.find(id).expect("find user");
    assert_eq!(found, user);
}

#[test]
fn sqlite_json_field_round_trips() {
    let (db, _) = setup();

    let mut post = Post {
        user_id: 1,
        title: "hello".to_string(),
        meta: PostMeta {
            tags: vec!["rust".to_string(), "orm".to_string()],
            pinned: true,
        },
        ..Post::default()
    };
    db.insert(&mut post).expect("insert post");

    let found: Post = db.find(post.id).expect("find post");
    assert_eq!(found.meta, post.meta);
    assert!(found.created_at > 1_600_000_000_000, "created_at is in milliseconds");
    assert_eq!(found.created_at, found.updated_at);
}

#[test]
fn sqlite_update_omits_zero_fields() {
    let (db, _) = setup();
    let mut user = User {
        name: "kwin".to_string(),
        status: 5,
        ..User::default()
    };
    db.insert(&mut user).expect("insert user");

    let patch = User {
        id: user.id,
        name: "kwin2".to_string(),
        ..User::default()
    };
    assert_eq!(db.update(&patch).expect("update"), 1);
    let found: User = db.find(user.id).expect("find user");
    assert_eq!(found.name, "kwin2");
    assert_eq!(found.status, 5);

    assert_eq!(db.update_all(&patch).expect("update all"), 1);
    let found: User = db.find(user.id).expect("find user");
    assert_eq!(found.status, 0);
}

#[test]
fn sqlite_update_keeps_created_at() {
    let (db, _) = setup();
    let mut post = Post {
        user_id: 1,
        title: "hello".to_string(),
        ..Post::default()
    };
    db.insert(&mut post).expect("insert post");
    let inserted: Post = db.find(post.id).expect("find post");

    db.execute("UPDATE posts SET created_at = 1 WHERE id = ?1", &[Value::Int(post.id)])
        .expect("backdate post");
    let edit = Post {
        id: post.id,
        title: "edited".to_string(),
        ..Post::default()
    };
    db.update(&edit).expect("update post");

    let found: Post = db.find(post.id).expect("find post");
    assert_eq!(found.title, "edited");
    assert_eq!(found.created_at, 1);
    assert!(found.updated_at >= inserted.updated_at);
}

#[test]
fn sqlite_soft_delete_then_force_delete() {
    let (db, _) = setup();
    let mut user = User {
        name: "bob".to_string(),
        ..User::default()
    };
    db.insert(&mut user).expect("insert user");

    db.delete(&user).expect("soft delete");
    assert!(db.find::<User>(user.id).expect_err("hidden").is_not_found());
    let hidden: User = db
        .query()
        .with_deleted()
        .find(user.id)
        .expect("still stored");
    assert!(hidden.deleted_at.is_some());

    db.force_delete(&user).expect("hard delete");
    let gone = db.query().with_deleted().find::<User>(user.id);
    assert!(gone.expect_err("row removed").is_not_found());
}

#[test]
fn sqlite_posts_without_soft_delete_are_removed() {
    let (db, _) = setup();
    let mut post = Post {
        user_id: 1,
        title: "bye".to_string(),
        ..Post::default()
    };
    db.insert(&mut post).expect("insert post");
    assert_eq!(db.delete(&post).expect("delete post"), 1);
    let count: i64 = db.table("posts").value("COUNT(*)").expect("count posts");
    assert_eq!(count, 0);
}
