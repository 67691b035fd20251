#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tablemap::chrono::NaiveDateTime;
use tablemap::prelude::*;
use tablemap::{Dialect, Rows};
use tablemap_sqlite::SqliteConnection;

pub const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    status INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT
);
CREATE TABLE posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    meta TEXT,
    created_at INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    body TEXT NOT NULL
);
";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub status: i32,
    pub deleted_at: Option<NaiveDateTime>,
    pub posts: Vec<Post>,
}

impl Model for User {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("id", |u| &u.id, |u| &mut u.id)
            .primary_key()
            .auto_increment();
        def.field("name", |u| &u.name, |u| &mut u.name);
        def.field("status", |u| &u.status, |u| &mut u.status);
        def.field("deleted_at", |u| &u.deleted_at, |u| &mut u.deleted_at);
        def.has_many("posts", |u: &mut User| &mut u.posts);
    }

    fn table_name() -> Option<String> {
        Some("users".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMeta {
    pub tags: Vec<String>,
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub meta: PostMeta,
    pub created_at: i64,
    pub updated_at: i64,
    pub author: User,
    pub comments: Vec<Comment>,
}

fn limit_posts(query: &mut Query<'_>) -> std::result::Result<(), HookError> {
    match query.builder().get_limit() {
        Some(limit) if limit > 100 => Err(HookError::new("at most 100 posts per query")),
        _ => Ok(()),
    }
}

impl Model for Post {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("id", |p| &p.id, |p| &mut p.id)
            .primary_key()
            .auto_increment();
        def.field("user_id", |p| &p.user_id, |p| &mut p.user_id);
        def.field("title", |p| &p.title, |p| &mut p.title);
        def.json_field("meta", |p| &p.meta, |p| &mut p.meta);
        def.field("created_at", |p| &p.created_at, |p| &mut p.created_at);
        def.field("updated_at", |p| &p.updated_at, |p| &mut p.updated_at);
        def.belongs_to("author", |p: &mut Post| &mut p.author);
        def.has_many("comments", |p: &mut Post| &mut p.comments);
        def.before_query(limit_posts);
    }

    fn table_name() -> Option<String> {
        Some("posts".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub body: String,
}

fn reject_empty(comment: &mut Comment, _db: &Db) -> std::result::Result<(), HookError> {
    if comment.body.is_empty() {
        return Err(HookError::new("empty comment"));
    }
    Ok(())
}

impl Model for Comment {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("id", |c| &c.id, |c| &mut c.id)
            .primary_key()
            .auto_increment();
        def.field("post_id", |c| &c.post_id, |c| &mut c.post_id);
        def.field("body", |c| &c.body, |c| &mut c.body);
        def.after_query(reject_empty);
    }

    fn table_name() -> Option<String> {
        Some("comments".to_string())
    }
}

/// SQLite connection that counts row-returning statements.
pub struct Counting {
    inner: SqliteConnection,
    queries: Arc<AtomicUsize>,
}

impl Connection for Counting {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn dsn(&self) -> &str {
        self.inner.dsn()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows<'_>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.inner.execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.inner.insert(sql, params)
    }
}

/// Fresh in-memory database with the test tables, plus a query counter.
pub fn setup() -> (Db, Arc<AtomicUsize>) {
    let inner = SqliteConnection::open_memory().expect("open sqlite memory db");
    inner.execute_batch(SCHEMA).expect("create tables");
    let queries = Arc::new(AtomicUsize::new(0));
    let conn = Counting {
        inner,
        queries: Arc::clone(&queries),
    };
    (Db::new(conn), queries)
}

pub fn queries(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// The two users from the soft-delete example: kwin is live, bob is deleted.
pub fn seed_kwin_and_bob(db: &Db) {
    db.execute(
        "INSERT INTO users (id, name, status, deleted_at) VALUES (?1, ?2, ?3, NULL)",
        &[Value::Int(1), Value::from("kwin"), Value::Int(1)],
    )
    .expect("insert kwin");
    db.execute(
        "INSERT INTO users (id, name, status, deleted_at) VALUES (?1, ?2, ?3, ?4)",
        &[
            Value::Int(2),
            Value::from("bob"),
            Value::Int(0),
            Value::from("2024-01-01"),
        ],
    )
    .expect("insert bob");
}
