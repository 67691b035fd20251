//! Scripted connection and sample models for unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use tablemap_core::{
    Connection, Dialect, ExecutionError, HookError, IndexKind, Result, Row, Rows, Value,
};
use tablemap_query::Order;

use crate::config::DbConfig;
use crate::db::Db;
use crate::model::{Model, ModelDef};
use crate::query::Query;
use crate::registry::Registry;

type Responder = Box<dyn Fn(&str, &[Value]) -> Vec<Row> + Send + Sync>;

/// Connection that answers queries from a closure and records every call.
pub(crate) struct ScriptedConnection {
    responder: Responder,
    failure: Option<String>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedConnection {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Vec<Row> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every query returns no rows.
    pub(crate) fn empty() -> Self {
        Self::new(|_, _| Vec::new())
    }

    /// Every call fails with `message`.
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::empty()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((sql.to_string(), params.to_vec()));
        match &self.failure {
            Some(message) => Err(ExecutionError::new(message.clone()).with_sql(sql).into()),
            None => Ok(()),
        }
    }
}

impl Connection for ScriptedConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn dsn(&self) -> &str {
        "scripted"
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows<'_>> {
        self.record(sql, params)?;
        let rows = (self.responder)(sql, params);
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.record(sql, params)?;
        Ok(42)
    }
}

pub(crate) fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().map(|(c, v)| (*c, v.clone())))
}

/// Db over `conn` with a private schema cache.
pub(crate) fn db_for(conn: Arc<ScriptedConnection>) -> Db {
    Db::from_shared(conn, DbConfig::default()).with_registry(Arc::new(Registry::new()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct User {
    pub id: i64,
    pub name: String,
    pub status: i32,
    pub deleted_at: Option<NaiveDateTime>,
    pub secret: String,
    pub display: String,
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
        def.field("secret", |u| &u.secret, |u| &mut u.secret).raw();
        def.has_many("posts", |u: &mut User| &mut u.posts);
        def.derive_attrs(|u| u.display = format!("#{} {}", u.id, u.name));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Post {
    pub id: i64,
    pub user_id: i64,
    pub editor_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub author: User,
    pub editor: User,
}

fn post_before_query(query: &mut Query<'_>) -> std::result::Result<(), HookError> {
    if query.builder().get_limit().is_some_and(|limit| limit > 100) {
        return Err(HookError::new("posts are fetched at most 100 at a time"));
    }
    if query.builder().get_order().is_empty() {
        query.builder_mut().push_order("id", Order::Asc);
    }
    Ok(())
}

fn post_after_query(post: &mut Post, _db: &Db) -> std::result::Result<(), HookError> {
    if post.title == "forbidden" {
        return Err(HookError::new("forbidden title"));
    }
    Ok(())
}

impl Model for Post {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("id", |p| &p.id, |p| &mut p.id)
            .primary_key()
            .auto_increment();
        def.field("user_id", |p| &p.user_id, |p| &mut p.user_id)
            .index_with(IndexKind::Plain, "idx_title_user", 2);
        def.field("editor_id", |p| &p.editor_id, |p| &mut p.editor_id);
        def.field("title", |p| &p.title, |p| &mut p.title)
            .index_with(IndexKind::Plain, "idx_title_user", 1);
        def.field("slug", |p| &p.slug, |p| &mut p.slug).unique("uniq_slug");
        def.json_field("tags", |p| &p.tags, |p| &mut p.tags);
        def.belongs_to("author", |p: &mut Post| &mut p.author)
            .local_key("user_id");
        def.belongs_to("editor", |p: &mut Post| &mut p.editor)
            .local_key("editor_id");
        def.before_query(post_before_query);
        def.after_query(post_after_query);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Stamps {
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model for Stamps {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("created_at", |s| &s.created_at, |s| &mut s.created_at);
        def.field("updated_at", |s| &s.updated_at, |s| &mut s.updated_at);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Account {
    pub id: i64,
    pub email: String,
    pub stamps: Stamps,
}

impl Model for Account {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("id", |a| &a.id, |a| &mut a.id).primary_key();
        def.field("email", |a| &a.email, |a| &mut a.email);
        def.embed(|a| &a.stamps, |a| &mut a.stamps);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Keyless {
    pub name: String,
}

impl Model for Keyless {
    fn describe(def: &mut ModelDef<Self>) {
        def.field("name", |k| &k.name, |k| &mut k.name);
    }
}
