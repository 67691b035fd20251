//! Column/value extraction for writes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tablemap_core::value::TIMESTAMP_TEXT_FORMAT;
use tablemap_core::{DataKind, DefaultValue, Error, FieldRole, Result, Value};

use crate::model::{MappedField, Model};
use crate::schema::Schema;

/// How a convention timestamp is written, chosen from the field's kind and
/// declared width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampRepr {
    /// `YYYY-MM-DD HH:MM:SS.mmm`
    Text,
    /// Seconds since the Unix epoch.
    UnixSeconds,
    /// Milliseconds since the Unix epoch.
    UnixMillis,
    /// Microseconds since the Unix epoch.
    UnixMicros,
}

impl TimestampRepr {
    /// Representation for a field, `None` when the combination has none.
    pub const fn for_field(kind: DataKind, size: u16) -> Option<Self> {
        match (kind, size) {
            (DataKind::Time, _) => Some(TimestampRepr::Text),
            (DataKind::Int | DataKind::Uint, 32) => Some(TimestampRepr::UnixSeconds),
            (DataKind::Int, 64) => Some(TimestampRepr::UnixMillis),
            (DataKind::Uint, 64) => Some(TimestampRepr::UnixMicros),
            _ => None,
        }
    }

    /// Render `now`.
    pub fn render(self, now: DateTime<Utc>) -> Value {
        match self {
            TimestampRepr::Text => Value::Text(now.format(TIMESTAMP_TEXT_FORMAT).to_string()),
            TimestampRepr::UnixSeconds => Value::Int(now.timestamp()),
            TimestampRepr::UnixMillis => Value::Int(now.timestamp_millis()),
            TimestampRepr::UnixMicros => Value::Int(now.timestamp_micros()),
        }
    }
}

/// Columns and values to write, iterated in column-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet(BTreeMap<String, Value>);

impl ChangeSet {
    /// Empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Whether `column` has a value.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Set `column`, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    /// Take `column` out of the set.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no column is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column/value pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Consume into `(column, value)` pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        self.0.into_iter()
    }
}

impl<M: Model> Schema<M> {
    /// Change-set for `model` using the current time for convention
    /// timestamps.
    pub fn record_values(&self, model: &M, omit_empty: bool, is_update: bool) -> Result<ChangeSet> {
        self.record_values_at(model, omit_empty, is_update, Utc::now())
    }

    /// Change-set for `model` with an explicit "now".
    pub fn record_values_at(
        &self,
        model: &M,
        omit_empty: bool,
        is_update: bool,
        now: DateTime<Utc>,
    ) -> Result<ChangeSet> {
        let mut set = ChangeSet::new();
        for field in self.fields() {
            if let Some(value) = self.record_value(field, model, omit_empty, is_update, now)? {
                set.insert(field.column(), value);
            }
        }
        Ok(set)
    }

    /// Value written for one field, `None` when the field is left out.
    pub fn record_value(
        &self,
        field: &MappedField<M>,
        model: &M,
        omit_empty: bool,
        is_update: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Value>> {
        let desc = field.descriptor();
        if desc.raw || desc.auto_increment {
            return Ok(None);
        }

        if desc.role.is_write_timestamp() {
            if is_update && desc.role == FieldRole::CreatedAt {
                return Ok(None);
            }
            if let Some(repr) = TimestampRepr::for_field(desc.kind, desc.size) {
                return Ok(Some(repr.render(now)));
            }
        }

        if field.is_zero(model) {
            if omit_empty {
                return Ok(None);
            }
            match &desc.default {
                DefaultValue::Null => return Ok(None),
                DefaultValue::Value(value) => return Ok(Some(value.clone())),
                DefaultValue::Unset => {}
            }
        }

        field.read(model).map(Some).map_err(|source| Error::Encode {
            field: desc.column_name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelDef;
    use crate::test_support::{Account, Post, User};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(678)
    }

    #[derive(Debug, Default)]
    struct Stamped {
        id: i64,
        title: String,
        views: i32,
        note: String,
        created_at: chrono::NaiveDateTime,
        updated_at: u32,
        touched_at: u64,
    }

    impl Model for Stamped {
        fn describe(def: &mut ModelDef<Self>) {
            def.field("id", |m| &m.id, |m| &mut m.id).primary_key().auto_increment();
            def.field("title", |m| &m.title, |m| &mut m.title).default("untitled");
            def.field("views", |m| &m.views, |m| &mut m.views);
            def.field("note", |m| &m.note, |m| &mut m.note).default_null();
            def.field("created_at", |m| &m.created_at, |m| &mut m.created_at);
            def.field("updated_at", |m| &m.updated_at, |m| &mut m.updated_at);
            def.field("touched_at", |m| &m.touched_at, |m| &mut m.touched_at)
                .role(FieldRole::UpdatedAt);
        }
    }

    #[test]
    fn test_timestamp_repr_table() {
        assert_eq!(TimestampRepr::for_field(DataKind::Time, 0), Some(TimestampRepr::Text));
        assert_eq!(TimestampRepr::for_field(DataKind::Int, 32), Some(TimestampRepr::UnixSeconds));
        assert_eq!(TimestampRepr::for_field(DataKind::Uint, 32), Some(TimestampRepr::UnixSeconds));
        assert_eq!(TimestampRepr::for_field(DataKind::Int, 64), Some(TimestampRepr::UnixMillis));
        assert_eq!(TimestampRepr::for_field(DataKind::Uint, 64), Some(TimestampRepr::UnixMicros));
        assert_eq!(TimestampRepr::for_field(DataKind::Int, 16), None);
        assert_eq!(TimestampRepr::for_field(DataKind::String, 0), None);
    }

    #[test]
    fn test_timestamp_render() {
        let now = fixed_now();
        assert_eq!(
            TimestampRepr::Text.render(now),
            Value::from("2024-01-02 03:04:05.678")
        );
        assert_eq!(TimestampRepr::UnixSeconds.render(now), Value::Int(1_704_164_645));
        assert_eq!(TimestampRepr::UnixMillis.render(now), Value::Int(1_704_164_645_678));
        assert_eq!(
            TimestampRepr::UnixMicros.render(now),
            Value::Int(1_704_164_645_678_000)
        );
    }

    #[test]
    fn test_insert_change_set() {
        let schema = Schema::<Stamped>::build("").unwrap();
        let set = schema
            .record_values_at(&Stamped::default(), false, false, fixed_now())
            .unwrap();

        assert!(!set.contains("id"));
        assert_eq!(set.get("title"), Some(&Value::from("untitled")));
        assert_eq!(set.get("views"), Some(&Value::Int(0)));
        assert!(!set.contains("note"));
        assert_eq!(set.get("created_at"), Some(&Value::from("2024-01-02 03:04:05.678")));
        assert_eq!(set.get("updated_at"), Some(&Value::Int(1_704_164_645)));
        assert_eq!(set.get("touched_at"), Some(&Value::Int(1_704_164_645_678_000)));
    }

    #[test]
    fn test_update_change_set_omits_created_at_and_empty() {
        let schema = Schema::<Stamped>::build("").unwrap();
        let model = Stamped {
            id: 4,
            views: 3,
            ..Stamped::default()
        };
        let set = schema
            .record_values_at(&model, true, true, fixed_now())
            .unwrap();

        let columns: Vec<_> = set.columns().collect();
        assert_eq!(columns, vec!["touched_at", "updated_at", "views"]);
    }

    #[test]
    fn test_raw_fields_never_written() {
        let schema = Schema::<User>::build("").unwrap();
        let user = User {
            name: "kwin".to_string(),
            secret: "hidden".to_string(),
            ..User::default()
        };
        let set = schema.record_values(&user, false, false).unwrap();
        assert!(!set.contains("secret"));
        assert!(!set.contains("id"));
        assert_eq!(set.get("name"), Some(&Value::from("kwin")));
    }

    #[test]
    fn test_json_field_is_encoded() {
        let schema = Schema::<Post>::build("").unwrap();
        let post = Post {
            tags: vec!["rust".to_string()],
            ..Post::default()
        };
        let set = schema.record_values(&post, true, false).unwrap();
        assert_eq!(set.get("tags"), Some(&Value::from(r#"["rust"]"#)));
    }

    #[test]
    fn test_embedded_int64_timestamps_are_millis() {
        let schema = Schema::<Account>::build("").unwrap();
        let set = schema
            .record_values_at(&Account::default(), false, false, fixed_now())
            .unwrap();
        assert_eq!(set.get("created_at"), Some(&Value::Int(1_704_164_645_678)));
        assert_eq!(set.get("updated_at"), Some(&Value::Int(1_704_164_645_678)));
    }
}
