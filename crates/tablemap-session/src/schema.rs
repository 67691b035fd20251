//! Resolved table metadata for one model type.

use std::collections::{BTreeMap, HashMap, HashSet};

use heck::ToSnakeCase;
use tablemap_core::{
    Error, FieldRole, IndexKind, Result, Value, is_valid_identifier, is_valid_table_name,
};

use crate::model::{AfterQueryHook, BeforeQueryHook, DeriveHook, MappedField, Model, ModelDef};
use crate::relationship::Relationship;

/// One column's position inside a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMember {
    /// Column name.
    pub column: String,
    /// Position within a composite key; lower sorts first.
    pub priority: i32,
}

/// Index name to ordered member columns.
pub type IndexList = BTreeMap<String, Vec<IndexMember>>;

/// Immutable metadata for `M`, built once and shared through the registry.
pub struct Schema<M> {
    type_name: &'static str,
    table_name: String,
    fields: Vec<MappedField<M>>,
    by_column: HashMap<String, usize>,
    primary_key: Option<usize>,
    deleted_at: Option<usize>,
    unique_keys: IndexList,
    index_keys: IndexList,
    full_text_keys: IndexList,
    relationships: Vec<Relationship<M>>,
    before_query: Option<BeforeQueryHook>,
    after_query: Option<AfterQueryHook<M>>,
    derive_attrs: Option<DeriveHook<M>>,
}

impl<M> std::fmt::Debug for Schema<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .field(
                "relationships",
                &self.relationships.iter().map(Relationship::name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Table name for `M`: the override if any, else the snake-cased prefix
/// plus type name.
pub fn resolve_table_name<M: Model>(prefix: &str) -> String {
    M::table_name().unwrap_or_else(|| format!("{prefix}{}", M::type_name()).to_snake_case())
}

impl<M: Model> Schema<M> {
    /// Describe `M` and validate the result.
    pub fn build(prefix: &str) -> Result<Self> {
        Self::from_def(resolve_table_name::<M>(prefix), ModelDef::<M>::describe())
    }

    fn from_def(table_name: String, def: ModelDef<M>) -> Result<Self> {
        let type_name = M::type_name();
        if def.fields.is_empty() {
            return Err(Error::Schema(format!("model `{type_name}` maps no fields")));
        }
        if !is_valid_table_name(&table_name) {
            return Err(Error::Schema(format!(
                "model `{type_name}` has invalid table name `{table_name}`"
            )));
        }

        let mut by_column = HashMap::with_capacity(def.fields.len());
        let mut primary_key = None;
        let mut deleted_at = None;
        let mut unique_keys = IndexList::new();
        let mut index_keys = IndexList::new();
        let mut full_text_keys = IndexList::new();

        for (idx, field) in def.fields.iter().enumerate() {
            let desc = field.descriptor();
            let column = desc.column_name.as_str();
            if !is_valid_identifier(column) {
                return Err(Error::Schema(format!(
                    "model `{type_name}` has invalid column name `{column}`"
                )));
            }
            if by_column.insert(column.to_string(), idx).is_some() {
                return Err(Error::Schema(format!(
                    "model `{type_name}` maps column `{column}` more than once"
                )));
            }
            if desc.primary_key {
                if primary_key.is_some() {
                    return Err(Error::Schema(format!(
                        "model `{type_name}` declares more than one primary key"
                    )));
                }
                primary_key = Some(idx);
            }
            if desc.role == FieldRole::DeletedAt && deleted_at.is_none() {
                deleted_at = Some(idx);
            }
            for spec in &desc.indexes {
                let list = match spec.kind {
                    IndexKind::Unique => &mut unique_keys,
                    IndexKind::FullText => &mut full_text_keys,
                    IndexKind::Plain => &mut index_keys,
                };
                list.entry(spec.name.clone()).or_default().push(IndexMember {
                    column: column.to_string(),
                    priority: spec.priority,
                });
            }
        }

        for list in [&mut unique_keys, &mut index_keys, &mut full_text_keys] {
            for members in list.values_mut() {
                members.sort_by_key(|m| m.priority);
            }
        }

        let mut seen = HashSet::new();
        for rel in &def.relationships {
            if !seen.insert(rel.name()) {
                return Err(Error::Schema(format!(
                    "model `{type_name}` declares relationship `{}` more than once",
                    rel.name()
                )));
            }
        }

        Ok(Self {
            type_name,
            table_name,
            fields: def.fields,
            by_column,
            primary_key,
            deleted_at,
            unique_keys,
            index_keys,
            full_text_keys,
            relationships: def.relationships,
            before_query: def.before_query,
            after_query: def.after_query,
            derive_attrs: def.derive_attrs,
        })
    }
}

impl<M> Schema<M> {
    /// Short type name of the model.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolved table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All mapped fields in declaration order, embedded fields flattened.
    pub fn fields(&self) -> &[MappedField<M>] {
        &self.fields
    }

    /// Field mapped onto `column`.
    pub fn field_by_column(&self, column: &str) -> Option<&MappedField<M>> {
        self.by_column.get(column).map(|&idx| &self.fields[idx])
    }

    pub(crate) fn column_index(&self, column: &str) -> Option<usize> {
        self.by_column.get(column).copied()
    }

    /// Primary-key field, if declared.
    pub fn primary_key(&self) -> Option<&MappedField<M>> {
        self.primary_key.map(|idx| &self.fields[idx])
    }

    /// Deletion-timestamp field, if declared.
    pub fn deleted_at(&self) -> Option<&MappedField<M>> {
        self.deleted_at.map(|idx| &self.fields[idx])
    }

    /// Columns selected by default: every non-raw field.
    pub fn select_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.descriptor().is_selectable())
            .map(|f| f.column().to_string())
            .collect()
    }

    /// UNIQUE indexes.
    pub fn unique_keys(&self) -> &IndexList {
        &self.unique_keys
    }

    /// Plain indexes.
    pub fn index_keys(&self) -> &IndexList {
        &self.index_keys
    }

    /// FULLTEXT indexes.
    pub fn full_text_keys(&self) -> &IndexList {
        &self.full_text_keys
    }

    /// Declared relationships.
    pub fn relationships(&self) -> &[Relationship<M>] {
        &self.relationships
    }

    /// Relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship<M>> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    /// Hook run on the pending query before it is built.
    pub fn before_query_hook(&self) -> Option<BeforeQueryHook> {
        self.before_query
    }

    /// Hook run on each materialized record.
    pub fn after_query_hook(&self) -> Option<AfterQueryHook<M>> {
        self.after_query
    }

    /// Hook that fills derived attributes after scanning.
    pub fn derive_hook(&self) -> Option<DeriveHook<M>> {
        self.derive_attrs
    }

    /// Primary-key value of `model`, `None` without a primary key.
    pub fn primary_key_value(&self, model: &M) -> Option<Value> {
        self.primary_key()
            .and_then(|field| field.read(model).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Account, Post, User};

    #[derive(Default)]
    struct Empty;

    impl Model for Empty {
        fn describe(_def: &mut ModelDef<Self>) {}
    }

    #[derive(Default)]
    struct Dup {
        a: i64,
        b: i64,
    }

    impl Model for Dup {
        fn describe(def: &mut ModelDef<Self>) {
            def.field("a", |d| &d.a, |d| &mut d.a).column("x");
            def.field("b", |d| &d.b, |d| &mut d.b).column("x");
        }
    }

    #[derive(Default)]
    struct TwoKeys {
        a: i64,
        b: i64,
    }

    impl Model for TwoKeys {
        fn describe(def: &mut ModelDef<Self>) {
            def.field("a", |d| &d.a, |d| &mut d.a).primary_key();
            def.field("b", |d| &d.b, |d| &mut d.b).primary_key();
        }
    }

    #[derive(Default)]
    struct BadColumn {
        a: i64,
    }

    impl Model for BadColumn {
        fn describe(def: &mut ModelDef<Self>) {
            def.field("a", |d| &d.a, |d| &mut d.a).column("a; drop");
        }
    }

    #[derive(Default)]
    struct Renamed {
        id: i64,
    }

    impl Model for Renamed {
        fn describe(def: &mut ModelDef<Self>) {
            def.field("id", |d| &d.id, |d| &mut d.id).primary_key();
        }

        fn table_name() -> Option<String> {
            Some("legacy_things".to_string())
        }
    }

    #[test]
    fn test_table_name_convention() {
        assert_eq!(resolve_table_name::<User>(""), "user");
        assert_eq!(resolve_table_name::<User>("App"), "app_user");
        assert_eq!(resolve_table_name::<Renamed>("App"), "legacy_things");
    }

    #[test]
    fn test_build_user_schema() {
        let schema = Schema::<User>::build("").unwrap();
        assert_eq!(schema.table_name(), "user");
        assert_eq!(schema.primary_key().unwrap().column(), "id");
        assert_eq!(schema.deleted_at().unwrap().column(), "deleted_at");
        assert_eq!(
            schema.select_columns(),
            vec!["id", "name", "status", "deleted_at"]
        );
        assert!(schema.field_by_column("secret").is_some());
        assert!(schema.relationship("posts").is_some());
        assert!(schema.relationship("missing").is_none());
    }

    #[test]
    fn test_index_lists_sorted_by_priority() {
        let schema = Schema::<Post>::build("").unwrap();
        let members = &schema.index_keys()["idx_title_user"];
        let columns: Vec<_> = members.iter().map(|m| m.column.as_str()).collect();
        assert_eq!(columns, vec!["title", "user_id"]);
        assert!(schema.unique_keys().contains_key("uniq_slug"));
    }

    #[test]
    fn test_embedded_schema() {
        let schema = Schema::<Account>::build("").unwrap();
        assert!(schema.field_by_column("created_at").is_some());
        assert!(schema.deleted_at().is_none());
    }

    #[test]
    fn test_rejects_invalid_descriptions() {
        assert!(matches!(Schema::<Empty>::build(""), Err(Error::Schema(_))));
        assert!(matches!(Schema::<Dup>::build(""), Err(Error::Schema(_))));
        assert!(matches!(Schema::<TwoKeys>::build(""), Err(Error::Schema(_))));
        assert!(matches!(Schema::<BadColumn>::build(""), Err(Error::Schema(_))));
    }

    #[test]
    fn test_primary_key_value() {
        let schema = Schema::<User>::build("").unwrap();
        let user = User {
            id: 7,
            ..User::default()
        };
        assert_eq!(schema.primary_key_value(&user), Some(Value::Int(7)));
    }
}
