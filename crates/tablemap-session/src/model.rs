//! Model declaration API.
//!
//! A model describes itself once through [`Model::describe`]: every mapped
//! field is registered with a pair of accessors, embedded structs are
//! flattened, relationships and hooks are attached. The resulting
//! [`ModelDef`] is turned into an immutable [`crate::Schema`] by the registry.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tablemap_core::{
    ConversionError, DataKind, DefaultValue, FieldDescriptor, FieldRole, FieldValue, HookError,
    IndexKind, RelationshipInfo, RelationshipKind, RowError, Value,
};

use crate::db::Db;
use crate::query::Query;
use crate::relationship::{BatchLoader, Relationship};

/// Pre-query hook. May adjust the pending query or abort the call.
pub type BeforeQueryHook = for<'q, 'db> fn(&'q mut Query<'db>) -> Result<(), HookError>;

/// Post-row hook. An error fails only the row being materialized.
pub type AfterQueryHook<M> = fn(&mut M, &Db) -> Result<(), HookError>;

/// Derived-attribute hook, run after scanning and before the post-row hook.
pub type DeriveHook<M> = fn(&mut M);

/// A record type mapped onto a table.
///
/// ```ignore
/// impl Model for Post {
///     fn describe(def: &mut ModelDef<Self>) {
///         def.field("id", |p| &p.id, |p| &mut p.id).primary_key().auto_increment();
///         def.field("user_id", |p| &p.user_id, |p| &mut p.user_id).index("idx_user");
///         def.json_field("tags", |p| &p.tags, |p| &mut p.tags);
///         def.belongs_to("user", |p: &mut Post| &mut p.user);
///     }
/// }
/// ```
pub trait Model: Default + Send + Sync + Sized + 'static {
    /// Register fields, relationships and hooks.
    fn describe(def: &mut ModelDef<Self>);

    /// Table name override. Without one the table is the snake-cased
    /// configured prefix plus type name.
    fn table_name() -> Option<String> {
        None
    }

    /// Short type name used for naming conventions and diagnostics.
    fn type_name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// Last path segment of a type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Failure while writing a column value into a field.
#[derive(Debug)]
pub(crate) enum WriteError {
    Convert(ConversionError),
    Decode(String),
}

impl WriteError {
    pub(crate) fn into_row_error(self, index: usize, column: &str) -> RowError {
        match self {
            WriteError::Convert(e) => RowError::scan(index, column, e),
            WriteError::Decode(msg) => RowError::decode(index, column, msg),
        }
    }
}

/// Type-erased read/write access to one field of `M`.
pub(crate) trait FieldAccessor<M>: Send + Sync {
    fn read(&self, model: &M) -> Result<Value, serde_json::Error>;
    fn is_zero(&self, model: &M) -> bool;
    fn write(&self, model: &mut M, value: Value) -> Result<(), WriteError>;
}

struct ScalarField<T, G, S> {
    get: G,
    get_mut: S,
    _marker: PhantomData<fn() -> T>,
}

impl<M, T, G, S> FieldAccessor<M> for ScalarField<T, G, S>
where
    T: FieldValue,
    G: Fn(&M) -> &T + Send + Sync,
    S: Fn(&mut M) -> &mut T + Send + Sync,
{
    fn read(&self, model: &M) -> Result<Value, serde_json::Error> {
        Ok((self.get)(model).to_value())
    }

    fn is_zero(&self, model: &M) -> bool {
        (self.get)(model).is_zero()
    }

    fn write(&self, model: &mut M, value: Value) -> Result<(), WriteError> {
        *(self.get_mut)(model) = T::from_value(value).map_err(WriteError::Convert)?;
        Ok(())
    }
}

struct JsonField<T, G, S> {
    get: G,
    get_mut: S,
    _marker: PhantomData<fn() -> T>,
}

impl<M, T, G, S> FieldAccessor<M> for JsonField<T, G, S>
where
    T: Serialize + DeserializeOwned + Default + PartialEq + Send + Sync,
    G: Fn(&M) -> &T + Send + Sync,
    S: Fn(&mut M) -> &mut T + Send + Sync,
{
    fn read(&self, model: &M) -> Result<Value, serde_json::Error> {
        serde_json::to_string((self.get)(model)).map(Value::Text)
    }

    fn is_zero(&self, model: &M) -> bool {
        *(self.get)(model) == T::default()
    }

    fn write(&self, model: &mut M, value: Value) -> Result<(), WriteError> {
        let bytes = match value {
            Value::Null => return Ok(()),
            Value::Text(text) => text.into_bytes(),
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(WriteError::Convert(ConversionError::new(
                    "JSON text",
                    other.type_name(),
                )));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        *(self.get_mut)(model) =
            serde_json::from_slice(&bytes).map_err(|e| WriteError::Decode(e.to_string()))?;
        Ok(())
    }
}

/// Field of an embedded struct, reached through the owner's accessors.
struct Projected<E, G, S> {
    inner: Arc<dyn FieldAccessor<E>>,
    get: Arc<G>,
    get_mut: Arc<S>,
}

impl<M, E, G, S> FieldAccessor<M> for Projected<E, G, S>
where
    E: 'static,
    G: Fn(&M) -> &E + Send + Sync,
    S: Fn(&mut M) -> &mut E + Send + Sync,
{
    fn read(&self, model: &M) -> Result<Value, serde_json::Error> {
        self.inner.read((self.get)(model))
    }

    fn is_zero(&self, model: &M) -> bool {
        self.inner.is_zero((self.get)(model))
    }

    fn write(&self, model: &mut M, value: Value) -> Result<(), WriteError> {
        self.inner.write((self.get_mut)(model), value)
    }
}

/// A field descriptor bound to the accessors of one model type.
pub struct MappedField<M> {
    descriptor: FieldDescriptor,
    access: Arc<dyn FieldAccessor<M>>,
}

impl<M> Clone for MappedField<M> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            access: Arc::clone(&self.access),
        }
    }
}

impl<M> std::fmt::Debug for MappedField<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MappedField").field(&self.descriptor).finish()
    }
}

impl<M> MappedField<M> {
    /// Column metadata.
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// Column name.
    pub fn column(&self) -> &str {
        &self.descriptor.column_name
    }

    /// Current value of this field on `model`. JSON fields are encoded.
    pub fn read(&self, model: &M) -> Result<Value, serde_json::Error> {
        self.access.read(model)
    }

    /// Whether the field holds its zero value.
    pub fn is_zero(&self, model: &M) -> bool {
        self.access.is_zero(model)
    }

    pub(crate) fn write(&self, model: &mut M, value: Value) -> Result<(), WriteError> {
        self.access.write(model, value)
    }
}

/// Accumulates a model's declaration.
pub struct ModelDef<M> {
    pub(crate) fields: Vec<MappedField<M>>,
    pub(crate) relationships: Vec<Relationship<M>>,
    pub(crate) before_query: Option<BeforeQueryHook>,
    pub(crate) after_query: Option<AfterQueryHook<M>>,
    pub(crate) derive_attrs: Option<DeriveHook<M>>,
}

impl<M: Model> Default for ModelDef<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> ModelDef<M> {
    /// Create an empty definition.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            relationships: Vec::new(),
            before_query: None,
            after_query: None,
            derive_attrs: None,
        }
    }

    /// Collect the definition of `M`.
    pub fn describe() -> Self {
        let mut def = Self::new();
        M::describe(&mut def);
        def
    }

    fn push_field(
        &mut self,
        descriptor: FieldDescriptor,
        access: Arc<dyn FieldAccessor<M>>,
    ) -> FieldBuilder<'_> {
        self.fields.push(MappedField { descriptor, access });
        let last = self.fields.len() - 1;
        FieldBuilder {
            field: &mut self.fields[last].descriptor,
        }
    }

    /// Map a scalar field.
    pub fn field<T, G, S>(&mut self, name: &str, get: G, get_mut: S) -> FieldBuilder<'_>
    where
        T: FieldValue,
        G: Fn(&M) -> &T + Send + Sync + 'static,
        S: Fn(&mut M) -> &mut T + Send + Sync + 'static,
    {
        let access = ScalarField {
            get,
            get_mut,
            _marker: PhantomData,
        };
        self.push_field(FieldDescriptor::new(name, T::KIND, T::SIZE), Arc::new(access))
    }

    /// Map a field stored as JSON text.
    pub fn json_field<T, G, S>(&mut self, name: &str, get: G, get_mut: S) -> FieldBuilder<'_>
    where
        T: Serialize + DeserializeOwned + Default + PartialEq + Send + Sync + 'static,
        G: Fn(&M) -> &T + Send + Sync + 'static,
        S: Fn(&mut M) -> &mut T + Send + Sync + 'static,
    {
        let access = JsonField {
            get,
            get_mut,
            _marker: PhantomData,
        };
        self.push_field(
            FieldDescriptor::new(name, DataKind::Json, 0).json(true),
            Arc::new(access),
        )
    }

    /// Flatten the fields of an embedded model into this one.
    ///
    /// Only fields are taken from `E`; its relationships and hooks are ignored.
    pub fn embed<E, G, S>(&mut self, get: G, get_mut: S)
    where
        E: Model,
        G: Fn(&M) -> &E + Send + Sync + 'static,
        S: Fn(&mut M) -> &mut E + Send + Sync + 'static,
    {
        let inner = ModelDef::<E>::describe();
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);
        for field in inner.fields {
            let access = Projected {
                inner: field.access,
                get: Arc::clone(&get),
                get_mut: Arc::clone(&get_mut),
            };
            self.fields.push(MappedField {
                descriptor: field.descriptor,
                access: Arc::new(access),
            });
        }
    }

    fn push_relationship<R, A>(
        &mut self,
        name: &str,
        kind: RelationshipKind,
        attach: A,
    ) -> RelationshipBuilder<'_>
    where
        R: Model + Clone,
        A: Fn(&mut M, &[R]) + Send + Sync + 'static,
    {
        self.relationships.push(Relationship::new(
            RelationshipInfo::new(name, R::type_name(), kind),
            Box::new(BatchLoader::new(attach)),
        ));
        let last = self.relationships.len() - 1;
        RelationshipBuilder {
            info: self.relationships[last].info_mut(),
        }
    }

    /// One owner row, many related rows whose `<owner>_id` matches the
    /// owner's primary key.
    pub fn has_many<R, S>(&mut self, name: &str, set: S) -> RelationshipBuilder<'_>
    where
        R: Model + Clone,
        S: Fn(&mut M) -> &mut Vec<R> + Send + Sync + 'static,
    {
        self.push_relationship(name, RelationshipKind::OneToMany, move |owner, group: &[R]| {
            *set(owner) = group.to_vec();
        })
    }

    /// One owner row, at most one related row whose `<owner>_id` matches.
    pub fn has_one<R, S>(&mut self, name: &str, set: S) -> RelationshipBuilder<'_>
    where
        R: Model + Clone,
        S: Fn(&mut M) -> &mut R + Send + Sync + 'static,
    {
        self.push_relationship(name, RelationshipKind::OneToOne, move |owner, group: &[R]| {
            *set(owner) = group.first().cloned().unwrap_or_default();
        })
    }

    /// The owner's `<related>_id` column points at the related primary key.
    pub fn belongs_to<R, S>(&mut self, name: &str, set: S) -> RelationshipBuilder<'_>
    where
        R: Model + Clone,
        S: Fn(&mut M) -> &mut R + Send + Sync + 'static,
    {
        self.push_relationship(name, RelationshipKind::ManyToOne, move |owner, group: &[R]| {
            *set(owner) = group.first().cloned().unwrap_or_default();
        })
    }

    /// Install the pre-query hook.
    pub fn before_query(&mut self, hook: BeforeQueryHook) {
        self.before_query = Some(hook);
    }

    /// Install the post-row hook.
    pub fn after_query(&mut self, hook: AfterQueryHook<M>) {
        self.after_query = Some(hook);
    }

    /// Install the derived-attribute hook.
    pub fn derive_attrs(&mut self, hook: DeriveHook<M>) {
        self.derive_attrs = Some(hook);
    }
}

/// Chainable options for a freshly mapped field.
pub struct FieldBuilder<'a> {
    field: &'a mut FieldDescriptor,
}

impl FieldBuilder<'_> {
    /// Set the column name.
    pub fn column(self, name: &str) -> Self {
        self.field.column_name = name.to_string();
        self.field.role = FieldRole::for_column(name);
        self
    }

    /// Mark as primary key.
    pub fn primary_key(self) -> Self {
        self.field.primary_key = true;
        self
    }

    /// Mark as database-assigned.
    pub fn auto_increment(self) -> Self {
        self.field.auto_increment = true;
        self
    }

    /// Mark as unmanaged: not selected by default, never written.
    pub fn raw(self) -> Self {
        self.field.raw = true;
        self
    }

    /// Override the declared bit width.
    pub fn size(self, bits: u16) -> Self {
        self.field.size = bits;
        self
    }

    /// Value written in place of a zero value.
    pub fn default(self, value: impl Into<Value>) -> Self {
        self.field.default = DefaultValue::Value(value.into());
        self
    }

    /// Leave the column out of writes when the field is zero.
    pub fn default_null(self) -> Self {
        self.field.default = DefaultValue::Null;
        self
    }

    /// Join a UNIQUE index.
    pub fn unique(self, name: &str) -> Self {
        self.index_with(IndexKind::Unique, name, 0)
    }

    /// Join a plain index.
    pub fn index(self, name: &str) -> Self {
        self.index_with(IndexKind::Plain, name, 0)
    }

    /// Join a FULLTEXT index.
    pub fn full_text(self, name: &str) -> Self {
        self.index_with(IndexKind::FullText, name, 0)
    }

    /// Join an index at a given position of a composite key.
    pub fn index_with(self, kind: IndexKind, name: &str, priority: i32) -> Self {
        self.field.indexes.push(tablemap_core::IndexSpec {
            kind,
            name: name.to_string(),
            priority,
        });
        self
    }

    /// Override the convention role.
    pub fn role(self, role: FieldRole) -> Self {
        self.field.role = role;
        self
    }
}

/// Chainable options for a relationship.
pub struct RelationshipBuilder<'a> {
    info: &'a mut RelationshipInfo,
}

impl RelationshipBuilder<'_> {
    /// Column on the owner table.
    pub fn local_key(self, column: &str) -> Self {
        self.info.local_key = Some(column.to_string());
        self
    }

    /// Column on the related table.
    pub fn remote_key(self, column: &str) -> Self {
        self.info.remote_key = Some(column.to_string());
        self
    }
}
