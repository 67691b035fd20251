//! Batched eager loading.
//!
//! Every requested relationship is resolved with one secondary query over
//! the distinct keys of all owners, never one query per owner. Results are
//! grouped by key and handed to the relationship's attach function.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use heck::ToSnakeCase;
use tablemap_core::{Cardinality, Error, RelationKey, RelationshipInfo, Result, Value};

use crate::db::Db;
use crate::model::Model;
use crate::schema::Schema;

/// A declared relationship of `M`.
pub struct Relationship<M> {
    info: RelationshipInfo,
    loader: Box<dyn RelationLoader<M>>,
}

impl<M> Relationship<M> {
    pub(crate) fn new(info: RelationshipInfo, loader: Box<dyn RelationLoader<M>>) -> Self {
        Self { info, loader }
    }

    /// Relationship name, as used in `with(..)`.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Declared metadata, including any explicit keys.
    pub fn info(&self) -> &RelationshipInfo {
        &self.info
    }

    pub(crate) fn info_mut(&mut self) -> &mut RelationshipInfo {
        &mut self.info
    }

    /// Whether one record or a list is attached.
    pub fn cardinality(&self) -> Cardinality {
        self.info.cardinality()
    }
}

/// Loads one relationship for a batch of owners.
pub(crate) trait RelationLoader<M>: Send + Sync {
    fn load(
        &self,
        db: &Db,
        owner: &Schema<M>,
        info: &RelationshipInfo,
        owners: &mut [M],
        nested: &[String],
    ) -> Result<()>;
}

/// Loader for related model `R`; `attach` receives each owner's group.
pub(crate) struct BatchLoader<R, A> {
    attach: A,
    _marker: PhantomData<fn() -> R>,
}

impl<R, A> BatchLoader<R, A> {
    pub(crate) fn new(attach: A) -> Self {
        Self {
            attach,
            _marker: PhantomData,
        }
    }
}

/// `(owner column, related column)` used to match rows.
fn join_keys<M: Model, R: Model>(
    owner: &Schema<M>,
    related: &Schema<R>,
    info: &RelationshipInfo,
) -> Result<(String, String)> {
    let missing_pk = |type_name: &str| {
        Error::Schema(format!(
            "relationship `{}` needs a primary key on `{type_name}`",
            info.name
        ))
    };

    if info.kind.key_on_owner() {
        let local = match &info.local_key {
            Some(key) => key.clone(),
            None => format!("{}_id", R::type_name().to_snake_case()),
        };
        let remote = match &info.remote_key {
            Some(key) => key.clone(),
            None => related
                .primary_key()
                .ok_or_else(|| missing_pk(R::type_name()))?
                .column()
                .to_string(),
        };
        Ok((local, remote))
    } else {
        let local = match &info.local_key {
            Some(key) => key.clone(),
            None => owner
                .primary_key()
                .ok_or_else(|| missing_pk(M::type_name()))?
                .column()
                .to_string(),
        };
        let remote = match &info.remote_key {
            Some(key) => key.clone(),
            None => format!("{}_id", M::type_name().to_snake_case()),
        };
        Ok((local, remote))
    }
}

fn key_of<T>(schema: &Schema<T>, column: &str, model: &T) -> Result<Option<RelationKey>> {
    let field = schema.field_by_column(column).ok_or_else(|| {
        Error::Schema(format!(
            "`{}` has no column `{column}` to join on",
            schema.type_name()
        ))
    })?;
    let value = field.read(model).map_err(|source| Error::Encode {
        field: column.to_string(),
        source,
    })?;
    Ok(value.relation_key())
}

impl<M, R, A> RelationLoader<M> for BatchLoader<R, A>
where
    M: Model,
    R: Model + Clone,
    A: Fn(&mut M, &[R]) + Send + Sync,
{
    #[tracing::instrument(
        level = "debug",
        skip(self, db, owner, info, owners, nested),
        fields(model = M::type_name(), relationship = %info.name, owners = owners.len())
    )]
    fn load(
        &self,
        db: &Db,
        owner: &Schema<M>,
        info: &RelationshipInfo,
        owners: &mut [M],
        nested: &[String],
    ) -> Result<()> {
        let related = db.schema::<R>()?;
        let (local, remote) = join_keys(owner, &related, info)?;

        let local_field = owner.field_by_column(&local).ok_or_else(|| {
            Error::Schema(format!(
                "`{}` has no column `{local}` to join on",
                owner.type_name()
            ))
        })?;
        let mut owner_keys = Vec::with_capacity(owners.len());
        let mut seen = HashSet::new();
        let mut params: Vec<Value> = Vec::new();
        for model in owners.iter() {
            let value = local_field.read(model).map_err(|source| Error::Encode {
                field: local.clone(),
                source,
            })?;
            let key = value.relation_key();
            if let Some(key) = &key {
                if seen.insert(key.clone()) {
                    params.push(value);
                }
            }
            owner_keys.push(key);
        }

        if owners.len() == 1 {
            db.record_relation_load(M::type_name(), &info.name);
        }

        if params.is_empty() {
            tracing::debug!("No owner keys; skipping secondary query");
            for model in owners.iter_mut() {
                (self.attach)(model, &[]);
            }
            return Ok(());
        }

        tracing::debug!(keys = params.len(), "Loading relationship batch");
        let mut query = db
            .query()
            .where_in(format!("{}.{}", related.table_name(), remote), params);
        for path in nested {
            query = query.with(path.clone());
        }
        let records: Vec<R> = query.get()?;

        let mut groups: HashMap<RelationKey, Vec<R>> = HashMap::new();
        for record in records {
            if let Some(key) = key_of(&related, &remote, &record)? {
                groups.entry(key).or_default().push(record);
            }
        }

        for (model, key) in owners.iter_mut().zip(owner_keys) {
            let group = key
                .as_ref()
                .and_then(|k| groups.get(k))
                .map_or(&[][..], Vec::as_slice);
            (self.attach)(model, group);
        }
        Ok(())
    }
}

/// Requested relationships grouped by first path segment, with the
/// remaining segments passed down to the related type.
pub(crate) struct LoadPlan<'s, M> {
    steps: Vec<(&'s Relationship<M>, Vec<String>)>,
}

impl<'s, M> LoadPlan<'s, M> {
    /// Check every path against `schema` before any query runs.
    pub(crate) fn new(schema: &'s Schema<M>, paths: &[String]) -> Result<Self> {
        let mut steps: Vec<(&'s Relationship<M>, Vec<String>)> = Vec::new();
        for path in paths {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path.as_str(), None),
            };
            let relationship = schema.relationship(head).ok_or_else(|| {
                Error::Schema(format!(
                    "`{}` has no relationship named `{head}`",
                    schema.type_name()
                ))
            })?;

            let idx = match steps.iter().position(|(r, _)| r.name() == head) {
                Some(idx) => idx,
                None => {
                    steps.push((relationship, Vec::new()));
                    steps.len() - 1
                }
            };
            if let Some(rest) = rest {
                let nested = &mut steps[idx].1;
                if !nested.iter().any(|p| p == rest) {
                    nested.push(rest.to_string());
                }
            }
        }
        Ok(Self { steps })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Load every step in request order.
    pub(crate) fn load(&self, db: &Db, schema: &Schema<M>, owners: &mut [M]) -> Result<()> {
        if owners.is_empty() {
            return Ok(());
        }
        for (relationship, nested) in &self.steps {
            relationship
                .loader
                .load(db, schema, &relationship.info, owners, nested)?;
        }
        Ok(())
    }
}
