//! In-memory tables and relationship traversal
//!
//! The store is the single source of truth for every relation: one-to-many
//! collections are never materialized, they are resolved by scanning the target
//! table for rows whose reference column points back at the owner.

use std::collections::{btree_map, BTreeMap};

use log::{debug, trace};
use serde::Serialize;

use crate::config::Config;
use crate::error::{RelfilterError, Result};
use crate::query::Query;
use crate::schema::{Entity, EntitySchema, RelationKind, RelationSchema, Registry};
use crate::value::{Key, Value};

/// One row of an entity, keyed by property name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    #[serde(skip)]
    entity: &'static str,
    #[serde(flatten)]
    values: BTreeMap<&'static str, Value>,
}

impl Row {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &'static str, value: impl Into<Value>) {
        self.values.insert(field, value.into());
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn key(&self, schema: &EntitySchema) -> Key {
        Key(schema
            .primary_key
            .iter()
            .map(|name| self.get(name).cloned().unwrap_or(Value::Null))
            .collect())
    }

    /// The row as a JSON object keyed by property name
    pub fn to_json(&self) -> serde_json::Value {
        // Keys are field names, so serialization cannot fail
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Table {
    rows: BTreeMap<Key, Row>,
    /// `None` once `i64::MAX` has been taken
    next_id: Option<i64>,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: Some(1),
        }
    }
}

/// Rows of every registered entity
#[derive(Debug, Clone)]
pub struct Store {
    registry: Registry,
    config: Config,
    tables: BTreeMap<&'static str, Table>,
}

impl Store {
    /// Create an empty store after validating the registry's relations
    pub fn new(registry: Registry) -> Result<Self> {
        Self::with_config(registry, Config::default())
    }

    pub fn with_config(registry: Registry, config: Config) -> Result<Self> {
        registry.validate()?;
        let tables = registry
            .entities()
            .map(|schema| (schema.name, Table::new()))
            .collect();
        Ok(Self {
            registry,
            config,
            tables,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self, entity: &str) -> Result<&'static EntitySchema> {
        self.registry.resolve(entity)
    }

    /// Start a read-only query over the current contents
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    /// Parse, validate and evaluate a JSON filter in one call
    pub fn find(&self, entity: &str, filter: &serde_json::Value) -> Result<Vec<&Row>> {
        self.query().find(entity, filter)
    }

    pub fn insert<E: Entity>(&mut self, entity: E) -> Result<Key> {
        self.insert_row(E::SCHEMA.name, entity.into_row())
    }

    /// Insert a row given as a JSON object keyed by property or column names
    pub fn insert_json(&mut self, entity: &str, json: &serde_json::Value) -> Result<Key> {
        let schema = self.schema(entity)?;
        let object = json.as_object().ok_or_else(|| {
            RelfilterError::invalid_filter_shape(format!(
                "row for '{}' must be an object, found {}",
                schema.name, json
            ))
        })?;
        let mut row = Row::new(schema.name);
        for (name, value) in object {
            let field = schema.require_field(name)?;
            row.set(field.name, Value::from_json(value)?);
        }
        self.insert_row(schema.name, row)
    }

    /// Validate and insert a row, returning its primary key.
    ///
    /// A null autoincrement field is assigned the next id of its table. The
    /// store is left untouched when any check fails.
    pub fn insert_row(&mut self, entity: &str, row: Row) -> Result<Key> {
        let schema = self.schema(entity)?;
        let table = self.table(schema)?;
        let mut next_id = table.next_id;

        let mut normalized = Row::new(schema.name);
        for (name, value) in row.iter() {
            let field = schema.require_field(name)?;
            normalized.set(field.name, value.clone());
        }

        for field in schema.fields {
            let mut value = normalized.get(field.name).cloned().unwrap_or(Value::Null);
            if field.autoincrement {
                match value {
                    Value::Null => {
                        let id = next_id.ok_or_else(|| {
                            RelfilterError::sequence_exhausted(schema.name, field.name)
                        })?;
                        value = Value::Int(id);
                        next_id = id.checked_add(1);
                    }
                    Value::Int(id) if next_id.is_some_and(|next| id >= next) => {
                        next_id = id.checked_add(1);
                    }
                    _ => {}
                }
            }
            if value.is_null() {
                if !field.nullable {
                    return Err(RelfilterError::missing_field(schema.name, field.name));
                }
            } else if !field.kind.accepts(&value) {
                return Err(RelfilterError::type_mismatch(
                    schema.name,
                    field.name,
                    field.kind.name(),
                    value.type_name(),
                ));
            }
            normalized.set(field.name, value);
        }

        let key = normalized.key(schema);
        if table.rows.contains_key(&key) {
            return Err(RelfilterError::DuplicateKey {
                entity: schema.name.to_string(),
                key: key.to_string(),
            });
        }

        for field in schema.fields.iter().filter(|f| f.unique) {
            let value = match normalized.get(field.name) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };
            if table.rows.values().any(|r| r.get(field.name) == Some(value)) {
                return Err(RelfilterError::UniqueViolation {
                    entity: schema.name.to_string(),
                    field: field.name.to_string(),
                    value: value.to_string(),
                });
            }
        }

        for relation in schema.relations {
            if let Some(target) = self.referenced_row_checked(schema, relation, &normalized)? {
                trace!(
                    "{} {} references {} row {}",
                    schema.name,
                    key,
                    relation.target,
                    target
                );
            }
        }

        debug!("insert {} {}", schema.name, key);
        let table = self
            .tables
            .get_mut(schema.name)
            .ok_or_else(|| RelfilterError::unknown_entity(schema.name))?;
        table.next_id = next_id;
        table.rows.insert(key.clone(), normalized);
        Ok(key)
    }

    /// All rows of an entity in primary key order
    pub fn all(&self, entity: &str) -> Result<impl Iterator<Item = &Row> + '_> {
        let schema = self.schema(entity)?;
        self.rows(schema)
    }

    pub fn get(&self, entity: &str, key: &Key) -> Result<Option<&Row>> {
        let schema = self.schema(entity)?;
        Ok(self.table(schema)?.rows.get(key))
    }

    pub fn len(&self, entity: &str) -> Result<usize> {
        let schema = self.schema(entity)?;
        Ok(self.table(schema)?.rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.rows.is_empty())
    }

    pub(crate) fn rows(
        &self,
        schema: &EntitySchema,
    ) -> Result<impl Iterator<Item = &Row> + '_> {
        Ok(self.table(schema)?.rows.values())
    }

    /// Rows on the far side of a one-to-many relation of `owner`.
    ///
    /// The iterator scans the target table lazily; nothing is cached.
    pub fn related_rows<'a>(
        &'a self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        owner: &Row,
    ) -> Result<RelatedRows<'a>> {
        let mapped_by = match relation.kind {
            RelationKind::OneToMany { mapped_by } => mapped_by,
            RelationKind::ManyToOne { .. } => {
                return Err(RelfilterError::invalid_filter_shape(format!(
                    "'{}.{}' is not a collection",
                    schema.name, relation.name
                )))
            }
        };
        let target = self.schema(relation.target)?;
        let column = match target.require_relation(mapped_by)?.kind {
            RelationKind::ManyToOne { column } => column,
            RelationKind::OneToMany { .. } => {
                return Err(RelfilterError::schema_mismatch(target.name, mapped_by))
            }
        };
        let owner_key = owner
            .key(schema)
            .as_single()
            .cloned()
            .ok_or_else(|| RelfilterError::schema_mismatch(schema.name, "<single-column primary key>"))?;
        trace!(
            "resolving {}.{} for {} via {}.{}",
            schema.name,
            relation.name,
            owner_key,
            target.name,
            column
        );
        Ok(RelatedRows {
            rows: self.table(target)?.rows.values(),
            column,
            owner: owner_key,
        })
    }

    /// The row a many-to-one relation of `row` points at, if the reference is set
    pub fn referenced_row(
        &self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        row: &Row,
    ) -> Result<Option<&Row>> {
        let column = match relation.kind {
            RelationKind::ManyToOne { column } => column,
            RelationKind::OneToMany { .. } => {
                return Err(RelfilterError::invalid_filter_shape(format!(
                    "'{}.{}' is a collection, not a reference",
                    schema.name, relation.name
                )))
            }
        };
        let value = match row.get(column) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(None),
        };
        let target = self.schema(relation.target)?;
        Ok(self.table(target)?.rows.get(&Key(vec![value])))
    }

    /// Like `referenced_row`, but a set reference with no target row is an error
    fn referenced_row_checked(
        &self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        row: &Row,
    ) -> Result<Option<Key>> {
        let column = match relation.kind {
            RelationKind::ManyToOne { column } => column,
            RelationKind::OneToMany { .. } => return Ok(None),
        };
        let value = match row.get(column) {
            Some(value) if !value.is_null() => value,
            _ => return Ok(None),
        };
        match self.referenced_row(schema, relation, row)? {
            Some(_) => Ok(Some(Key(vec![value.clone()]))),
            None => Err(RelfilterError::DanglingReference {
                entity: schema.name.to_string(),
                relation: relation.name.to_string(),
                target: relation.target.to_string(),
                key: value.to_string(),
            }),
        }
    }

    fn table(&self, schema: &EntitySchema) -> Result<&Table> {
        self.tables
            .get(schema.name)
            .ok_or_else(|| RelfilterError::unknown_entity(schema.name))
    }
}

/// Lazy iterator over the rows of a one-to-many collection
#[derive(Debug)]
pub struct RelatedRows<'a> {
    rows: btree_map::Values<'a, Key, Row>,
    column: &'static str,
    owner: Value,
}

impl<'a> Iterator for RelatedRows<'a> {
    type Item = &'a Row;

    fn next(&mut self) -> Option<&'a Row> {
        let column = self.column;
        let owner = &self.owner;
        self.rows.find(|row| row.get(column) == Some(owner))
    }
}
