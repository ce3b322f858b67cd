//! Entity metadata and name resolution
//!
//! Schemas are plain `'static` data. The `Entity` derive emits one
//! [`EntitySchema`] per struct; hand-written schemas use the same types.

use heck::{ToSnakeCase, ToUpperCamelCase};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{RelfilterError, Result};
use crate::store::Row;
use crate::value::Value;

/// Storage type of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Int,
    Text,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Text => "text",
        }
    }

    /// Whether a non-null value can be stored in (or compared against) this kind
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_)) | (Self::Int, Value::Int(_)) | (Self::Text, Value::Text(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Property name used in filters (e.g. `fieldId`)
    pub name: &'static str,
    /// Column name (e.g. `field_id`), also accepted in filters
    pub column_name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    pub autoincrement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The reference is stored in `column` as the target's primary key value
    ManyToOne { column: &'static str },
    /// Inverse side of the target's `ManyToOne` relation named `mapped_by`
    OneToMany { mapped_by: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSchema {
    pub name: &'static str,
    pub target: &'static str,
    pub kind: RelationKind,
}

impl RelationSchema {
    pub fn is_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::OneToMany { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub table_name: &'static str,
    pub primary_key: &'static [&'static str],
    pub fields: &'static [FieldSchema],
    pub relations: &'static [RelationSchema],
}

/// A field or relation resolved by name
#[derive(Debug, Clone, Copy)]
pub enum Member<'s> {
    Field(&'s FieldSchema),
    Relation(&'s RelationSchema),
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.name == name || f.column_name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSchema> {
        self.relations
            .iter()
            .find(|r| r.name == name || r.name.to_snake_case() == name)
    }

    /// Resolve a filter key. Relations win over the field that stores them.
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        self.relation(name)
            .map(Member::Relation)
            .or_else(|| self.field(name).map(Member::Field))
    }

    pub fn require_field(&self, name: &str) -> Result<&FieldSchema> {
        self.field(name)
            .ok_or_else(|| RelfilterError::schema_mismatch(self.name, name))
    }

    pub fn require_relation(&self, name: &str) -> Result<&RelationSchema> {
        self.relation(name)
            .ok_or_else(|| RelfilterError::schema_mismatch(self.name, name))
    }

    /// The primary key field of a single-column key
    pub fn single_primary_key(&self) -> Option<&FieldSchema> {
        match self.primary_key {
            [name] => self.field(name),
            _ => None,
        }
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &FieldSchema> + '_ {
        self.primary_key.iter().filter_map(move |name| self.field(name))
    }
}

/// Implemented by row types, usually through `#[derive(Entity)]`
pub trait Entity {
    const SCHEMA: &'static EntitySchema;

    fn into_row(self) -> Row;
}

/// Marker for the inverse side of a one-to-many relation.
///
/// The collection is never stored; it is resolved from the store on demand.
pub struct HasMany<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> HasMany<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for HasMany<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for HasMany<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HasMany<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HasMany")
    }
}

impl<T> PartialEq for HasMany<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// The set of entity schemas a store and its queries operate on
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: Vec<&'static EntitySchema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Entity>(self) -> Self {
        self.with_schema(E::SCHEMA)
    }

    pub fn with_schema(mut self, schema: &'static EntitySchema) -> Self {
        if !self.entities.iter().any(|e| e.name == schema.name) {
            self.entities.push(schema);
        }
        self
    }

    pub fn entities(&self) -> impl Iterator<Item = &'static EntitySchema> + '_ {
        self.entities.iter().copied()
    }

    /// Look up an entity by name, table name, or a snake/Pascal case variant of either
    pub fn get(&self, name: &str) -> Option<&'static EntitySchema> {
        if let Some(schema) = self
            .entities
            .iter()
            .find(|e| e.name == name || e.table_name == name)
        {
            return Some(schema);
        }

        // Namespaced paths such as "bridge::EntityTwo"
        let short = match name.rfind("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        };
        let pascal = short.to_upper_camel_case();
        self.entities
            .iter()
            .find(|e| e.name == short || e.name == pascal || e.table_name == short.to_snake_case())
            .copied()
    }

    pub fn resolve(&self, name: &str) -> Result<&'static EntitySchema> {
        self.get(name)
            .ok_or_else(|| RelfilterError::unknown_entity(name))
    }

    /// Check that every relation points at a registered entity and that
    /// one-to-many relations are backed by a matching many-to-one.
    pub fn validate(&self) -> Result<()> {
        for schema in &self.entities {
            for key in schema.primary_key {
                schema.require_field(key)?;
            }
            for relation in schema.relations {
                let target = self.resolve(relation.target)?;
                match relation.kind {
                    RelationKind::ManyToOne { column } => {
                        let field = schema.require_field(column)?;
                        let key = target.single_primary_key().ok_or_else(|| {
                            RelfilterError::schema_mismatch(target.name, "<single-column primary key>")
                        })?;
                        if field.kind != key.kind {
                            return Err(RelfilterError::type_mismatch(
                                schema.name,
                                column,
                                key.kind.name(),
                                field.kind.name(),
                            ));
                        }
                    }
                    RelationKind::OneToMany { mapped_by } => {
                        let inverse = target.require_relation(mapped_by)?;
                        let points_back = matches!(inverse.kind, RelationKind::ManyToOne { .. })
                            && self.resolve(inverse.target)?.name == schema.name;
                        if !points_back {
                            log::warn!(
                                "{}.{} is mapped by {}.{}, which does not reference {}",
                                schema.name,
                                relation.name,
                                target.name,
                                mapped_by,
                                schema.name
                            );
                            return Err(RelfilterError::schema_mismatch(target.name, mapped_by));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
