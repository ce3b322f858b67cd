//! Mapping-form filters (`serde_json::Value`) to [`Filter`] trees
//!
//! Keys of one object are conjoined, so key order never matters. Relation keys
//! are accepted at any position: at the top level, inside `$and`/`$or`
//! arrays, and under `$not`.

use serde_json::{Map, Value as Json};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{RelfilterError, Result};
use crate::filter::{not, FieldOp, Filter, Quantifier};
use crate::schema::{EntitySchema, Member, RelationKind, RelationSchema, Registry};
use crate::value::Value;

/// Operators that combine whole filters
pub const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$not"];

/// Operators applied to a collection relation
pub const QUANTIFIERS: &[&str] = &["$some", "$none", "$every"];

/// Operators applied to a single field
pub const FIELD_OPERATORS: &[&str] = &[
    "$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$nin", "$like", "$ilike",
];

pub fn is_known_operator(key: &str) -> bool {
    LOGICAL_OPERATORS.contains(&key) || QUANTIFIERS.contains(&key) || FIELD_OPERATORS.contains(&key)
}

pub struct FilterParser<'r> {
    registry: &'r Registry,
    max_depth: usize,
}

impl<'r> FilterParser<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a filter rooted at `entity`
    pub fn parse(&self, entity: &str, json: &Json) -> Result<Filter> {
        let schema = self.registry.resolve(entity)?;
        self.parse_filter(schema, json, 0)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(RelfilterError::FilterTooDeep {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn parse_filter(&self, schema: &EntitySchema, json: &Json, depth: usize) -> Result<Filter> {
        self.check_depth(depth)?;
        let object = json.as_object().ok_or_else(|| {
            RelfilterError::invalid_filter_shape(format!(
                "filter on '{}' must be an object, found {}",
                schema.name, json
            ))
        })?;
        let parts = object
            .iter()
            .map(|(key, value)| self.parse_entry(schema, key, value, depth))
            .collect::<Result<Vec<_>>>()?;
        Ok(Filter::all(parts))
    }

    fn parse_entry(
        &self,
        schema: &EntitySchema,
        key: &str,
        value: &Json,
        depth: usize,
    ) -> Result<Filter> {
        match key {
            "$and" => Ok(Filter::And(self.parse_list(schema, key, value, depth + 1)?)),
            "$or" => Ok(Filter::Or(self.parse_list(schema, key, value, depth + 1)?)),
            "$not" => Ok(not(self.parse_filter(schema, value, depth + 1)?)),
            operator if operator.starts_with('$') => Err(misplaced_operator(operator, schema.name)),
            name => match schema.member(name) {
                None => Err(RelfilterError::schema_mismatch(schema.name, name)),
                Some(Member::Field(field)) => self.parse_field(schema, field.name, value, depth + 1),
                Some(Member::Relation(relation)) => match relation.kind {
                    RelationKind::ManyToOne { column } => {
                        self.parse_reference(schema, relation, column, value, depth + 1)
                    }
                    RelationKind::OneToMany { .. } => {
                        self.parse_collection(relation, value, depth + 1)
                    }
                },
            },
        }
    }

    fn parse_list(
        &self,
        schema: &EntitySchema,
        operator: &str,
        value: &Json,
        depth: usize,
    ) -> Result<Vec<Filter>> {
        let items = value.as_array().ok_or_else(|| {
            RelfilterError::invalid_filter_shape(format!(
                "{} expects an array of filters, found {}",
                operator, value
            ))
        })?;
        items
            .iter()
            .map(|item| self.parse_filter(schema, item, depth))
            .collect()
    }

    /// Condition on a scalar field: a literal, a list, or an operator object
    fn parse_field(
        &self,
        schema: &EntitySchema,
        field: &'static str,
        value: &Json,
        depth: usize,
    ) -> Result<Filter> {
        self.check_depth(depth)?;
        match value {
            Json::Object(ops) => {
                let parts = ops
                    .iter()
                    .map(|(op, operand)| self.parse_field_op(schema, field, op, operand, depth))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Filter::all(parts))
            }
            Json::Array(_) => Ok(Filter::field(field, FieldOp::In(scalar_list("$in", value)?))),
            scalar => Ok(Filter::field(field, FieldOp::Eq(Value::from_json(scalar)?))),
        }
    }

    fn parse_field_op(
        &self,
        schema: &EntitySchema,
        field: &'static str,
        op: &str,
        operand: &Json,
        depth: usize,
    ) -> Result<Filter> {
        let op = match op {
            "$eq" => FieldOp::Eq(scalar(op, operand)?),
            "$ne" => FieldOp::Ne(scalar(op, operand)?),
            "$gt" => FieldOp::Gt(scalar(op, operand)?),
            "$gte" => FieldOp::Gte(scalar(op, operand)?),
            "$lt" => FieldOp::Lt(scalar(op, operand)?),
            "$lte" => FieldOp::Lte(scalar(op, operand)?),
            "$in" => FieldOp::In(scalar_list(op, operand)?),
            "$nin" => FieldOp::NotIn(scalar_list(op, operand)?),
            "$like" => FieldOp::Like(pattern(op, operand)?),
            "$ilike" => FieldOp::ILike(pattern(op, operand)?),
            "$not" => return Ok(not(self.parse_field(schema, field, operand, depth + 1)?)),
            operator if operator.starts_with('$') => {
                return Err(if is_known_operator(operator) {
                    RelfilterError::invalid_filter_shape(format!(
                        "{} cannot be applied to field '{}.{}'",
                        operator, schema.name, field
                    ))
                } else {
                    RelfilterError::unknown_operator(operator)
                })
            }
            nested => {
                return Err(RelfilterError::schema_mismatch(
                    schema.name,
                    format!("{}.{}", field, nested),
                ))
            }
        };
        Ok(Filter::field(field, op))
    }

    /// Many-to-one: compare the stored key, or filter the referenced row
    fn parse_reference(
        &self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        column: &'static str,
        value: &Json,
        depth: usize,
    ) -> Result<Filter> {
        match value {
            Json::Object(object) if is_field_op_object(object) => {
                self.parse_field(schema, column, value, depth)
            }
            Json::Object(_) => {
                let target = self.registry.resolve(relation.target)?;
                Ok(Filter::is(relation.name, self.parse_filter(target, value, depth)?))
            }
            _ => self.parse_field(schema, column, value, depth),
        }
    }

    /// One-to-many: `$some` / `$none` / `$every`, or an implicit `$some`.
    ///
    /// `$not` next to (or wrapping) quantifiers negates the collection filter
    /// it holds, so `{books: {$not: {$some: F}}}` reads as `{books: {$none: F}}`.
    fn parse_collection(
        &self,
        relation: &RelationSchema,
        value: &Json,
        depth: usize,
    ) -> Result<Filter> {
        self.check_depth(depth)?;
        let target = self.registry.resolve(relation.target)?;
        let object = value.as_object().ok_or_else(|| {
            RelfilterError::invalid_filter_shape(format!(
                "collection '{}' expects an object with $some, $none or $every, found {}",
                relation.name, value
            ))
        })?;

        if !is_collection_op_object(object) {
            return Ok(Filter::some(relation.name, self.parse_filter(target, value, depth)?));
        }

        let parts = object
            .iter()
            .map(|(key, operand)| -> Result<Filter> {
                let quantifier = match key.as_str() {
                    "$some" => Quantifier::Some,
                    "$none" => Quantifier::None,
                    "$every" => Quantifier::Every,
                    "$not" => {
                        return Ok(not(self.parse_collection(relation, operand, depth + 1)?));
                    }
                    operator if operator.starts_with('$') && !is_known_operator(operator) => {
                        return Err(RelfilterError::unknown_operator(operator));
                    }
                    other => {
                        return Err(RelfilterError::invalid_filter_shape(format!(
                            "'{}' cannot be mixed with quantifiers on collection '{}'",
                            other, relation.name
                        )));
                    }
                };
                if !operand.is_object() {
                    return Err(RelfilterError::invalid_filter_shape(format!(
                        "{} on '{}' expects a filter object, found {}",
                        key, relation.name, operand
                    )));
                }
                let filter = self.parse_filter(target, operand, depth + 1)?;
                Ok(Filter::relation(relation.name, quantifier, filter))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Filter::all(parts))
    }
}

fn is_field_op_object(object: &Map<String, Json>) -> bool {
    !object.is_empty() && object.keys().all(|k| FIELD_OPERATORS.contains(&k.as_str()))
}

/// Quantifier keys, possibly under one or more `$not`
fn is_collection_op_object(object: &Map<String, Json>) -> bool {
    object.iter().any(|(key, operand)| match key.as_str() {
        "$not" => operand.as_object().is_some_and(is_collection_op_object),
        key => QUANTIFIERS.contains(&key),
    })
}

fn misplaced_operator(operator: &str, entity: &str) -> RelfilterError {
    if is_known_operator(operator) {
        RelfilterError::invalid_filter_shape(format!(
            "{} must be applied to a field or relation of '{}'",
            operator, entity
        ))
    } else {
        RelfilterError::unknown_operator(operator)
    }
}

fn scalar(operator: &str, operand: &Json) -> Result<Value> {
    Value::from_json(operand).map_err(|_| {
        RelfilterError::invalid_filter_shape(format!(
            "{} expects a scalar, found {}",
            operator, operand
        ))
    })
}

fn scalar_list(operator: &str, operand: &Json) -> Result<Vec<Value>> {
    let items = operand.as_array().ok_or_else(|| {
        RelfilterError::invalid_filter_shape(format!(
            "{} expects an array, found {}",
            operator, operand
        ))
    })?;
    items.iter().map(|item| scalar(operator, item)).collect()
}

fn pattern(operator: &str, operand: &Json) -> Result<String> {
    operand.as_str().map(str::to_string).ok_or_else(|| {
        RelfilterError::invalid_filter_shape(format!(
            "{} expects a string pattern, found {}",
            operator, operand
        ))
    })
}
