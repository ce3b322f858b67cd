//! Schema checks run before any row is scanned
//!
//! Evaluation short-circuits, so an invalid branch might otherwise go
//! unnoticed on some stores. Validating the whole tree first makes errors
//! independent of the data.

use crate::error::{RelfilterError, Result};
use crate::filter::{FieldOp, Filter, Quantifier};
use crate::schema::{EntitySchema, FieldKind, RelationKind, Registry};

pub fn validate(
    registry: &Registry,
    schema: &EntitySchema,
    filter: &Filter,
    max_depth: usize,
) -> Result<()> {
    validate_at(registry, schema, filter, 0, max_depth)
}

fn validate_at(
    registry: &Registry,
    schema: &EntitySchema,
    filter: &Filter,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if depth > max_depth {
        return Err(RelfilterError::FilterTooDeep { max_depth });
    }
    match filter {
        Filter::And(children) | Filter::Or(children) => children
            .iter()
            .try_for_each(|child| validate_at(registry, schema, child, depth + 1, max_depth)),
        Filter::Not(inner) => validate_at(registry, schema, inner, depth + 1, max_depth),
        Filter::Field { field, op } => {
            let field = schema.require_field(field)?;
            if matches!(op, FieldOp::Like(_) | FieldOp::ILike(_)) && field.kind != FieldKind::Text {
                return Err(RelfilterError::type_mismatch(
                    schema.name,
                    field.name,
                    FieldKind::Text.name(),
                    field.kind.name(),
                ));
            }
            Ok(())
        }
        Filter::Relation {
            relation,
            quantifier,
            filter,
        } => {
            let relation = schema.require_relation(relation)?;
            let fits = match (quantifier, relation.kind) {
                (Quantifier::Is, RelationKind::ManyToOne { .. }) => true,
                (Quantifier::Is, RelationKind::OneToMany { .. }) => false,
                (_, RelationKind::OneToMany { .. }) => true,
                (_, RelationKind::ManyToOne { .. }) => false,
            };
            if !fits {
                return Err(RelfilterError::invalid_filter_shape(format!(
                    "{:?} cannot be applied to relation '{}.{}'",
                    quantifier, schema.name, relation.name
                )));
            }
            let target = registry.resolve(relation.target)?;
            validate_at(registry, target, filter, depth + 1, max_depth)
        }
    }
}
