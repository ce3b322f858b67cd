//! Filter tree
//!
//! A closed tree of boolean combinators, field predicates and relationship
//! quantifiers. Every evaluator over it is an exhaustive `match`, so adding an
//! operator is a compile-time checked change.

use serde_json::{json, Map};
use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// True iff every child is true; empty is true
    And(Vec<Filter>),
    /// True iff some child is true; empty is false
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Predicate on a scalar field (or on the key stored by a reference)
    Field { field: String, op: FieldOp },
    /// Quantified condition over the rows reached through a relation
    Relation {
        relation: String,
        quantifier: Quantifier,
        filter: Box<Filter>,
    },
}

/// Leaf predicate operators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Like(String),
    ILike(String),
}

impl FieldOp {
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Eq(_) => "$eq",
            Self::Ne(_) => "$ne",
            Self::Gt(_) => "$gt",
            Self::Gte(_) => "$gte",
            Self::Lt(_) => "$lt",
            Self::Lte(_) => "$lte",
            Self::In(_) => "$in",
            Self::NotIn(_) => "$nin",
            Self::Like(_) => "$like",
            Self::ILike(_) => "$ilike",
        }
    }

    /// Scalar operands, for type checking against the field kind
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Self::Eq(v) | Self::Ne(v) | Self::Gt(v) | Self::Gte(v) | Self::Lt(v) | Self::Lte(v) => {
                vec![v]
            }
            Self::In(values) | Self::NotIn(values) => values.iter().collect(),
            Self::Like(_) | Self::ILike(_) => Vec::new(),
        }
    }

    fn operand_json(&self) -> serde_json::Value {
        match self {
            Self::Eq(v) | Self::Ne(v) | Self::Gt(v) | Self::Gte(v) | Self::Lt(v) | Self::Lte(v) => {
                v.to_json()
            }
            Self::In(values) | Self::NotIn(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Self::Like(pattern) | Self::ILike(pattern) => json!(pattern),
        }
    }
}

/// How the rows reached through a relation are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// At least one related row matches (`$some`)
    Some,
    /// No related row matches (`$none`)
    None,
    /// Every related row matches (`$every`)
    Every,
    /// The referenced row of a many-to-one relation exists and matches
    Is,
}

impl Quantifier {
    pub fn operator(self) -> Option<&'static str> {
        match self {
            Self::Some => Some("$some"),
            Self::None => Some("$none"),
            Self::Every => Some("$every"),
            Self::Is => Option::None,
        }
    }
}

impl Filter {
    pub fn field(field: impl Into<String>, op: FieldOp) -> Self {
        Self::Field {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, FieldOp::Eq(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(field, FieldOp::Ne(value.into()))
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::field(field, FieldOp::Like(pattern.into()))
    }

    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::field(field, FieldOp::ILike(pattern.into()))
    }

    pub fn relation(relation: impl Into<String>, quantifier: Quantifier, filter: Filter) -> Self {
        Self::Relation {
            relation: relation.into(),
            quantifier,
            filter: Box::new(filter),
        }
    }

    pub fn some(relation: impl Into<String>, filter: Filter) -> Self {
        Self::relation(relation, Quantifier::Some, filter)
    }

    pub fn none(relation: impl Into<String>, filter: Filter) -> Self {
        Self::relation(relation, Quantifier::None, filter)
    }

    pub fn every(relation: impl Into<String>, filter: Filter) -> Self {
        Self::relation(relation, Quantifier::Every, filter)
    }

    pub fn is(relation: impl Into<String>, filter: Filter) -> Self {
        Self::relation(relation, Quantifier::Is, filter)
    }

    /// The filter that matches every row
    pub fn always() -> Self {
        Self::And(Vec::new())
    }

    /// Conjunction of a list, without wrapping a single element
    pub fn all(mut filters: Vec<Filter>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Self::And(filters)
        }
    }

    /// Render back into the mapping form accepted by the parser
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::And(children) => {
                json!({ "$and": children.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Self::Or(children) => {
                json!({ "$or": children.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Self::Not(inner) => json!({ "$not": inner.to_json() }),
            Self::Field { field, op } => {
                let operand = match op {
                    FieldOp::Eq(value) => value.to_json(),
                    _ => {
                        let mut ops = Map::new();
                        ops.insert(op.operator().to_string(), op.operand_json());
                        serde_json::Value::Object(ops)
                    }
                };
                let mut object = Map::new();
                object.insert(field.clone(), operand);
                serde_json::Value::Object(object)
            }
            Self::Relation {
                relation,
                quantifier,
                filter,
            } => {
                let operand = match quantifier.operator() {
                    Some(operator) => {
                        let mut ops = Map::new();
                        ops.insert(operator.to_string(), filter.to_json());
                        serde_json::Value::Object(ops)
                    }
                    Option::None => filter.to_json(),
                };
                let mut object = Map::new();
                object.insert(relation.clone(), operand);
                serde_json::Value::Object(object)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}
