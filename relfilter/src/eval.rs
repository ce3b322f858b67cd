//! Row-level evaluation of filter trees
//!
//! Logic is two-valued: a null field simply fails every comparison except
//! `Eq(Null)`, `Ne(non-null)`, `NotIn` and the negations built on top of them.

use log::trace;

use crate::error::Result;
use crate::filter::{FieldOp, Filter, Quantifier};
use crate::schema::{EntitySchema, RelationSchema};
use crate::store::{Row, Store};
use crate::value::Value;

pub struct Evaluator<'s> {
    store: &'s Store,
    like_escape: Option<char>,
}

impl<'s> Evaluator<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            like_escape: store.config().like_escape,
        }
    }

    /// Whether `row` of entity `schema` satisfies `filter`
    pub fn matches(&self, schema: &EntitySchema, row: &Row, filter: &Filter) -> Result<bool> {
        match filter {
            Filter::And(children) => {
                for child in children {
                    if !self.matches(schema, row, child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(children) => {
                for child in children {
                    if self.matches(schema, row, child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(inner) => Ok(!self.matches(schema, row, inner)?),
            Filter::Field { field, op } => {
                let field = schema.require_field(field)?;
                let value = row.get(field.name).unwrap_or(&Value::Null);
                Ok(test_value(value, op, self.like_escape))
            }
            Filter::Relation {
                relation,
                quantifier,
                filter,
            } => {
                let relation = schema.require_relation(relation)?;
                self.quantify(schema, relation, *quantifier, row, filter)
            }
        }
    }

    fn quantify(
        &self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        quantifier: Quantifier,
        row: &Row,
        filter: &Filter,
    ) -> Result<bool> {
        let target = self.store.schema(relation.target)?;
        match quantifier {
            Quantifier::Is => match self.store.referenced_row(schema, relation, row)? {
                Some(referenced) => self.matches(target, referenced, filter),
                None => Ok(false),
            },
            Quantifier::Some => self.any_related(schema, relation, row, filter),
            Quantifier::None => Ok(!self.any_related(schema, relation, row, filter)?),
            Quantifier::Every => {
                for related in self.store.related_rows(schema, relation, row)? {
                    if !self.matches(target, related, filter)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn any_related(
        &self,
        schema: &EntitySchema,
        relation: &RelationSchema,
        row: &Row,
        filter: &Filter,
    ) -> Result<bool> {
        let target = self.store.schema(relation.target)?;
        for related in self.store.related_rows(schema, relation, row)? {
            if self.matches(target, related, filter)? {
                trace!(
                    "{}.{}: related {} matches",
                    schema.name,
                    relation.name,
                    related.key(target)
                );
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Apply a leaf operator to one field value
pub fn test_value(value: &Value, op: &FieldOp, like_escape: Option<char>) -> bool {
    match op {
        FieldOp::Eq(operand) => value == operand,
        FieldOp::Ne(operand) => value != operand,
        FieldOp::Gt(operand) => value.compare(operand).is_some_and(|o| o.is_gt()),
        FieldOp::Gte(operand) => value.compare(operand).is_some_and(|o| o.is_ge()),
        FieldOp::Lt(operand) => value.compare(operand).is_some_and(|o| o.is_lt()),
        FieldOp::Lte(operand) => value.compare(operand).is_some_and(|o| o.is_le()),
        FieldOp::In(operands) => operands.contains(value),
        FieldOp::NotIn(operands) => !operands.contains(value),
        FieldOp::Like(pattern) => value
            .as_str()
            .is_some_and(|text| like_match(text, pattern, like_escape, false)),
        FieldOp::ILike(pattern) => value
            .as_str()
            .is_some_and(|text| like_match(text, pattern, like_escape, true)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// `%`
    Any,
    /// `_`
    One,
    Literal(char),
}

fn tokenize(pattern: &str, escape: Option<char>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let token = match c {
            c if Some(c) == escape => Token::Literal(chars.next().unwrap_or(c)),
            // Runs of % are equivalent to one
            '%' if tokens.last() == Some(&Token::Any) => continue,
            '%' => Token::Any,
            '_' => Token::One,
            c => Token::Literal(c),
        };
        tokens.push(token);
    }
    tokens
}

fn chars_match(pattern: char, text: char, fold_case: bool) -> bool {
    pattern == text || (fold_case && pattern.to_lowercase().eq(text.to_lowercase()))
}

/// SQL `LIKE` matching: `%` is any sequence, `_` any single character.
///
/// The escape character makes the following character literal. With
/// `fold_case` literals match when their Unicode lowercase forms are equal;
/// `_` still stands for exactly one character of the original text.
pub fn like_match(text: &str, pattern: &str, escape: Option<char>, fold_case: bool) -> bool {
    let tokens = tokenize(pattern, escape);
    let text: Vec<char> = text.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    // Position after the last % and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some(Token::One) => {
                t += 1;
                p += 1;
                continue;
            }
            Some(Token::Literal(c)) if chars_match(*c, text[t], fold_case) => {
                t += 1;
                p += 1;
                continue;
            }
            _ => {}
        }
        match backtrack {
            Some((after_any, absorbed)) => {
                p = after_any;
                t = absorbed + 1;
                backtrack = Some((after_any, absorbed + 1));
            }
            None => return false,
        }
    }
    tokens[p..].iter().all(|token| *token == Token::Any)
}
