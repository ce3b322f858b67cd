//! Side-by-side evaluation of two filters
//!
//! The reproduction cases all have the same shape: two formulations that
//! should select the same rows. [`compare`] runs both against one store and
//! reports the rows on which they disagree.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::filter::Filter;
use crate::query::Query;
use crate::value::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub entity: String,
    pub left: Vec<Key>,
    pub right: Vec<Key>,
    /// Selected by the left filter only
    pub only_left: Vec<Key>,
    /// Selected by the right filter only
    pub only_right: Vec<Key>,
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        self.only_left.is_empty() && self.only_right.is_empty()
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_equivalent() {
            return write!(f, "{}: both select {} rows", self.entity, self.left.len());
        }
        let join = |keys: &[Key]| {
            keys.iter()
                .map(Key::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "{}: only left [{}], only right [{}]",
            self.entity,
            join(&self.only_left),
            join(&self.only_right)
        )
    }
}

pub fn compare(query: &Query<'_>, entity: &str, left: &Filter, right: &Filter) -> Result<Comparison> {
    let left_keys = query.keys(entity, left)?;
    let right_keys = query.keys(entity, right)?;

    let left_set: BTreeSet<&Key> = left_keys.iter().collect();
    let right_set: BTreeSet<&Key> = right_keys.iter().collect();
    let only_left = left_set.difference(&right_set).map(|k| (*k).clone()).collect();
    let only_right = right_set.difference(&left_set).map(|k| (*k).clone()).collect();

    let comparison = Comparison {
        entity: query.store().schema(entity)?.name.to_string(),
        only_left,
        only_right,
        left: left_keys,
        right: right_keys,
    };
    if !comparison.is_equivalent() {
        log::warn!("filters diverge: {} vs {}: {}", left, right, comparison);
    }
    Ok(comparison)
}

/// [`compare`] for two mapping-form filters
pub fn compare_json(
    query: &Query<'_>,
    entity: &str,
    left: &serde_json::Value,
    right: &serde_json::Value,
) -> Result<Comparison> {
    let left = query.parse(entity, left)?;
    let right = query.parse(entity, right)?;
    compare(query, entity, &left, &right)
}
