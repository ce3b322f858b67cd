//! Canonical rewriting of filter trees
//!
//! Two filters that normalize to the same tree select the same rows on every
//! store.

use crate::filter::{Filter, Quantifier};

/// Rewrite a filter into a canonical form with the same meaning.
///
/// - `$none` becomes `$not` over `$some`
/// - `$every` becomes `$not` over `$some` of the negated sub-filter
/// - double negation is removed
/// - nested `$and` / `$or` nodes are flattened, single-child ones unwrapped
pub fn normalize(filter: &Filter) -> Filter {
    match filter {
        Filter::And(children) => flatten(children, true),
        Filter::Or(children) => flatten(children, false),
        Filter::Not(inner) => negate(normalize(inner)),
        Filter::Field { .. } => filter.clone(),
        Filter::Relation {
            relation,
            quantifier,
            filter,
        } => {
            let inner = normalize(filter);
            match quantifier {
                Quantifier::Some => Filter::some(relation.clone(), inner),
                Quantifier::None => negate(Filter::some(relation.clone(), inner)),
                Quantifier::Every => negate(Filter::some(relation.clone(), negate(inner))),
                Quantifier::Is => Filter::is(relation.clone(), inner),
            }
        }
    }
}

fn negate(filter: Filter) -> Filter {
    match filter {
        Filter::Not(inner) => *inner,
        other => Filter::Not(Box::new(other)),
    }
}

fn flatten(children: &[Filter], conjunction: bool) -> Filter {
    let mut flat = Vec::with_capacity(children.len());
    for child in children.iter().map(normalize) {
        match (child, conjunction) {
            (Filter::And(grandchildren), true) | (Filter::Or(grandchildren), false) => {
                flat.extend(grandchildren)
            }
            (child, _) => flat.push(child),
        }
    }
    if flat.len() == 1 {
        return flat.remove(0);
    }
    if conjunction {
        Filter::And(flat)
    } else {
        Filter::Or(flat)
    }
}
