//! The three-entity bridge model and the filters that reproduce the
//! `$none` / `$not` + `$some` divergence.
//!
//! `EntityTwo.middleLinks` is the inverse side of `EntityMiddle.standalone2`;
//! each middle row also references an `EntityOne` through `standalone1`.

pub mod entities;

use log::debug;
use once_cell::sync::Lazy;
use relfilter::{Entity, Registry, Result, Row, Store};
use serde_json::json;

pub use entities::*;

pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new()
        .register::<EntityOne>()
        .register::<EntityTwo>()
        .register::<EntityMiddle>()
});

/// An empty store over the bridge model
pub fn new_store() -> Result<Store> {
    Store::new(REGISTRY.clone())
}

/// The middle rows linked to an `EntityTwo` row
pub fn related_middle_rows<'s>(store: &'s Store, two: &Row) -> Result<Vec<&'s Row>> {
    let schema = EntityTwo::SCHEMA;
    let relation = schema.require_relation(entity_two::middle_links::NAME)?;
    Ok(store.related_rows(schema, relation, two)?.collect())
}

/// One `EntityOne` (id 1) and one `EntityTwo` ("t1", named "asdfg").
///
/// With `link_data` set, a middle row links the two with that payload.
pub fn reproduction_store(link_data: Option<&str>) -> Result<Store> {
    let mut store = new_store()?;
    store.insert(EntityOne::new("one", "one@example.com"))?;
    store.insert(EntityTwo::new("t1", "asdfg"))?;
    if let Some(data) = link_data {
        store.insert(EntityMiddle::new(1, "t1").data(data))?;
    }
    debug!(
        "reproduction store: {} middle rows",
        store.len(EntityMiddle::SCHEMA.name)?
    );
    Ok(store)
}

/// `$none` as one element of an `$and` array
pub fn none_inside_and() -> serde_json::Value {
    json!({
        "$and": [
            { "someBooleanFlag": true },
            { "name": { "$like": "%asdf%" } },
            {
                "middleLinks": {
                    "$none": {
                        "standalone1": { "id": 1 },
                        "arbitraryData": { "$ne": null }
                    }
                }
            }
        ]
    })
}

/// `$none` on a relation key next to a top-level `$and`
pub fn none_at_top_level() -> serde_json::Value {
    json!({
        "$and": [
            { "someBooleanFlag": true },
            { "name": { "$like": "%asdf%" } }
        ],
        "middleLinks": {
            "$none": {
                "standalone1": { "id": 1 },
                "arbitraryData": { "$ne": null }
            }
        }
    })
}

/// `$not` over `$some`, with the inner `$ne: null` spelled as a negated null check
pub fn not_some_at_top_level() -> serde_json::Value {
    json!({
        "$and": [
            { "someBooleanFlag": true },
            { "name": { "$like": "%asdf%" } }
        ],
        "$not": {
            "middleLinks": {
                "$some": {
                    "standalone1": { "id": 1 },
                    "$not": { "arbitraryData": null }
                }
            }
        }
    })
}

/// The three formulations, labelled
pub fn reproduction_filters() -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("$none inside $and", none_inside_and()),
        ("$none at top level", none_at_top_level()),
        ("$not + $some at top level", not_some_at_top_level()),
    ]
}
