//! Reference oracle for relationship-quantified ORM filters.
//!
//! Entities are described by `'static` schema metadata (usually derived with
//! `#[derive(Entity)]`), rows live in an in-memory [`Store`], and filters are
//! either built with the typed API or parsed from the mapping form used by
//! ORMs (`{"$and": [...], "links": {"$none": {...}}}`).
//!
//! `$none` is evaluated as exactly `$not` over `$some`, wherever it appears in
//! the boolean tree.

pub mod config;
pub mod error;
pub mod eval;
pub mod filter;
pub mod normalize;
pub mod oracle;
pub mod parse;
pub mod query;
pub mod schema;
pub mod store;
pub mod validate;
pub mod value;

pub use config::Config;
pub use error::{ErrorKind, RelfilterError, Result};
pub use filter::{and, not, or, FieldOp, Filter, Quantifier};
pub use normalize::normalize;
pub use oracle::{compare, compare_json, Comparison};
pub use parse::FilterParser;
pub use query::{FindOptions, Query, SortOrder};
pub use schema::{
    Entity, EntitySchema, FieldKind, FieldSchema, HasMany, Registry, RelationKind, RelationSchema,
};
pub use store::{RelatedRows, Row, Store};
pub use value::{Key, Value};

pub use relfilter_macros::Entity;
