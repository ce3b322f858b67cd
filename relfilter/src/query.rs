//! Top-level query entry points

use log::debug;

use crate::error::Result;
use crate::eval::Evaluator;
use crate::filter::Filter;
use crate::parse::FilterParser;
use crate::store::{Row, Store};
use crate::validate::validate;
use crate::value::Key;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Ordering and pagination applied after filtering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by a field; later calls break ties of earlier ones.
    /// Rows that still tie keep primary key order.
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Read-only view of a store for running filters
#[derive(Clone, Copy)]
pub struct Query<'s> {
    store: &'s Store,
}

impl<'s> Query<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// Parse a mapping-form filter for `entity` with the store's configuration
    pub fn parse(&self, entity: &str, json: &serde_json::Value) -> Result<Filter> {
        FilterParser::new(self.store.registry())
            .max_depth(self.store.config().max_depth)
            .parse(entity, json)
    }

    /// Rows of `entity` satisfying `filter`, in primary key order.
    ///
    /// The filter is checked against the schema first; on error no rows are
    /// returned.
    pub fn evaluate(&self, entity: &str, filter: &Filter) -> Result<Vec<&'s Row>> {
        let schema = self.store.schema(entity)?;
        validate(
            self.store.registry(),
            schema,
            filter,
            self.store.config().max_depth,
        )?;

        let evaluator = Evaluator::new(self.store);
        let mut matched = Vec::new();
        let mut scanned = 0usize;
        for row in self.store.rows(schema)? {
            scanned += 1;
            if evaluator.matches(schema, row, filter)? {
                matched.push(row);
            }
        }
        debug!(
            "{} where {}: {} of {} rows",
            schema.name,
            filter,
            matched.len(),
            scanned
        );
        Ok(matched)
    }

    pub fn evaluate_with(
        &self,
        entity: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<&'s Row>> {
        let schema = self.store.schema(entity)?;
        let order = options
            .order_by
            .iter()
            .map(|(field, order)| schema.require_field(field).map(|f| (f.name, *order)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = self.evaluate(entity, filter)?;
        if !order.is_empty() {
            // Stable, so ties keep primary key order
            rows.sort_by(|a, b| {
                order
                    .iter()
                    .map(|(field, order)| {
                        let ordering = a.get(field).cmp(&b.get(field));
                        match order {
                            SortOrder::Asc => ordering,
                            SortOrder::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(options.offset).take(limit).collect())
    }

    /// Parse and evaluate a mapping-form filter
    pub fn find(&self, entity: &str, json: &serde_json::Value) -> Result<Vec<&'s Row>> {
        let filter = self.parse(entity, json)?;
        self.evaluate(entity, &filter)
    }

    pub fn find_with(
        &self,
        entity: &str,
        json: &serde_json::Value,
        options: &FindOptions,
    ) -> Result<Vec<&'s Row>> {
        let filter = self.parse(entity, json)?;
        self.evaluate_with(entity, &filter, options)
    }

    /// Primary keys of the matching rows
    pub fn keys(&self, entity: &str, filter: &Filter) -> Result<Vec<Key>> {
        let schema = self.store.schema(entity)?;
        Ok(self
            .evaluate(entity, filter)?
            .into_iter()
            .map(|row| row.key(schema))
            .collect())
    }

    pub fn count(&self, entity: &str, filter: &Filter) -> Result<usize> {
        Ok(self.evaluate(entity, filter)?.len())
    }
}
