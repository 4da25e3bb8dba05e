//! Query fragment builders and the generic bool-query composer

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::clause::{BoolQuery, BoolType, Query, QueryWithBoolType};
use super::command::{SearchCommand, SearchValue};
use super::registry::{QueryBuilderRegistry, RangeQueryBuilderRegistry};
use crate::index::IndexField;

/// Equality / full-text fragment builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldQueryBuilder {
    Term(BoolType),
    Match(BoolType),
}

impl FieldQueryBuilder {
    pub fn bool_type(&self) -> BoolType {
        match self {
            FieldQueryBuilder::Term(b) | FieldQueryBuilder::Match(b) => *b,
        }
    }

    pub fn build(&self, field: &str, value: &Value) -> Query {
        match self {
            FieldQueryBuilder::Term(_) => Query::Term {
                field: field.to_string(),
                value: value.clone(),
            },
            FieldQueryBuilder::Match(_) => Query::Match {
                field: field.to_string(),
                query: value.clone(),
            },
        }
    }
}

/// Range fragment builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQueryBuilder(pub BoolType);

impl RangeQueryBuilder {
    pub fn bool_type(&self) -> BoolType {
        self.0
    }

    /// `None` when neither bound is given; bounds are kept as passed
    pub fn build(&self, field: &str, gte: Option<&Value>, lte: Option<&Value>) -> Option<Query> {
        if gte.is_none() && lte.is_none() {
            return None;
        }
        Some(Query::Range {
            field: field.to_string(),
            gte: gte.cloned(),
            lte: lte.cloned(),
        })
    }
}

/// Composes a search command into one bool query
pub struct GenericSearchQueryBuilder;

impl GenericSearchQueryBuilder {
    /// Build the query for `command`
    ///
    /// Elements whose field is in neither registry, or whose value kind does
    /// not fit the registered builder, contribute nothing. The result does not
    /// depend on element order.
    pub fn build<F: IndexField>(
        command: &SearchCommand<F>,
        equality: &QueryBuilderRegistry<F>,
        range: &RangeQueryBuilderRegistry<F>,
    ) -> Query {
        let fragments: Vec<QueryWithBoolType> = command
            .elements
            .iter()
            .filter_map(|element| {
                let field = element.field.field_name();
                if let Some(builder) = equality.get(&element.field) {
                    return match &element.value {
                        SearchValue::Single(value) => Some(QueryWithBoolType::new(
                            builder.build(field, value),
                            builder.bool_type(),
                        )),
                        SearchValue::Range { .. } => {
                            debug!(field, "Range value on an equality field ignored");
                            None
                        }
                    };
                }
                if let Some(builder) = range.get(&element.field) {
                    return match &element.value {
                        SearchValue::Range { from, to } => builder
                            .build(field, from.as_ref(), to.as_ref())
                            .map(|q| QueryWithBoolType::new(q, builder.bool_type())),
                        SearchValue::Single(_) => {
                            debug!(field, "Single value on a range field ignored");
                            None
                        }
                    };
                }
                debug!(field, "Unregistered search field ignored");
                None
            })
            .collect();

        Self::compose(fragments)
    }

    /// Group fragments by clause; each group is ordered by canonical JSON
    pub fn compose(fragments: Vec<QueryWithBoolType>) -> Query {
        if fragments.is_empty() {
            return Query::MatchAll;
        }

        let mut groups: BTreeMap<BoolType, Vec<(String, Query)>> = BTreeMap::new();
        for fragment in fragments {
            let key = fragment.query.canonical();
            groups
                .entry(fragment.bool_type)
                .or_default()
                .push((key, fragment.query));
        }

        let mut take = |bool_type: BoolType| -> Vec<Query> {
            let mut group = groups.remove(&bool_type).unwrap_or_default();
            group.sort_by(|a, b| a.0.cmp(&b.0));
            group.into_iter().map(|(_, q)| q).collect()
        };

        let must = take(BoolType::Must);
        let filter = take(BoolType::Filter);
        let should = take(BoolType::Should);
        let minimum_should_match = (!should.is_empty()).then_some(1);

        Query::Bool(BoolQuery {
            must,
            should,
            filter,
            minimum_should_match,
        })
    }
}
