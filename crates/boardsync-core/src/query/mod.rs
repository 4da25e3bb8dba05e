//! Query layer - structured search commands → index queries
//!
//! # Architecture
//!
//! - `command`: the caller's search conditions and result window
//! - `clause`: the query tree and its JSON rendering
//! - `builder` / `registry`: per-field fragment builders and bool composition
//! - `pagination`: window normalization and look-ahead trimming
//! - `executor`: runs a query against an index backend
//!
//! Everything except the executor is pure.

pub mod builder;
pub mod clause;
pub mod command;
pub mod executor;
pub mod pagination;
pub mod registry;

pub use builder::{FieldQueryBuilder, GenericSearchQueryBuilder, RangeQueryBuilder};
pub use clause::{BoolQuery, BoolType, Query, QueryWithBoolType};
pub use command::{SearchCommand, SearchElement, SearchValue};
pub use executor::{SearchQueryExecutor, SortOption, SortOrder};
pub use pagination::{Page, PaginationInfo, PaginationPolicy, paginate};
pub use registry::{
    JOB_QUERY_BUILDERS, JOB_RANGE_BUILDERS, QueryBuilderRegistry, RangeQueryBuilderRegistry,
};
