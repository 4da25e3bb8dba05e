//! Structured search requests

use serde_json::Value;

use super::executor::SortOption;
use crate::index::IndexField;

/// What a search element compares against
///
/// A single value or a bound pair, never both and never neither.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    Single(Value),
    Range {
        from: Option<Value>,
        to: Option<Value>,
    },
}

/// One condition of a search command
#[derive(Debug, Clone, PartialEq)]
pub struct SearchElement<F> {
    pub field: F,
    pub value: SearchValue,
}

impl<F: IndexField> SearchElement<F> {
    pub fn single(field: F, value: impl Into<Value>) -> Self {
        Self {
            field,
            value: SearchValue::Single(value.into()),
        }
    }

    /// Inclusive range; either bound may be absent
    pub fn range(field: F, from: Option<Value>, to: Option<Value>) -> Self {
        Self {
            field,
            value: SearchValue::Range { from, to },
        }
    }

    pub fn at_least(field: F, from: impl Into<Value>) -> Self {
        Self::range(field, Some(from.into()), None)
    }

    pub fn at_most(field: F, to: impl Into<Value>) -> Self {
        Self::range(field, None, Some(to.into()))
    }
}

/// Ordered search conditions plus a `[from, to)` result window
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCommand<F> {
    pub elements: Vec<SearchElement<F>>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub sort: Option<SortOption>,
}

impl<F> Default for SearchCommand<F> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            from: None,
            to: None,
            sort: None,
        }
    }
}

impl<F: IndexField> SearchCommand<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: SearchElement<F>) -> Self {
        self.elements.push(element);
        self
    }

    pub fn window(mut self, from: Option<i64>, to: Option<i64>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn sort(mut self, sort: SortOption) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
