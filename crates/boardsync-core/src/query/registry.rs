//! Field → fragment builder registries
//!
//! Registries are immutable once built. Lookups of unregistered fields return
//! `None` and the element is skipped by the query builder.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::builder::{FieldQueryBuilder, RangeQueryBuilder};
use super::clause::BoolType;
use crate::index::{IndexField, JobIndexField};

/// Equality / full-text registry
#[derive(Debug, Clone)]
pub struct QueryBuilderRegistry<F> {
    builders: HashMap<F, FieldQueryBuilder>,
}

impl<F: IndexField> QueryBuilderRegistry<F> {
    pub fn from_entries(entries: impl IntoIterator<Item = (F, FieldQueryBuilder)>) -> Self {
        Self {
            builders: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, field: &F) -> Option<&FieldQueryBuilder> {
        self.builders.get(field)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

/// Range registry
#[derive(Debug, Clone)]
pub struct RangeQueryBuilderRegistry<F> {
    builders: HashMap<F, RangeQueryBuilder>,
}

impl<F: IndexField> RangeQueryBuilderRegistry<F> {
    pub fn from_entries(entries: impl IntoIterator<Item = (F, RangeQueryBuilder)>) -> Self {
        Self {
            builders: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, field: &F) -> Option<&RangeQueryBuilder> {
        self.builders.get(field)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

/// Equality and full-text builders of the job index
pub static JOB_QUERY_BUILDERS: LazyLock<QueryBuilderRegistry<JobIndexField>> = LazyLock::new(|| {
    use FieldQueryBuilder::{Match, Term};
    use JobIndexField as F;

    QueryBuilderRegistry::from_entries([
        (F::DocId, Term(BoolType::Filter)),
        (F::JobId, Term(BoolType::Filter)),
        (F::Url, Term(BoolType::Filter)),
        (F::Company, Term(BoolType::Filter)),
        (F::Organization, Term(BoolType::Filter)),
        (F::Locations, Term(BoolType::Filter)),
        (F::EmploymentType, Term(BoolType::Filter)),
        (F::CareerLevel, Term(BoolType::Filter)),
        (F::PositionCategory, Term(BoolType::Filter)),
        (F::RemotePolicy, Term(BoolType::Filter)),
        (F::TechCategories, Term(BoolType::Filter)),
        (F::ExperienceRequired, Term(BoolType::Filter)),
        (F::IsOpenEnded, Term(BoolType::Filter)),
        (F::IsClosed, Term(BoolType::Filter)),
        (F::HasAssignment, Term(BoolType::Filter)),
        (F::HasCodingTest, Term(BoolType::Filter)),
        (F::HasLiveCoding, Term(BoolType::Filter)),
        (F::Title, Match(BoolType::Should)),
        (F::MarkdownBody, Match(BoolType::Should)),
        (F::OneLineSummary, Match(BoolType::Should)),
        (F::FullDescription, Match(BoolType::Should)),
        (F::Deleted, Term(BoolType::Must)),
    ])
});

/// Range builders of the job index
pub static JOB_RANGE_BUILDERS: LazyLock<RangeQueryBuilderRegistry<JobIndexField>> =
    LazyLock::new(|| {
        use JobIndexField as F;

        RangeQueryBuilderRegistry::from_entries(
            [
                F::MinYears,
                F::MaxYears,
                F::StartedAt,
                F::EndedAt,
                F::InterviewCount,
                F::InterviewDays,
                F::CreatedAt,
                F::UpdatedAt,
                F::PopularityViewCount,
                F::PopularityCommentCount,
                F::PopularityLikeCount,
            ]
            .map(|field| (field, RangeQueryBuilder(BoolType::Filter))),
        )
    });

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::QueryType;

    #[test]
    fn test_every_job_field_is_registered_once() {
        for field in JobIndexField::ALL {
            let in_equality = JOB_QUERY_BUILDERS.get(&field).is_some();
            let in_range = JOB_RANGE_BUILDERS.get(&field).is_some();
            assert!(in_equality ^ in_range, "{} must be in exactly one registry", field);
        }
        assert_eq!(
            JOB_QUERY_BUILDERS.len() + JOB_RANGE_BUILDERS.len(),
            JobIndexField::ALL.len()
        );
    }

    #[test]
    fn test_registry_agrees_with_field_query_types() {
        for field in JobIndexField::ALL {
            match (field.query_type(), JOB_QUERY_BUILDERS.get(&field)) {
                (QueryType::Term, Some(b)) => assert!(matches!(b, FieldQueryBuilder::Term(_))),
                (QueryType::Match, Some(b)) => assert!(matches!(b, FieldQueryBuilder::Match(_))),
                (QueryType::Range, None) => assert!(JOB_RANGE_BUILDERS.get(&field).is_some()),
                (qt, b) => panic!("{} has query type {:?} but builder {:?}", field, qt, b),
            }
        }
    }

    #[test]
    fn test_clause_types() {
        assert_eq!(
            JOB_QUERY_BUILDERS.get(&JobIndexField::Title),
            Some(&FieldQueryBuilder::Match(BoolType::Should))
        );
        assert_eq!(
            JOB_QUERY_BUILDERS.get(&JobIndexField::Deleted),
            Some(&FieldQueryBuilder::Term(BoolType::Must))
        );
        assert_eq!(
            JOB_RANGE_BUILDERS.get(&JobIndexField::PopularityViewCount),
            Some(&RangeQueryBuilder(BoolType::Filter))
        );
    }

    #[test]
    fn test_unregistered_field_is_none() {
        let registry = QueryBuilderRegistry::from_entries([(
            JobIndexField::Company,
            FieldQueryBuilder::Term(BoolType::Filter),
        )]);
        assert!(registry.get(&JobIndexField::Url).is_none());
        assert!(!registry.is_empty());
    }
}
