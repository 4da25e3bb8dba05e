//! Job search facade
//!
//! Wires the job registries, the query builder, pagination and the executor
//! against the configured job index.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::index::{JobDoc, JobIndexField, PopularityDoc};
use crate::job::{CareerLevel, EmploymentType, PositionCategory, RemotePolicy};
use crate::query::{
    GenericSearchQueryBuilder, JOB_QUERY_BUILDERS, JOB_RANGE_BUILDERS, PaginationPolicy,
    SearchCommand, SearchElement, SearchQueryExecutor, paginate,
};

/// One page of job documents
#[derive(Debug, Clone, PartialEq)]
pub struct JobSearchResult {
    pub docs: Vec<JobDoc>,
    pub has_next: bool,
}

#[derive(Debug, Clone)]
pub struct JobSearch {
    executor: SearchQueryExecutor,
    index: String,
    policy: PaginationPolicy,
}

impl JobSearch {
    pub fn new(executor: SearchQueryExecutor, index: impl Into<String>) -> Self {
        Self {
            executor,
            index: index.into(),
            policy: PaginationPolicy::default(),
        }
    }

    pub fn from_config(executor: SearchQueryExecutor, config: &SearchConfig) -> Self {
        Self::new(executor, config.job_index.clone()).with_policy(PaginationPolicy::from(config))
    }

    pub fn with_policy(mut self, policy: PaginationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub async fn search(&self, command: &SearchCommand<JobIndexField>) -> Result<JobSearchResult> {
        let query = GenericSearchQueryBuilder::build(command, &JOB_QUERY_BUILDERS, &JOB_RANGE_BUILDERS);
        let pagination = self.policy.calculate(command.from, command.to);

        let docs: Vec<JobDoc> = self
            .executor
            .search(
                &self.index,
                &query,
                pagination.from,
                pagination.search_size,
                command.sort.as_ref(),
            )
            .await?;
        let page = paginate(docs, pagination.requested_size);

        info!(
            index = %self.index,
            from = pagination.from,
            returned = page.data.len(),
            has_next = page.has_next,
            "Job search completed"
        );

        Ok(JobSearchResult {
            docs: page.data,
            has_next: page.has_next,
        })
    }
}

/// Caller-facing job search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSearchRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    pub career_level: Option<CareerLevel>,
    pub employment_type: Option<EmploymentType>,
    pub position_category: Option<PositionCategory>,
    pub remote_policy: Option<RemotePolicy>,
    pub tech_categories: Vec<String>,
    pub location: Option<String>,
    pub min_years: Option<u32>,
    pub max_years: Option<u32>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl JobSearchRequest {
    /// Convert into a search command; visible (not deleted) jobs only
    pub fn to_command(&self) -> SearchCommand<JobIndexField> {
        let mut command = SearchCommand::new().window(self.from, self.to);

        if let Some(title) = non_blank(&self.title) {
            command = command.element(SearchElement::single(JobIndexField::Title, title));
        }
        if let Some(company) = non_blank(&self.company) {
            command = command.element(SearchElement::single(JobIndexField::Company, company));
        }
        if let Some(level) = self.career_level {
            command = command.element(SearchElement::single(JobIndexField::CareerLevel, level.as_str()));
        }
        if let Some(kind) = self.employment_type {
            command =
                command.element(SearchElement::single(JobIndexField::EmploymentType, kind.as_str()));
        }
        if let Some(category) = self.position_category {
            command = command.element(SearchElement::single(
                JobIndexField::PositionCategory,
                category.as_str(),
            ));
        }
        if let Some(policy) = self.remote_policy {
            command =
                command.element(SearchElement::single(JobIndexField::RemotePolicy, policy.as_str()));
        }
        for tech in self.tech_categories.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            command = command.element(SearchElement::single(JobIndexField::TechCategories, tech));
        }
        if let Some(location) = non_blank(&self.location) {
            command = command.element(SearchElement::single(JobIndexField::Locations, location));
        }
        if let Some(min_years) = self.min_years {
            command = command.element(SearchElement::at_least(JobIndexField::MinYears, min_years));
        }
        if let Some(max_years) = self.max_years {
            command = command.element(SearchElement::at_most(JobIndexField::MaxYears, max_years));
        }

        command.element(SearchElement::single(JobIndexField::Deleted, false))
    }
}

/// Summary of a job for result listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobCard {
    pub job_id: i64,
    pub url: String,
    pub company: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_line_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_policy: Option<String>,
    pub tech_categories: Vec<String>,
    pub locations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_years: Option<u32>,
    pub is_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<PopularityDoc>,
}

impl From<JobDoc> for JobCard {
    fn from(doc: JobDoc) -> Self {
        Self {
            job_id: doc.job_id,
            url: doc.url,
            company: doc.company,
            title: doc.title,
            organization: doc.organization,
            one_line_summary: doc.one_line_summary,
            career_level: doc.career_level,
            employment_type: doc.employment_type,
            remote_policy: doc.remote_policy,
            tech_categories: doc.tech_categories,
            locations: doc.locations,
            min_years: doc.min_years,
            max_years: doc.max_years,
            is_closed: doc.is_closed,
            popularity: doc.popularity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSearchResponse {
    pub jobs: Vec<JobCard>,
    pub has_next: bool,
    pub count: usize,
}

impl From<JobSearchResult> for JobSearchResponse {
    fn from(result: JobSearchResult) -> Self {
        let jobs: Vec<JobCard> = result.docs.into_iter().map(JobCard::from).collect();
        Self {
            count: jobs.len(),
            jobs,
            has_next: result.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchValue;
    use serde_json::json;

    #[test]
    fn test_blank_filters_are_ignored() {
        let request = JobSearchRequest {
            title: Some("   ".to_string()),
            company: Some(String::new()),
            tech_categories: vec!["".to_string(), " RUST ".to_string()],
            ..Default::default()
        };
        let command = request.to_command();

        let fields: Vec<_> = command.elements.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![JobIndexField::TechCategories, JobIndexField::Deleted]);
        assert_eq!(command.elements[0].value, SearchValue::Single(json!("RUST")));
    }

    #[test]
    fn test_every_request_excludes_deleted_jobs() {
        let command = JobSearchRequest::default().to_command();
        assert_eq!(command.elements.len(), 1);
        assert_eq!(command.elements[0].field, JobIndexField::Deleted);
        assert_eq!(command.elements[0].value, SearchValue::Single(json!(false)));
    }

    #[test]
    fn test_years_become_ranges() {
        let request = JobSearchRequest {
            min_years: Some(2),
            max_years: Some(5),
            career_level: Some(CareerLevel::Mid),
            from: Some(10),
            to: Some(20),
            ..Default::default()
        };
        let command = request.to_command();

        assert!(command.elements.contains(&SearchElement::at_least(JobIndexField::MinYears, 2)));
        assert!(command.elements.contains(&SearchElement::at_most(JobIndexField::MaxYears, 5)));
        assert!(command.elements.contains(&SearchElement::single(JobIndexField::CareerLevel, "MID")));
        assert_eq!((command.from, command.to), (Some(10), Some(20)));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: JobSearchRequest = serde_json::from_value(json!({
            "title": "backend",
            "remote_policy": "HYBRID"
        }))
        .unwrap();
        assert_eq!(request.remote_policy, Some(RemotePolicy::Hybrid));
        assert!(request.tech_categories.is_empty());
    }
}
