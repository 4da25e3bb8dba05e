//! Index documents
//!
//! Flat, nullable projections of domain aggregates. `None` fields are left out
//! of the serialized JSON.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::outbox::TargetType;

/// A document that can be written to the search index
pub trait IndexDocument: Serialize + DeserializeOwned + Send + Sync {
    /// Deterministic id, `{entity}_{id}`
    fn doc_id(&self) -> &str;
}

/// Deterministic document id for a target
pub fn doc_id_for(target_type: TargetType, target_id: i64) -> String {
    format!("{}_{}", target_type.doc_prefix(), target_id)
}

/// Engagement counters, indexed as an object so they are queried as `popularity.*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityDoc {
    pub view_count: u64,
    pub comment_count: u64,
    pub like_count: u64,
}

/// Job search document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDoc {
    pub doc_id: String,
    pub job_id: i64,
    pub url: String,
    pub company: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_line_summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_policy: Option<String>,
    #[serde(default)]
    pub tech_categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub is_open_ended: bool,
    pub is_closed: bool,
    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_assignment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_coding_test: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_live_coding: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_days: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_min_base_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_max_base_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation_has_stock_option: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<PopularityDoc>,

    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexDocument for JobDoc {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_format() {
        assert_eq!(doc_id_for(TargetType::Job, 42), "job_42");
        assert_eq!(doc_id_for(TargetType::TechBlog, 7), "tech_blog_7");
    }

    #[test]
    fn test_sparse_document_parses() {
        let doc: JobDoc = serde_json::from_value(serde_json::json!({
            "doc_id": "job_1",
            "job_id": 1,
            "url": "https://example.com/jobs/1",
            "company": "ACME",
            "title": "Engineer",
            "is_open_ended": false,
            "is_closed": false,
            "deleted": false,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.doc_id(), "job_1");
        assert!(doc.popularity.is_none());
        assert!(doc.tech_categories.is_empty());
    }
}
