//! Aggregate → document mapping

use super::document::{IndexDocument, JobDoc, PopularityDoc, doc_id_for};
use crate::error::{Error, Result};
use crate::job::Job;
use crate::outbox::TargetType;

/// Pure projection of an aggregate into its index document
pub trait DocMapper: Send + Sync {
    type Aggregate;
    type Doc: IndexDocument;

    fn to_doc(&self, aggregate: &Self::Aggregate) -> Result<Self::Doc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JobDocMapper;

impl DocMapper for JobDocMapper {
    type Aggregate = Job;
    type Doc = JobDoc;

    fn to_doc(&self, job: &Job) -> Result<JobDoc> {
        if job.job_id <= 0 {
            return Err(Error::Mapping(format!(
                "job '{}' has no stored id",
                job.title
            )));
        }

        let experience = job.experience.as_ref();
        let description = job.description.as_ref();
        let interview = job.interview_process.as_ref();
        let compensation = job.compensation.as_ref();

        Ok(JobDoc {
            doc_id: doc_id_for(TargetType::Job, job.job_id),
            job_id: job.job_id,
            url: job.url.clone(),
            company: job.company.clone(),
            title: job.title.clone(),
            organization: job.organization.clone(),
            one_line_summary: job.one_line_summary.clone(),

            min_years: experience.and_then(|e| e.min_years),
            max_years: experience.and_then(|e| e.max_years),
            experience_required: experience.map(|e| e.required),

            career_level: job.career_level.map(|v| v.as_str().to_string()),
            employment_type: job.employment_type.map(|v| v.as_str().to_string()),
            position_category: job.position_category.map(|v| v.as_str().to_string()),
            remote_policy: job.remote_policy.map(|v| v.as_str().to_string()),
            tech_categories: job
                .tech_categories
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),

            started_at: job.started_at,
            ended_at: job.ended_at,
            is_open_ended: job.is_open_ended,
            is_closed: job.is_closed,
            locations: job.locations.clone(),

            full_description: description.and_then(|d| d.full_description.clone()),
            markdown_body: description.and_then(|d| d.markdown_body.clone()),

            has_assignment: interview.map(|i| i.has_assignment),
            has_coding_test: interview.map(|i| i.has_coding_test),
            has_live_coding: interview.map(|i| i.has_live_coding),
            interview_count: interview.and_then(|i| i.interview_count),
            interview_days: interview.and_then(|i| i.interview_days),

            compensation_min_base_pay: compensation.and_then(|c| c.min_base_pay),
            compensation_max_base_pay: compensation.and_then(|c| c.max_base_pay),
            compensation_currency: compensation.and_then(|c| c.currency.clone()),
            compensation_unit: compensation
                .and_then(|c| c.unit)
                .map(|u| u.as_str().to_string()),
            compensation_has_stock_option: compensation.map(|c| c.has_stock_option),

            popularity: job.popularity.map(|p| PopularityDoc {
                view_count: p.view_count,
                comment_count: p.comment_count,
                like_count: p.like_count,
            }),

            deleted: job.deleted,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{
        CareerLevel, Compensation, InterviewProcess, NewJob, PayUnit, Popularity, TechCategory,
    };
    use chrono::Utc;

    fn stored_job() -> Job {
        let mut job = Job::from_new(
            NewJob {
                url: "https://example.com/jobs/42".to_string(),
                company: "ACME".to_string(),
                title: "Backend Engineer".to_string(),
                career_level: Some(CareerLevel::Senior),
                tech_categories: vec![TechCategory::Rust],
                interview_process: Some(InterviewProcess {
                    has_coding_test: true,
                    interview_count: Some(3),
                    ..Default::default()
                }),
                compensation: Some(Compensation {
                    min_base_pay: Some(80000.0),
                    unit: Some(PayUnit::Yearly),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Utc::now(),
        );
        job.job_id = 42;
        job
    }

    #[test]
    fn test_maps_flattened_fields() {
        let doc = JobDocMapper.to_doc(&stored_job()).unwrap();

        assert_eq!(doc.doc_id, "job_42");
        assert_eq!(doc.career_level.as_deref(), Some("SENIOR"));
        assert_eq!(doc.tech_categories, vec!["RUST".to_string()]);
        assert_eq!(doc.has_coding_test, Some(true));
        assert_eq!(doc.interview_count, Some(3));
        assert_eq!(doc.compensation_unit.as_deref(), Some("YEARLY"));
        assert_eq!(doc.popularity.map(|p| p.view_count), Some(0));
    }

    #[test]
    fn test_missing_sub_structures_are_omitted() {
        let mut job = stored_job();
        job.interview_process = None;
        job.compensation = None;
        job.popularity = None;

        let json = serde_json::to_value(JobDocMapper.to_doc(&job).unwrap()).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("has_coding_test"));
        assert!(!obj.contains_key("compensation_unit"));
        assert!(!obj.contains_key("popularity"));
        assert!(!obj.contains_key("min_years"));
        assert_eq!(obj["deleted"], serde_json::json!(false));
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let job = stored_job().with_popularity(Popularity::default().increment_view_count(9));
        let a = serde_json::to_string(&JobDocMapper.to_doc(&job).unwrap()).unwrap();
        let b = serde_json::to_string(&JobDocMapper.to_doc(&job).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsaved_job_is_rejected() {
        let mut job = stored_job();
        job.job_id = 0;
        assert!(matches!(JobDocMapper.to_doc(&job), Err(Error::Mapping(_))));
    }
}
