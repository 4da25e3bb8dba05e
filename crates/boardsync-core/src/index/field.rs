//! Logical index fields and the query type each one is searched with

use std::fmt;

/// How a field is matched in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Exact keyword/number/boolean match
    Term,
    /// Analyzed full-text match
    Match,
    /// Bounded comparison (`gte`/`lte`)
    Range,
    /// Field inside a nested object
    Nested,
}

/// A logical field of an index document
pub trait IndexField: Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    /// Name of the field in the index document (dotted for object sub-fields)
    fn field_name(&self) -> &'static str;

    fn query_type(&self) -> QueryType;
}

/// Searchable fields of the job index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobIndexField {
    DocId,
    JobId,
    Url,
    Company,
    Title,
    Organization,
    OneLineSummary,
    MarkdownBody,
    FullDescription,
    MinYears,
    MaxYears,
    ExperienceRequired,
    CareerLevel,
    EmploymentType,
    PositionCategory,
    RemotePolicy,
    TechCategories,
    Locations,
    StartedAt,
    EndedAt,
    IsOpenEnded,
    IsClosed,
    HasAssignment,
    HasCodingTest,
    HasLiveCoding,
    InterviewCount,
    InterviewDays,
    PopularityViewCount,
    PopularityCommentCount,
    PopularityLikeCount,
    Deleted,
    CreatedAt,
    UpdatedAt,
}

impl JobIndexField {
    pub const ALL: [JobIndexField; 33] = [
        JobIndexField::DocId,
        JobIndexField::JobId,
        JobIndexField::Url,
        JobIndexField::Company,
        JobIndexField::Title,
        JobIndexField::Organization,
        JobIndexField::OneLineSummary,
        JobIndexField::MarkdownBody,
        JobIndexField::FullDescription,
        JobIndexField::MinYears,
        JobIndexField::MaxYears,
        JobIndexField::ExperienceRequired,
        JobIndexField::CareerLevel,
        JobIndexField::EmploymentType,
        JobIndexField::PositionCategory,
        JobIndexField::RemotePolicy,
        JobIndexField::TechCategories,
        JobIndexField::Locations,
        JobIndexField::StartedAt,
        JobIndexField::EndedAt,
        JobIndexField::IsOpenEnded,
        JobIndexField::IsClosed,
        JobIndexField::HasAssignment,
        JobIndexField::HasCodingTest,
        JobIndexField::HasLiveCoding,
        JobIndexField::InterviewCount,
        JobIndexField::InterviewDays,
        JobIndexField::PopularityViewCount,
        JobIndexField::PopularityCommentCount,
        JobIndexField::PopularityLikeCount,
        JobIndexField::Deleted,
        JobIndexField::CreatedAt,
        JobIndexField::UpdatedAt,
    ];

    /// Look a field up by its document name
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.field_name() == name)
    }
}

impl IndexField for JobIndexField {
    fn field_name(&self) -> &'static str {
        match self {
            JobIndexField::DocId => "doc_id",
            JobIndexField::JobId => "job_id",
            JobIndexField::Url => "url",
            JobIndexField::Company => "company",
            JobIndexField::Title => "title",
            JobIndexField::Organization => "organization",
            JobIndexField::OneLineSummary => "one_line_summary",
            JobIndexField::MarkdownBody => "markdown_body",
            JobIndexField::FullDescription => "full_description",
            JobIndexField::MinYears => "min_years",
            JobIndexField::MaxYears => "max_years",
            JobIndexField::ExperienceRequired => "experience_required",
            JobIndexField::CareerLevel => "career_level",
            JobIndexField::EmploymentType => "employment_type",
            JobIndexField::PositionCategory => "position_category",
            JobIndexField::RemotePolicy => "remote_policy",
            JobIndexField::TechCategories => "tech_categories",
            JobIndexField::Locations => "locations",
            JobIndexField::StartedAt => "started_at",
            JobIndexField::EndedAt => "ended_at",
            JobIndexField::IsOpenEnded => "is_open_ended",
            JobIndexField::IsClosed => "is_closed",
            JobIndexField::HasAssignment => "has_assignment",
            JobIndexField::HasCodingTest => "has_coding_test",
            JobIndexField::HasLiveCoding => "has_live_coding",
            JobIndexField::InterviewCount => "interview_count",
            JobIndexField::InterviewDays => "interview_days",
            JobIndexField::PopularityViewCount => "popularity.view_count",
            JobIndexField::PopularityCommentCount => "popularity.comment_count",
            JobIndexField::PopularityLikeCount => "popularity.like_count",
            JobIndexField::Deleted => "deleted",
            JobIndexField::CreatedAt => "created_at",
            JobIndexField::UpdatedAt => "updated_at",
        }
    }

    fn query_type(&self) -> QueryType {
        match self {
            JobIndexField::Title
            | JobIndexField::OneLineSummary
            | JobIndexField::MarkdownBody
            | JobIndexField::FullDescription => QueryType::Match,
            JobIndexField::MinYears
            | JobIndexField::MaxYears
            | JobIndexField::StartedAt
            | JobIndexField::EndedAt
            | JobIndexField::InterviewCount
            | JobIndexField::InterviewDays
            | JobIndexField::PopularityViewCount
            | JobIndexField::PopularityCommentCount
            | JobIndexField::PopularityLikeCount
            | JobIndexField::CreatedAt
            | JobIndexField::UpdatedAt => QueryType::Range,
            _ => QueryType::Term,
        }
    }
}

impl fmt::Display for JobIndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}
