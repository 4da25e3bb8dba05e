//! Job aggregate and its value objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerations stored and indexed as SCREAMING_SNAKE_CASE strings
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum!(
    /// Seniority the position is aimed at
    CareerLevel {
        Entry => "ENTRY",
        Junior => "JUNIOR",
        Mid => "MID",
        Senior => "SENIOR",
        Lead => "LEAD",
    }
);

keyword_enum!(
    EmploymentType {
        FullTime => "FULL_TIME",
        Contract => "CONTRACT",
        Intern => "INTERN",
    }
);

keyword_enum!(
    PositionCategory {
        Backend => "BACKEND",
        Frontend => "FRONTEND",
        Fullstack => "FULLSTACK",
        Mobile => "MOBILE",
        Data => "DATA",
        MachineLearning => "MACHINE_LEARNING",
        Devops => "DEVOPS",
        Security => "SECURITY",
        Etc => "ETC",
    }
);

keyword_enum!(
    RemotePolicy {
        Remote => "REMOTE",
        Hybrid => "HYBRID",
        Onsite => "ONSITE",
    }
);

keyword_enum!(
    /// Technology tag attached to a posting
    TechCategory {
        Java => "JAVA",
        Kotlin => "KOTLIN",
        Spring => "SPRING",
        Rust => "RUST",
        Go => "GO",
        Python => "PYTHON",
        Javascript => "JAVASCRIPT",
        Typescript => "TYPESCRIPT",
        React => "REACT",
        Swift => "SWIFT",
        Android => "ANDROID",
        Kubernetes => "KUBERNETES",
        Aws => "AWS",
        Database => "DATABASE",
        MachineLearning => "MACHINE_LEARNING",
    }
);

keyword_enum!(
    PayUnit {
        Hourly => "HOURLY",
        Monthly => "MONTHLY",
        Yearly => "YEARLY",
    }
);

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperienceRequirement {
    pub min_years: Option<u32>,
    pub max_years: Option<u32>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobDescription {
    pub full_description: Option<String>,
    pub markdown_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterviewProcess {
    pub has_assignment: bool,
    pub has_coding_test: bool,
    pub has_live_coding: bool,
    pub interview_count: Option<u32>,
    pub interview_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Compensation {
    pub min_base_pay: Option<f64>,
    pub max_base_pay: Option<f64>,
    pub currency: Option<String>,
    pub unit: Option<PayUnit>,
    pub has_stock_option: bool,
}

/// Engagement counters; changing only these produces a POPULARITY_ONLY event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Popularity {
    pub view_count: u64,
    pub comment_count: u64,
    pub like_count: u64,
}

impl Popularity {
    pub fn increment_view_count(self, by: u64) -> Self {
        Self {
            view_count: self.view_count.saturating_add(by),
            ..self
        }
    }

    pub fn increment_comment_count(self) -> Self {
        Self {
            comment_count: self.comment_count.saturating_add(1),
            ..self
        }
    }

    pub fn increment_like_count(self) -> Self {
        Self {
            like_count: self.like_count.saturating_add(1),
            ..self
        }
    }

    pub fn decrement_like_count(self) -> Self {
        Self {
            like_count: self.like_count.saturating_sub(1),
            ..self
        }
    }
}

/// Fields supplied by a writer when a job is first stored
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewJob {
    pub url: String,
    pub company: String,
    pub title: String,
    pub organization: Option<String>,
    pub one_line_summary: Option<String>,
    pub career_level: Option<CareerLevel>,
    pub employment_type: Option<EmploymentType>,
    pub position_category: Option<PositionCategory>,
    pub remote_policy: Option<RemotePolicy>,
    pub tech_categories: Vec<TechCategory>,
    pub locations: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_open_ended: bool,
    pub experience: Option<ExperienceRequirement>,
    pub description: Option<JobDescription>,
    pub interview_process: Option<InterviewProcess>,
    pub compensation: Option<Compensation>,
}

/// A job posting as stored in the primary store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub url: String,
    pub company: String,
    pub title: String,
    pub organization: Option<String>,
    pub one_line_summary: Option<String>,
    pub career_level: Option<CareerLevel>,
    pub employment_type: Option<EmploymentType>,
    pub position_category: Option<PositionCategory>,
    pub remote_policy: Option<RemotePolicy>,
    pub tech_categories: Vec<TechCategory>,
    pub locations: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_open_ended: bool,
    pub is_closed: bool,
    pub experience: Option<ExperienceRequirement>,
    pub description: Option<JobDescription>,
    pub interview_process: Option<InterviewProcess>,
    pub compensation: Option<Compensation>,
    pub popularity: Option<Popularity>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Materialize a new job; `job_id` is assigned by the repository
    pub fn from_new(new: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            job_id: 0,
            url: new.url,
            company: new.company,
            title: new.title,
            organization: new.organization,
            one_line_summary: new.one_line_summary,
            career_level: new.career_level,
            employment_type: new.employment_type,
            position_category: new.position_category,
            remote_policy: new.remote_policy,
            tech_categories: new.tech_categories,
            locations: new.locations,
            started_at: new.started_at,
            ended_at: new.ended_at,
            is_open_ended: new.is_open_ended,
            is_closed: false,
            experience: new.experience,
            description: new.description,
            interview_process: new.interview_process,
            compensation: new.compensation,
            popularity: Some(Popularity::default()),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_popularity(self, popularity: Popularity) -> Self {
        Self {
            popularity: Some(popularity),
            updated_at: Utc::now(),
            ..self
        }
    }

    /// Current counters, zeroed when the job has none yet
    pub fn popularity_or_default(&self) -> Popularity {
        self.popularity.unwrap_or_default()
    }
}
