//! Job aggregate - the primary-store side of the index pipeline
//!
//! - `model`: the aggregate, its enums and value objects
//! - `repository`: SQLite persistence and the sync worker's fetch seam
//! - `writer`: mutations that record their outbox event in the same transaction

pub mod model;
pub mod repository;
pub mod writer;

pub use model::{
    CareerLevel, Compensation, EmploymentType, ExperienceRequirement, InterviewProcess, Job,
    JobDescription, NewJob, PayUnit, Popularity, PositionCategory, RemotePolicy, TechCategory,
};
pub use repository::JobRepository;
pub use writer::JobWriter;
