//! Entity search facades built on the query layer

pub mod job;

pub use job::{JobCard, JobSearch, JobSearchRequest, JobSearchResponse, JobSearchResult};
