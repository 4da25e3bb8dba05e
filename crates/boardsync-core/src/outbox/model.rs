//! Outbox event model
//!
//! An event is a signal that a target changed, not a payload. The worker
//! re-reads the target's current state when it processes the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity an outbox event points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Job,
    CommunityPost,
    TechBlog,
    Comment,
}

impl TargetType {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Job => "JOB",
            TargetType::CommunityPost => "COMMUNITY_POST",
            TargetType::TechBlog => "TECH_BLOG",
            TargetType::Comment => "COMMENT",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "JOB" => Some(TargetType::Job),
            "COMMUNITY_POST" => Some(TargetType::CommunityPost),
            "TECH_BLOG" => Some(TargetType::TechBlog),
            "COMMENT" => Some(TargetType::Comment),
            _ => None,
        }
    }

    /// Prefix used for deterministic index document ids
    pub fn doc_prefix(&self) -> &'static str {
        match self {
            TargetType::Job => "job",
            TargetType::CommunityPost => "community_post",
            TargetType::TechBlog => "tech_blog",
            TargetType::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of mutation produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    Created,
    Updated,
    PopularityOnly,
    Deleted,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Created => "CREATED",
            UpdateType::Updated => "UPDATED",
            UpdateType::PopularityOnly => "POPULARITY_ONLY",
            UpdateType::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(UpdateType::Created),
            "UPDATED" => Some(UpdateType::Updated),
            "POPULARITY_ONLY" => Some(UpdateType::PopularityOnly),
            "DELETED" => Some(UpdateType::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of an outbox event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[default]
    Wait,
    Processing,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Wait => "WAIT",
            EventStatus::Processing => "PROCESSING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WAIT" => Some(EventStatus::Wait),
            "PROCESSING" => Some(EventStatus::Processing),
            "COMPLETED" => Some(EventStatus::Completed),
            "FAILED" => Some(EventStatus::Failed),
            _ => None,
        }
    }

    /// COMPLETED and FAILED are never left by the worker
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded change to an index-visible target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: i64,
    pub target_type: TargetType,
    pub target_id: i64,
    pub update_type: UpdateType,
    pub status: EventStatus,
    pub retry_count: u32,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// A not-yet-persisted WAIT event; `id` is assigned by the store
    pub fn pending(target_type: TargetType, target_id: i64, update_type: UpdateType) -> Self {
        Self {
            id: 0,
            target_type,
            target_id,
            update_type,
            status: EventStatus::Wait,
            retry_count: 0,
            error_message: None,
            updated_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn mark_processing(self) -> Self {
        Self {
            status: EventStatus::Processing,
            updated_at: Utc::now(),
            ..self
        }
    }

    pub fn mark_completed(self) -> Self {
        let now = Utc::now();
        Self {
            status: EventStatus::Completed,
            error_message: None,
            updated_at: now,
            processed_at: Some(now),
            ..self
        }
    }

    pub fn mark_failed(self, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: EventStatus::Failed,
            retry_count: self.retry_count + 1,
            error_message: Some(message.into()),
            updated_at: now,
            processed_at: Some(now),
            ..self
        }
    }
}

/// Filter for fetching pending events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindPendingEvents {
    pub limit: u32,
    pub target_type: Option<TargetType>,
}

impl FindPendingEvents {
    pub fn of_type(limit: u32, target_type: TargetType) -> Self {
        Self {
            limit,
            target_type: Some(target_type),
        }
    }

    pub fn any(limit: u32) -> Self {
        Self {
            limit,
            target_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_string_roundtrip() {
        for t in [
            TargetType::Job,
            TargetType::CommunityPost,
            TargetType::TechBlog,
            TargetType::Comment,
        ] {
            assert_eq!(TargetType::parse(t.as_str()), Some(t));
        }
        for u in [
            UpdateType::Created,
            UpdateType::Updated,
            UpdateType::PopularityOnly,
            UpdateType::Deleted,
        ] {
            assert_eq!(UpdateType::parse(u.as_str()), Some(u));
        }
        assert_eq!(EventStatus::parse("wait"), None);
        assert_eq!(
            serde_json::to_string(&UpdateType::PopularityOnly).unwrap(),
            "\"POPULARITY_ONLY\""
        );
    }

    #[test]
    fn test_pending_event_defaults() {
        let event = OutboxEvent::pending(TargetType::Job, 7, UpdateType::Created);
        assert_eq!(event.status, EventStatus::Wait);
        assert_eq!(event.retry_count, 0);
        assert!(event.error_message.is_none());
        assert!(event.processed_at.is_none());
    }

    #[test]
    fn test_mark_failed_increments_retry() {
        let event = OutboxEvent::pending(TargetType::Job, 7, UpdateType::Updated)
            .mark_processing()
            .mark_failed("JOB 7 not found");

        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.retry_count, 1);
        assert_eq!(event.error_message.as_deref(), Some("JOB 7 not found"));
        assert!(event.processed_at.is_some());
        assert!(event.status.is_terminal());

        let again = event.mark_failed("still missing");
        assert_eq!(again.retry_count, 2);
    }

    #[test]
    fn test_mark_completed_clears_error() {
        let mut event = OutboxEvent::pending(TargetType::Job, 7, UpdateType::Updated);
        event.error_message = Some("old".to_string());

        let done = event.mark_completed();
        assert_eq!(done.status, EventStatus::Completed);
        assert!(done.error_message.is_none());
        assert_eq!(done.target_id, 7);
    }
}
