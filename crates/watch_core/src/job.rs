use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::evaluate::Evaluation;

pub type JobId = u64;

/// Message carried by a job that has not been checked yet.
pub const INITIAL_MESSAGE: &str = "Initializing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    ClassName,
    Id,
    TagName,
}

impl SelectorKind {
    /// Renders a raw selector value into a CSS selector string.
    pub fn render(self, value: &str) -> String {
        match self {
            SelectorKind::ClassName => format!(".{value}"),
            SelectorKind::Id => format!("#{value}"),
            SelectorKind::TagName => value.to_string(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SelectorKind::ClassName => "Class Name",
            SelectorKind::Id => "ID",
            SelectorKind::TagName => "Tag Name",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    /// Placeholder before a job exists; never stored.
    #[default]
    Idle,
    Monitoring,
    Triggered,
    Error,
}

impl JobStatus {
    /// Whether the scheduler polls a job in this status. Errors are retried;
    /// triggered jobs stay inert until removed.
    pub fn is_pollable(self) -> bool {
        matches!(self, JobStatus::Monitoring | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Idle => "Idle",
            JobStatus::Monitoring => "Monitoring",
            JobStatus::Triggered => "Triggered",
            JobStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("url must not be empty")]
    EmptyUrl,
    #[error("selector value must not be empty")]
    EmptySelector,
    #[error("target endpoint must not be empty")]
    EmptyEndpoint,
}

/// Operator input describing a new watch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub url: String,
    pub selector_kind: SelectorKind,
    pub selector_value: String,
    pub trigger_value: Option<String>,
    pub target_endpoint: String,
}

impl JobSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        if self.selector_value.trim().is_empty() {
            return Err(ValidationError::EmptySelector);
        }
        if self.target_endpoint.trim().is_empty() {
            return Err(ValidationError::EmptyEndpoint);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchJob {
    pub id: JobId,
    pub url: String,
    pub selector_kind: SelectorKind,
    pub selector_value: String,
    pub trigger_value: Option<String>,
    pub target_endpoint: String,
    pub status: JobStatus,
    pub last_content: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl WatchJob {
    /// Builds a freshly created job. Status is always Monitoring.
    pub(crate) fn from_submission(id: JobId, submission: JobSubmission) -> Self {
        let trigger_value = submission.trigger_value.filter(|t| !t.is_empty());
        Self {
            id,
            url: submission.url.trim().to_string(),
            selector_kind: submission.selector_kind,
            selector_value: submission.selector_value.trim().to_string(),
            trigger_value,
            target_endpoint: submission.target_endpoint.trim().to_string(),
            status: JobStatus::Monitoring,
            last_content: None,
            last_checked_at: None,
            message: Some(INITIAL_MESSAGE.to_string()),
        }
    }

    /// CSS selector used to extract content.
    pub fn selector(&self) -> String {
        self.selector_kind.render(&self.selector_value)
    }

    /// Human-readable selector, e.g. `Class Name: price`.
    pub fn selector_description(&self) -> String {
        format!("{}: {}", self.selector_kind, self.selector_value)
    }

    /// Next record after a successful fetch. `dispatch_failure` overrides a
    /// Triggered verdict with Error and appends the failure detail.
    pub fn after_evaluation(
        &self,
        evaluation: Evaluation,
        dispatch_failure: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let (status, message) = match dispatch_failure {
            Some(detail) => (
                JobStatus::Error,
                format!("{} Webhook dispatch failed: {detail}", evaluation.message),
            ),
            None => (evaluation.status, evaluation.message),
        };
        Self {
            status,
            last_content: evaluation.content,
            last_checked_at: Some(checked_at),
            message: Some(message),
            ..self.clone()
        }
    }

    /// Next record after a failed fetch. The last known content is kept.
    pub fn after_fetch_failure(&self, detail: &str, checked_at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Error,
            last_checked_at: Some(checked_at),
            message: Some(detail.to_string()),
            ..self.clone()
        }
    }
}
