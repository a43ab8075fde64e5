//! Core types for the research workflow
//!
//! Defines:
//! - Research tasks (immutable; every revision builds a new one)
//! - The wire shape requested from the generation backend
//! - The terminal research report
//! - Workflow instance identifiers

use chrono::{DateTime, Local, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::GenerationError;

/// Unique workflow instance identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Ulid);

impl WorkflowId {
    /// Generate new workflow ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A research plan: topic plus ordered queries
///
/// Immutable once constructed. `confirmed` is true only when a human has
/// accepted this exact topic/query set through the confirmation gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchTask {
    topic: String,
    queries: Vec<String>,
    confirmed: bool,
}

impl ResearchTask {
    /// Create an unconfirmed candidate task
    #[inline]
    #[must_use]
    pub fn draft(topic: impl Into<String>, queries: Vec<String>) -> Self {
        Self {
            topic: topic.into(),
            queries,
            confirmed: false,
        }
    }

    /// Build the confirmed counterpart of this exact task
    #[must_use]
    pub(crate) fn into_confirmed(self) -> Self {
        Self {
            confirmed: true,
            ..self
        }
    }

    /// Research subject label
    #[inline]
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Queries in presentation and execution order
    #[inline]
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Whether a human accepted this task
    #[inline]
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Queries rendered one per line
    #[must_use]
    pub fn queries_joined(&self) -> String {
        self.queries.join("\n")
    }
}

/// Shape the generation backend is asked to produce for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDraft {
    /// Short research topic label
    pub topic: String,
    /// Specific queries to answer, in order
    pub queries: Vec<String>,
    /// Ignored on input; tasks always start unconfirmed
    #[serde(default)]
    pub confirmed_by_user: Option<bool>,
}

impl TaskDraft {
    /// Convert backend output into an unconfirmed task
    ///
    /// The confirmation flag claimed by the backend is discarded.
    ///
    /// # Errors
    /// `GenerationError::Schema` if the topic is blank
    pub fn into_task(self) -> Result<ResearchTask, GenerationError> {
        if self.topic.trim().is_empty() {
            return Err(GenerationError::Schema("task topic is empty".to_string()));
        }
        if self.confirmed_by_user == Some(true) {
            tracing::warn!(topic = %self.topic, "backend claimed user confirmation; ignoring");
        }
        Ok(ResearchTask::draft(self.topic, self.queries))
    }
}

/// Terminal artifact of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// Topic copied from the confirmed task
    pub topic: String,
    /// Synthesized findings, verbatim from the backend
    pub findings: String,
    /// Creation instant; display only
    pub generated_at: DateTime<Utc>,
}

impl ResearchReport {
    /// Create report stamped with the current instant
    #[inline]
    #[must_use]
    pub fn new(topic: impl Into<String>, findings: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            findings: findings.into(),
            generated_at: Utc::now(),
        }
    }

    /// Human-readable content with the date in the viewer's local zone
    #[must_use]
    pub fn content(&self) -> String {
        let date = self
            .generated_at
            .with_timezone(&Local)
            .format("%A, %B %d, %Y");
        format!(
            "Topic : {}\nFindings : {}\n {}",
            self.topic, self.findings, date
        )
        .trim()
        .to_string()
    }
}

impl PartialEq for ResearchReport {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.findings == other.findings
    }
}

impl Eq for ResearchReport {}

impl std::fmt::Display for ResearchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content())
    }
}
