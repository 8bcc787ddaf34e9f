use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinical document submitted for review. Constructed by the HTTP layer
/// and immutable for the rest of the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: DocumentMetadata::default(),
        }
    }
}

/// Informational metadata; the pipeline never parses any of it. `format` is
/// inspected only by the azure adapter to recognise binary payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// A known regulatory/protocol document used as the comparison basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

impl ComplianceReference {
    pub fn new(id: impl Into<String>, title: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            content: content.into(),
        }
    }
}

/// One compliance finding: a span of the document flagged against the
/// matched reference, with explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub description: String,
    pub quoted_text: String,
    pub offset: IssueOffset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Half-open byte range into the canonical UTF-8 encoding of
/// `Document.content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOffset {
    pub start: usize,
    pub end: usize,
}

impl IssueOffset {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Violation,
}

/// Terminal state of one review request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Reviewed,
    NoMatchingReference,
}

/// Response body of a successful review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub reference_id: Option<String>,
    pub status: ReviewStatus,
    pub issues: Vec<Issue>,
}

impl ReviewOutcome {
    pub fn no_match() -> Self {
        Self {
            reference_id: None,
            status: ReviewStatus::NoMatchingReference,
            issues: Vec::new(),
        }
    }

    pub fn reviewed(reference_id: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            reference_id: Some(reference_id.into()),
            status: ReviewStatus::Reviewed,
            issues,
        }
    }
}
