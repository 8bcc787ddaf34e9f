use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::review::catalogue::ReferenceCatalogue;
use crate::review::domain::{
    ComplianceReference, Document, Issue, IssueOffset, Severity,
};
use crate::review::matcher::ReferenceMatcher;
use crate::review::pipeline::ComplianceReviewService;
use crate::review::provider::{ComplianceProvider, ProviderError, ProviderFactory};
use crate::review::router::{review_router, ReviewApi};

pub(super) const ICF_DOCUMENT_TEXT: &str = "The subject was not informed of risks.";

pub(super) fn icf_document() -> Document {
    Document::new("d2", ICF_DOCUMENT_TEXT)
}

pub(super) fn subject_issue() -> Issue {
    Issue {
        description: "Risk disclosure to the subject is missing".to_string(),
        quoted_text: "subject".to_string(),
        offset: IssueOffset::new(4, 11),
        severity: Some(Severity::Violation),
    }
}

/// Low threshold so the short fixture text still clears it against the
/// bundled references.
pub(super) const TEST_MIN_CONFIDENCE: f32 = 0.05;

pub(super) fn matcher() -> ReferenceMatcher {
    ReferenceMatcher::new(ReferenceCatalogue::bundled(), TEST_MIN_CONFIDENCE)
}

pub(super) fn build_service(provider: Arc<dyn ComplianceProvider>) -> ComplianceReviewService {
    ComplianceReviewService::new(
        matcher(),
        Arc::new(ProviderFactory::with_adapter(provider)),
        Duration::from_secs(5),
    )
}

pub(super) fn build_router(provider: Arc<dyn ComplianceProvider>) -> axum::Router {
    let api = ReviewApi {
        service: Arc::new(build_service(provider)),
        project_name: "Compliance Review Service".to_string(),
    };
    review_router(api, "/api/v1")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Adapter double that replays a fixed issue list.
pub(super) struct ScriptedProvider {
    pub(super) issues: Vec<Issue>,
}

#[async_trait]
impl ComplianceProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn analyze(
        &self,
        document: &Document,
        _reference: &ComplianceReference,
    ) -> Result<Vec<Issue>, ProviderError> {
        if document.content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.issues.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum FailMode {
    Unavailable,
    Rejected,
    Quota,
    Internal,
}

/// Adapter double that always fails with the requested error kind.
pub(super) struct FailingProvider {
    pub(super) mode: FailMode,
}

#[async_trait]
impl ComplianceProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn analyze(
        &self,
        _document: &Document,
        _reference: &ComplianceReference,
    ) -> Result<Vec<Issue>, ProviderError> {
        Err(match self.mode {
            FailMode::Unavailable => ProviderError::UpstreamUnavailable {
                backend: "failing",
                detail: "connection refused".to_string(),
            },
            FailMode::Rejected => ProviderError::UpstreamRejected {
                backend: "failing",
                detail: "not json".to_string(),
            },
            FailMode::Quota => ProviderError::QuotaExceeded { backend: "failing" },
            FailMode::Internal => ProviderError::Internal {
                backend: "failing",
                detail: "panic in adapter".to_string(),
            },
        })
    }
}

/// Adapter double that sleeps past any small review budget.
pub(super) struct SlowProvider {
    pub(super) delay: Duration,
}

#[async_trait]
impl ComplianceProvider for SlowProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn analyze(
        &self,
        _document: &Document,
        _reference: &ComplianceReference,
    ) -> Result<Vec<Issue>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
