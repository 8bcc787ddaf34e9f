use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::domain::{Document, Issue, ReviewOutcome};
use super::matcher::ReferenceMatcher;
use super::provider::{ProviderError, ProviderFactory};

/// End-to-end orchestration of one review request: validate, match, run the
/// active adapter under the overall budget, normalise the result.
///
/// The service itself is stateless per request; the matcher's catalogue and
/// the factory's adapter are process-scoped and immutable after init.
pub struct ComplianceReviewService {
    matcher: ReferenceMatcher,
    factory: Arc<ProviderFactory>,
    review_budget: Duration,
}

impl ComplianceReviewService {
    pub fn new(
        matcher: ReferenceMatcher,
        factory: Arc<ProviderFactory>,
        review_budget: Duration,
    ) -> Self {
        Self {
            matcher,
            factory,
            review_budget,
        }
    }

    pub async fn review(&self, document: &Document) -> Result<ReviewOutcome, ReviewError> {
        if document.id.trim().is_empty() {
            return Err(ReviewError::MissingDocumentId);
        }

        let Some(matched) = self.matcher.best_match(document) else {
            info!(document_id = %document.id, "no compliance reference above threshold");
            return Ok(ReviewOutcome::no_match());
        };
        info!(
            document_id = %document.id,
            reference_id = %matched.reference.id,
            confidence = matched.confidence,
            "matched compliance reference"
        );

        let provider = self.factory.get_service();
        let analysis = tokio::time::timeout(
            self.review_budget,
            provider.analyze(document, &matched.reference),
        )
        .await;

        let issues = match analysis {
            Ok(Ok(issues)) => issues,
            Ok(Err(err)) => {
                error!(backend = err.backend(), error = %err, "compliance analysis failed");
                return Err(ReviewError::Provider(err));
            }
            Err(_) => {
                let err = ProviderError::UpstreamUnavailable {
                    backend: provider.name(),
                    detail: format!(
                        "analysis exceeded the {}s review budget",
                        self.review_budget.as_secs()
                    ),
                };
                error!(backend = provider.name(), error = %err, "compliance analysis timed out");
                return Err(ReviewError::Provider(err));
            }
        };

        let issues =
            normalize_issues(&document.content, issues, provider.name()).map_err(|err| {
                error!(backend = err.backend(), error = %err, "adapter returned invalid issues");
                ReviewError::Provider(err)
            })?;
        Ok(ReviewOutcome::reviewed(matched.reference.id, issues))
    }
}

/// Enforce the issue invariants before anything leaves the pipeline:
/// every offset must be a valid char-boundary byte range whose slice equals
/// the quoted text exactly; the list is sorted (start ascending, longer
/// range first, then description) and duplicate offset+description pairs
/// are removed.
pub fn normalize_issues(
    content: &str,
    mut issues: Vec<Issue>,
    backend: &'static str,
) -> Result<Vec<Issue>, ProviderError> {
    for issue in &issues {
        let Issue {
            offset, quoted_text, ..
        } = issue;
        let valid = offset.start < offset.end
            && offset.end <= content.len()
            && content.is_char_boundary(offset.start)
            && content.is_char_boundary(offset.end)
            && &content[offset.start..offset.end] == quoted_text.as_str();
        if !valid {
            return Err(ProviderError::UpstreamRejected {
                backend,
                detail: format!(
                    "issue offset {}..{} does not verify against the document content",
                    offset.start, offset.end
                ),
            });
        }
    }

    issues.sort_by(issue_order);
    issues.dedup_by(|next, kept| next.offset == kept.offset && next.description == kept.description);

    Ok(issues)
}

/// Ascending start, longer range first on ties, then description.
pub fn issue_order(a: &Issue, b: &Issue) -> Ordering {
    a.offset
        .start
        .cmp(&b.offset.start)
        .then_with(|| b.offset.end.cmp(&a.offset.end))
        .then_with(|| a.description.cmp(&b.description))
}

/// Error raised by the review pipeline. Retryable variants map to 502 at
/// the HTTP layer, the rest to 400/500.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("document id must not be empty")]
    MissingDocumentId,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ReviewError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewError::Provider(err) => err.is_retryable(),
            ReviewError::MissingDocumentId => false,
        }
    }
}
