//! Provider adapters behind a single compliance-analysis capability.
//!
//! An adapter receives one `(Document, ComplianceReference)` pair and
//! returns compliance issues anchored to byte offsets in the document
//! content. The factory selects one adapter per process from the
//! `PDF_PROCESSOR` configuration value and memoises it.

pub mod azure;
pub mod gemini;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::domain::{ComplianceReference, Document, Issue, IssueOffset, Severity};

pub use azure::AzureProvider;
pub use gemini::GeminiProvider;

/// The compliance-analysis capability every backend implements.
#[async_trait]
pub trait ComplianceProvider: Send + Sync {
    /// Stable backend name used in logs and error payloads.
    fn name(&self) -> &'static str;

    /// Analyse one document against one reference. Empty document content
    /// must return an empty list without touching the network.
    async fn analyze(
        &self,
        document: &Document,
        reference: &ComplianceReference,
    ) -> Result<Vec<Issue>, ProviderError>;
}

/// Adapter failure taxonomy. `UpstreamUnavailable` and `QuotaExceeded` are
/// retryable from the caller's point of view; the rest are not.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{backend} unreachable: {detail}")]
    UpstreamUnavailable {
        backend: &'static str,
        detail: String,
    },
    #[error("{backend} returned an unusable response: {detail}")]
    UpstreamRejected {
        backend: &'static str,
        detail: String,
    },
    #[error("{backend} rate or credit quota exhausted")]
    QuotaExceeded { backend: &'static str },
    #[error("adapter fault in {backend}: {detail}")]
    Internal {
        backend: &'static str,
        detail: String,
    },
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::UpstreamUnavailable { .. } | ProviderError::QuotaExceeded { .. }
        )
    }

    pub fn backend(&self) -> &'static str {
        match self {
            ProviderError::UpstreamUnavailable { backend, .. }
            | ProviderError::UpstreamRejected { backend, .. }
            | ProviderError::QuotaExceeded { backend }
            | ProviderError::Internal { backend, .. } => backend,
        }
    }
}

/// Named provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Azure,
    Gemini,
}

impl ProcessorKind {
    /// The designated default when `PDF_PROCESSOR` is unset or unrecognised.
    pub const CANONICAL_FALLBACK: ProcessorKind = ProcessorKind::Gemini;

    pub fn label(&self) -> &'static str {
        match self {
            ProcessorKind::Azure => "azure",
            ProcessorKind::Gemini => "gemini",
        }
    }
}

/// Outcome of parsing the `PDF_PROCESSOR` configuration value.
#[derive(Debug, Clone)]
pub struct ProcessorSelection {
    /// The raw configured value, kept for the fallback log line.
    pub requested: String,
    pub resolved: ProcessorKind,
    pub fallback: bool,
}

impl ProcessorSelection {
    /// Case-insensitive; unknown names degrade to the canonical fallback.
    /// An unset (empty) value counts as the default, not a fallback.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "azure" => Self {
                requested: trimmed.to_string(),
                resolved: ProcessorKind::Azure,
                fallback: false,
            },
            "gemini" => Self {
                requested: trimmed.to_string(),
                resolved: ProcessorKind::Gemini,
                fallback: false,
            },
            "" => Self {
                requested: String::new(),
                resolved: ProcessorKind::CANONICAL_FALLBACK,
                fallback: false,
            },
            _ => Self {
                requested: trimmed.to_string(),
                resolved: ProcessorKind::CANONICAL_FALLBACK,
                fallback: true,
            },
        }
    }
}

/// Process-wide adapter selection. Builds the adapter lazily on first use
/// and hands out the same instance afterwards; never fails.
pub struct ProviderFactory {
    selection: ProcessorSelection,
    adapter: OnceLock<Arc<dyn ComplianceProvider>>,
}

impl ProviderFactory {
    pub fn new(selection: ProcessorSelection) -> Self {
        Self {
            selection,
            adapter: OnceLock::new(),
        }
    }

    /// Inject a pre-built adapter instead of resolving from configuration.
    pub fn with_adapter(provider: Arc<dyn ComplianceProvider>) -> Self {
        let adapter = OnceLock::new();
        let _ = adapter.set(provider);
        Self {
            selection: ProcessorSelection::parse(""),
            adapter,
        }
    }

    pub fn selection(&self) -> &ProcessorSelection {
        &self.selection
    }

    /// The active adapter for this process.
    pub fn get_service(&self) -> Arc<dyn ComplianceProvider> {
        self.adapter
            .get_or_init(|| {
                if self.selection.fallback {
                    warn!(
                        requested = %self.selection.requested,
                        actual = self.selection.resolved.label(),
                        "unrecognised PDF_PROCESSOR, falling back to canonical default"
                    );
                } else {
                    info!(
                        processor = self.selection.resolved.label(),
                        "compliance processor selected"
                    );
                }
                match self.selection.resolved {
                    ProcessorKind::Azure => Arc::new(AzureProvider::from_env()),
                    ProcessorKind::Gemini => Arc::new(GeminiProvider::from_env()),
                }
            })
            .clone()
    }
}

/// One finding as the model reports it, before offsets are resolved.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFinding {
    pub(crate) description: String,
    pub(crate) quoted_text: String,
    #[serde(default)]
    pub(crate) severity: Option<Severity>,
}

#[derive(Debug, Deserialize)]
struct FindingsEnvelope {
    issues: Vec<RawFinding>,
}

/// Shared instruction block sent to every backend.
pub(crate) fn compliance_prompt(document_text: &str, reference: &ComplianceReference) -> String {
    format!(
        "You are a clinical compliance reviewer. Compare the document below \
         against the compliance reference and list every passage that \
         violates or falls short of the reference.\n\
         Respond with JSON only: an object {{\"issues\": [...]}} where each \
         issue has \"description\" (why the passage is non-compliant), \
         \"quoted_text\" (the exact passage copied verbatim from the \
         document, unmodified), and optionally \"severity\" (one of \
         \"info\", \"warning\", \"violation\").\n\n\
         COMPLIANCE REFERENCE ({reference_id}):\n{reference_text}\n\n\
         DOCUMENT:\n{document_text}",
        reference_id = reference.id,
        reference_text = reference.content,
    )
}

/// Parse the model's reply into findings. Tolerates a Markdown code fence
/// and either the `{"issues": [...]}` envelope or a bare array.
pub(crate) fn parse_findings(
    backend: &'static str,
    reply: &str,
) -> Result<Vec<RawFinding>, ProviderError> {
    let body = strip_code_fence(reply);

    if let Ok(envelope) = serde_json::from_str::<FindingsEnvelope>(body) {
        return Ok(envelope.issues);
    }
    serde_json::from_str::<Vec<RawFinding>>(body).map_err(|err| ProviderError::UpstreamRejected {
        backend,
        detail: format!("findings payload is not valid JSON: {err}"),
    })
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Anchor findings to byte offsets by locating the quoted text in the
/// submitted content. Quotes that do not occur verbatim cannot satisfy the
/// offset invariant and are dropped with a warning.
pub(crate) fn locate_findings(
    backend: &'static str,
    content: &str,
    findings: Vec<RawFinding>,
) -> Vec<Issue> {
    findings
        .into_iter()
        .filter_map(|finding| {
            if finding.quoted_text.is_empty() {
                warn!(backend, "dropping finding with empty quoted_text");
                return None;
            }
            match content.find(&finding.quoted_text) {
                Some(start) => Some(Issue {
                    offset: IssueOffset::new(start, start + finding.quoted_text.len()),
                    description: finding.description,
                    quoted_text: finding.quoted_text,
                    severity: finding.severity,
                }),
                None => {
                    warn!(
                        backend,
                        quote_len = finding.quoted_text.len(),
                        "dropping finding whose quote is absent from the document content"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Map a reqwest transport failure onto the adapter taxonomy.
pub(crate) fn transport_error(backend: &'static str, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::UpstreamUnavailable {
            backend,
            detail: err.to_string(),
        }
    } else {
        ProviderError::Internal {
            backend,
            detail: err.to_string(),
        }
    }
}

/// Map a non-success HTTP status onto the adapter taxonomy.
pub(crate) fn status_error(
    backend: &'static str,
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::QuotaExceeded { backend }
    } else if status.is_server_error() {
        ProviderError::UpstreamUnavailable {
            backend,
            detail: format!("status {status}"),
        }
    } else {
        ProviderError::UpstreamRejected {
            backend,
            detail: format!("status {status}: {}", truncate(body, 200)),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
