//! Compliance review of clinical documents.
//!
//! One request flows `Document → matcher → (Document, ComplianceReference)
//! → provider adapter → normalised issue list`. The catalogue and the
//! factory's selected adapter are built once at startup and shared
//! immutably across requests; everything else is per-request state.

pub mod catalogue;
pub mod domain;
pub mod matcher;
pub mod pipeline;
pub mod provider;
pub mod router;

#[cfg(test)]
mod tests;

pub use catalogue::{CatalogueError, ReferenceCatalogue};
pub use domain::{
    ComplianceReference, Document, DocumentMetadata, Issue, IssueOffset, ReviewOutcome,
    ReviewStatus, Severity,
};
pub use matcher::{MatchedReference, ReferenceMatcher};
pub use pipeline::{ComplianceReviewService, ReviewError};
pub use provider::{
    ComplianceProvider, ProcessorKind, ProcessorSelection, ProviderError, ProviderFactory,
};
pub use router::{review_router, ReviewApi};
