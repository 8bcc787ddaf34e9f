use std::collections::BTreeSet;

use rapidfuzz::distance::jaro_winkler;
use tracing::debug;

use super::catalogue::ReferenceCatalogue;
use super::domain::{ComplianceReference, Document};

/// The single best-matching reference for a document, with the confidence
/// that selected it.
#[derive(Debug, Clone)]
pub struct MatchedReference {
    pub reference: ComplianceReference,
    pub confidence: f32,
}

/// Picks the best-matching compliance reference for a clinical document.
///
/// Scoring is a bounded content-similarity measure: token-set Jaccard
/// overlap of normalised text as the base, with a Jaro-Winkler title boost
/// when the document carries a title close to a reference's. Matching is
/// deterministic for a fixed catalogue and document; numerical ties resolve
/// to the lexicographically smallest reference id.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    catalogue: ReferenceCatalogue,
    min_confidence: f32,
}

const TITLE_BOOST: f32 = 1.10;
const TITLE_BOOST_THRESHOLD: f64 = 0.85;

impl ReferenceMatcher {
    pub fn new(catalogue: ReferenceCatalogue, min_confidence: f32) -> Self {
        Self {
            catalogue,
            min_confidence,
        }
    }

    pub fn catalogue(&self) -> &ReferenceCatalogue {
        &self.catalogue
    }

    /// Return the highest-scoring reference above the configured threshold,
    /// or `None` when nothing qualifies. Empty content and an empty
    /// catalogue both yield `None`.
    pub fn best_match(&self, document: &Document) -> Option<MatchedReference> {
        if document.content.trim().is_empty() {
            return None;
        }

        let document_tokens = token_set(&document.content);
        if document_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f32, &ComplianceReference)> = None;
        // Catalogue is id-sorted; the strict `>` keeps the smallest id on ties.
        for reference in self.catalogue.iter() {
            let score = self.score(document, &document_tokens, reference);
            debug!(reference_id = %reference.id, score, "scored compliance reference");
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, reference)),
            }
        }

        best.filter(|(score, _)| *score >= self.min_confidence)
            .map(|(confidence, reference)| MatchedReference {
                reference: reference.clone(),
                confidence,
            })
    }

    fn score(
        &self,
        document: &Document,
        document_tokens: &BTreeSet<String>,
        reference: &ComplianceReference,
    ) -> f32 {
        let reference_tokens = token_set(&reference.content);
        let mut score = jaccard(document_tokens, &reference_tokens);

        if let (Some(doc_title), Some(ref_title)) =
            (document.metadata.title.as_deref(), reference.title.as_deref())
        {
            let title_similarity = jaro_winkler::similarity(
                normalize(doc_title).chars(),
                normalize(ref_title).chars(),
            );
            if title_similarity > TITLE_BOOST_THRESHOLD {
                score = (score * TITLE_BOOST).min(1.0);
            }
        }

        score
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}

/// Normalize a string for comparison: trim, lowercase, collapse separators.
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_set(s: &str) -> BTreeSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2)
        .map(str::to_string)
        .collect()
}
