use super::common::{icf_document, matcher, TEST_MIN_CONFIDENCE};
use crate::review::catalogue::ReferenceCatalogue;
use crate::review::domain::{ComplianceReference, Document};
use crate::review::matcher::ReferenceMatcher;

#[test]
fn informed_consent_text_matches_icf_reference() {
    let matched = matcher()
        .best_match(&icf_document())
        .expect("reference matched");
    assert_eq!(matched.reference.id, "ref-icf-01");
    assert!(matched.confidence >= TEST_MIN_CONFIDENCE);
}

#[test]
fn matching_is_deterministic_across_invocations() {
    let matcher = matcher();
    let document = icf_document();

    let first = matcher.best_match(&document).expect("match");
    for _ in 0..10 {
        let again = matcher.best_match(&document).expect("match");
        assert_eq!(again.reference.id, first.reference.id);
        assert_eq!(again.confidence, first.confidence);
    }
}

#[test]
fn empty_content_yields_no_match() {
    assert!(matcher().best_match(&Document::new("d1", "")).is_none());
    assert!(matcher().best_match(&Document::new("d1", "   \n\t")).is_none());
}

#[test]
fn empty_catalogue_yields_no_match() {
    let matcher = ReferenceMatcher::new(ReferenceCatalogue::default(), TEST_MIN_CONFIDENCE);
    assert!(matcher.best_match(&icf_document()).is_none());
}

#[test]
fn threshold_filters_weak_matches() {
    let matcher = ReferenceMatcher::new(ReferenceCatalogue::bundled(), 0.99);
    assert!(matcher.best_match(&icf_document()).is_none());
}

#[test]
fn score_ties_resolve_to_smallest_reference_id() {
    let shared = "identical reference wording about consent disclosure";
    let catalogue = ReferenceCatalogue::from_references(vec![
        ComplianceReference::new("ref-zz", None, shared),
        ComplianceReference::new("ref-aa", None, shared),
    ]);
    let matcher = ReferenceMatcher::new(catalogue, 0.05);

    let matched = matcher
        .best_match(&Document::new("d1", shared))
        .expect("tie still matches");
    assert_eq!(matched.reference.id, "ref-aa");
}

#[test]
fn verbatim_reference_content_scores_highest() {
    let catalogue = ReferenceCatalogue::bundled();
    let reference = catalogue.get("ref-pd-02").expect("bundled reference");
    let document = Document::new("d-verbatim", reference.content.clone());

    let matcher = ReferenceMatcher::new(catalogue.clone(), 0.05);
    let matched = matcher.best_match(&document).expect("verbatim matches");
    assert_eq!(matched.reference.id, "ref-pd-02");
    assert!(matched.confidence > 0.9);
}

#[test]
fn title_similarity_boosts_the_score() {
    let catalogue = ReferenceCatalogue::from_references(vec![ComplianceReference::new(
        "ref-t",
        Some("Adverse Event Documentation"),
        "events must be documented and followed until resolution",
    )]);
    let matcher = ReferenceMatcher::new(catalogue, 0.0);

    let mut untitled = Document::new("d1", "events followed until resolution");
    let without = matcher.best_match(&untitled).expect("match").confidence;

    untitled.metadata.title = Some("Adverse event documentation".to_string());
    let with = matcher.best_match(&untitled).expect("match").confidence;

    assert!(with > without, "title boost should raise {without} -> {with}");
}
