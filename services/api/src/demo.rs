use clap::Args;
use compliance_ai::error::AppError;
use compliance_ai::review::{Document, ReferenceCatalogue, ReferenceMatcher};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// Document to preview, read from a text file
    #[arg(long, conflicts_with = "text")]
    pub(crate) file: Option<PathBuf>,
    /// Document text passed inline
    #[arg(long)]
    pub(crate) text: Option<String>,
    /// Optional document title (feeds the matcher's title boost)
    #[arg(long)]
    pub(crate) title: Option<String>,
    /// Directory of reference documents; bundled set when omitted
    #[arg(long)]
    pub(crate) reference_dir: Option<PathBuf>,
    /// Minimum confidence before a reference is accepted
    #[arg(long, default_value_t = 0.35)]
    pub(crate) min_confidence: f32,
}

/// Offline preview of the matcher stage: no provider credentials needed.
pub(crate) fn run_match_preview(args: MatchArgs) -> Result<(), AppError> {
    let MatchArgs {
        file,
        text,
        title,
        reference_dir,
        min_confidence,
    } = args;

    let content = match (file, text) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(text)) => text,
        (None, None) => {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "pass --file or --text",
            )))
        }
    };

    let catalogue = ReferenceCatalogue::load(reference_dir.as_deref())?;
    let matcher = ReferenceMatcher::new(catalogue, min_confidence);

    let mut document = Document::new("preview", content);
    document.metadata.title = title;

    println!("Compliance reference preview");
    println!("============================");
    println!(
        "Catalogue: {} reference(s), threshold {:.2}",
        matcher.catalogue().len(),
        min_confidence
    );
    println!();

    match matcher.best_match(&document) {
        Some(matched) => {
            println!("Best match : {}", matched.reference.id);
            if let Some(title) = &matched.reference.title {
                println!("Title      : {title}");
            }
            println!("Confidence : {:.3}", matched.confidence);
        }
        None => {
            println!("No reference cleared the threshold; a review request");
            println!("for this document would return no_matching_reference.");
        }
    }

    Ok(())
}
