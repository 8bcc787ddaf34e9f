use std::fs;
use std::path::{Path, PathBuf};

use super::domain::ComplianceReference;

/// Immutable, id-sorted set of compliance references known to the process.
///
/// Loaded once at startup; per-request matching only reads it. An empty
/// catalogue is valid; every review then ends in `no_matching_reference`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalogue {
    references: Vec<ComplianceReference>,
}

impl ReferenceCatalogue {
    /// Build a catalogue from explicit references. Sorts by id and keeps the
    /// first occurrence of duplicate ids so lookups stay unambiguous.
    pub fn from_references(mut references: Vec<ComplianceReference>) -> Self {
        references.sort_by(|a, b| a.id.cmp(&b.id));
        references.dedup_by(|next, kept| next.id == kept.id);
        Self { references }
    }

    /// The bundled clinical-compliance set used when no `REFERENCE_DIR` is
    /// configured.
    pub fn bundled() -> Self {
        Self::from_references(vec![
            ComplianceReference::new(
                "ref-icf-01",
                Some("Informed Consent Requirements"),
                "Informed consent must be obtained before any trial procedure. \
                 The subject must be informed of all foreseeable risks and \
                 discomforts, the expected duration of participation, and the \
                 right to withdraw at any time without penalty. Consent must \
                 be documented with a dated signature prior to enrollment.",
            ),
            ComplianceReference::new(
                "ref-pd-02",
                Some("Protocol Deviation Reporting"),
                "Any deviation from the approved protocol must be recorded and \
                 reported to the sponsor and the institutional review board. \
                 Deviations affecting subject safety or data integrity require \
                 notification within five working days, with a corrective and \
                 preventive action plan.",
            ),
            ComplianceReference::new(
                "ref-ae-03",
                Some("Adverse Event Documentation"),
                "All adverse events observed during the trial must be assessed \
                 for severity and causality, documented in the case report \
                 form, and followed until resolution. Serious adverse events \
                 must be reported to the sponsor within twenty-four hours of \
                 the site becoming aware.",
            ),
        ])
    }

    /// Load references from a directory: one `.txt` or `.md` file per
    /// reference, id taken from the file stem, title from the first
    /// non-empty line (stripped of Markdown heading markers).
    pub fn load_from_dir(dir: &Path) -> Result<Self, CatalogueError> {
        let entries = fs::read_dir(dir).map_err(|source| CatalogueError::Unavailable {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut references = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogueError::Unavailable {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let is_reference_file = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"));
            if !is_reference_file {
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|source| {
                CatalogueError::Unavailable {
                    path: path.clone(),
                    source,
                }
            })?;

            let id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("reference")
                .to_string();
            let title = content
                .lines()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim_start_matches('#').trim().to_string());

            references.push(ComplianceReference {
                id,
                title,
                content,
            });
        }

        Ok(Self::from_references(references))
    }

    /// Resolve the catalogue for the configured source.
    pub fn load(reference_dir: Option<&Path>) -> Result<Self, CatalogueError> {
        match reference_dir {
            Some(dir) => Self::load_from_dir(dir),
            None => Ok(Self::bundled()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn get(&self, id: &str) -> Option<&ComplianceReference> {
        self.references
            .binary_search_by(|reference| reference.id.as_str().cmp(id))
            .ok()
            .map(|index| &self.references[index])
    }

    /// References in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComplianceReference> {
        self.references.iter()
    }
}

/// Startup-time failure: the catalogue source exists in configuration but
/// cannot be read. Fatal to the process, never to a single request.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("reference catalogue unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}
