//! Raw provider records → normalized [`ArtifactRecord`]s
//!
//! Provider conventions:
//! - Artifact repositories (Figshare): reuse = downloads + views / 10
//! - Code hosts (GitHub): reuse = stars + 3 × forks
//!
//! Contributor institutions are never gathered, so `n_institutions` is
//! always 1; code artifacts also count a single author.

use crate::types::{ArtifactRecord, ArtifactType, RawArtifact, RawRepository};

/// Descriptions longer than this count as README-equivalent documentation
const README_DESCRIPTION_CHARS: usize = 50;

/// Weight of one fork relative to one star
const FORK_WEIGHT: u64 = 3;

/// Views per reuse event on artifact repositories
const VIEWS_PER_REUSE: u64 = 10;

/// Map a provider's declared type onto the scoring types
pub fn artifact_type(declared: &str) -> ArtifactType {
    match declared.trim().to_lowercase().as_str() {
        "dataset" | "fileset" => ArtifactType::Dataset,
        "software" | "code" => ArtifactType::Code,
        _ => ArtifactType::Other,
    }
}

/// Normalize one artifact-repository item
pub fn normalize_artifact(raw: &RawArtifact) -> ArtifactRecord {
    let has_license = raw
        .license
        .as_deref()
        .map(|l| !l.trim().is_empty())
        .unwrap_or(false);
    let has_doi = raw
        .doi
        .as_deref()
        .map(|d| !d.trim().is_empty())
        .unwrap_or(false);

    ArtifactRecord {
        title: raw.title.clone(),
        source_type: artifact_type(&raw.declared_type),
        is_public: true,
        has_license,
        has_doi,
        has_readme: raw.description.chars().count() > README_DESCRIPTION_CHARS
            || raw.files_count > 1,
        is_standard_format: !raw.categories.is_empty(),
        reuse_events: raw.downloads.saturating_add(raw.views / VIEWS_PER_REUSE),
        n_authors: (raw.authors.len() as u32).max(1),
        n_institutions: 1,
        authors: raw.authors.clone(),
        declared_type: raw.declared_type.clone(),
    }
}

/// Normalize one code repository
pub fn normalize_repository(raw: &RawRepository) -> ArtifactRecord {
    ArtifactRecord {
        title: raw.name.clone(),
        source_type: ArtifactType::Code,
        is_public: true,
        has_license: raw.has_license,
        has_doi: false,
        has_readme: raw.has_readme,
        is_standard_format: raw
            .language
            .as_deref()
            .map(|l| !l.trim().is_empty())
            .unwrap_or(false),
        reuse_events: raw
            .stars
            .saturating_add(raw.forks.saturating_mul(FORK_WEIGHT)),
        n_authors: 1,
        n_institutions: 1,
        authors: Vec::new(),
        declared_type: "code".to_string(),
    }
}

/// Non-fork repositories, most starred first, at most `limit`
///
/// Stable on equal star counts.
pub fn top_repositories(repos: &[RawRepository], limit: usize) -> Vec<RawRepository> {
    let mut own: Vec<RawRepository> = repos.iter().filter(|r| !r.is_fork).cloned().collect();
    own.sort_by(|a, b| b.stars.cmp(&a.stars));
    own.truncate(limit);
    own
}
