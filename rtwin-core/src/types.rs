//! Core value types for identity resolution, merging and scoring
//!
//! Every record here is an immutable value: produced once by a fetcher or a
//! pure transform, consumed downstream, never mutated in place. All types are
//! JSON-compatible so the service layer can forward them unchanged.

use rtwin_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

// ============================================================================
// Sources
// ============================================================================

/// Upstream record sources the core knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    Orcid,
    SemanticScholar,
    GoogleScholar,
    OpenAlex,
    Figshare,
    Github,
    Nominatim,
}

impl SourceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Orcid => "orcid",
            SourceName::SemanticScholar => "semantic_scholar",
            SourceName::GoogleScholar => "google_scholar",
            SourceName::OpenAlex => "openalex",
            SourceName::Figshare => "figshare",
            SourceName::Github => "github",
            SourceName::Nominatim => "nominatim",
        }
    }

    /// Affiliation richness rank (lower = richer, merged first)
    ///
    /// Self-reported employment history carries city/country and dates,
    /// citation-graph inference carries country, the author index only
    /// reports bare current institution names.
    pub fn affiliation_rank(&self) -> u8 {
        match self {
            SourceName::Orcid => 0,
            SourceName::OpenAlex => 1,
            SourceName::SemanticScholar => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a source contributed nothing
///
/// Never raised to callers; carried inside [`FetchOutcome::Unavailable`] and
/// surfaced as per-source status.
#[derive(Debug, Clone, PartialEq, Eq, ThisError, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFailure {
    /// No identifier for this source on the researcher record
    #[error("not configured")]
    NotConfigured,

    #[error("timed out")]
    Timeout,

    /// Still rate limited after the single retry
    #[error("rate limited")]
    RateLimited,

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Discriminated result of one call into a source fetcher
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Unavailable(SourceFailure),
}

impl<T> FetchOutcome<T> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, FetchOutcome::Fetched(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Fetched(v) => FetchOutcome::Fetched(f(v)),
            FetchOutcome::Unavailable(e) => FetchOutcome::Unavailable(e),
        }
    }

    /// Fetched value, or `None` when the source was unavailable
    pub fn fetched(self) -> Option<T> {
        match self {
            FetchOutcome::Fetched(v) => Some(v),
            FetchOutcome::Unavailable(_) => None,
        }
    }

    /// Status summary for reporting
    pub fn status(&self) -> SourceStatus {
        match self {
            FetchOutcome::Fetched(_) => SourceStatus::Connected,
            FetchOutcome::Unavailable(e) => SourceStatus::Unavailable(e.clone()),
        }
    }
}

impl<T: Default> FetchOutcome<T> {
    /// Degrade an unavailable source to its empty value
    pub fn or_empty(self) -> T {
        self.fetched().unwrap_or_default()
    }
}

/// Per-source status reported alongside a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Connected,
    Unavailable(SourceFailure),
}

// ============================================================================
// Identity
// ============================================================================

/// A person as known to the caller: display name plus per-source identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentity {
    pub display_name: String,
    #[serde(default)]
    pub identifiers: Vec<(SourceName, String)>,
}

impl PersonIdentity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            identifiers: Vec::new(),
        }
    }

    /// Copy of this identity with one more identifier appended
    ///
    /// Blank identifiers are ignored.
    pub fn with_identifier(&self, source: SourceName, id: impl Into<String>) -> Self {
        let id = id.into();
        let mut next = self.clone();
        if !id.trim().is_empty() {
            next.identifiers.push((source, id.trim().to_string()));
        }
        next
    }

    /// First identifier recorded for `source`
    pub fn identifier(&self, source: SourceName) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, id)| id.as_str())
    }
}

/// Author entry as reported by the foreign author index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub author_id: String,
    pub name: String,
}

// ============================================================================
// Affiliations
// ============================================================================

/// One institution a person is (or was) affiliated with
///
/// Deserialization goes through [`AffiliationRecord::new`], so a blank
/// institution is rejected there too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AffiliationFields")]
pub struct AffiliationRecord {
    pub institution: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub is_current: bool,
    pub source: SourceName,
}

impl AffiliationRecord {
    /// Build a record; the institution name must be non-blank
    pub fn new(institution: impl Into<String>, is_current: bool, source: SourceName) -> Result<Self> {
        let institution = institution.into().trim().to_string();
        if institution.is_empty() {
            return Err(Error::InvalidInput(
                "affiliation institution must be non-empty".to_string(),
            ));
        }
        Ok(Self {
            institution,
            city: None,
            country: None,
            is_current,
            source,
        })
    }

    pub fn with_location(mut self, city: Option<String>, country: Option<String>) -> Self {
        self.city = city.filter(|c| !c.trim().is_empty());
        self.country = country.filter(|c| !c.trim().is_empty());
        self
    }
}

#[derive(Deserialize)]
struct AffiliationFields {
    institution: String,
    city: Option<String>,
    country: Option<String>,
    is_current: bool,
    source: SourceName,
}

impl TryFrom<AffiliationFields> for AffiliationRecord {
    type Error = Error;

    fn try_from(fields: AffiliationFields) -> Result<Self> {
        Ok(AffiliationRecord::new(fields.institution, fields.is_current, fields.source)?
            .with_location(fields.city, fields.country))
    }
}

/// Geocoded coordinates for an affiliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
}

/// Affiliation with its (optional) map position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedAffiliation {
    #[serde(flatten)]
    pub affiliation: AffiliationRecord,
    pub location: Option<GeoPoint>,
}

// ============================================================================
// Artifacts
// ============================================================================

/// Raw repository item as listed by an artifact provider (e.g. Figshare)
///
/// Carries everything dedup grouping and normalization need.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtifact {
    pub id: String,
    pub title: String,
    /// Provider's declared type ("dataset", "figure", "software", ...)
    pub declared_type: String,
    pub authors: Vec<String>,
    pub downloads: u64,
    pub views: u64,
    pub doi: Option<String>,
    pub license: Option<String>,
    pub description: String,
    pub categories: Vec<String>,
    pub files_count: u32,
    pub url: String,
}

impl RawArtifact {
    /// Dedup reuse signal
    pub fn reuse_signal(&self) -> u64 {
        self.downloads.saturating_add(self.views)
    }
}

/// Raw source-code repository (e.g. GitHub)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRepository {
    pub name: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub has_license: bool,
    pub has_readme: bool,
    pub is_fork: bool,
    pub url: String,
}

/// Normalized artifact type used for field medians
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Dataset,
    Code,
    Other,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Dataset => "dataset",
            ArtifactType::Code => "code",
            ArtifactType::Other => "other",
        }
    }
}

/// Normalized artifact, ready for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub title: String,
    pub source_type: ArtifactType,
    pub is_public: bool,
    pub has_license: bool,
    pub has_doi: bool,
    pub has_readme: bool,
    pub is_standard_format: bool,
    pub reuse_events: u64,
    /// ≥ 1 after normalization
    pub n_authors: u32,
    /// ≥ 1 after normalization
    pub n_institutions: u32,
    pub authors: Vec<String>,
    pub declared_type: String,
}

// ============================================================================
// Bibliometrics
// ============================================================================

/// One paper in a bibliometric record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub year: Option<i32>,
    pub citations: u64,
    #[serde(default)]
    pub url: String,
    pub source: SourceName,
}

/// Author-level bibliometrics from one or more sources
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BibliometricRecord {
    pub name: String,
    pub paper_count: u64,
    pub citation_count: u64,
    pub h_index: u32,
    pub i10_index: u32,
    pub top_papers: Vec<PaperRecord>,
    /// Sources that contributed to this record
    pub sources: Vec<SourceName>,
}

// ============================================================================
// Scores
// ============================================================================

/// Per-artifact score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub quality: f64,
    pub impact: f64,
    pub collaboration: f64,
    /// Public and licensed
    pub fair_gate: bool,
    pub composite_score: f64,
}

/// Score for one named artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArtifact {
    pub title: String,
    pub source_type: ArtifactType,
    pub reuse_events: u64,
    pub score: ScoreResult,
}

/// Counts and bibliometric headline numbers reported with the S-index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_datasets: usize,
    pub total_repos_scored: usize,
    pub h_index: u32,
    pub i10_index: u32,
    pub total_citations: u64,
    pub total_papers: u64,
}

/// Researcher-level score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearcherScore {
    pub s_index: f64,
    pub paper_impact: f64,
    pub dataset_scores: Vec<ScoredArtifact>,
    pub repo_scores: Vec<ScoredArtifact>,
    pub summary: ScoreSummary,
}
