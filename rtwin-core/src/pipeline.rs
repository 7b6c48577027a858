//! Researcher profile pipeline
//!
//! Resolves the foreign author id when it is missing, fans out to every
//! configured source concurrently, then runs the pure merge, dedup,
//! normalization and scoring steps over whatever came back. A failed source
//! only sparsifies the profile; its status is reported per source.

use crate::affiliation_merger::AffiliationMerger;
use crate::artifact_dedup::deduplicate;
use crate::artifact_normalizer::{normalize_artifact, normalize_repository, top_repositories};
use crate::bibliometrics::merge_bibliometrics;
use crate::identity_resolver::{IdentityResolver, Resolution};
use crate::impact_scorer::{FieldMedians, ImpactScorer};
use crate::sources::nominatim::geocode_affiliation;
use crate::sources::{
    with_deadline, AffiliationSource, ArtifactSource, AuthorIndex, BibliometricSource, Geocoder,
    RepositorySource, WorksSource,
};
use crate::types::{
    AffiliationRecord, ArtifactRecord, BibliometricRecord, FetchOutcome,
    LocatedAffiliation, PersonIdentity, RawArtifact, RawRepository, ResearcherScore, SourceFailure,
    SourceName, SourceStatus,
};
use futures::future::join_all;
use rtwin_common::TomlConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source wiring for one pipeline
///
/// Every slot is optional; an empty slot reports `not_configured`.
#[derive(Clone, Default)]
pub struct ProfileSources {
    /// Known-profile works (ORCID), used for identity resolution
    pub works: Option<Arc<dyn WorksSource>>,
    /// Foreign author index (Semantic Scholar), used for identity resolution
    pub author_index: Option<Arc<dyn AuthorIndex>>,
    /// Primary bibliometrics (Semantic Scholar)
    pub bibliometrics: Option<Arc<dyn BibliometricSource>>,
    /// Secondary bibliometrics (scholar profile)
    pub scholar: Option<Arc<dyn BibliometricSource>>,
    pub artifacts: Option<Arc<dyn ArtifactSource>>,
    pub repositories: Option<Arc<dyn RepositorySource>>,
    pub affiliations: Vec<Arc<dyn AffiliationSource>>,
    pub geocoder: Option<Arc<dyn Geocoder>>,
}

/// Tunables for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bound on each whole-source fetch
    pub source_deadline: Duration,
    /// Bound on each single resolver call
    pub call_timeout: Duration,
    pub max_dois: usize,
    pub similarity_threshold: f64,
    pub max_repositories: usize,
    pub medians: FieldMedians,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            source_deadline: config.http.source_deadline(),
            call_timeout: config.http.timeout(),
            max_dois: config.resolver.max_dois,
            similarity_threshold: config.merge.similarity_threshold,
            max_repositories: config.scoring.max_repositories,
            medians: FieldMedians::from_config(&config.scoring),
        }
    }
}

/// Everything known about one researcher after a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearcherProfile {
    /// Input identity plus any resolved identifiers
    pub identity: PersonIdentity,
    /// Present when resolution was attempted
    pub resolution: Option<Resolution>,
    pub bibliometrics: Option<BibliometricRecord>,
    pub affiliations: Vec<LocatedAffiliation>,
    /// Deduplicated, normalized artifacts
    pub artifacts: Vec<ArtifactRecord>,
    /// Scored repositories
    pub repositories: Vec<ArtifactRecord>,
    pub score: ResearcherScore,
    pub sources: BTreeMap<SourceName, SourceStatus>,
}

/// Already-fetched inputs for offline scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreBundle {
    pub artifacts: Vec<RawArtifact>,
    pub repositories: Vec<RawRepository>,
    pub bibliometrics: Option<BibliometricRecord>,
    pub scholar: Option<BibliometricRecord>,
}

/// Dedup, normalize and score raw artifacts and repositories
///
/// Every deposited artifact lands in the dataset list whatever its declared
/// type; the type only picks the field median.
fn score_inputs(
    raw_artifacts: &[RawArtifact],
    raw_repositories: &[RawRepository],
    bibliometrics: Option<&BibliometricRecord>,
    settings: &PipelineSettings,
) -> (Vec<ArtifactRecord>, Vec<ArtifactRecord>, ResearcherScore) {
    let artifacts: Vec<ArtifactRecord> = deduplicate(raw_artifacts)
        .iter()
        .map(normalize_artifact)
        .collect();
    let repositories: Vec<ArtifactRecord> =
        top_repositories(raw_repositories, settings.max_repositories)
            .iter()
            .map(normalize_repository)
            .collect();

    let score = ImpactScorer::new(settings.medians.clone()).score_researcher(
        &artifacts,
        &repositories,
        bibliometrics,
    );
    (artifacts, repositories, score)
}

/// Score an offline bundle; no network
pub fn score_bundle(bundle: &ScoreBundle, settings: &PipelineSettings) -> ResearcherScore {
    let bibliometrics =
        merge_bibliometrics(bundle.bibliometrics.clone(), bundle.scholar.clone());
    let (_, _, score) = score_inputs(
        &bundle.artifacts,
        &bundle.repositories,
        bibliometrics.as_ref(),
        settings,
    );
    score
}

async fn fetch_optional<T, F>(
    slot: Option<F>,
    deadline: Duration,
) -> FetchOutcome<T>
where
    F: std::future::Future<Output = FetchOutcome<T>>,
{
    match slot {
        Some(call) => with_deadline(deadline, call).await,
        None => FetchOutcome::Unavailable(SourceFailure::NotConfigured),
    }
}

pub struct ProfilePipeline {
    sources: ProfileSources,
    settings: PipelineSettings,
}

impl ProfilePipeline {
    pub fn new(sources: ProfileSources, settings: PipelineSettings) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fill in the Semantic Scholar id from the ORCID when it is missing
    async fn resolve_identity(&self, person: &PersonIdentity) -> (PersonIdentity, Option<Resolution>) {
        if person.identifier(SourceName::SemanticScholar).is_some() {
            return (person.clone(), None);
        }
        let (Some(orcid), Some(works), Some(authors)) = (
            person.identifier(SourceName::Orcid),
            self.sources.works.as_ref(),
            self.sources.author_index.as_ref(),
        ) else {
            return (person.clone(), None);
        };

        let resolver = IdentityResolver::new(
            Arc::clone(works),
            Arc::clone(authors),
            self.settings.max_dois,
            self.settings.call_timeout,
        );
        let resolution = resolver.resolve(orcid, &person.display_name).await;
        let resolved = match resolution.foreign_id() {
            Some(id) => {
                info!(orcid = %orcid, s2_id = %id, "Resolved Semantic Scholar id");
                person.with_identifier(SourceName::SemanticScholar, id)
            }
            None => {
                warn!(orcid = %orcid, resolution = ?resolution, "Semantic Scholar id unresolved");
                person.clone()
            }
        };
        (resolved, Some(resolution))
    }

    /// Geocode merged affiliations one at a time (the geocoder is rate limited)
    async fn locate(&self, affiliations: Vec<AffiliationRecord>) -> Vec<LocatedAffiliation> {
        let mut located = Vec::with_capacity(affiliations.len());
        for affiliation in affiliations {
            let location = match &self.sources.geocoder {
                Some(geocoder) => geocode_affiliation(geocoder.as_ref(), &affiliation).await,
                None => None,
            };
            located.push(LocatedAffiliation {
                affiliation,
                location,
            });
        }
        located
    }

    /// Build the full profile for `person`
    pub async fn build_profile(&self, person: &PersonIdentity) -> ResearcherProfile {
        info!(name = %person.display_name, "Building researcher profile");
        let (identity, resolution) = self.resolve_identity(person).await;
        let deadline = self.settings.source_deadline;

        let mut affiliation_sources = self.sources.affiliations.clone();
        affiliation_sources.sort_by_key(|s| s.source().affiliation_rank());

        let (primary, scholar, artifacts, repositories, affiliation_lists) = tokio::join!(
            fetch_optional(
                self.sources.bibliometrics.as_ref().map(|s| s.bibliometrics(&identity)),
                deadline
            ),
            fetch_optional(
                self.sources.scholar.as_ref().map(|s| s.bibliometrics(&identity)),
                deadline
            ),
            fetch_optional(
                self.sources.artifacts.as_ref().map(|s| s.artifacts(&identity)),
                deadline
            ),
            fetch_optional(
                self.sources.repositories.as_ref().map(|s| s.repositories(&identity)),
                deadline
            ),
            join_all(
                affiliation_sources
                    .iter()
                    .map(|s| with_deadline(deadline, s.affiliations(&identity)))
            ),
        );

        let mut sources: BTreeMap<SourceName, SourceStatus> = BTreeMap::new();
        let mut record_status = |source: SourceName, status: SourceStatus| {
            if let SourceStatus::Unavailable(failure) = &status {
                warn!(source = %source, failure = %failure, "Source unavailable");
            }
            // A source serving several roles is connected if any role succeeded
            let entry = sources.entry(source).or_insert_with(|| status.clone());
            if status == SourceStatus::Connected {
                *entry = SourceStatus::Connected;
            }
        };

        let primary_source = self
            .sources
            .bibliometrics
            .as_ref()
            .map_or(SourceName::SemanticScholar, |s| s.source());
        let scholar_source = self
            .sources
            .scholar
            .as_ref()
            .map_or(SourceName::GoogleScholar, |s| s.source());
        record_status(primary_source, primary.status());
        record_status(scholar_source, scholar.status());
        record_status(SourceName::Figshare, artifacts.status());
        record_status(SourceName::Github, repositories.status());

        let mut per_source = Vec::with_capacity(affiliation_lists.len());
        for (source, outcome) in affiliation_sources.iter().zip(affiliation_lists) {
            record_status(source.source(), outcome.status());
            per_source.push(outcome.or_empty());
        }

        let merged = AffiliationMerger::new(self.settings.similarity_threshold).merge(&per_source);
        debug!(merged = merged.len(), "Affiliations merged");
        let affiliations = self.locate(merged).await;

        let bibliometrics = merge_bibliometrics(primary.fetched(), scholar.fetched());
        let (artifacts, repositories, score) = score_inputs(
            &artifacts.or_empty(),
            &repositories.or_empty(),
            bibliometrics.as_ref(),
            &self.settings,
        );

        info!(
            name = %identity.display_name,
            s_index = score.s_index,
            artifacts = artifacts.len(),
            repositories = repositories.len(),
            affiliations = affiliations.len(),
            "Researcher profile built"
        );

        ResearcherProfile {
            identity,
            resolution,
            bibliometrics,
            affiliations,
            artifacts,
            repositories,
            score,
            sources,
        }
    }
}
