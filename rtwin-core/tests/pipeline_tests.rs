// Profile pipeline integration tests
//
// End-to-end runs over in-memory fakes: resolution, concurrent fetch, merge,
// dedup and scoring, with failing and slow sources.

use std::sync::Arc;
use std::time::Duration;

use rtwin_core::pipeline::{PipelineSettings, ProfilePipeline, ProfileSources};
use rtwin_core::sources::fakes::{
    FakeAffiliations, FakeArtifacts, FakeAuthorIndex, FakeBibliometrics, FakeGeocoder,
    FakeRepositories, FakeWorks,
};
use rtwin_core::sources::AffiliationSource;
use rtwin_core::types::{
    AffiliationRecord, BibliometricRecord, PaperRecord, PersonIdentity, RawArtifact, RawRepository,
    SourceFailure, SourceName, SourceStatus,
};
use rtwin_core::Resolution;

const NAME: &str = "Martin Frasch";
const ORCID: &str = "0000-0003-3159-6321";

fn person() -> PersonIdentity {
    PersonIdentity::new(NAME).with_identifier(SourceName::Orcid, ORCID)
}

fn affiliation(name: &str, source: SourceName) -> AffiliationRecord {
    AffiliationRecord::new(name, true, source).unwrap()
}

fn s2_record() -> BibliometricRecord {
    BibliometricRecord {
        name: NAME.to_string(),
        paper_count: 120,
        citation_count: 1000,
        h_index: 4,
        i10_index: 0,
        top_papers: vec![PaperRecord {
            title: "Fetal heart rate variability in sepsis".to_string(),
            year: Some(2018),
            citations: 90,
            url: String::new(),
            source: SourceName::SemanticScholar,
        }],
        sources: vec![SourceName::SemanticScholar],
    }
}

fn licensed_dataset(title: &str, downloads: u64) -> RawArtifact {
    RawArtifact {
        id: title.to_string(),
        title: title.to_string(),
        declared_type: "dataset".to_string(),
        authors: vec![NAME.to_string()],
        downloads,
        license: Some("CC BY 4.0".to_string()),
        ..Default::default()
    }
}

fn resolution_sources() -> (Arc<FakeWorks>, Arc<FakeAuthorIndex>) {
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("777", "M. Frasch"), ("900", "H. Wu")])
            .with_paper_count("777", 120),
    );
    (works, index)
}

// ================================================================================================
// Full run
// ================================================================================================

#[tokio::test]
async fn builds_profile_with_partial_source_failure() {
    // Arrange
    let (works, index) = resolution_sources();
    let bibliometrics = Arc::new(FakeBibliometrics::new(SourceName::SemanticScholar).with(NAME, s2_record()));
    let artifacts = Arc::new(FakeArtifacts::new(SourceName::Figshare).with(
        NAME,
        vec![
            licensed_dataset("Fetal sheep ECG", 100),
            licensed_dataset("Fetal sheep ECG", 10),
            licensed_dataset("Sleep EEG", 0),
        ],
    ));
    let repositories = Arc::new(FakeRepositories::new(SourceName::Github).failing(SourceFailure::RateLimited));
    let orcid = Arc::new(FakeAffiliations::new(SourceName::Orcid).with(
        NAME,
        vec![affiliation("Université de Paris", SourceName::Orcid)
            .with_location(Some("Paris".to_string()), Some("FR".to_string()))],
    ));
    let openalex = Arc::new(
        FakeAffiliations::new(SourceName::OpenAlex).failing(SourceFailure::Http { status: 503 }),
    );
    let s2_affiliations = Arc::new(FakeAffiliations::new(SourceName::SemanticScholar).with(
        NAME,
        vec![
            affiliation("University of Paris", SourceName::SemanticScholar),
            affiliation("University of Washington", SourceName::SemanticScholar),
        ],
    ));
    let geocoder = Arc::new(
        FakeGeocoder::new()
            .with_place("Université de Paris, Paris, FR", 48.85, 2.35)
            .with_place("University of Washington", 47.65, -122.30),
    );

    let sources = ProfileSources {
        works: Some(works),
        author_index: Some(index),
        bibliometrics: Some(bibliometrics.clone()),
        scholar: None,
        artifacts: Some(artifacts),
        repositories: Some(repositories),
        // deliberately out of richness order
        affiliations: vec![
            s2_affiliations as Arc<dyn AffiliationSource>,
            openalex as Arc<dyn AffiliationSource>,
            orcid as Arc<dyn AffiliationSource>,
        ],
        geocoder: Some(geocoder),
    };
    let pipeline = ProfilePipeline::new(sources, PipelineSettings::default());

    // Act
    let profile = pipeline.build_profile(&person()).await;

    // Assert: identity resolved and used downstream
    assert_eq!(profile.identity.identifier(SourceName::SemanticScholar), Some("777"));
    assert!(matches!(profile.resolution, Some(Resolution::Resolved(_))));
    assert_eq!(bibliometrics.log.calls(), vec![format!("semantic_scholar:{}", NAME)]);

    // affiliations merged richest first, then located
    let institutions: Vec<&str> = profile
        .affiliations
        .iter()
        .map(|a| a.affiliation.institution.as_str())
        .collect();
    assert_eq!(institutions, vec!["Université de Paris", "University of Washington"]);
    assert_eq!(profile.affiliations[0].affiliation.source, SourceName::Orcid);
    assert!(profile.affiliations.iter().all(|a| a.location.is_some()));

    // duplicate dataset listing folded before scoring
    assert_eq!(profile.artifacts.len(), 2);
    assert_eq!(profile.score.summary.total_datasets, 2);
    assert_eq!(profile.score.summary.total_repos_scored, 0);
    assert!(profile.repositories.is_empty());
    assert_eq!(profile.score.summary.h_index, 4);
    assert!(profile.score.s_index > profile.score.paper_impact);

    // per-source status
    assert_eq!(profile.sources[&SourceName::Orcid], SourceStatus::Connected);
    assert_eq!(profile.sources[&SourceName::SemanticScholar], SourceStatus::Connected);
    assert_eq!(profile.sources[&SourceName::Figshare], SourceStatus::Connected);
    assert_eq!(
        profile.sources[&SourceName::Github],
        SourceStatus::Unavailable(SourceFailure::RateLimited)
    );
    assert_eq!(
        profile.sources[&SourceName::OpenAlex],
        SourceStatus::Unavailable(SourceFailure::Http { status: 503 })
    );
    assert_eq!(
        profile.sources[&SourceName::GoogleScholar],
        SourceStatus::Unavailable(SourceFailure::NotConfigured)
    );
}

#[tokio::test]
async fn known_foreign_id_skips_resolution() {
    let (works, index) = resolution_sources();
    let sources = ProfileSources {
        works: Some(works.clone()),
        author_index: Some(index.clone()),
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(sources, PipelineSettings::default());
    let known = person().with_identifier(SourceName::SemanticScholar, "123");

    let profile = pipeline.build_profile(&known).await;

    assert!(profile.resolution.is_none());
    assert_eq!(profile.identity.identifier(SourceName::SemanticScholar), Some("123"));
    assert!(works.log.calls().is_empty());
    assert!(index.log.calls().is_empty());
}

#[tokio::test]
async fn secondary_bibliometrics_merge_into_profile() {
    let scholar_record = BibliometricRecord {
        name: NAME.to_string(),
        citation_count: 1400,
        h_index: 6,
        i10_index: 5,
        sources: vec![SourceName::GoogleScholar],
        ..Default::default()
    };
    let sources = ProfileSources {
        bibliometrics: Some(Arc::new(
            FakeBibliometrics::new(SourceName::SemanticScholar).with(NAME, s2_record()),
        )),
        scholar: Some(Arc::new(
            FakeBibliometrics::new(SourceName::GoogleScholar).with(NAME, scholar_record),
        )),
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(sources, PipelineSettings::default());

    let profile = pipeline
        .build_profile(&person().with_identifier(SourceName::SemanticScholar, "777"))
        .await;

    let merged = profile.bibliometrics.unwrap();
    assert_eq!(merged.citation_count, 1400);
    assert_eq!(merged.h_index, 6);
    assert_eq!(merged.i10_index, 5);
    assert!(merged.sources.contains(&SourceName::SemanticScholar));
    assert!(merged.sources.contains(&SourceName::GoogleScholar));
    assert_eq!(profile.score.summary.i10_index, 5);
}

// ================================================================================================
// Degradation
// ================================================================================================

#[tokio::test]
async fn no_sources_still_renders_a_profile() {
    let pipeline = ProfilePipeline::new(ProfileSources::default(), PipelineSettings::default());

    let profile = pipeline.build_profile(&PersonIdentity::new(NAME)).await;

    assert!(profile.resolution.is_none());
    assert!(profile.bibliometrics.is_none());
    assert!(profile.affiliations.is_empty());
    assert_eq!(profile.score.s_index, 0.0);
    for source in [SourceName::SemanticScholar, SourceName::Figshare, SourceName::Github] {
        assert_eq!(
            profile.sources[&source],
            SourceStatus::Unavailable(SourceFailure::NotConfigured)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn sources_are_fetched_concurrently_and_bounded() {
    // Arrange: four sources at 10s each, one that never answers in time
    let delay = Duration::from_secs(10);
    let sources = ProfileSources {
        bibliometrics: Some(Arc::new(
            FakeBibliometrics::new(SourceName::SemanticScholar)
                .with(NAME, s2_record())
                .with_delay(delay),
        )),
        artifacts: Some(Arc::new(
            FakeArtifacts::new(SourceName::Figshare)
                .with(NAME, vec![licensed_dataset("Fetal sheep ECG", 100)])
                .with_delay(delay),
        )),
        repositories: Some(Arc::new(
            FakeRepositories::new(SourceName::Github)
                .with(
                    NAME,
                    vec![RawRepository {
                        name: "hrv-tools".to_string(),
                        stars: 12,
                        has_license: true,
                        ..Default::default()
                    }],
                )
                .with_delay(delay),
        )),
        affiliations: vec![
            Arc::new(
                FakeAffiliations::new(SourceName::Orcid)
                    .with(NAME, vec![affiliation("Columbia University", SourceName::Orcid)])
                    .with_delay(delay),
            ) as Arc<dyn AffiliationSource>,
            Arc::new(
                FakeAffiliations::new(SourceName::OpenAlex)
                    .with(NAME, Vec::new())
                    .with_delay(Duration::from_secs(600)),
            ) as Arc<dyn AffiliationSource>,
        ],
        ..Default::default()
    };
    let settings = PipelineSettings {
        source_deadline: Duration::from_secs(60),
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(sources, settings);
    let started = tokio::time::Instant::now();

    // Act
    let profile = pipeline
        .build_profile(&person().with_identifier(SourceName::SemanticScholar, "777"))
        .await;

    // Assert: bounded by the slowest source's deadline, not the sum of delays
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(70), "elapsed {:?}", elapsed);
    assert_eq!(
        profile.sources[&SourceName::OpenAlex],
        SourceStatus::Unavailable(SourceFailure::Timeout)
    );
    assert_eq!(profile.sources[&SourceName::Github], SourceStatus::Connected);
    assert_eq!(profile.affiliations.len(), 1);
    assert_eq!(profile.score.summary.total_datasets, 1);
    assert_eq!(profile.score.summary.total_repos_scored, 1);
}
