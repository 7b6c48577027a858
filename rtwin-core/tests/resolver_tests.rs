// Identity resolution integration tests
//
// Known profile (works by DOI) → foreign author id, using in-memory fakes for
// both sides. No network.

use std::sync::Arc;
use std::time::Duration;

use rtwin_core::identity_resolver::{IdentityResolver, Resolution, UnresolvedReason, DEFAULT_MAX_DOIS};
use rtwin_core::sources::fakes::{FakeAuthorIndex, FakeWorks};
use rtwin_core::types::SourceFailure;

const ORCID: &str = "0000-0003-3159-6321";
const NAME: &str = "Martin G. Frasch";
const CALL_TIMEOUT: Duration = Duration::from_secs(15);

fn resolver(works: Arc<FakeWorks>, index: Arc<FakeAuthorIndex>) -> IdentityResolver {
    IdentityResolver::new(works, index, DEFAULT_MAX_DOIS, CALL_TIMEOUT)
}

// ================================================================================================
// Voting and canonical choice
// ================================================================================================

#[tokio::test]
async fn resolves_to_matching_coauthor_with_largest_profile() {
    // Arrange: two DOIs, the person appears under two ids (fragmented profile)
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a", "10.1/b"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("111", "M. Frasch"), ("900", "H. Wu")])
            .with_paper("10.1/b", &[("222", "Martin Frasch"), ("901", "A. Smith")])
            .with_paper_count("111", 12)
            .with_paper_count("222", 85),
    );

    // Act
    let resolution = resolver(works, index.clone()).resolve(ORCID, NAME).await;

    // Assert
    assert_eq!(resolution.foreign_id(), Some("222"));
    let Resolution::Resolved(resolved) = resolution else {
        panic!("expected a resolution");
    };
    let ids: Vec<&str> = resolved.candidates.iter().map(|c| c.author_id.as_str()).collect();
    assert_eq!(ids, vec!["111", "222"], "non-matching co-authors never become candidates");
    assert_eq!(index.log.count_prefix("count:"), 2);
}

#[tokio::test]
async fn name_search_adds_doi_disjoint_profile() {
    // The larger profile shares no DOI with the known profile
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("111", "M. G. Frasch")])
            .with_search(NAME, &[("333", "Martin Frasch"), ("444", "Karl Frasch")])
            .with_paper_count("111", 4)
            .with_paper_count("333", 140)
            .with_paper_count("444", 900),
    );

    let resolution = resolver(works, index).resolve(ORCID, NAME).await;

    let Resolution::Resolved(resolved) = resolution else {
        panic!("expected a resolution");
    };
    assert_eq!(resolved.foreign_id, "333");
    let searched = resolved.candidates.iter().find(|c| c.author_id == "333").unwrap();
    assert!(searched.from_search);
    assert_eq!(searched.votes, 0);
    assert!(resolved.candidates.iter().all(|c| c.author_id != "444"));
}

#[tokio::test]
async fn equal_paper_counts_keep_first_seen_candidate() {
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a", "10.1/b"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("first", "Martin Frasch")])
            .with_paper("10.1/b", &[("second", "M. Frasch")])
            .with_paper_count("first", 30)
            .with_paper_count("second", 30),
    );

    let resolution = resolver(works, index).resolve(ORCID, NAME).await;

    assert_eq!(resolution.foreign_id(), Some("first"));
}

#[tokio::test]
async fn doi_lookups_are_sequential_and_capped() {
    // Arrange: more DOIs than the cap
    let dois: Vec<String> = (0..12).map(|i| format!("10.1/{}", i)).collect();
    let doi_refs: Vec<&str> = dois.iter().map(String::as_str).collect();
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &doi_refs));
    let mut index = FakeAuthorIndex::new().with_paper_count("111", 3);
    for doi in &doi_refs {
        index = index.with_paper(doi, &[("111", "Martin Frasch")]);
    }
    let index = Arc::new(index);

    // Act
    let resolution = resolver(works, index.clone()).resolve(ORCID, NAME).await;

    // Assert: exactly the first 8 DOIs, in order, before the name search
    let calls = index.log.calls();
    let doi_calls: Vec<String> = calls.iter().filter(|c| c.starts_with("doi:")).cloned().collect();
    let expected: Vec<String> = doi_refs[..DEFAULT_MAX_DOIS]
        .iter()
        .map(|d| format!("doi:{}", d))
        .collect();
    assert_eq!(doi_calls, expected);
    let search_at = calls.iter().position(|c| c.starts_with("search:")).unwrap();
    assert_eq!(search_at, DEFAULT_MAX_DOIS);

    let Resolution::Resolved(resolved) = resolution else {
        panic!("expected a resolution");
    };
    assert_eq!(resolved.candidates[0].votes, DEFAULT_MAX_DOIS as u32);
}

// ================================================================================================
// Degradation
// ================================================================================================

#[tokio::test]
async fn blank_inputs_are_invalid() {
    let works = Arc::new(FakeWorks::new());
    let index = Arc::new(FakeAuthorIndex::new());
    let resolver = resolver(works.clone(), index);

    assert_eq!(
        resolver.resolve("  ", NAME).await,
        Resolution::Unresolved(UnresolvedReason::InvalidInput)
    );
    assert_eq!(
        resolver.resolve(ORCID, "").await,
        Resolution::Unresolved(UnresolvedReason::InvalidInput)
    );
    assert!(works.log.calls().is_empty());
}

#[tokio::test]
async fn no_publications_is_unresolved() {
    let works = Arc::new(FakeWorks::new().failing(ORCID, SourceFailure::Http { status: 500 }));
    let index = Arc::new(FakeAuthorIndex::new());

    let resolution = resolver(works, index.clone()).resolve(ORCID, NAME).await;

    assert_eq!(resolution, Resolution::Unresolved(UnresolvedReason::NoPublications));
    assert!(index.log.calls().is_empty());
}

#[tokio::test]
async fn failed_doi_lookups_degrade_to_search() {
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a", "10.1/b"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .failing("doi:10.1/a", SourceFailure::RateLimited)
            .failing("doi:10.1/b", SourceFailure::Network("reset".to_string()))
            .with_search(NAME, &[("555", "Martin G Frasch")])
            .failing("count:555", SourceFailure::Timeout),
    );

    let resolution = resolver(works, index).resolve(ORCID, NAME).await;

    assert_eq!(resolution.foreign_id(), Some("555"));
}

#[tokio::test]
async fn empty_union_is_unresolved() {
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("900", "H. Wu")])
            .failing(&format!("search:{}", NAME), SourceFailure::Http { status: 503 }),
    );

    let resolution = resolver(works, index).resolve(ORCID, NAME).await;

    assert_eq!(resolution, Resolution::Unresolved(UnresolvedReason::NoCandidates));
}

#[tokio::test(start_paused = true)]
async fn slow_author_index_times_out_per_call() {
    // Every index call takes longer than the per-call bound
    let works = Arc::new(FakeWorks::new().with_dois(ORCID, &["10.1/a", "10.1/b"]));
    let index = Arc::new(
        FakeAuthorIndex::new()
            .with_paper("10.1/a", &[("111", "Martin Frasch")])
            .with_delay(Duration::from_secs(30)),
    );
    let started = tokio::time::Instant::now();

    let resolution = resolver(works, index.clone()).resolve(ORCID, NAME).await;

    assert_eq!(resolution, Resolution::Unresolved(UnresolvedReason::NoCandidates));
    // two DOI calls plus the search, each cut at the bound
    assert_eq!(index.log.calls().len(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= CALL_TIMEOUT * 3 && elapsed < CALL_TIMEOUT * 4, "elapsed {:?}", elapsed);
}
