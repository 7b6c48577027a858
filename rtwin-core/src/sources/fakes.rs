//! In-memory fakes for the source traits (testing only)
//!
//! Each fake answers from tables filled in by the test, can be told to fail
//! with a given [`SourceFailure`], and records the calls it receives so tests
//! can assert on ordering and volume.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AffiliationSource, ArtifactSource, AuthorIndex, BibliometricSource, Geocoder,
    RepositorySource, WorksSource,
};
use crate::types::{
    AffiliationRecord, AuthorRef, BibliometricRecord, FetchOutcome, GeoPoint, PersonIdentity,
    RawArtifact, RawRepository, SourceFailure, SourceName,
};

/// Shared call log
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

fn lookup<T: Clone>(
    table: &HashMap<String, T>,
    failures: &HashMap<String, SourceFailure>,
    key: &str,
) -> Option<FetchOutcome<T>> {
    if let Some(failure) = failures.get(key) {
        return Some(FetchOutcome::Unavailable(failure.clone()));
    }
    table.get(key).cloned().map(FetchOutcome::Fetched)
}

// ---------------------------------------------------------------------------
// FakeWorks
// ---------------------------------------------------------------------------

/// Known-profile works keyed by profile id
#[derive(Debug, Default)]
pub struct FakeWorks {
    dois: HashMap<String, Vec<String>>,
    failures: HashMap<String, SourceFailure>,
    pub log: CallLog,
}

impl FakeWorks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dois(mut self, known_id: &str, dois: &[&str]) -> Self {
        self.dois
            .insert(known_id.to_string(), dois.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn failing(mut self, known_id: &str, failure: SourceFailure) -> Self {
        self.failures.insert(known_id.to_string(), failure);
        self
    }
}

#[async_trait]
impl WorksSource for FakeWorks {
    async fn publication_dois(&self, known_id: &str, cap: usize) -> FetchOutcome<Vec<String>> {
        self.log.record(format!("works:{}", known_id));
        lookup(&self.dois, &self.failures, known_id)
            .unwrap_or(FetchOutcome::Fetched(Vec::new()))
            .map(|dois| dois.into_iter().take(cap).collect())
    }
}

// ---------------------------------------------------------------------------
// FakeAuthorIndex
// ---------------------------------------------------------------------------

/// Foreign author index with per-DOI author lists, search results and
/// per-author paper counts
#[derive(Debug, Default)]
pub struct FakeAuthorIndex {
    doi_authors: HashMap<String, Vec<AuthorRef>>,
    search_results: HashMap<String, Vec<AuthorRef>>,
    paper_counts: HashMap<String, u64>,
    failures: HashMap<String, SourceFailure>,
    delay: Option<Duration>,
    pub log: CallLog,
}

fn authors(pairs: &[(&str, &str)]) -> Vec<AuthorRef> {
    pairs
        .iter()
        .map(|(id, name)| AuthorRef {
            author_id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

impl FakeAuthorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(author_id, name)` pairs on the paper with this DOI
    pub fn with_paper(mut self, doi: &str, paper_authors: &[(&str, &str)]) -> Self {
        self.doi_authors.insert(doi.to_string(), authors(paper_authors));
        self
    }

    pub fn with_search(mut self, name: &str, results: &[(&str, &str)]) -> Self {
        self.search_results.insert(name.to_string(), authors(results));
        self
    }

    pub fn with_paper_count(mut self, author_id: &str, count: u64) -> Self {
        self.paper_counts.insert(author_id.to_string(), count);
        self
    }

    /// Fail calls keyed `doi:<doi>`, `search:<name>` or `count:<id>`
    pub fn failing(mut self, call_key: &str, failure: SourceFailure) -> Self {
        self.failures.insert(call_key.to_string(), failure);
        self
    }

    /// Delay every answer (for timeout tests under paused time)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn answer<T: Clone>(&self, call_key: String, table: &HashMap<String, T>, key: &str) -> Option<FetchOutcome<T>> {
        self.log.record(call_key.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = self.failures.get(&call_key) {
            return Some(FetchOutcome::Unavailable(failure.clone()));
        }
        table.get(key).cloned().map(FetchOutcome::Fetched)
    }
}

#[async_trait]
impl AuthorIndex for FakeAuthorIndex {
    async fn authors_for_doi(&self, doi: &str) -> FetchOutcome<Vec<AuthorRef>> {
        self.answer(format!("doi:{}", doi), &self.doi_authors, doi)
            .await
            .unwrap_or(FetchOutcome::Unavailable(SourceFailure::Http { status: 404 }))
    }

    async fn search_authors(&self, name: &str) -> FetchOutcome<Vec<AuthorRef>> {
        self.answer(format!("search:{}", name), &self.search_results, name)
            .await
            .unwrap_or(FetchOutcome::Fetched(Vec::new()))
    }

    async fn paper_count(&self, author_id: &str) -> FetchOutcome<u64> {
        self.answer(format!("count:{}", author_id), &self.paper_counts, author_id)
            .await
            .unwrap_or(FetchOutcome::Unavailable(SourceFailure::Http { status: 404 }))
    }
}

// ---------------------------------------------------------------------------
// Person-keyed fakes
// ---------------------------------------------------------------------------

/// Answers keyed by the person's display name, or one fixed failure
#[derive(Debug)]
pub struct FakePersonSource<T> {
    source: SourceName,
    answers: HashMap<String, T>,
    failure: Option<SourceFailure>,
    delay: Option<Duration>,
    pub log: CallLog,
}

impl<T: Clone> FakePersonSource<T> {
    pub fn new(source: SourceName) -> Self {
        Self {
            source,
            answers: HashMap::new(),
            failure: None,
            delay: None,
            log: CallLog::default(),
        }
    }

    pub fn with(mut self, display_name: &str, answer: T) -> Self {
        self.answers.insert(display_name.to_string(), answer);
        self
    }

    pub fn failing(mut self, failure: SourceFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn answer(&self, person: &PersonIdentity) -> FetchOutcome<T> {
        self.log.record(format!("{}:{}", self.source, person.display_name));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failures = match &self.failure {
            Some(failure) => HashMap::from([(person.display_name.clone(), failure.clone())]),
            None => HashMap::new(),
        };
        lookup(&self.answers, &failures, &person.display_name)
            .unwrap_or(FetchOutcome::Unavailable(SourceFailure::Http { status: 404 }))
    }
}

pub type FakeAffiliations = FakePersonSource<Vec<AffiliationRecord>>;
pub type FakeBibliometrics = FakePersonSource<BibliometricRecord>;
pub type FakeArtifacts = FakePersonSource<Vec<RawArtifact>>;
pub type FakeRepositories = FakePersonSource<Vec<RawRepository>>;

#[async_trait]
impl AffiliationSource for FakeAffiliations {
    fn source(&self) -> SourceName {
        self.source
    }

    async fn affiliations(&self, person: &PersonIdentity) -> FetchOutcome<Vec<AffiliationRecord>> {
        self.answer(person).await
    }
}

#[async_trait]
impl BibliometricSource for FakeBibliometrics {
    fn source(&self) -> SourceName {
        self.source
    }

    async fn bibliometrics(&self, person: &PersonIdentity) -> FetchOutcome<BibliometricRecord> {
        self.answer(person).await
    }
}

#[async_trait]
impl ArtifactSource for FakeArtifacts {
    async fn artifacts(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawArtifact>> {
        self.answer(person).await
    }
}

#[async_trait]
impl RepositorySource for FakeRepositories {
    async fn repositories(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawRepository>> {
        self.answer(person).await
    }
}

// ---------------------------------------------------------------------------
// FakeGeocoder
// ---------------------------------------------------------------------------

/// Geocoder answering from a query → point table; unknown queries are
/// "not found"
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    places: HashMap<String, GeoPoint>,
    pub log: CallLog,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, query: &str, lat: f64, lng: f64) -> Self {
        self.places.insert(
            query.to_string(),
            GeoPoint {
                lat,
                lng,
                display_name: query.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> FetchOutcome<Option<GeoPoint>> {
        self.log.record(format!("geocode:{}", query));
        FetchOutcome::Fetched(self.places.get(query).cloned())
    }
}
