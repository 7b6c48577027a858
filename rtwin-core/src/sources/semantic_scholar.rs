//! Semantic Scholar Graph API
//!
//! Foreign author index for identity resolution, primary bibliometric
//! source, and current-affiliation source. All calls go through the shared
//! rate limiter carried by the HTTP client.

use super::{get_or_fetch, AffiliationSource, AuthorIndex, BibliometricSource, HttpJsonClient};
use crate::types::{
    AffiliationRecord, AuthorRef, BibliometricRecord, FetchOutcome, PaperRecord, PersonIdentity,
    SourceFailure, SourceName,
};
use async_trait::async_trait;
use rtwin_common::{cache_key, Cache};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const S2_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const AUTHOR_FIELDS: &str = "name,paperCount,citationCount,hIndex";
const PAPER_FIELDS: &str = "title,year,citationCount,url";
const PAPER_PAGE: usize = 50;
const TOP_PAPERS: usize = 20;

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct S2Author {
    #[serde(rename = "authorId")]
    pub author_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "paperCount")]
    pub paper_count: Option<u64>,
    #[serde(rename = "citationCount")]
    pub citation_count: Option<u64>,
    #[serde(rename = "hIndex")]
    pub h_index: Option<u32>,
    /// A single string or a list, depending on the record
    pub affiliations: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct S2Paper {
    pub title: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "citationCount")]
    pub citation_count: Option<u64>,
    pub url: Option<String>,
    pub authors: Option<Vec<S2Author>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct S2Page<T> {
    pub data: Option<Vec<T>>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Authors with an id; missing names become empty
pub fn parse_authors(authors: Vec<S2Author>) -> Vec<AuthorRef> {
    authors
        .into_iter()
        .filter_map(|a| {
            let author_id = a.author_id.filter(|id| !id.is_empty())?;
            Some(AuthorRef {
                author_id,
                name: a.name.unwrap_or_default(),
            })
        })
        .collect()
}

/// Affiliation names from a string-or-list payload
pub fn parse_affiliation_names(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Author profile plus citation-sorted papers → bibliometric record
pub fn parse_bibliometrics(author: &S2Author, papers: Vec<S2Paper>) -> BibliometricRecord {
    let mut top_papers: Vec<PaperRecord> = papers
        .into_iter()
        .map(|p| PaperRecord {
            title: p.title.unwrap_or_default(),
            year: p.year,
            citations: p.citation_count.unwrap_or(0),
            url: p.url.unwrap_or_default(),
            source: SourceName::SemanticScholar,
        })
        .collect();
    top_papers.truncate(TOP_PAPERS);

    BibliometricRecord {
        name: author.name.clone().unwrap_or_default(),
        paper_count: author.paper_count.unwrap_or(0),
        citation_count: author.citation_count.unwrap_or(0),
        h_index: author.h_index.unwrap_or(0),
        i10_index: 0,
        top_papers,
        sources: vec![SourceName::SemanticScholar],
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct SemanticScholarClient {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    default_ttl: Duration,
    affiliation_ttl: Duration,
}

impl SemanticScholarClient {
    pub fn new(
        client: HttpJsonClient,
        cache: Arc<dyn Cache>,
        default_ttl: Duration,
        affiliation_ttl: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            default_ttl,
            affiliation_ttl,
        }
    }

    async fn author(&self, author_id: &str, fields: &str) -> FetchOutcome<S2Author> {
        let url = format!("{}/author/{}", S2_BASE_URL, author_id);
        self.client
            .get_json(&url, &[("fields", fields.to_string())], &[])
            .await
    }

    async fn fetch_bibliometrics(&self, author_id: &str) -> FetchOutcome<BibliometricRecord> {
        let author = match self.author(author_id, AUTHOR_FIELDS).await {
            FetchOutcome::Fetched(author) => author,
            FetchOutcome::Unavailable(failure) => return FetchOutcome::Unavailable(failure),
        };

        let url = format!("{}/author/{}/papers", S2_BASE_URL, author_id);
        let papers = self
            .client
            .get_json::<S2Page<S2Paper>>(
                &url,
                &[
                    ("fields", PAPER_FIELDS.to_string()),
                    ("limit", PAPER_PAGE.to_string()),
                    ("sort", "citationCount:desc".to_string()),
                ],
                &[],
            )
            .await
            .fetched()
            .and_then(|page| page.data)
            .unwrap_or_default();

        FetchOutcome::Fetched(parse_bibliometrics(&author, papers))
    }
}

#[async_trait]
impl AuthorIndex for SemanticScholarClient {
    async fn authors_for_doi(&self, doi: &str) -> FetchOutcome<Vec<AuthorRef>> {
        let url = format!("{}/paper/DOI:{}", S2_BASE_URL, doi);
        debug!(doi = %doi, "Fetching S2 paper authors");
        self.client
            .get_json::<S2Paper>(&url, &[("fields", "authors".to_string())], &[])
            .await
            .map(|paper| parse_authors(paper.authors.unwrap_or_default()))
    }

    async fn search_authors(&self, name: &str) -> FetchOutcome<Vec<AuthorRef>> {
        let url = format!("{}/author/search", S2_BASE_URL);
        self.client
            .get_json::<S2Page<S2Author>>(
                &url,
                &[("query", name.to_string()), ("fields", "name".to_string())],
                &[],
            )
            .await
            .map(|page| parse_authors(page.data.unwrap_or_default()))
    }

    async fn paper_count(&self, author_id: &str) -> FetchOutcome<u64> {
        self.author(author_id, "paperCount")
            .await
            .map(|a| a.paper_count.unwrap_or(0))
    }
}

#[async_trait]
impl BibliometricSource for SemanticScholarClient {
    fn source(&self) -> SourceName {
        SourceName::SemanticScholar
    }

    async fn bibliometrics(&self, person: &PersonIdentity) -> FetchOutcome<BibliometricRecord> {
        let Some(author_id) = person.identifier(SourceName::SemanticScholar) else {
            return FetchOutcome::Unavailable(SourceFailure::NotConfigured);
        };
        let key = cache_key(&["s2", "author", author_id]);
        get_or_fetch(self.cache.as_ref(), &key, self.default_ttl, || {
            self.fetch_bibliometrics(author_id)
        })
        .await
    }
}

#[async_trait]
impl AffiliationSource for SemanticScholarClient {
    fn source(&self) -> SourceName {
        SourceName::SemanticScholar
    }

    async fn affiliations(&self, person: &PersonIdentity) -> FetchOutcome<Vec<AffiliationRecord>> {
        let Some(author_id) = person.identifier(SourceName::SemanticScholar) else {
            return FetchOutcome::Unavailable(SourceFailure::NotConfigured);
        };

        // Cached as bare names, the payload shape the upstream returns
        let key = cache_key(&["s2", "affiliations", author_id]);
        let names: FetchOutcome<Vec<String>> =
            get_or_fetch(self.cache.as_ref(), &key, self.affiliation_ttl, || async {
                self.author(author_id, "affiliations")
                    .await
                    .map(|author| parse_affiliation_names(author.affiliations.as_ref()))
            })
            .await;

        // The index only reports current affiliations
        names.map(|names| {
            names
                .into_iter()
                .filter_map(|name| {
                    AffiliationRecord::new(name, true, SourceName::SemanticScholar).ok()
                })
                .collect()
        })
    }
}
