//! Figshare articles by author name
//!
//! Search results are paginated and carry no author list, so each hit is
//! looked up individually and kept only when one of its authors carries both
//! the first and the last token of the searched name.

use super::{cached, store, ArtifactSource, Budget, HttpJsonClient};
use crate::types::{FetchOutcome, PersonIdentity, RawArtifact, SourceName};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rtwin_common::{cache_key, Cache};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const FIGSHARE_BASE_URL: &str = "https://api.figshare.com/v2";
pub const PAGE_SIZE: usize = 50;
/// Upper bound on result pages walked per search
const MAX_PAGES: usize = 20;
/// Detail lookups in flight per page
pub const DETAIL_CONCURRENCY: usize = 4;
/// Share of the per-source deadline a search walk may use
pub const SEARCH_BUDGET_SHARE: f64 = 0.9;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search_for: &'a str,
    page: usize,
    page_size: usize,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleDetail {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub description: Option<String>,
    pub views: Option<u64>,
    pub downloads: Option<u64>,
    pub license: Option<NamedEntry>,
    pub authors: Option<Vec<ArticleAuthor>>,
    pub categories: Option<Vec<Category>>,
    pub defined_type_name: Option<String>,
    pub url_public_html: Option<String>,
    pub files: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NamedEntry {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleAuthor {
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Category {
    pub title: Option<String>,
}

/// Does any author name contain both the first and last token of `search_name`?
///
/// Single-token search names never match.
pub fn author_matches(authors: &[String], search_name: &str) -> bool {
    let lowered = search_name.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.len() < 2 {
        return false;
    }
    let (first, last) = (tokens[0], tokens[tokens.len() - 1]);
    authors.iter().any(|author| {
        let full = author.to_lowercase();
        full.contains(first) && full.contains(last)
    })
}

/// Detail payload → raw artifact
pub fn parse_article(detail: ArticleDetail) -> RawArtifact {
    RawArtifact {
        id: detail.id.map(|id| id.to_string()).unwrap_or_default(),
        title: detail.title.unwrap_or_default(),
        declared_type: detail.defined_type_name.unwrap_or_default(),
        authors: detail
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.full_name)
            .collect(),
        downloads: detail.downloads.unwrap_or(0),
        views: detail.views.unwrap_or(0),
        doi: detail.doi.filter(|d| !d.trim().is_empty()),
        license: detail.license.and_then(|l| l.name).filter(|l| !l.trim().is_empty()),
        description: detail.description.unwrap_or_default(),
        categories: detail
            .categories
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.title)
            .collect(),
        files_count: detail.files.map(|f| f.len() as u32).unwrap_or(0),
        url: detail.url_public_html.unwrap_or_default(),
    }
}

/// Outcome of one walk over the search results
#[derive(Debug, PartialEq)]
pub struct SearchWalk {
    pub outcome: FetchOutcome<Vec<RawArtifact>>,
    /// False when the time budget ran out before every hit was looked up
    pub complete: bool,
}

/// Walk search pages and look up each hit, within `budget`
///
/// Detail lookups on a page run up to [`DETAIL_CONCURRENCY`] at a time, in
/// hit order. Once the budget is spent the walk stops and keeps what it
/// collected; only an unavailable first page makes the whole source
/// unavailable.
pub async fn walk_results<P, PF, D, DF>(
    search_name: &str,
    budget: Budget,
    fetch_page: P,
    fetch_detail: D,
) -> SearchWalk
where
    P: Fn(usize) -> PF,
    PF: Future<Output = FetchOutcome<Vec<SearchHit>>>,
    D: Fn(u64) -> DF,
    DF: Future<Output = FetchOutcome<ArticleDetail>>,
{
    let mut articles = Vec::new();
    let mut complete = true;

    for page in 1..=MAX_PAGES {
        let hits = match budget.run(fetch_page(page)).await {
            FetchOutcome::Fetched(hits) => hits,
            // A failed first page means the source is down; later pages only truncate
            FetchOutcome::Unavailable(failure) if page == 1 => {
                return SearchWalk {
                    outcome: FetchOutcome::Unavailable(failure),
                    complete: false,
                }
            }
            FetchOutcome::Unavailable(failure) => {
                warn!(page, failure = %failure, "Figshare search page unavailable, stopping");
                complete = false;
                break;
            }
        };

        let ids: Vec<u64> = hits.iter().filter_map(|h| h.id).collect();
        let details: Vec<(u64, FetchOutcome<ArticleDetail>)> = stream::iter(ids)
            .map(|id| {
                let lookup = budget.run(fetch_detail(id));
                async move { (id, lookup.await) }
            })
            .buffered(DETAIL_CONCURRENCY)
            .collect()
            .await;

        for (id, detail) in details {
            let Some(detail) = detail.fetched() else {
                debug!(article_id = id, "Figshare article detail unavailable, skipping");
                continue;
            };
            let article = parse_article(detail);
            if author_matches(&article.authors, search_name) {
                articles.push(article);
            }
        }

        if budget.is_spent() {
            warn!(page, kept = articles.len(), "Figshare search out of time, returning partial results");
            complete = false;
            break;
        }
        if hits.len() < PAGE_SIZE {
            break;
        }
    }

    debug!(name = %search_name, articles = articles.len(), complete, "Figshare search complete");
    SearchWalk {
        outcome: FetchOutcome::Fetched(articles),
        complete,
    }
}

pub struct FigshareClient {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    search_budget: Duration,
}

impl FigshareClient {
    /// `search_budget` bounds one whole search walk and should sit below
    /// the caller's per-source deadline
    pub fn new(
        client: HttpJsonClient,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        search_budget: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            ttl,
            search_budget,
        }
    }

    async fn search(&self, search_name: &str) -> SearchWalk {
        let search_url = format!("{}/articles/search", FIGSHARE_BASE_URL);

        walk_results(
            search_name,
            Budget::new(self.search_budget),
            |page| {
                let search_url = search_url.clone();
                async move {
                    let request = SearchRequest {
                        search_for: search_name,
                        page,
                        page_size: PAGE_SIZE,
                    };
                    self.client
                        .post_json::<_, Vec<SearchHit>>(&search_url, &request)
                        .await
                }
            },
            |id| async move {
                let detail_url = format!("{}/articles/{}", FIGSHARE_BASE_URL, id);
                self.client.get_json::<ArticleDetail>(&detail_url, &[], &[]).await
            },
        )
        .await
    }
}

#[async_trait]
impl ArtifactSource for FigshareClient {
    async fn artifacts(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawArtifact>> {
        let search_name = person
            .identifier(SourceName::Figshare)
            .unwrap_or(person.display_name.as_str())
            .trim()
            .to_string();

        let key = cache_key(&["figshare", "search", &search_name.to_lowercase()]);
        if let Some(hit) = cached(self.cache.as_ref(), &key) {
            return FetchOutcome::Fetched(hit);
        }

        let walk = self.search(&search_name).await;
        // partial walks are served but not cached
        if let (FetchOutcome::Fetched(articles), true) = (&walk.outcome, walk.complete) {
            store(self.cache.as_ref(), &key, self.ttl, articles);
        }
        walk.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceFailure;
    use serde_json::json;

    #[test]
    fn test_author_matches_middle_names() {
        let authors = vec!["Martin Gerbert Frasch".to_string(), "A. Smith".to_string()];
        assert!(author_matches(&authors, "Martin Frasch"));
        assert!(!author_matches(&authors, "Gerlinde Frasch"));
        assert!(!author_matches(&authors, "Frasch"));
    }

    #[test]
    fn test_parse_article() {
        let detail: ArticleDetail = serde_json::from_value(json!({
            "id": 42,
            "title": "Figure 1 from Fetal ECG",
            "doi": "",
            "views": 300,
            "downloads": 12,
            "license": {"name": "CC BY 4.0"},
            "authors": [{"full_name": "Martin G. Frasch"}, {"full_name": null}],
            "categories": [{"title": "Physiology"}],
            "defined_type_name": "figure",
            "url_public_html": "https://figshare.com/articles/42",
            "files": [{}, {}]
        }))
        .unwrap();

        let raw = parse_article(detail);

        assert_eq!(raw.id, "42");
        assert_eq!(raw.doi, None);
        assert_eq!(raw.license.as_deref(), Some("CC BY 4.0"));
        assert_eq!(raw.authors, vec!["Martin G. Frasch"]);
        assert_eq!(raw.files_count, 2);
        assert_eq!(raw.reuse_signal(), 312);
    }

    fn hits(ids: std::ops::RangeInclusive<u64>) -> Vec<SearchHit> {
        ids.map(|id| SearchHit { id: Some(id) }).collect()
    }

    fn detail(id: u64, author: &str) -> ArticleDetail {
        ArticleDetail {
            id: Some(id),
            title: Some(format!("Dataset {}", id)),
            authors: Some(vec![ArticleAuthor {
                full_name: Some(author.to_string()),
            }]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_walk_keeps_matching_authors() {
        let walk = walk_results(
            "Martin Frasch",
            Budget::new(Duration::from_secs(60)),
            |_page| async { FetchOutcome::Fetched(hits(1..=3)) },
            |id| async move {
                match id {
                    2 => FetchOutcome::Fetched(detail(id, "Karl Weber")),
                    3 => FetchOutcome::Unavailable(SourceFailure::Http { status: 404 }),
                    _ => FetchOutcome::Fetched(detail(id, "Martin G. Frasch")),
                }
            },
        )
        .await;

        assert!(walk.complete);
        let articles = walk.outcome.fetched().unwrap();
        let ids: Vec<&str> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test]
    async fn test_walk_unavailable_when_first_page_fails() {
        let walk = walk_results(
            "Martin Frasch",
            Budget::new(Duration::from_secs(60)),
            |_page| async { FetchOutcome::Unavailable(SourceFailure::Http { status: 503 }) },
            |id| async move { FetchOutcome::Fetched(detail(id, "Martin Frasch")) },
        )
        .await;

        assert_eq!(walk.outcome, FetchOutcome::Unavailable(SourceFailure::Http { status: 503 }));
        assert!(!walk.complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_out_of_time_keeps_collected_articles() {
        // Arrange: a full page of hits, each detail lookup takes 1s
        let started = tokio::time::Instant::now();
        let pages = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let page_calls = Arc::clone(&pages);

        // Act
        let walk = walk_results(
            "Martin Frasch",
            Budget::new(Duration::from_millis(4_500)),
            move |_page| {
                page_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { FetchOutcome::Fetched(hits(1..=PAGE_SIZE as u64)) }
            },
            |id| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                FetchOutcome::Fetched(detail(id, "Martin Frasch"))
            },
        )
        .await;

        // Assert: returned at the budget with a prefix of the page, not Timeout
        assert!(!walk.complete);
        let articles = walk.outcome.fetched().expect("partial results survive");
        assert!(!articles.is_empty() && articles.len() < PAGE_SIZE, "kept {}", articles.len());
        let expected: Vec<String> = (1..=articles.len()).map(|i| i.to_string()).collect();
        let ids: Vec<String> = articles.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(pages.load(std::sync::atomic::Ordering::SeqCst), 1);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed <= Duration::from_millis(4_500), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_search_request_shape() {
        let body = serde_json::to_value(SearchRequest {
            search_for: "Martin Frasch",
            page: 2,
            page_size: PAGE_SIZE,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"search_for": "Martin Frasch", "page": 2, "page_size": 50})
        );
    }
}
