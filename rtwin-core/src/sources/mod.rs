//! Source fetcher seams
//!
//! The core never talks to the network directly. Each capability it needs
//! from an upstream is a small async trait; HTTP implementations live in the
//! per-service submodules, in-memory fakes in [`fakes`].
//!
//! Fetchers never return errors for ordinary failures (timeouts, 404,
//! malformed payloads, rate limiting). Every call yields a [`FetchOutcome`]
//! and the caller degrades `Unavailable` to an empty contribution.

use crate::types::{
    AffiliationRecord, AuthorRef, BibliometricRecord, FetchOutcome, GeoPoint, PersonIdentity,
    RawArtifact, RawRepository, SourceFailure, SourceName,
};
use async_trait::async_trait;
use rtwin_common::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub mod fakes;
pub mod figshare;
pub mod github;
pub mod http;
pub mod nominatim;
pub mod openalex;
pub mod orcid;
pub mod semantic_scholar;
pub mod snapshot;

pub use http::HttpJsonClient;

// ============================================================================
// Capability traits
// ============================================================================

/// Publication identifiers attached to a known profile (e.g. ORCID works)
#[async_trait]
pub trait WorksSource: Send + Sync {
    /// Up to `cap` DOIs for the profile `known_id`
    async fn publication_dois(&self, known_id: &str, cap: usize) -> FetchOutcome<Vec<String>>;
}

/// Foreign author index the resolver maps into (e.g. Semantic Scholar)
#[async_trait]
pub trait AuthorIndex: Send + Sync {
    /// Author list of the publication with this DOI
    async fn authors_for_doi(&self, doi: &str) -> FetchOutcome<Vec<AuthorRef>>;

    /// Direct author search by display name
    async fn search_authors(&self, name: &str) -> FetchOutcome<Vec<AuthorRef>>;

    /// Total publication count of one author profile
    async fn paper_count(&self, author_id: &str) -> FetchOutcome<u64>;
}

/// Provider of affiliation records for a person
#[async_trait]
pub trait AffiliationSource: Send + Sync {
    fn source(&self) -> SourceName;

    async fn affiliations(&self, person: &PersonIdentity) -> FetchOutcome<Vec<AffiliationRecord>>;
}

/// Provider of author-level bibliometrics
#[async_trait]
pub trait BibliometricSource: Send + Sync {
    fn source(&self) -> SourceName;

    async fn bibliometrics(&self, person: &PersonIdentity) -> FetchOutcome<BibliometricRecord>;
}

/// Provider of raw research artifacts (datasets, figures, filesets)
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn artifacts(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawArtifact>>;
}

/// Provider of source-code repositories
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn repositories(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawRepository>>;
}

/// Free-text place lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Fetched(None)` means the upstream answered but knows no such place
    async fn geocode(&self, query: &str) -> FetchOutcome<Option<GeoPoint>>;
}

// ============================================================================
// Call helpers
// ============================================================================

/// Bound one source call by `limit`; expiry degrades to `Timeout`
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> FetchOutcome<T>
where
    F: Future<Output = FetchOutcome<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!("Source call exceeded {:?}", limit);
            FetchOutcome::Unavailable(SourceFailure::Timeout)
        }
    }
}

/// Time left for a multi-request walk over one source
///
/// Each call is bounded by what remains, so a walk that runs out of time
/// stops with the results it already has instead of being cancelled whole.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    deadline: Instant,
}

impl Budget {
    pub fn new(limit: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_spent(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Run `call` within the remaining time; a spent budget skips the call
    pub async fn run<T, F>(&self, call: F) -> FetchOutcome<T>
    where
        F: Future<Output = FetchOutcome<T>>,
    {
        if self.is_spent() {
            return FetchOutcome::Unavailable(SourceFailure::Timeout);
        }
        with_deadline(self.remaining(), call).await
    }
}

/// Cached value under `key`, if present and still of shape `T`
pub fn cached<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let value = cache.get(key)?;
    match serde_json::from_value::<T>(value) {
        Ok(hit) => {
            debug!(key = %key, "Cache hit");
            Some(hit)
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Cached value has unexpected shape, refetching");
            None
        }
    }
}

/// Store `value` under `key`; failures are logged, never raised
pub fn store<T: Serialize>(cache: &dyn Cache, key: &str, ttl: Duration, value: &T) {
    match serde_json::to_value(value) {
        Ok(json) => {
            if let Err(e) = cache.set(key, json, ttl) {
                warn!(key = %key, error = %e, "Cache write failed");
            }
        }
        Err(e) => warn!(key = %key, error = %e, "Cache encode failed"),
    }
}

/// Serve `key` from the cache, or run `fetch` and cache a successful result
///
/// Failures are never cached. A cached value that no longer deserializes
/// into `T` is treated as a miss.
pub async fn get_or_fetch<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> FetchOutcome<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchOutcome<T>>,
{
    if let Some(hit) = cached(cache, key) {
        return FetchOutcome::Fetched(hit);
    }

    let outcome = fetch().await;
    if let FetchOutcome::Fetched(value) = &outcome {
        store(cache, key, ttl, value);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtwin_common::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let outcome: FetchOutcome<u32> = with_deadline(Duration::from_secs(15), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            FetchOutcome::Fetched(1)
        })
        .await;
        assert_eq!(outcome, FetchOutcome::Unavailable(SourceFailure::Timeout));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let outcome = with_deadline(Duration::from_secs(1), async { FetchOutcome::Fetched(7u32) }).await;
        assert_eq!(outcome, FetchOutcome::Fetched(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_bounds_calls_by_remaining_time() {
        let budget = Budget::new(Duration::from_secs(20));

        let first = budget
            .run(async {
                tokio::time::sleep(Duration::from_secs(15)).await;
                FetchOutcome::Fetched(1u32)
            })
            .await;
        assert_eq!(first, FetchOutcome::Fetched(1));
        assert_eq!(budget.remaining(), Duration::from_secs(5));

        // cut at the 5s left, not at its own 15s
        let started = tokio::time::Instant::now();
        let second: FetchOutcome<u32> = budget
            .run(async {
                tokio::time::sleep(Duration::from_secs(15)).await;
                FetchOutcome::Fetched(2)
            })
            .await;
        assert_eq!(second, FetchOutcome::Unavailable(SourceFailure::Timeout));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(budget.is_spent());

        let skipped = budget.run(async { FetchOutcome::Fetched(3u32) }).await;
        assert_eq!(skipped, FetchOutcome::Unavailable(SourceFailure::Timeout));
    }

    fn counting<T>(
        calls: &Arc<AtomicUsize>,
        outcome: FetchOutcome<T>,
    ) -> impl FnOnce() -> futures::future::Ready<FetchOutcome<T>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(outcome)
        }
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let cache = MemoryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(60);
        let mit = vec!["MIT".to_string()];

        let failed: FetchOutcome<Vec<String>> = get_or_fetch(
            &cache,
            "k",
            ttl,
            counting(&calls, FetchOutcome::Unavailable(SourceFailure::RateLimited)),
        )
        .await;
        assert!(!failed.is_fetched());
        assert!(cache.is_empty());

        let first = get_or_fetch(&cache, "k", ttl, counting(&calls, FetchOutcome::Fetched(mit.clone()))).await;
        let second = get_or_fetch(
            &cache,
            "k",
            ttl,
            counting(&calls, FetchOutcome::Fetched(vec!["other".to_string()])),
        )
        .await;

        assert_eq!(first, FetchOutcome::Fetched(mit.clone()));
        assert_eq!(second, FetchOutcome::Fetched(mit));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
