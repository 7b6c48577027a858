//! GitHub public repositories of a user

use super::{get_or_fetch, HttpJsonClient, RepositorySource};
use crate::types::{FetchOutcome, PersonIdentity, RawRepository, SourceFailure, SourceName};
use async_trait::async_trait;
use rtwin_common::{cache_key, Cache};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GithubRepo {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub language: Option<String>,
    pub license: Option<serde_json::Value>,
    pub fork: bool,
    pub html_url: Option<String>,
}

/// Listing → repositories, forks dropped, most starred first
///
/// The listing carries no README flag; public repositories are assumed to
/// have one.
pub fn parse_repositories(repos: Vec<GithubRepo>) -> Vec<RawRepository> {
    let mut parsed: Vec<RawRepository> = repos
        .into_iter()
        .filter(|r| !r.fork)
        .map(|r| RawRepository {
            name: r.name.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            stars: r.stargazers_count.unwrap_or(0),
            forks: r.forks_count.unwrap_or(0),
            language: r.language.filter(|l| !l.is_empty()),
            has_license: r.license.map_or(false, |l| !l.is_null()),
            has_readme: true,
            is_fork: false,
            url: r.html_url.unwrap_or_default(),
        })
        .collect();
    parsed.sort_by(|a, b| b.stars.cmp(&a.stars));
    parsed
}

pub struct GithubClient {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(
        client: HttpJsonClient,
        cache: Arc<dyn Cache>,
        ttl: Duration,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            cache,
            ttl,
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", "application/vnd.github+json".to_string())];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        headers
    }
}

#[async_trait]
impl RepositorySource for GithubClient {
    async fn repositories(&self, person: &PersonIdentity) -> FetchOutcome<Vec<RawRepository>> {
        let Some(username) = person.identifier(SourceName::Github) else {
            return FetchOutcome::Unavailable(SourceFailure::NotConfigured);
        };

        let key = cache_key(&["gh", "user", username]);
        get_or_fetch(self.cache.as_ref(), &key, self.ttl, || async {
            let url = format!("{}/users/{}/repos", GITHUB_API_URL, username);
            self.client
                .get_json::<Vec<GithubRepo>>(
                    &url,
                    &[("sort", "updated".to_string()), ("per_page", "100".to_string())],
                    &self.headers(),
                )
                .await
                .map(parse_repositories)
        })
        .await
    }
}
