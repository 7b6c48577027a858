//! Shared JSON-over-HTTP client for upstream sources
//!
//! Applies the per-call timeout, an optional shared rate limiter, and
//! exactly one fixed-delay retry after HTTP 429. Every failure maps onto a
//! [`SourceFailure`]; nothing here returns an error.

use crate::types::{FetchOutcome, SourceFailure, SourceName};
use rtwin_common::config::HttpConfig;
use rtwin_common::{Error, RateLimiter, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HttpJsonClient {
    http_client: reqwest::Client,
    source: SourceName,
    rate_limiter: Option<Arc<RateLimiter>>,
    retry_delay: Duration,
}

impl HttpJsonClient {
    pub fn new(
        source: SourceName,
        config: &HttpConfig,
        rate_limiter: Option<Arc<RateLimiter>>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("HTTP client for {}: {}", source, e)))?;

        Ok(Self {
            http_client,
            source,
            rate_limiter,
            retry_delay: config.retry_delay(),
        })
    }

    pub fn source(&self) -> SourceName {
        self.source
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> FetchOutcome<T> {
        self.send_json(|| {
            let mut request = self.http_client.get(url).query(query);
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }
            request
        })
        .await
    }

    /// POST a JSON body to `url` and decode the JSON response
    pub async fn post_json<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> FetchOutcome<T> {
        self.send_json(|| self.http_client.post(url).json(body)).await
    }

    async fn send_json<T, F>(&self, build: F) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retried = false;
        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire().await;
            }

            let response = match build().send().await {
                Ok(response) => response,
                Err(e) => return FetchOutcome::Unavailable(self.transport_failure(&e)),
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retried {
                    warn!(source = %self.source, "Still rate limited after retry");
                    return FetchOutcome::Unavailable(SourceFailure::RateLimited);
                }
                debug!(source = %self.source, delay = ?self.retry_delay, "Rate limited, retrying once");
                retried = true;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            if !status.is_success() {
                debug!(source = %self.source, status = status.as_u16(), "Upstream returned error status");
                return FetchOutcome::Unavailable(SourceFailure::Http {
                    status: status.as_u16(),
                });
            }

            return match response.json::<T>().await {
                Ok(body) => FetchOutcome::Fetched(body),
                Err(e) if e.is_timeout() => FetchOutcome::Unavailable(SourceFailure::Timeout),
                Err(e) => {
                    warn!(source = %self.source, error = %e, "Malformed upstream payload");
                    FetchOutcome::Unavailable(SourceFailure::Malformed(e.to_string()))
                }
            };
        }
    }

    fn transport_failure(&self, e: &reqwest::Error) -> SourceFailure {
        if e.is_timeout() {
            warn!(source = %self.source, "Upstream request timed out");
            SourceFailure::Timeout
        } else {
            warn!(source = %self.source, error = %e, "Upstream request failed");
            SourceFailure::Network(e.to_string())
        }
    }
}
