//! Nominatim (OpenStreetMap) geocoding for affiliations
//!
//! Usage policy: at most one request per second with an identifying
//! User-Agent. Both hits and "not found" answers are cached; institutions
//! do not move.

use super::{get_or_fetch, Geocoder, HttpJsonClient};
use crate::types::{AffiliationRecord, FetchOutcome, GeoPoint, SourceFailure};
use async_trait::async_trait;
use rtwin_common::{cache_key, Cache};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NominatimHit {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
}

/// First hit → point; coordinates arrive as decimal strings
pub fn parse_hits(hits: &[NominatimHit], query: &str) -> FetchOutcome<Option<GeoPoint>> {
    let Some(hit) = hits.first() else {
        return FetchOutcome::Fetched(None);
    };
    match (hit.lat.trim().parse::<f64>(), hit.lon.trim().parse::<f64>()) {
        (Ok(lat), Ok(lng)) => FetchOutcome::Fetched(Some(GeoPoint {
            lat,
            lng,
            display_name: hit.display_name.clone().unwrap_or_else(|| query.to_string()),
        })),
        _ => FetchOutcome::Unavailable(SourceFailure::Malformed(format!(
            "coordinates '{}', '{}'",
            hit.lat, hit.lon
        ))),
    }
}

pub struct NominatimGeocoder {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl NominatimGeocoder {
    pub fn new(client: HttpJsonClient, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> FetchOutcome<Option<GeoPoint>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return FetchOutcome::Fetched(None);
        }

        let key = cache_key(&["geocode", &query.to_lowercase()]);
        get_or_fetch(self.cache.as_ref(), &key, self.ttl, || async {
            let params = [
                ("q", query.to_string()),
                ("format", "json".to_string()),
                ("limit", "1".to_string()),
                ("addressdetails", "0".to_string()),
            ];
            match self
                .client
                .get_json::<Vec<NominatimHit>>(NOMINATIM_URL, &params, &[])
                .await
            {
                FetchOutcome::Fetched(hits) => parse_hits(&hits, query),
                FetchOutcome::Unavailable(failure) => FetchOutcome::Unavailable(failure),
            }
        })
        .await
    }
}

/// Locate one affiliation: "institution, city, country" first, then the
/// institution name alone
pub async fn geocode_affiliation(
    geocoder: &dyn Geocoder,
    affiliation: &AffiliationRecord,
) -> Option<GeoPoint> {
    let parts: Vec<&str> = std::iter::once(affiliation.institution.as_str())
        .chain(affiliation.city.as_deref())
        .chain(affiliation.country.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();

    let full_query = parts.join(", ");
    if let Some(point) = geocoder.geocode(&full_query).await.fetched().flatten() {
        return Some(point);
    }

    if parts.len() > 1 {
        debug!(institution = %affiliation.institution, "Falling back to institution-only geocode");
        return geocoder
            .geocode(&affiliation.institution)
            .await
            .fetched()
            .flatten();
    }
    None
}
