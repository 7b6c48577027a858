//! ORCID public API: works (DOIs) and employment history
//!
//! ORCID is the known starting point for identity resolution and the
//! richest affiliation source (self-reported, with city/country and dates).

use super::{get_or_fetch, AffiliationSource, HttpJsonClient, WorksSource};
use crate::affiliation_merger::AffiliationMerger;
use crate::types::{AffiliationRecord, FetchOutcome, PersonIdentity, SourceFailure, SourceName};
use async_trait::async_trait;
use rtwin_common::{cache_key, Cache};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const ORCID_BASE_URL: &str = "https://pub.orcid.org/v3.0";

// ============================================================================
// Payloads
// ============================================================================

/// `/{orcid}/works` response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorksResponse {
    pub group: Vec<WorkGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkGroup {
    #[serde(rename = "work-summary")]
    pub work_summary: Vec<WorkSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkSummary {
    #[serde(rename = "external-ids")]
    pub external_ids: Option<ExternalIds>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExternalIds {
    #[serde(rename = "external-id")]
    pub external_id: Vec<ExternalId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExternalId {
    #[serde(rename = "external-id-type")]
    pub id_type: String,
    #[serde(rename = "external-id-value")]
    pub value: String,
}

/// `/{orcid}/employments` response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmploymentsResponse {
    #[serde(rename = "affiliation-group")]
    pub affiliation_group: Vec<AffiliationGroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AffiliationGroup {
    pub summaries: Vec<EmploymentItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmploymentItem {
    #[serde(rename = "employment-summary")]
    pub employment_summary: Option<EmploymentSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmploymentSummary {
    pub organization: Option<Organization>,
    #[serde(rename = "end-date")]
    pub end_date: Option<FuzzyDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub name: String,
    pub address: Option<OrgAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrgAddress {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FuzzyDate {
    pub year: Option<serde_json::Value>,
}

// ============================================================================
// Parsing
// ============================================================================

/// First DOI of each work group, at most `cap`
pub fn parse_dois(works: &WorksResponse, cap: usize) -> Vec<String> {
    works
        .group
        .iter()
        .filter_map(|group| {
            group
                .work_summary
                .first()
                .and_then(|summary| summary.external_ids.as_ref())
                .and_then(|ids| {
                    ids.external_id
                        .iter()
                        .find(|id| id.id_type.eq_ignore_ascii_case("doi") && !id.value.trim().is_empty())
                })
                .map(|id| id.value.trim().to_string())
        })
        .take(cap)
        .collect()
}

/// Employment records, current when no end year is recorded
pub fn parse_employments(response: &EmploymentsResponse) -> Vec<AffiliationRecord> {
    response
        .affiliation_group
        .iter()
        .flat_map(|group| group.summaries.iter())
        .filter_map(|item| item.employment_summary.as_ref())
        .filter_map(|summary| {
            let org = summary.organization.as_ref()?;
            let is_current = summary
                .end_date
                .as_ref()
                .map(|d| d.year.as_ref().map_or(true, |y| y.is_null()))
                .unwrap_or(true);
            let address = org.address.as_ref();
            AffiliationRecord::new(org.name.as_str(), is_current, SourceName::Orcid)
                .ok()
                .map(|record| {
                    record.with_location(
                        address.and_then(|a| a.city.clone()),
                        address.and_then(|a| a.country.clone()),
                    )
                })
        })
        .collect()
}

// ============================================================================
// Client
// ============================================================================

pub struct OrcidClient {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    affiliation_ttl: Duration,
    merger: AffiliationMerger,
}

impl OrcidClient {
    pub fn new(
        client: HttpJsonClient,
        cache: Arc<dyn Cache>,
        affiliation_ttl: Duration,
        merger: AffiliationMerger,
    ) -> Self {
        Self {
            client,
            cache,
            affiliation_ttl,
            merger,
        }
    }

    fn accept_json() -> Vec<(&'static str, String)> {
        vec![("Accept", "application/json".to_string())]
    }
}

#[async_trait]
impl WorksSource for OrcidClient {
    async fn publication_dois(&self, orcid: &str, cap: usize) -> FetchOutcome<Vec<String>> {
        let url = format!("{}/{}/works", ORCID_BASE_URL, orcid);
        debug!(orcid = %orcid, "Fetching ORCID works");
        self.client
            .get_json::<WorksResponse>(&url, &[], &Self::accept_json())
            .await
            .map(|works| parse_dois(&works, cap))
    }
}

#[async_trait]
impl AffiliationSource for OrcidClient {
    fn source(&self) -> SourceName {
        SourceName::Orcid
    }

    async fn affiliations(&self, person: &PersonIdentity) -> FetchOutcome<Vec<AffiliationRecord>> {
        let Some(orcid) = person.identifier(SourceName::Orcid) else {
            return FetchOutcome::Unavailable(SourceFailure::NotConfigured);
        };

        let key = cache_key(&["orcid", "employments", orcid]);
        get_or_fetch(self.cache.as_ref(), &key, self.affiliation_ttl, || async {
            let url = format!("{}/{}/employments", ORCID_BASE_URL, orcid);
            self.client
                .get_json::<EmploymentsResponse>(&url, &[], &Self::accept_json())
                .await
                .map(|response| self.merger.dedup_within_source(&parse_employments(&response)))
        })
        .await
    }
}
