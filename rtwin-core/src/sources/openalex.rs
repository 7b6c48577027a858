//! OpenAlex author affiliations, inferred from the citation graph
//!
//! Each affiliation lists the publication years it was observed in; an
//! affiliation is current when it appears in the author's latest year.

use super::{get_or_fetch, AffiliationSource, HttpJsonClient};
use crate::types::{AffiliationRecord, FetchOutcome, PersonIdentity, SourceFailure, SourceName};
use async_trait::async_trait;
use rtwin_common::{cache_key, Cache};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const OPENALEX_BASE_URL: &str = "https://api.openalex.org";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAlexAuthor {
    pub display_name: Option<String>,
    pub affiliations: Option<Vec<OpenAlexAffiliation>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAlexAffiliation {
    pub institution: Option<OpenAlexInstitution>,
    pub years: Option<Vec<i32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenAlexInstitution {
    pub display_name: Option<String>,
    pub country_code: Option<String>,
}

/// Affiliation records in upstream order
pub fn parse_affiliations(author: &OpenAlexAuthor) -> Vec<AffiliationRecord> {
    let affiliations = author.affiliations.as_deref().unwrap_or_default();
    let latest_of = |a: &OpenAlexAffiliation| a.years.as_deref().and_then(|y| y.iter().max().copied());
    let latest_year = affiliations.iter().filter_map(latest_of).max();

    affiliations
        .iter()
        .filter_map(|aff| {
            let institution = aff.institution.as_ref()?;
            let name = institution.display_name.as_deref()?;
            let is_current = latest_year.is_some() && latest_of(aff) == latest_year;
            AffiliationRecord::new(name, is_current, SourceName::OpenAlex)
                .ok()
                .map(|r| r.with_location(None, institution.country_code.clone()))
        })
        .collect()
}

pub struct OpenAlexClient {
    client: HttpJsonClient,
    cache: Arc<dyn Cache>,
    affiliation_ttl: Duration,
}

impl OpenAlexClient {
    pub fn new(client: HttpJsonClient, cache: Arc<dyn Cache>, affiliation_ttl: Duration) -> Self {
        Self {
            client,
            cache,
            affiliation_ttl,
        }
    }
}

#[async_trait]
impl AffiliationSource for OpenAlexClient {
    fn source(&self) -> SourceName {
        SourceName::OpenAlex
    }

    async fn affiliations(&self, person: &PersonIdentity) -> FetchOutcome<Vec<AffiliationRecord>> {
        let Some(orcid) = person.identifier(SourceName::Orcid) else {
            return FetchOutcome::Unavailable(SourceFailure::NotConfigured);
        };

        let key = cache_key(&["openalex", "affiliations", orcid]);
        get_or_fetch(self.cache.as_ref(), &key, self.affiliation_ttl, || async {
            let url = format!("{}/authors/orcid:{}", OPENALEX_BASE_URL, orcid);
            self.client
                .get_json::<OpenAlexAuthor>(&url, &[], &[])
                .await
                .map(|author| parse_affiliations(&author))
        })
        .await
    }
}
