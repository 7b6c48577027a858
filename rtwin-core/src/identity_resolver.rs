// Identity Resolver - known profile id → foreign author id
//
// Transitive evidence: publications on the known profile (DOIs) are looked up
// on the foreign author index, and every co-author whose name matches the
// person casts a vote for their foreign id. A direct name search is unioned
// in to catch fragmented profiles that share no DOI with the known profile.
// The canonical id is the candidate with the largest publication count.

use crate::name_matcher;
use crate::sources::{with_deadline, AuthorIndex, WorksSource};
use crate::types::FetchOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default cap on DOIs sampled from the known profile
pub const DEFAULT_MAX_DOIS: usize = 8;

/// Why resolution produced no identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Blank known id or display name
    InvalidInput,
    /// The known profile yielded no DOIs
    NoPublications,
    /// Neither DOI votes nor name search produced a matching author
    NoCandidates,
}

/// One foreign author id considered during resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub author_id: String,
    /// Matching-author occurrences across the sampled DOIs
    pub votes: u32,
    /// Also returned by the direct name search
    pub from_search: bool,
    pub paper_count: Option<u64>,
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub foreign_id: String,
    /// All candidates in first-seen order
    pub candidates: Vec<Candidate>,
}

/// Outcome of one resolution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedIdentity),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn foreign_id(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(r) => Some(r.foreign_id.as_str()),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// Vote tally keyed by foreign id, preserving first-seen order
#[derive(Debug, Default)]
struct CandidateVotes {
    entries: Vec<Candidate>,
}

impl CandidateVotes {
    fn entry(&mut self, author_id: &str) -> &mut Candidate {
        let idx = match self.entries.iter().position(|c| c.author_id == author_id) {
            Some(idx) => idx,
            None => {
                self.entries.push(Candidate {
                    author_id: author_id.to_string(),
                    votes: 0,
                    from_search: false,
                    paper_count: None,
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    fn vote(&mut self, author_id: &str) {
        self.entry(author_id).votes += 1;
    }

    fn mark_searched(&mut self, author_id: &str) {
        self.entry(author_id).from_search = true;
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolver over a works source (known side) and an author index (foreign side)
pub struct IdentityResolver {
    works: Arc<dyn WorksSource>,
    authors: Arc<dyn AuthorIndex>,
    max_dois: usize,
    call_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(
        works: Arc<dyn WorksSource>,
        authors: Arc<dyn AuthorIndex>,
        max_dois: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            works,
            authors,
            max_dois: max_dois.max(1),
            call_timeout,
        }
    }

    /// Map `known_id` to the foreign author id of the person `display_name`
    ///
    /// Source failures degrade the affected step to empty; only an empty
    /// union of DOI votes and name search yields `Unresolved`.
    pub async fn resolve(&self, known_id: &str, display_name: &str) -> Resolution {
        let known_id = known_id.trim();
        let display_name = display_name.trim();
        if known_id.is_empty() || display_name.is_empty() {
            debug!("Resolution skipped: blank id or name");
            return Resolution::Unresolved(UnresolvedReason::InvalidInput);
        }

        let dois = match with_deadline(
            self.call_timeout,
            self.works.publication_dois(known_id, self.max_dois),
        )
        .await
        {
            FetchOutcome::Fetched(dois) => dois,
            FetchOutcome::Unavailable(failure) => {
                warn!(known_id = %known_id, failure = %failure, "Works lookup unavailable");
                Vec::new()
            }
        };

        if dois.is_empty() {
            info!(known_id = %known_id, "No DOIs on known profile");
            return Resolution::Unresolved(UnresolvedReason::NoPublications);
        }

        let mut votes = CandidateVotes::default();

        // Sequential on purpose: the author index is rate limited
        for doi in dois.iter().take(self.max_dois) {
            let authors = with_deadline(self.call_timeout, self.authors.authors_for_doi(doi))
                .await
                .or_empty();
            for author in authors {
                if author.author_id.is_empty() {
                    continue;
                }
                if name_matcher::matches(display_name, &author.name) {
                    debug!(doi = %doi, author_id = %author.author_id, "DOI vote");
                    votes.vote(&author.author_id);
                }
            }
        }

        let searched = with_deadline(self.call_timeout, self.authors.search_authors(display_name))
            .await
            .or_empty();
        for author in searched {
            if !author.author_id.is_empty() && name_matcher::matches(display_name, &author.name) {
                votes.mark_searched(&author.author_id);
            }
        }

        if votes.is_empty() {
            info!(known_id = %known_id, name = %display_name, "No matching foreign author");
            return Resolution::Unresolved(UnresolvedReason::NoCandidates);
        }

        let mut candidates = votes.entries;
        for candidate in candidates.iter_mut() {
            candidate.paper_count =
                with_deadline(self.call_timeout, self.authors.paper_count(&candidate.author_id))
                    .await
                    .fetched();
        }

        let foreign_id = pick_largest_profile(&candidates);
        info!(
            known_id = %known_id,
            foreign_id = %foreign_id,
            candidates = candidates.len(),
            "Identity resolved"
        );

        Resolution::Resolved(ResolvedIdentity {
            foreign_id,
            candidates,
        })
    }
}

/// Candidate with the strictly largest paper count; ties and unknown counts
/// fall back to first-seen order
fn pick_largest_profile(candidates: &[Candidate]) -> String {
    let mut best = &candidates[0];
    let mut best_count = 0u64;
    for candidate in candidates {
        let count = candidate.paper_count.unwrap_or(0);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best.author_id.clone()
}
