// Bibliometric merge - primary author index + scholar profile
//
// The primary record (Semantic Scholar) wins on identity; the secondary
// (Google Scholar) adds papers the primary lacks and the i10-index. Author
// metrics take the larger of the two.

use crate::text::{normalize_title, similarity};
use crate::types::{BibliometricRecord, PaperRecord};
use tracing::debug;

/// Title similarity above which two papers are the same work
pub const TITLE_MATCH_THRESHOLD: f64 = 0.85;

/// Shorter normalized titles are too generic to match on
const MIN_TITLE_CHARS: usize = 10;

/// Papers kept on the merged record
pub const MAX_TOP_PAPERS: usize = 20;

/// Merge the two records; either may be missing
pub fn merge_bibliometrics(
    primary: Option<BibliometricRecord>,
    secondary: Option<BibliometricRecord>,
) -> Option<BibliometricRecord> {
    match (primary, secondary) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(finish(only)),
        (Some(primary), Some(secondary)) => Some(merge_both(primary, secondary)),
    }
}

fn finish(mut record: BibliometricRecord) -> BibliometricRecord {
    sort_and_truncate(&mut record.top_papers);
    record
}

fn sort_and_truncate(papers: &mut Vec<PaperRecord>) {
    papers.sort_by(|a, b| b.citations.cmp(&a.citations));
    papers.truncate(MAX_TOP_PAPERS);
}

fn merge_both(primary: BibliometricRecord, secondary: BibliometricRecord) -> BibliometricRecord {
    let mut papers = primary.top_papers.clone();
    let keys: Vec<String> = papers.iter().map(|p| normalize_title(&p.title)).collect();

    let mut matched = 0usize;
    let mut added = 0usize;
    for paper in &secondary.top_papers {
        let key = normalize_title(&paper.title);
        if key.chars().count() < MIN_TITLE_CHARS {
            continue;
        }

        match keys
            .iter()
            .position(|existing| similarity(&key, existing) > TITLE_MATCH_THRESHOLD)
        {
            Some(idx) => {
                papers[idx].citations = papers[idx].citations.max(paper.citations);
                matched += 1;
            }
            None => {
                papers.push(paper.clone());
                added += 1;
            }
        }
    }
    debug!(matched, added, "Scholar papers merged");

    sort_and_truncate(&mut papers);

    let mut sources = primary.sources.clone();
    for source in secondary.sources {
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    BibliometricRecord {
        name: if primary.name.is_empty() {
            secondary.name
        } else {
            primary.name
        },
        paper_count: primary.paper_count.max(secondary.paper_count),
        citation_count: primary.citation_count.max(secondary.citation_count),
        h_index: primary.h_index.max(secondary.h_index),
        i10_index: secondary.i10_index,
        top_papers: papers,
        sources,
    }
}
