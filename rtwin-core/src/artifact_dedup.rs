// Artifact Deduplicator - one representative per underlying work
//
// Providers list paper fragments (figures, supplementary tables, posters) as
// separate items next to genuine standalone works. Items are grouped by the
// work they belong to and only the most reused item of each group survives.
//
// Grouping key, first rule that applies:
// 1. Standalone type (dataset, software, code, fileset) → own normalized title
// 2. Title matches a part-of pattern ("Figure 2 from X") → parent title X
// 3. Known fragment type (figure, poster, presentation, media) → sorted
//    lowercased author list (co-components of one paper share authors)
// 4. Anything else → own normalized title

use crate::text::normalize_title;
use crate::types::RawArtifact;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

const STANDALONE_TYPES: &[&str] = &["dataset", "software", "code", "fileset"];
const FRAGMENT_TYPES: &[&str] = &["figure", "poster", "presentation", "media"];

/// "Figure 3 from …", "Supplementary file 1 of …", "Table S2 from …"
static PART_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:additional\s+|supplementary\s+)?(?:figure|fig\.?|table|file|material|data|movie|video|appendix|dataset|image)\s+s?\d+[a-z]?\s*[:.]?\s+(?:from|of)\s+(.+?)\s*$",
    )
    .expect("part-of pattern is valid")
});

/// Grouping key for one raw item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Standalone work, keyed by its own title
    Title(String),
    /// Fragment of a named parent work
    Parent(String),
    /// Fragment keyed by its author set
    Authors(String),
}

/// Parent-work title fragment of a part-of title, if any
pub fn parent_title(title: &str) -> Option<String> {
    PART_OF
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_title(m.as_str()))
        .filter(|parent| !parent.is_empty())
}

/// Sorted, lowercased author fingerprint; `None` without authors
pub fn author_fingerprint(authors: &[String]) -> Option<String> {
    let mut names: Vec<String> = authors
        .iter()
        .map(|a| a.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();
    if names.is_empty() {
        return None;
    }
    names.sort();
    Some(names.join("|"))
}

/// Classify one raw item into its group
pub fn group_key(item: &RawArtifact) -> GroupKey {
    let declared = item.declared_type.trim().to_lowercase();
    let own_title = || GroupKey::Title(normalize_title(&item.title));

    if STANDALONE_TYPES.contains(&declared.as_str()) {
        return own_title();
    }

    if let Some(parent) = parent_title(&item.title) {
        return GroupKey::Parent(parent);
    }

    if FRAGMENT_TYPES.contains(&declared.as_str()) {
        if let Some(fingerprint) = author_fingerprint(&item.authors) {
            return GroupKey::Authors(fingerprint);
        }
    }

    own_title()
}

/// Keep exactly one item per group: the highest `downloads + views`,
/// first seen on ties
///
/// Output follows the first appearance of each group. Running this on its
/// own output returns the same list.
pub fn deduplicate(items: &[RawArtifact]) -> Vec<RawArtifact> {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut best: HashMap<GroupKey, &RawArtifact> = HashMap::new();

    for item in items {
        let key = group_key(item);
        match best.get(&key) {
            Some(current) if current.reuse_signal() >= item.reuse_signal() => {
                debug!(title = %item.title, kept = %current.title, "Fragment folded into group");
            }
            Some(current) => {
                debug!(title = %current.title, kept = %item.title, "Fragment folded into group");
                best.insert(key, item);
            }
            None => {
                order.push(key.clone());
                best.insert(key, item);
            }
        }
    }

    let kept: Vec<RawArtifact> = order
        .iter()
        .filter_map(|key| best.get(key).map(|item| (*item).clone()))
        .collect();

    debug!(input = items.len(), kept = kept.len(), "Artifacts deduplicated");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, declared_type: &str, authors: &[&str], downloads: u64, views: u64) -> RawArtifact {
        RawArtifact {
            id: title.to_string(),
            title: title.to_string(),
            declared_type: declared_type.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            downloads,
            views,
            ..Default::default()
        }
    }

    #[test]
    fn test_parent_title_patterns() {
        assert_eq!(
            parent_title("Figure 2 from Fetal ECG in sheep"),
            Some("fetal ecg in sheep".to_string())
        );
        assert_eq!(
            parent_title("Supplementary file 1 of Maternal stress and HRV"),
            Some("maternal stress and hrv".to_string())
        );
        assert_eq!(
            parent_title("Table S3 from Fetal ECG in sheep"),
            Some("fetal ecg in sheep".to_string())
        );
        assert_eq!(parent_title("Fetal ECG dataset"), None);
    }

    #[test]
    fn test_figures_of_one_paper_collapse() {
        let items = vec![
            item("Figure 1 from Fetal ECG in sheep", "figure", &["A Smith"], 3, 40),
            item("Figure 2 from Fetal ECG in sheep", "figure", &["A Smith"], 10, 90),
            item("Table S1 from Fetal ECG in sheep", "dataset", &["A Smith"], 1, 5),
        ];

        let kept = deduplicate(&items);

        // The table is declared a dataset, so it stays standalone
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "Figure 2 from Fetal ECG in sheep");
        assert_eq!(kept[1].title, "Table S1 from Fetal ECG in sheep");
    }

    #[test]
    fn test_fragments_grouped_by_author_set() {
        let items = vec![
            item("Heart rate panel", "figure", &["B Jones", "a smith"], 5, 5),
            item("Conference poster", "poster", &["A Smith", "B  Jones"], 2, 50),
            item("Unrelated figure", "figure", &["C Brown"], 1, 1),
        ];

        let kept = deduplicate(&items);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "Conference poster");
        assert_eq!(kept[1].title, "Unrelated figure");
    }

    #[test]
    fn test_literal_duplicate_listings_collapse() {
        let items = vec![
            item("Sheep ECG Recordings", "dataset", &["A"], 10, 0),
            item("Sheep ECG recordings.", "dataset", &["A"], 10, 0),
            item("Analysis code", "software", &["A"], 0, 0),
        ];

        let kept = deduplicate(&items);

        assert_eq!(kept.len(), 2);
        // Tie on reuse keeps the first seen
        assert_eq!(kept[0].title, "Sheep ECG Recordings");
    }

    #[test]
    fn test_fragment_without_authors_uses_own_title() {
        let items = vec![
            item("Panel A", "figure", &[], 1, 1),
            item("Panel B", "figure", &[], 1, 1),
        ];
        assert_eq!(deduplicate(&items).len(), 2);
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let items = vec![
            item("Figure 1 from Paper X", "figure", &["A"], 1, 1),
            item("Figure 2 from Paper X", "figure", &["A"], 5, 1),
            item("Poster", "poster", &["A", "B"], 0, 9),
            item("Slides", "presentation", &["B", "A"], 0, 3),
            item("Data", "dataset", &["A"], 7, 7),
            item("Data", "dataset", &["A"], 8, 7),
            item("Notebook", "journal contribution", &["A"], 0, 0),
        ];

        let once = deduplicate(&items);
        let twice = deduplicate(&once);

        assert_eq!(once.len(), 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate(&[]).is_empty());
    }
}
