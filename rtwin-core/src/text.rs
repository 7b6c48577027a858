//! Text normalization shared by the matchers
//!
//! - `fold_name`: NFKD, strip combining marks, lowercase, collapse whitespace
//! - `normalize_title`: lowercase, drop punctuation, collapse whitespace
//! - `similarity`: Ratcliff/Obershelp matching-blocks ratio in [0, 1]

use difflib::sequencematcher::SequenceMatcher;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Accent-insensitive, case-insensitive key for institution names
pub fn fold_name(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for work titles
///
/// Keeps letters, digits, underscore and whitespace.
pub fn normalize_title(s: &str) -> String {
    let kept: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matching-blocks similarity ratio between two already-normalized strings
///
/// `2·M / T` over characters, where `M` is the total size of the recursive
/// longest common blocks and `T` the combined length. Two empty strings
/// are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut matcher = SequenceMatcher::<char>::new(a.as_slice(), b.as_slice());
    let matched: usize = matcher.get_matching_blocks().iter().map(|m| m.size).sum();
    // computed in f64: the crate's own ratio() is f32 and lands just above
    // exact thresholds such as 0.8
    2.0 * matched as f64 / total as f64
}
