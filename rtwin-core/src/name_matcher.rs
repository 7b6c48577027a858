// Name Matcher - same-person test for free-text author names
//
// Tolerates abbreviated given names ("G. Metz" vs "Gerlinde Metz",
// "M. H. Frasch" vs "Martin Frasch"). Surnames must agree exactly after
// normalization; no edit distance is applied here.

/// Split a name into (given-name tokens, surname)
///
/// `.`, `-` and `,` become spaces; the last token is the surname. A
/// single-token name is its own surname with no given names.
pub fn split_name(name: &str) -> (Vec<String>, String) {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '.' | '-' | ',') { ' ' } else { c })
        .collect();
    let mut tokens: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();

    match tokens.pop() {
        Some(surname) => (tokens, surname),
        None => (Vec::new(), String::new()),
    }
}

/// Do two names denote the same person?
pub fn matches(name_a: &str, name_b: &str) -> bool {
    let (given_a, surname_a) = split_name(name_a);
    let (given_b, surname_b) = split_name(name_b);

    if surname_a.is_empty() || surname_a != surname_b {
        return false;
    }

    if given_a.is_empty() || given_b.is_empty() {
        return true;
    }

    given_a
        .iter()
        .any(|ta| given_b.iter().any(|tb| tokens_agree(ta, tb)))
}

/// Identical, or one is a single-letter initial of the other
fn tokens_agree(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    is_initial_of(a, b) || is_initial_of(b, a)
}

fn is_initial_of(initial: &str, full: &str) -> bool {
    initial.chars().count() == 1 && full.starts_with(initial)
}
