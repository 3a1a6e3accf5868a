//! Token normalization shared by the catalog, placer and validator.

use rustc_hash::FxHashSet;

/// Lowercase ASCII-alphanumeric runs joined by `_`.
///
/// `"Apple Tree!"` and `"apple-tree"` both become `"apple_tree"`.
pub fn slugify(input: &str) -> String {
    tokens(input).join("_")
}

/// Lowercased alphanumeric fragments of `input`.
pub fn tokens(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Word fragments only, with numeric fragments dropped. `"squirrel_2"`
/// yields `["squirrel"]`.
pub fn word_tokens(input: &str) -> Vec<String> {
    tokens(input)
        .into_iter()
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// Claim `base` in `taken`, appending `_2`, `_3`, ... on collision.
pub fn claim_unique(base: &str, taken: &mut FxHashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Push `item` unless it is already present. Keeps first-seen order.
pub fn push_unique(list: &mut Vec<String>, item: &str) {
    if !item.is_empty() && !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
