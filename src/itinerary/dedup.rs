use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::Poi;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// "7-eleven" appeared twice in the list this was taken from; one entry is enough.
pub const CHAIN_WORDS: &[&str] = &[
    "starbucks",
    "mcdonald",
    "kfc",
    "burger king",
    "dunkin",
    "subway",
    "7-eleven",
    "7 11",
    "pizza hut",
];

/// Dedup key: trimmed, inner whitespace collapsed, lowercased.
pub fn normalize_name(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").to_lowercase()
}

/// First-seen-wins dedup by normalized name. Nameless items are dropped.
pub fn dedupe_by_name(items: &[Poi]) -> Vec<Poi> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| {
            let key = normalize_name(&item.name);
            !key.is_empty() && seen.insert(key)
        })
        .cloned()
        .collect()
}

pub fn is_chain(name: &str) -> bool {
    let lowered = name.to_lowercase();
    CHAIN_WORDS.iter().any(|word| lowered.contains(word))
}

/// Drops chain outlets unless fewer than `keep_at_least` items would remain.
pub fn filter_chains(items: &[Poi], keep_at_least: usize) -> Vec<Poi> {
    let non_chains: Vec<Poi> = items
        .iter()
        .filter(|item| !is_chain(&item.name))
        .cloned()
        .collect();
    if non_chains.len() >= keep_at_least {
        non_chains
    } else {
        items.to_vec()
    }
}
