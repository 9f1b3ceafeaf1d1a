//! Numeric statistics derived from free-text fields

use std::collections::BTreeMap;

/// Length in characters
pub fn char_length(text: &str) -> f64 {
    text.chars().count() as f64
}

/// Shannon entropy of the character distribution, in bits per character.
///
/// Counts are kept in a `BTreeMap` so the summation order, and therefore the
/// exact float result, is the same on every call.
pub fn char_entropy(text: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let len = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}
