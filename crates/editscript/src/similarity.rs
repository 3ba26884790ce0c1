//! String similarity measures used for fuzzy node matching.

use std::collections::HashMap;

/// Dice coefficient over character bigrams.
///
/// Identical strings score 1.0; a string too short to form a bigram scores 0.0
/// against anything else.
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let left = bigrams(a);
    let right = bigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::new();
    for gram in &left {
        *counts.entry(*gram).or_default() += 1;
    }
    let mut common = 0usize;
    for gram in &right {
        if let Some(count) = counts.get_mut(gram) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }
    (2 * common) as f64 / (left.len() + right.len()) as f64
}

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `1 - distance / longer length`; two empty strings are identical
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bigram_similarity() {
        assert_eq!(bigram_similarity("night", "night"), 1.0);
        assert_eq!(bigram_similarity("", ""), 1.0);
        assert_eq!(bigram_similarity("a", "b"), 0.0);
        assert_eq!(bigram_similarity("ab", "cd"), 0.0);
        // night: ni ig gh ht / nacht: na ac ch ht -> one shared bigram
        assert!((bigram_similarity("night", "nacht") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_similarity("", ""), 1.0);
        assert!((levenshtein_similarity("abcd", "abce") - 0.75).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn proptest_similarities_are_bounded_and_symmetric(a in "[a-c ]{0,8}", b in "[a-c ]{0,8}") {
            let bigram = bigram_similarity(&a, &b);
            let lev = levenshtein_similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&bigram));
            prop_assert!((0.0..=1.0).contains(&lev));
            prop_assert!((bigram - bigram_similarity(&b, &a)).abs() < 1e-9);
            prop_assert!((lev - levenshtein_similarity(&b, &a)).abs() < 1e-9);
        }
    }
}
