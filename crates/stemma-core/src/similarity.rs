//! # Name Similarity
//!
//! Fuzzy string matching for tree reconciliation.
//!
//! The merge engine only depends on the [`Similarity`] trait, so any
//! normalized edit-distance scorer can be substituted. [`TokenSetRatio`] is
//! the default: case- and order-insensitive, tolerant of extra tokens.
//!
//! Everything is integer arithmetic. Pairwise scores are 0..=100, aggregated
//! scores are per-mille (0..=1000).

use std::collections::BTreeSet;

/// Capability: similarity of two strings on a 0..=100 scale.
pub trait Similarity {
    fn similarity(&self, a: &str, b: &str) -> u32;
}

/// Token-set ratio over lower-cased whitespace tokens.
///
/// Shared tokens are compared against each side's remainder, so
/// "Weasley Ron" matches "ron weasley" perfectly and "Ronald Bilius Weasley"
/// still scores high against "Ronald Weasley".
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSetRatio;

impl Similarity for TokenSetRatio {
    fn similarity(&self, a: &str, b: &str) -> u32 {
        let left = tokens(a);
        let right = tokens(b);
        if left.is_empty() || right.is_empty() {
            return 0;
        }

        let common: Vec<&str> = left.intersection(&right).map(String::as_str).collect();
        let only_left: Vec<&str> = left.difference(&right).map(String::as_str).collect();
        let only_right: Vec<&str> = right.difference(&left).map(String::as_str).collect();

        if !common.is_empty() && (only_left.is_empty() || only_right.is_empty()) {
            return 100;
        }

        let common_str = common.join(" ");
        let combined_left = join_nonempty(&common_str, &only_left.join(" "));
        let combined_right = join_nonempty(&common_str, &only_right.join(" "));

        indel_ratio(&common_str, &combined_left)
            .max(indel_ratio(&common_str, &combined_right))
            .max(indel_ratio(&combined_left, &combined_right))
    }
}

fn tokens(s: &str) -> BTreeSet<String> {
    s.split_whitespace().map(str::to_lowercase).collect()
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Insert/delete edit distance between two char sequences.
///
/// Two DP rows; a substitution costs a deletion plus an insertion.
fn indel_distance(a: &[char], b: &[char]) -> usize {
    let n = b.len();
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, &c) in a.iter().enumerate() {
        curr[0] = i + 1;
        for j in 1..=n {
            let deletion = prev[j] + 1;
            let insertion = curr[j - 1] + 1;
            let keep = if c == b[j - 1] { prev[j - 1] } else { usize::MAX };
            curr[j] = deletion.min(insertion).min(keep);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// `100 * (1 - indel / (len_a + len_b))`, rounded half up.
fn indel_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let kept = total - indel_distance(&a, &b);
    ((200 * kept + total) / (2 * total)) as u32
}

/// Per-mille similarity of two name lists.
///
/// Each name of the shorter list is scored against its best match in the
/// longer list and the scores are averaged. Either list empty scores 0.
pub fn name_similarity<S: Similarity + ?Sized>(
    scorer: &S,
    names_a: &[&str],
    names_b: &[&str],
) -> u32 {
    if names_a.is_empty() || names_b.is_empty() {
        return 0;
    }
    let (shorter, longer) = if names_b.len() < names_a.len() {
        (names_b, names_a)
    } else {
        (names_a, names_b)
    };
    let total: u32 = shorter
        .iter()
        .map(|s| {
            longer
                .iter()
                .map(|l| scorer.similarity(s, l).min(100))
                .max()
                .unwrap_or(0)
        })
        .sum();
    total * 10 / shorter.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_and_reordered_names_score_full() {
        let scorer = TokenSetRatio;
        assert_eq!(scorer.similarity("John Smith", "John Smith"), 100);
        assert_eq!(scorer.similarity("Smith  JOHN", "john smith"), 100);
    }

    #[test]
    fn subset_tokens_score_full() {
        assert_eq!(
            TokenSetRatio.similarity("Ronald Bilius Weasley", "Ronald Weasley"),
            100
        );
    }

    #[test]
    fn near_spelling_scores_high() {
        let score = TokenSetRatio.similarity("John Smith", "Jon Smith");
        assert!(score >= 90, "score was {}", score);
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = TokenSetRatio.similarity("Xu", "Bob");
        assert_eq!(score, 0);
        assert!(TokenSetRatio.similarity("John Smith", "Mary Jones") < 60);
    }

    #[test]
    fn blank_input_scores_zero() {
        assert_eq!(TokenSetRatio.similarity("", "John"), 0);
        assert_eq!(TokenSetRatio.similarity("   ", "   "), 0);
    }

    #[test]
    fn indel_ratio_values() {
        assert_eq!(indel_ratio("abc", "abc"), 100);
        assert_eq!(indel_ratio("abc", "xyz"), 0);
        // lcs 9 of 19 chars: 200 * 9 / 19 = 94.7
        assert_eq!(indel_ratio("smith john", "smith jon"), 95);
    }

    #[test]
    fn name_lists_average_over_shorter() {
        let scorer = TokenSetRatio;
        assert_eq!(name_similarity(&scorer, &["Ron Weasley"], &["Ron Weasley", "Won-Won"]), 1000);
        assert_eq!(name_similarity(&scorer, &[], &["Ron"]), 0);
        let mixed = name_similarity(&scorer, &["Ron", "Xu"], &["Ron", "Bob"]);
        assert_eq!(mixed, 500);
    }
}
