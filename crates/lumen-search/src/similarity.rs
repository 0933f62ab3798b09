//! Normalized edit-distance similarity used for fuzzy relevance scoring.

/// Levenshtein distance over Unicode scalar values.
///
/// Insertion, deletion and substitution each cost 1. Uses the classic
/// O(n·m) dynamic-programming table, kept as two rolling rows.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev_row[j] + usize::from(ca != cb);
            let deletion = prev_row[j + 1] + 1;
            let insertion = curr_row[j] + 1;
            curr_row[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// `1 - edit_distance(a, b) / max(len(a), len(b))`, in `[0, 1]`.
///
/// Two empty strings are identical (1.0). Lengths count characters, not bytes.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edit_distance_known_values() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "abd"), 1);
        assert_eq!(edit_distance("abc", "abcd"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn test_edit_distance_counts_characters_not_bytes() {
        assert_eq!(edit_distance("café", "cafe"), 1);
        assert_eq!(edit_distance("日本", "日本語"), 1);
    }

    #[test]
    fn test_similarity_known_values() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("dog", "dog"), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_threshold_examples() {
        // One typo in a short label stays above the 0.7 object-match cutoff.
        assert!(similarity("laptop", "labtop") > 0.7);
        assert!(similarity("car", "cat") < 0.7);
    }

    proptest! {
        #[test]
        fn test_edit_distance_identity(s in ".{0,24}") {
            prop_assert_eq!(edit_distance(&s, &s), 0);
        }

        #[test]
        fn test_similarity_identity(s in ".{1,24}") {
            prop_assert_eq!(similarity(&s, &s), 1.0);
        }

        #[test]
        fn test_edit_distance_symmetric(a in ".{0,16}", b in ".{0,16}") {
            prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
        }

        #[test]
        fn test_similarity_bounded(a in ".{0,16}", b in ".{0,16}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
