use crate::normalize::normalize;
use crate::scorer::Scorer;

/// Find the best-scoring candidate for `query`.
///
/// Candidates are scored in order and only a strictly higher score replaces
/// the current best, so ties go to the earliest candidate. Returns
/// `(None, 0.0)` when `candidates` is empty, when the query normalizes to
/// nothing, or when the best score is below `cutoff`.
pub fn best_match<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    cutoff: f64,
    scorer: &dyn Scorer,
) -> (Option<&'a str>, f64) {
    if normalize(query).is_empty() {
        return (None, 0.0);
    }

    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if normalize(candidate).is_empty() {
            continue;
        }
        let score = scorer.score(query, candidate);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    match best {
        Some((name, score)) if score >= cutoff => (Some(name), score),
        _ => (None, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{CharOverlap, ScorerKind};
    use proptest::prelude::*;

    #[test]
    fn picks_normalized_equal_candidate() {
        let scorer = ScorerKind::default().build();
        let candidates = ["ACME Bloemen B.V.", "Other Co"];
        let (name, score) = best_match("Acme Bloemen", &candidates, 70.0, scorer.as_ref());
        assert_eq!(name, Some("ACME Bloemen B.V."));
        assert!(score >= 90.0);
    }

    #[test]
    fn below_cutoff_returns_none_and_zero() {
        let scorer = ScorerKind::default().build();
        let candidates = ["ACME Bloemen B.V."];
        let (name, score) = best_match("Unknown Florist", &candidates, 70.0, scorer.as_ref());
        assert_eq!(name, None);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn empty_candidates() {
        let candidates: [&str; 0] = [];
        assert_eq!(best_match("Acme", &candidates, 0.0, &CharOverlap), (None, 0.0));
    }

    #[test]
    fn empty_query_never_matches() {
        let candidates = ["Acme", ""];
        assert_eq!(best_match(" . ", &candidates, 0.0, &CharOverlap), (None, 0.0));
    }

    #[test]
    fn blank_candidates_are_skipped() {
        let candidates = ["", "  ", "Acme"];
        let (name, _) = best_match("Acme", &candidates, 50.0, &CharOverlap);
        assert_eq!(name, Some("Acme"));
    }

    #[test]
    fn tie_goes_to_first_candidate() {
        // Both normalize to "acme", both score 100.
        let candidates = ["Acme BV".to_string(), "ACME B.V.".to_string()];
        let (name, score) = best_match("acme", &candidates, 70.0, &CharOverlap);
        assert_eq!(name, Some("Acme BV"));
        assert_eq!(score, 100.0);

        let reversed = ["ACME B.V.".to_string(), "Acme BV".to_string()];
        let (name, _) = best_match("acme", &reversed, 70.0, &CharOverlap);
        assert_eq!(name, Some("ACME B.V."));
    }

    proptest! {
        #[test]
        fn repeated_calls_are_deterministic(
            query in "[A-Za-z .&]{0,20}",
            candidates in proptest::collection::vec("[A-Za-z .&]{0,20}", 0..8),
        ) {
            let scorer = ScorerKind::default().build();
            let first = best_match(&query, &candidates, 50.0, scorer.as_ref());
            let second = best_match(&query, &candidates, 50.0, scorer.as_ref());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn duplicated_best_resolves_to_earliest(
            name in "[A-Za-z]{3,12}",
            filler in proptest::collection::vec("[0-9]{3,6}", 0..4),
        ) {
            let mut candidates = filler.clone();
            let first_pos = candidates.len();
            candidates.push(name.clone());
            candidates.push(name.clone());
            let (found, score) = best_match(&name, &candidates, 0.0, &CharOverlap);
            prop_assert_eq!(score, 100.0);
            let found = found.unwrap();
            prop_assert!(std::ptr::eq(found, candidates[first_pos].as_str()));
        }
    }
}
