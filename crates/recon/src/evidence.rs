use crate::model::{Action, Confidence, MatchResult, MatchStats};

/// Count results per confidence tier and per action.
///
/// `needs_review` covers both `REVIEW` and `MANUAL_REVIEW`; results with no
/// confidence (`NOT_IN_API`, `ADD_TO_EXCEL`) only show up in their action count.
pub fn compute_stats(results: &[MatchResult]) -> MatchStats {
    let mut stats = MatchStats { total: results.len(), ..MatchStats::default() };

    for r in results {
        match r.confidence {
            Confidence::High => stats.high_confidence += 1,
            Confidence::Medium => stats.medium_confidence += 1,
            Confidence::Low => stats.low_confidence += 1,
            Confidence::None => {}
        }
        match r.action {
            Action::UpdateExcel => stats.update_excel += 1,
            Action::AddToExcel => stats.add_to_excel += 1,
            Action::NotInApi => stats.not_in_api += 1,
            Action::Review | Action::ManualReview => stats.needs_review += 1,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RouteKey, Shift, Site};

    fn result(action: Action, confidence: Confidence) -> MatchResult {
        MatchResult {
            route: RouteKey::new(Site::Rijnsburg, Shift::Evening),
            source_name: "a".into(),
            target_name: "b".into(),
            score: 0.0,
            confidence,
            action,
            notes: String::new(),
        }
    }

    #[test]
    fn stats_counts() {
        let results = vec![
            result(Action::UpdateExcel, Confidence::High),
            result(Action::UpdateExcel, Confidence::High),
            result(Action::Review, Confidence::Medium),
            result(Action::ManualReview, Confidence::Low),
            result(Action::NotInApi, Confidence::None),
            result(Action::AddToExcel, Confidence::None),
            result(Action::AddToExcel, Confidence::None),
        ];
        let stats = compute_stats(&results);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.high_confidence, 2);
        assert_eq!(stats.medium_confidence, 1);
        assert_eq!(stats.low_confidence, 1);
        assert_eq!(stats.update_excel, 2);
        assert_eq!(stats.needs_review, 2);
        assert_eq!(stats.not_in_api, 1);
        assert_eq!(stats.add_to_excel, 2);
    }

    #[test]
    fn stats_empty() {
        assert_eq!(compute_stats(&[]), MatchStats::default());
    }
}
