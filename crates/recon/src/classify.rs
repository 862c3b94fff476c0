use crate::config::Thresholds;
use crate::model::{Action, Confidence, MatchCandidate, MatchResult, RouteKey};

/// Outcome of one matching step, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Pairing {
    /// Export-side name that no planning query selected.
    Leftover { target_name: String },
    /// Planning-side name with no candidate at or above the matcher cutoff.
    Unmatched { source_name: String },
    /// Planning-side name and its best export-side candidate.
    Matched(MatchCandidate),
}

/// Map a pairing onto the action taxonomy.
///
/// | pairing                         | action        | confidence |
/// |---------------------------------|---------------|------------|
/// | leftover export name            | ADD_TO_EXCEL  | NONE       |
/// | no match                        | NOT_IN_API    | NONE       |
/// | score >= high                   | UPDATE_EXCEL  | HIGH       |
/// | medium <= score < high          | REVIEW        | MEDIUM     |
/// | cutoff <= score < medium        | MANUAL_REVIEW | LOW        |
pub fn classify(route: RouteKey, pairing: Pairing, thresholds: &Thresholds) -> MatchResult {
    match pairing {
        Pairing::Leftover { target_name } => MatchResult {
            route,
            source_name: String::new(),
            target_name,
            score: 0.0,
            confidence: Confidence::None,
            action: Action::AddToExcel,
            notes: "Customer exists in API but not in Excel - needs to be added".into(),
        },
        Pairing::Unmatched { source_name } => MatchResult {
            route,
            source_name,
            target_name: String::new(),
            score: 0.0,
            confidence: Confidence::None,
            action: Action::NotInApi,
            notes: "Customer exists in Excel but not found in API".into(),
        },
        Pairing::Matched(candidate) => {
            let score = candidate.score;
            let confidence = thresholds.confidence(score);
            let (action, notes) = match confidence {
                Confidence::High => {
                    (Action::UpdateExcel, format!("High confidence match ({score:.1}%)"))
                }
                Confidence::Medium => (
                    Action::Review,
                    format!("Medium confidence match ({score:.1}%) - review needed"),
                ),
                Confidence::Low | Confidence::None => (
                    Action::ManualReview,
                    format!("Low confidence match ({score:.1}%) - manual review required"),
                ),
            };
            MatchResult {
                route,
                source_name: candidate.source_name,
                target_name: candidate.target_name,
                score,
                confidence,
                action,
                notes,
            }
        }
    }
}
