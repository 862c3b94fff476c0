//! Similarity scoring between customer names on a 0–100 scale.
//!
//! Two interchangeable strategies sit behind [`Scorer`]:
//! - [`WeightedRatio`] (feature `fuzzy`): token-aware edit-distance blend,
//!   tolerant of reordered words and partial names.
//! - [`CharOverlap`]: dependency-free fallback based on containment, base-name
//!   equality and character-set overlap.
//!
//! The strategy is chosen once at startup from [`ScorerKind`]; call sites only
//! see `&dyn Scorer`.

use std::collections::BTreeSet;

#[cfg(feature = "fuzzy")]
use rapidfuzz::distance::indel;
use serde::{Deserialize, Serialize};

use crate::normalize::{base_name, normalize};

pub trait Scorer {
    fn name(&self) -> &'static str;

    /// Score two normalized, non-empty, non-identical names.
    fn score_normalized(&self, query: &str, candidate: &str) -> f64;

    /// Score raw names. Both sides are normalized first; identical names score
    /// 100 and a side that normalizes to nothing scores 0 unless the raw
    /// strings are equal.
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let q = normalize(query);
        let c = normalize(candidate);
        if q.is_empty() || c.is_empty() {
            let raw = query.trim();
            return if !raw.is_empty() && raw == candidate.trim() { 100.0 } else { 0.0 };
        }
        if q == c {
            return 100.0;
        }
        self.score_normalized(&q, &c).clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    WeightedRatio,
    CharOverlap,
}

impl Default for ScorerKind {
    fn default() -> Self {
        if cfg!(feature = "fuzzy") {
            Self::WeightedRatio
        } else {
            Self::CharOverlap
        }
    }
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeightedRatio => write!(f, "weighted_ratio"),
            Self::CharOverlap => write!(f, "char_overlap"),
        }
    }
}

impl ScorerKind {
    /// Instantiate the strategy. Degrades to [`CharOverlap`] with a warning
    /// when the weighted ratio was requested but not compiled in.
    pub fn build(self) -> Box<dyn Scorer> {
        match self {
            #[cfg(feature = "fuzzy")]
            Self::WeightedRatio => Box::new(WeightedRatio),
            #[cfg(not(feature = "fuzzy"))]
            Self::WeightedRatio => {
                log::warn!(
                    "weighted_ratio scorer not available (built without `fuzzy`); using char_overlap"
                );
                Box::new(CharOverlap)
            }
            Self::CharOverlap => Box::new(CharOverlap),
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback: character overlap
// ---------------------------------------------------------------------------

/// Containment scores 90, equal base names 85, otherwise Jaccard overlap of
/// the two character sets × 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharOverlap;

impl Scorer for CharOverlap {
    fn name(&self) -> &'static str {
        "char_overlap"
    }

    fn score_normalized(&self, query: &str, candidate: &str) -> f64 {
        if candidate.contains(query) || query.contains(candidate) {
            return 90.0;
        }
        let base_q = base_name(query);
        if !base_q.is_empty() && base_q == base_name(candidate) {
            return 85.0;
        }
        let q: BTreeSet<char> = query.chars().collect();
        let c: BTreeSet<char> = candidate.chars().collect();
        let union = q.union(&c).count();
        if union == 0 {
            return 0.0;
        }
        q.intersection(&c).count() as f64 / union as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Library-backed: weighted ratio
// ---------------------------------------------------------------------------

/// Weighted blend of plain, token-sorted, token-set and partial ratios, all
/// built on the Indel (insert/delete only) similarity.
///
/// Names of similar length compare whole-string and token-wise; when one is
/// at least 1.5× longer the partial (best window) ratios take over, scaled
/// down so a fragment never outranks a full match.
#[cfg(feature = "fuzzy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

#[cfg(feature = "fuzzy")]
impl Scorer for WeightedRatio {
    fn name(&self) -> &'static str {
        "weighted_ratio"
    }

    fn score_normalized(&self, query: &str, candidate: &str) -> f64 {
        const UNBASE_SCALE: f64 = 0.95;

        let base = ratio(query, candidate);
        let len_q = query.chars().count() as f64;
        let len_c = candidate.chars().count() as f64;
        let len_ratio = len_q.max(len_c) / len_q.min(len_c);

        if len_ratio < 1.5 {
            let token = token_sort_ratio(query, candidate).max(token_set_ratio(query, candidate));
            return base.max(token * UNBASE_SCALE);
        }

        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        base.max(partial_ratio(query, candidate) * partial_scale)
            .max(partial_token_ratio(query, candidate) * UNBASE_SCALE * partial_scale)
    }
}

/// `2 × LCS / (len a + len b) × 100`.
#[cfg(feature = "fuzzy")]
fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    indel::normalized_similarity(a.chars(), b.chars()) * 100.0
}

#[cfg(feature = "fuzzy")]
fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

#[cfg(feature = "fuzzy")]
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

#[cfg(feature = "fuzzy")]
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    let sect: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let diff_ab: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let diff_ba: Vec<&str> = set_b.difference(&set_a).copied().collect();

    // One name's words are a subset of the other's.
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect_str = sect.join(" ");
    let join = |diff: &[&str]| {
        if sect_str.is_empty() {
            diff.join(" ")
        } else {
            format!("{sect_str} {}", diff.join(" "))
        }
    };
    let combined_ab = join(&diff_ab);
    let combined_ba = join(&diff_ba);

    let mut best = ratio(&combined_ab, &combined_ba);
    if !sect_str.is_empty() {
        best = best.max(ratio(&sect_str, &combined_ab)).max(ratio(&sect_str, &combined_ba));
    }
    best
}

/// Best ratio of the shorter string against every equally long window of the longer.
#[cfg(feature = "fuzzy")]
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == short_len {
        return ratio(short, long);
    }

    let mut best = 0.0f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(short, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

#[cfg(feature = "fuzzy")]
fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.intersection(&set_b).next().is_some() {
        return 100.0;
    }
    partial_ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}
