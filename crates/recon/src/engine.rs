use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{classify, Pairing};
use crate::config::{ReconConfig, Thresholds};
use crate::evidence::compute_stats;
use crate::matcher::best_match;
use crate::model::{CustomerRecord, MatchCandidate, MatchResult, MatchStats, Partition, RouteKey, Source};
use crate::normalize::normalize;
use crate::scorer::Scorer;

/// Output of one matching run across all configured routes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchRun {
    pub scorer: &'static str,
    pub results: Vec<MatchResult>,
    pub stats: MatchStats,
}

/// Match every configured route using the scorer named in the config.
pub fn run(config: &ReconConfig, records: &[CustomerRecord]) -> MatchRun {
    let scorer = config.scorer.kind.build();
    let results = match_all(records, config, scorer.as_ref());
    let stats = compute_stats(&results);
    MatchRun { scorer: scorer.name(), results, stats }
}

/// Group records by route. Names are trimmed, deduplicated and sorted; names
/// that normalize to nothing are dropped with a warning.
pub fn partition(records: &[CustomerRecord]) -> BTreeMap<RouteKey, Partition> {
    let mut sets: BTreeMap<RouteKey, (BTreeSet<String>, BTreeSet<String>)> = BTreeMap::new();
    for record in records {
        let name = record.raw_name.trim();
        if normalize(name).is_empty() {
            if !name.is_empty() {
                log::warn!(
                    "{}: dropping {:?} customer '{name}' (empty after normalization)",
                    record.route,
                    record.source
                );
            }
            continue;
        }
        let entry = sets.entry(record.route).or_default();
        match record.source {
            Source::Planning => entry.0.insert(name.to_string()),
            Source::Export => entry.1.insert(name.to_string()),
        };
    }

    sets.into_iter()
        .map(|(route, (planning, export))| {
            let partition = Partition {
                planning: planning.into_iter().collect(),
                export: export.into_iter().collect(),
            };
            (route, partition)
        })
        .collect()
}

/// Match one route's planning names against its export names.
///
/// Planning names are processed in order; each yields one result. Export
/// names stay eligible for later queries after being matched, and the
/// matched set only determines which export names are left over for
/// `ADD_TO_EXCEL`.
pub fn match_route(
    route: RouteKey,
    partition: &Partition,
    thresholds: &Thresholds,
    scorer: &dyn Scorer,
) -> Vec<MatchResult> {
    let cutoff = thresholds.cutoff();
    let mut matched: BTreeSet<&str> = BTreeSet::new();
    let mut results = Vec::with_capacity(partition.planning.len() + partition.export.len());

    for source_name in &partition.planning {
        let pairing = match best_match(source_name, &partition.export, cutoff, scorer) {
            (Some(target), score) => {
                matched.insert(target);
                Pairing::Matched(MatchCandidate {
                    source_name: source_name.clone(),
                    target_name: target.to_string(),
                    score,
                })
            }
            (None, _) => Pairing::Unmatched { source_name: source_name.clone() },
        };
        results.push(classify(route, pairing, thresholds));
    }

    for target_name in &partition.export {
        if !matched.contains(target_name.as_str()) {
            let pairing = Pairing::Leftover { target_name: target_name.clone() };
            results.push(classify(route, pairing, thresholds));
        }
    }

    log::debug!(
        "{route}: {} planning, {} export, {} export names matched",
        partition.planning.len(),
        partition.export.len(),
        matched.len()
    );
    results
}

/// Match every route listed in `config.routes`, in that order. Records for
/// routes outside the list are ignored with a warning.
pub fn match_all(records: &[CustomerRecord], config: &ReconConfig, scorer: &dyn Scorer) -> Vec<MatchResult> {
    let mut partitions = partition(records);
    let mut results = Vec::new();

    for route in &config.routes {
        let part = partitions.remove(route).unwrap_or_default();
        if part.planning.is_empty() && part.export.is_empty() {
            log::info!("{route}: no customers on either side");
            continue;
        }
        results.extend(match_route(*route, &part, &config.thresholds, scorer));
    }

    for (route, part) in partitions {
        log::warn!(
            "{route}: not in configured routes, skipping {} planning / {} export customers",
            part.planning.len(),
            part.export.len()
        );
    }

    results
}
