//! Route-level rollups over whole snapshots.
//!
//! Two comparison notions live here and stay separate:
//! - [`snapshot_diff`] uses exact normalized-name equality ("are the two
//!   sources in lockstep today").
//! - [`compare_before_after`] uses normalized equality with a substring
//!   containment fallback, via [`names_correspond`].

use std::collections::BTreeSet;

use crate::model::{Comparison, ComparisonDetail, ComparisonRow, RouteKey, RouteSummary, Snapshot};
use crate::normalize::normalize;

fn rate(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64 * 100.0
    }
}

fn normalized_set(names: &[String]) -> BTreeSet<String> {
    names.iter().map(|n| normalize(n)).filter(|n| !n.is_empty()).collect()
}

// ---------------------------------------------------------------------------
// Snapshot diff
// ---------------------------------------------------------------------------

/// Per-route diff between the planning and export snapshots, followed by a
/// TOTAL row (`route: None`). Routes absent from a snapshot count as empty.
pub fn snapshot_diff(routes: &[RouteKey], planning: &Snapshot, export: &Snapshot) -> Vec<RouteSummary> {
    let mut rows: Vec<RouteSummary> = routes
        .iter()
        .map(|route| {
            let plan = planning.get(route).cloned().unwrap_or_default();
            let exp = export.get(route).cloned().unwrap_or_default();
            let plan_set = normalized_set(&plan.customers);
            let exp_set = normalized_set(&exp.customers);
            let matched_count = plan_set.intersection(&exp_set).count();

            RouteSummary {
                route: Some(*route),
                planning_orders: plan.orders,
                export_orders: exp.orders,
                source_count: plan_set.len(),
                target_count: exp_set.len(),
                matched_count,
                match_rate: rate(matched_count, exp_set.len()),
                missing: exp_set.difference(&plan_set).cloned().collect(),
                extra: plan_set.difference(&exp_set).cloned().collect(),
            }
        })
        .collect();

    let mut total = RouteSummary {
        route: None,
        planning_orders: 0,
        export_orders: 0,
        source_count: 0,
        target_count: 0,
        matched_count: 0,
        match_rate: 0.0,
        missing: Vec::new(),
        extra: Vec::new(),
    };
    for row in &rows {
        total.planning_orders += row.planning_orders;
        total.export_orders += row.export_orders;
        total.source_count += row.source_count;
        total.target_count += row.target_count;
        total.matched_count += row.matched_count;
        total.missing.extend(row.missing.iter().cloned());
        total.extra.extend(row.extra.iter().cloned());
    }
    total.match_rate = rate(total.matched_count, total.target_count);
    rows.push(total);
    rows
}

// ---------------------------------------------------------------------------
// Before / after comparison
// ---------------------------------------------------------------------------

/// Two names refer to the same customer when their normalized forms are
/// equal or one contains the other. Empty names correspond to nothing.
pub fn names_correspond(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(&b) || b.contains(&a)
}

fn present_in(name: &str, snapshot_names: &[String]) -> bool {
    snapshot_names.iter().any(|candidate| names_correspond(name, candidate))
}

/// Count, per route, how many export customers each planning snapshot
/// contains. The TOTAL row (`route: None`) sums the counts and derives its
/// rates from the sums.
pub fn compare_before_after(
    routes: &[RouteKey],
    export: &Snapshot,
    before: &Snapshot,
    after: &Snapshot,
) -> Comparison {
    let mut rows = Vec::with_capacity(routes.len() + 1);
    let mut details = Vec::new();

    for route in routes {
        let exp = export.get(route).map(|c| c.customers.as_slice()).unwrap_or(&[]);
        let bef = before.get(route).map(|c| c.customers.as_slice()).unwrap_or(&[]);
        let aft = after.get(route).map(|c| c.customers.as_slice()).unwrap_or(&[]);

        let mut before_matched = 0;
        let mut after_matched = 0;
        for customer in exp {
            let in_before = present_in(customer, bef);
            let in_after = present_in(customer, aft);
            before_matched += usize::from(in_before);
            after_matched += usize::from(in_after);
            details.push(ComparisonDetail {
                route: *route,
                export_customer: customer.clone(),
                in_before,
                in_after,
            });
        }

        rows.push(ComparisonRow {
            route: Some(*route),
            export_customers: exp.len(),
            planning_before: bef.len(),
            planning_after: aft.len(),
            before_matched,
            after_matched,
            before_rate: rate(before_matched, exp.len()),
            after_rate: rate(after_matched, exp.len()),
        });
    }

    let sum = |f: fn(&ComparisonRow) -> usize| rows.iter().map(f).sum::<usize>();
    let export_customers = sum(|r| r.export_customers);
    let before_matched = sum(|r| r.before_matched);
    let after_matched = sum(|r| r.after_matched);
    let total = ComparisonRow {
        route: None,
        export_customers,
        planning_before: sum(|r| r.planning_before),
        planning_after: sum(|r| r.planning_after),
        before_matched,
        after_matched,
        before_rate: rate(before_matched, export_customers),
        after_rate: rate(after_matched, export_customers),
    };
    rows.push(total);

    Comparison { rows, details }
}
